//! Instruction text and response schema sent with every frame.

use serde_json::{Value, json};
use watchman_core::AuthorizedPerson;

/// Comma-separated `"name (role)"` list, in roster order.
pub fn roster_list(roster: &[AuthorizedPerson]) -> String {
    roster
        .iter()
        .map(AuthorizedPerson::prompt_label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the classification instruction for the current roster.
pub fn build_instruction(roster: &[AuthorizedPerson]) -> String {
    format!(
        "You are a school security AI. Analyze this camera frame.\n\
         Authorized persons list: [{people}].\n\
         Determine if any human is visible. If yes, identify if they match someone \
         in the authorized list or if they are \"Unknown\".\n\
         Provide a concise security status.",
        people = roster_list(roster),
    )
}

/// Schema constraining the service's JSON output to an
/// [`AnalysisResult`](watchman_core::AnalysisResult).
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "detected": {
                "type": "BOOLEAN",
                "description": "True if a human is detected."
            },
            "name": {
                "type": "STRING",
                "description": "The name identified or 'Unknown'."
            },
            "status": {
                "type": "STRING",
                "enum": ["Authorized", "Unauthorized", "None"],
                "description": "Security status of the person detected."
            },
            "reason": {
                "type": "STRING",
                "description": "A short reason for the identification."
            }
        },
        "required": ["detected", "name", "status", "reason"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchman_core::Role;

    #[test]
    fn roster_is_embedded_in_order() {
        let roster = vec![
            AuthorizedPerson::new("1", "Dr. Sarah Wilson", Role::Teacher),
            AuthorizedPerson::new("2", "John Doe", Role::Admin),
        ];
        let text = build_instruction(&roster);
        assert!(text.contains("[Dr. Sarah Wilson (Teacher), John Doe (Admin)]"));
        assert!(text.contains("\"Unknown\""));
    }

    #[test]
    fn empty_roster_yields_empty_list() {
        assert_eq!(roster_list(&[]), "");
        assert!(build_instruction(&[]).contains("Authorized persons list: []."));
    }

    #[test]
    fn schema_requires_all_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["detected", "name", "status", "reason"]);
        assert_eq!(schema["properties"]["status"]["enum"].as_array().unwrap().len(), 3);
    }
}
