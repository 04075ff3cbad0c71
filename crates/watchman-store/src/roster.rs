//! Roster of authorized people.
//!
//! The roster is only ever used as prompt context for classification; it
//! grants nothing by itself.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};
use watchman_core::{AuthorizedPerson, IdClock, Role};

use crate::StoreError;
use crate::kv::{KeyValueStore, load_json, save_json};

/// Storage key holding the serialized roster array.
pub const ROSTER_KEY: &str = "school_authorized_people";

/// Roster seeded when storage holds nothing yet.
pub fn default_roster() -> Vec<AuthorizedPerson> {
    vec![
        AuthorizedPerson::new("1", "Dr. Sarah Wilson", Role::Teacher),
        AuthorizedPerson::new("2", "John Doe", Role::Admin),
        AuthorizedPerson::new("3", "Emily Chen", Role::Student),
    ]
}

/// Insertion-ordered roster persisted under [`ROSTER_KEY`].
pub struct RosterStore {
    kv: Arc<dyn KeyValueStore>,
    people: Mutex<Vec<AuthorizedPerson>>,
    ids: IdClock,
}

impl RosterStore {
    /// Hydrate from storage, or seed with [`default_roster`] when the key is
    /// absent or unreadable.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let people = match load_json::<Vec<AuthorizedPerson>>(kv.as_ref(), ROSTER_KEY) {
            Ok(Some(stored)) => dedupe_ids(stored),
            Ok(None) => {
                info!("no stored roster, seeding defaults");
                default_roster()
            }
            Err(StoreError::Json(e)) => {
                warn!(error = %e, "stored roster is corrupt, seeding defaults");
                default_roster()
            }
            Err(e) => return Err(e),
        };
        info!(count = people.len(), "roster loaded");

        Ok(Self {
            kv,
            people: Mutex::new(people),
            ids: IdClock::new(),
        })
    }

    /// Add a person with a fresh id.
    ///
    /// Fails with [`StoreError::Validation`] and leaves the roster untouched
    /// when `name` is empty or whitespace.
    pub fn add(&self, name: &str, role: Role) -> Result<AuthorizedPerson, StoreError> {
        self.add_with_image(name, role, None)
    }

    /// Like [`add`](Self::add), with an optional portrait URL for display.
    pub fn add_with_image(
        &self,
        name: &str,
        role: Role,
        image_url: Option<String>,
    ) -> Result<AuthorizedPerson, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("name must not be empty".into()));
        }

        let mut people = self.lock();
        let id = self
            .ids
            .next_id_excluding(|candidate| people.iter().any(|p| p.id == candidate));
        let person = AuthorizedPerson {
            id,
            name: name.to_string(),
            role,
            image_url,
        };
        people.push(person.clone());
        info!(id = %person.id, role = %person.role, "added authorized person");

        self.persist(&people)?;
        Ok(person)
    }

    /// Remove the person with `id`. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut people = self.lock();
        let before = people.len();
        people.retain(|p| p.id != id);
        if people.len() == before {
            return Ok(());
        }
        info!(id, "removed authorized person");
        self.persist(&people)
    }

    /// Snapshot in insertion order.
    pub fn list(&self) -> Vec<AuthorizedPerson> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuthorizedPerson>> {
        self.people.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, people: &[AuthorizedPerson]) -> Result<(), StoreError> {
        save_json(self.kv.as_ref(), ROSTER_KEY, people).inspect_err(|e| {
            warn!(error = %e, "failed to persist roster");
        })
    }
}

/// Keep the first entry for each id.
fn dedupe_ids(people: Vec<AuthorizedPerson>) -> Vec<AuthorizedPerson> {
    let mut seen = HashSet::new();
    let total = people.len();
    let unique: Vec<_> = people
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(dropped = total - unique.len(), "dropped duplicate roster ids");
    }
    unique
}
