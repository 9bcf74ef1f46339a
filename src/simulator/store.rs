use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::BoatRecord;

/// Shared in-memory boat table.
///
/// Updates run under the write lock, so concurrent merges on the same id
/// are serialized and none is lost. Readers always get copies.
#[derive(Clone, Debug, Default)]
pub struct BoatStore {
    boats: Arc<RwLock<Vec<BoatRecord>>>,
}

impl BoatStore {
    pub fn new(boats: impl IntoIterator<Item = BoatRecord>) -> Self {
        Self {
            boats: Arc::new(RwLock::new(boats.into_iter().collect())),
        }
    }

    /// The fleet the third-party API starts with.
    pub fn seeded() -> Self {
        Self::new([
            BoatRecord::new("1", "River Queen"),
            BoatRecord::new("2", "Ocean Explorer"),
            BoatRecord::new("3", "Harbor Master"),
            BoatRecord::new("4", "Bay Cruiser"),
            BoatRecord::new("5", "Lake Navigator"),
        ])
    }

    pub fn list(&self) -> Vec<BoatRecord> {
        self.boats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<BoatRecord> {
        self.boats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|boat| boat.id == id)
            .cloned()
    }

    /// Merges `fields` into the boat with `id`. Never inserts.
    pub fn update(&self, id: &str, fields: &Map<String, Value>) -> Option<BoatRecord> {
        let mut boats = self.boats.write().unwrap_or_else(PoisonError::into_inner);
        let boat = boats.iter_mut().find(|boat| boat.id == id)?;
        boat.merge(fields);
        Some(boat.clone())
    }

    pub fn len(&self) -> usize {
        self.boats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
