//! Per-contact shear history and its persistence across steps and restarts.

use dashmap::DashMap;
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::GranError;

/// Stable identity of a contact, independent of neighbor-list slot order.
///
/// Pair keys are stored with the smaller body id first so that {a, b} and
/// {b, a} resolve to the same entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContactKey {
    Pair { a: u64, b: u64 },
    Wall { body: u64, element: u64 },
}

impl ContactKey {
    pub fn pair(a: u64, b: u64) -> Self {
        if a <= b {
            Self::Pair { a, b }
        } else {
            Self::Pair { a: b, b: a }
        }
    }

    pub fn wall(body: u64, element: u64) -> Self {
        Self::Wall { body, element }
    }
}

/// State carried by a live contact between steps.
///
/// `shear` is meaningful only while `touching` is true; the store guarantees
/// it is exactly zero from the moment a contact separates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactState {
    pub touching: bool,
    pub shear: DVec3,
}

impl ContactState {
    pub fn new() -> Self {
        Self {
            touching: false,
            shear: DVec3::ZERO,
        }
    }
}

impl Default for ContactState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size persisted record for one live contact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub key: ContactKey,
    pub touching: bool,
    pub shear: [f64; 3],
}

/// Owns the shear history of every live contact, keyed by stable identity.
///
/// A missing lookup means "new contact" and yields the zero state; separation
/// removes the entry outright, which is indistinguishable from a contact that
/// never existed. Entries are never shared between contacts, so the map can
/// be updated from parallel evaluation workers without coordination beyond
/// the per-entry locking `DashMap` already provides.
#[derive(Debug, Default)]
pub struct HistoryStore {
    contacts: DashMap<ContactKey, ContactState>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            contacts: DashMap::new(),
        }
    }

    /// Current state of a contact; the zero state if none is stored.
    pub fn get(&self, key: &ContactKey) -> ContactState {
        self.contacts
            .get(key)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    pub fn set(&self, key: ContactKey, state: ContactState) {
        self.contacts.insert(key, state);
    }

    /// Resets a contact to (not touching, zero shear). Called the moment a
    /// pair's separation reaches the touch threshold, whether or not a force
    /// was computed that step.
    pub fn reset(&self, key: &ContactKey) {
        self.contacts.remove(key);
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn clear(&self) {
        self.contacts.clear();
    }

    /// All live contacts as fixed-size records, sorted by key so that the
    /// snapshot is deterministic regardless of map iteration order.
    pub fn snapshot(&self) -> Vec<ContactRecord> {
        let mut records: Vec<ContactRecord> = self
            .contacts
            .iter()
            .map(|entry| ContactRecord {
                key: *entry.key(),
                touching: entry.value().touching,
                shear: entry.value().shear.to_array(),
            })
            .collect();
        records.sort_by_key(|r| r.key);
        records
    }

    /// Replaces the store contents with the given records. Restoring a
    /// snapshot and continuing must reproduce the same force trajectory as a
    /// run that never restarted.
    pub fn restore(&self, records: &[ContactRecord]) -> Result<(), GranError> {
        self.contacts.clear();
        for record in records {
            if record.shear.iter().any(|v| !v.is_finite()) {
                return Err(GranError::CorruptSnapshot(format!(
                    "non-finite shear in record for {:?}",
                    record.key
                )));
            }
            let prior = self.contacts.insert(
                record.key,
                ContactState {
                    touching: record.touching,
                    shear: DVec3::from_array(record.shear),
                },
            );
            if prior.is_some() {
                return Err(GranError::CorruptSnapshot(format!(
                    "duplicate record for {:?}",
                    record.key
                )));
            }
        }
        Ok(())
    }
}
