//! Order-tolerant merge of push and pull views of one entity collection.
//!
//! Push envelopes and pull results race. Every incoming entity goes through
//! the same replace-by-key step, guarded by a monotonic [`Version`]:
//!
//! - unknown key: insert
//! - known key: replace unless the incoming version is strictly older
//! - a deleted key stays deleted for the tombstone retention window
//!
//! Merging the same entity twice leaves the map unchanged, and a terminal
//! status can never be overwritten by a lower-ranked one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use chrono::Duration;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::sync::{EntityKind, EntityState};

/// Monotonic ordering of the states one entity passes through.
///
/// Compared lexicographically: `rank` first, then `updated_at`. The rank
/// encodes one-way lifecycles (request status, read flags) so a later
/// timestamp cannot pull an entity back to an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub rank: u8,
    pub updated_at: Timestamp,
}

impl Version {
    pub fn new(rank: u8, updated_at: Timestamp) -> Self {
        Self { rank, updated_at }
    }
}

/// An entity the reconciler can hold.
pub trait Reconcilable: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync;

    const KIND: EntityKind;

    fn key(&self) -> Self::Key;

    fn version(&self) -> Version;

    /// Extracts this kind from a decoded envelope.
    fn from_state(state: EntityState) -> Option<Self>;

    /// Recomputes locally derived fields before the entity is shown.
    fn refresh_derived(&mut self, _now: Timestamp) {}

    /// Orders a view for display.
    fn sort_view(_items: &mut [Self]) {}

    /// Badge count for a view, always recomputed from the full collection.
    fn badge(_items: &[Self], _viewer: &UserId) -> usize {
        0
    }
}

/// What a single merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    /// Same key, same content.
    Unchanged,
    /// Incoming was older than what is held.
    Stale,
    /// Key was deleted and the incoming state is not newer than the delete.
    Tombstoned,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, MergeOutcome::Inserted | MergeOutcome::Replaced)
    }
}

/// Tally of one full pull applied to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullMerge {
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
    pub stale: usize,
}

impl PullMerge {
    pub fn changed(&self) -> bool {
        self.inserted + self.replaced + self.removed > 0
    }

    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Replaced => self.replaced += 1,
            MergeOutcome::Stale | MergeOutcome::Tombstoned => self.stale += 1,
            MergeOutcome::Unchanged => {}
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    /// Local instant the entry was last merged.
    observed_at: Timestamp,
}

#[derive(Debug, Clone, Copy)]
struct Tombstone {
    version: Version,
    deleted_at: Timestamp,
}

/// Local reconciled map for one entity stream.
#[derive(Debug, Clone)]
pub struct LocalStore<T: Reconcilable> {
    entries: BTreeMap<T::Key, Entry<T>>,
    tombstones: HashMap<T::Key, Tombstone>,
    tombstone_retention: Duration,
}

impl<T: Reconcilable> LocalStore<T> {
    pub fn new(tombstone_retention: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            tombstones: HashMap::new(),
            tombstone_retention,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Every held entity in key order.
    pub fn values(&self) -> Vec<T> {
        self.entries.values().map(|e| e.value.clone()).collect()
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Merges one entity from either edge.
    pub fn upsert(&mut self, incoming: T, now: Timestamp) -> MergeOutcome {
        let key = incoming.key();
        let version = incoming.version();

        if let Some(tombstone) = self.tombstones.get(&key) {
            if version <= tombstone.version {
                return MergeOutcome::Tombstoned;
            }
            self.tombstones.remove(&key);
        }

        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(
                    key,
                    Entry {
                        value: incoming,
                        observed_at: now,
                    },
                );
                MergeOutcome::Inserted
            }
            Some(entry) => {
                if version < entry.value.version() {
                    return MergeOutcome::Stale;
                }
                entry.observed_at = now;
                if entry.value == incoming {
                    return MergeOutcome::Unchanged;
                }
                entry.value = incoming;
                MergeOutcome::Replaced
            }
        }
    }

    /// Applies a delete. Returns true if an entry was dropped.
    ///
    /// `version` is the version of the deleted state; anything not newer
    /// is refused for the retention window.
    pub fn remove(&mut self, key: &T::Key, version: Version, now: Timestamp) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if version < entry.value.version() {
                return false;
            }
        }
        self.tombstones.insert(
            key.clone(),
            Tombstone {
                version,
                deleted_at: now,
            },
        );
        self.entries.remove(key).is_some()
    }

    /// Merges a full authoritative collection.
    ///
    /// Entries absent from `items` are dropped only if they were last
    /// merged before the pull was issued, less `skew`. Anything observed
    /// after that may have arrived by push while the pull was in flight.
    pub fn apply_pull(
        &mut self,
        items: Vec<T>,
        requested_at: Timestamp,
        skew: Duration,
        now: Timestamp,
    ) -> PullMerge {
        let mut merge = PullMerge::default();
        let mut seen = HashSet::with_capacity(items.len());

        for item in items {
            seen.insert(item.key());
            merge.record(self.upsert(item, now));
        }

        let cutoff = requested_at.minus(skew);
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| seen.contains(key) || !entry.observed_at.is_before(&cutoff));
        merge.removed = before - self.entries.len();

        self.prune_tombstones(now);
        merge
    }

    /// Forgets tombstones older than the retention window.
    pub fn prune_tombstones(&mut self, now: Timestamp) -> usize {
        let retention = self.tombstone_retention;
        let before = self.tombstones.len();
        self.tombstones
            .retain(|_, t| now.duration_since(&t.deleted_at) < retention);
        before - self.tombstones.len()
    }
}
