//! Render-ready snapshot of one reconciled stream.

use crate::domain::foundation::{Timestamp, UserId};

use super::merge::{LocalStore, Reconcilable};

/// What a stream looks like right now.
///
/// Rebuilt from the whole local store on every change. Derived fields and
/// the badge are never carried over from the previous view.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamView<T> {
    pub items: Vec<T>,
    pub badge: usize,
    pub generated_at: Timestamp,
    pub last_pull_at: Option<Timestamp>,
    pub push_connected: bool,
}

impl<T: Reconcilable> StreamView<T> {
    pub fn empty(now: Timestamp) -> Self {
        Self {
            items: Vec::new(),
            badge: 0,
            generated_at: now,
            last_pull_at: None,
            push_connected: false,
        }
    }

    pub fn build(
        store: &LocalStore<T>,
        viewer: &UserId,
        now: Timestamp,
        last_pull_at: Option<Timestamp>,
        push_connected: bool,
    ) -> Self {
        let mut items = store.values();
        for item in &mut items {
            item.refresh_derived(now);
        }
        T::sort_view(&mut items);
        let badge = T::badge(&items, viewer);
        Self {
            items,
            badge,
            generated_at: now,
            last_pull_at,
            push_connected,
        }
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| &item.key() == key)
    }

    /// Number of entries held for `key`. Zero or one unless the merge is broken.
    pub fn occurrences(&self, key: &T::Key) -> usize {
        self.items.iter().filter(|item| &item.key() == key).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
