//! Ordered views over an effective collection.
//!
//! A [`SortedView`] always stores actions ascending. Descending views share the
//! same storage and iterate it back to front, so flipping direction never
//! sorts again and one cached sort serves both directions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threadview_core::{Action, ActionId, Collection};

use crate::order::compare;
use crate::visibility::is_visible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Oldest first.
    Ascending,
    /// Most recent first.
    Descending,
}

#[derive(Debug, Clone)]
pub struct SortedView {
    ascending: Arc<[Arc<Action>]>,
    direction: Direction,
}

impl SortedView {
    /// Wrap actions already in ascending order.
    fn from_ascending(ascending: Vec<Arc<Action>>, direction: Direction) -> Self {
        Self {
            ascending: ascending.into(),
            direction,
        }
    }

    pub fn empty(direction: Direction) -> Self {
        Self::from_ascending(Vec::new(), direction)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Same actions, other direction. Shares storage.
    pub fn with_direction(&self, direction: Direction) -> Self {
        Self {
            ascending: Arc::clone(&self.ascending),
            direction,
        }
    }

    pub fn len(&self) -> usize {
        self.ascending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ascending.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Action>> {
        match self.direction {
            Direction::Ascending => self.ascending.get(index),
            Direction::Descending => index
                .checked_add(1)
                .and_then(|n| self.ascending.len().checked_sub(n))
                .and_then(|i| self.ascending.get(i)),
        }
    }

    pub fn first(&self) -> Option<&Arc<Action>> {
        self.get(0)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.ascending.iter(),
            reversed: self.direction == Direction::Descending,
        }
    }

    /// Most recent first, whatever this view's direction.
    pub fn latest_first(&self) -> Iter<'_> {
        Iter {
            inner: self.ascending.iter(),
            reversed: true,
        }
    }

    pub fn ids(&self) -> Vec<ActionId> {
        self.iter().map(|a| a.id.clone()).collect()
    }

    /// True when both views hold the same storage.
    pub fn shares_storage_with(&self, other: &SortedView) -> bool {
        Arc::ptr_eq(&self.ascending, &other.ascending)
    }
}

pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Arc<Action>>,
    reversed: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Arc<Action>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reversed {
            self.inner.next_back()
        } else {
            self.inner.next()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.reversed {
            self.inner.next()
        } else {
            self.inner.next_back()
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a SortedView {
    type Item = &'a Arc<Action>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Order an effective collection.
///
/// One stable merge sort (`slice::sort_by`, O(n log n) worst case including
/// inputs full of equal timestamps); the collection is not modified.
pub fn sorted_view(effective: &Collection, direction: Direction) -> SortedView {
    let mut actions: Vec<Arc<Action>> = effective.values().cloned().collect();
    actions.sort_by(|a, b| compare(a, b));
    tracing::trace!(len = actions.len(), "sorted actions");
    SortedView::from_ascending(actions, direction)
}

/// Like [`sorted_view`] but keeps only actions that pass [`is_visible`].
pub fn sorted_for_display(effective: &Collection, direction: Direction) -> SortedView {
    let mut actions: Vec<Arc<Action>> = effective
        .values()
        .filter(|a| is_visible(a))
        .cloned()
        .collect();
    actions.sort_by(|a, b| compare(a, b));
    SortedView::from_ascending(actions, direction)
}

/// Narrow an existing view to visible actions, keeping its direction.
pub fn visible_only(view: &SortedView) -> SortedView {
    let ascending: Vec<Arc<Action>> = view
        .ascending
        .iter()
        .filter(|a| is_visible(a))
        .cloned()
        .collect();
    SortedView::from_ascending(ascending, view.direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadview_core::{ActionKind, PendingState, Timestamp};

    fn collection(entries: &[(&str, ActionKind, u64)]) -> Collection {
        entries
            .iter()
            .map(|(id, kind, ms)| {
                let action = Action::new(*id, kind.clone(), Timestamp::from_millis(*ms));
                (action.id.clone(), Arc::new(action))
            })
            .collect()
    }

    fn ids(view: &SortedView) -> Vec<String> {
        view.iter().map(|a| a.id.to_string()).collect()
    }

    #[test]
    fn ascending_and_descending() {
        let c = collection(&[
            ("3", ActionKind::Comment, 30),
            ("1", ActionKind::Comment, 10),
            ("2", ActionKind::Comment, 20),
        ]);
        let asc = sorted_view(&c, Direction::Ascending);
        assert_eq!(ids(&asc), vec!["1", "2", "3"]);

        let desc = sorted_view(&c, Direction::Descending);
        assert_eq!(ids(&desc), vec!["3", "2", "1"]);
        assert_eq!(desc.first().unwrap().id.as_str(), "3");
        assert_eq!(desc.get(2).unwrap().id.as_str(), "1");
        assert!(desc.get(3).is_none());
        assert!(desc.get(usize::MAX).is_none());
        assert!(asc.get(usize::MAX).is_none());
    }

    #[test]
    fn flipping_direction_shares_storage() {
        let c = collection(&[("1", ActionKind::Comment, 10), ("2", ActionKind::Comment, 20)]);
        let asc = sorted_view(&c, Direction::Ascending);
        let desc = asc.with_direction(Direction::Descending);
        assert!(asc.shares_storage_with(&desc));
        assert_eq!(ids(&desc), vec!["2", "1"]);
        let back: Vec<_> = desc.iter().rev().map(|a| a.id.to_string()).collect();
        assert_eq!(back, vec!["1", "2"]);
    }

    #[test]
    fn entries_are_shared_not_copied() {
        let c = collection(&[("1", ActionKind::Comment, 10)]);
        let view = sorted_view(&c, Direction::Ascending);
        assert!(Arc::ptr_eq(view.first().unwrap(), &c[&ActionId::from(1)]));
    }

    #[test]
    fn many_equal_timestamps_are_deterministic() {
        let entries: Vec<(String, u64)> = (0..2_000u64).map(|i| ((i * 7919 % 2_000).to_string(), 5)).collect();
        let c: Collection = entries
            .iter()
            .map(|(id, ms)| {
                let action = Action::new(id.as_str(), ActionKind::Comment, Timestamp::from_millis(*ms));
                (action.id.clone(), Arc::new(action))
            })
            .collect();
        let first = sorted_view(&c, Direction::Ascending).ids();
        let second = sorted_view(&c, Direction::Ascending).ids();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn display_view_drops_hidden_actions() {
        let mut c = collection(&[
            ("1", ActionKind::Comment, 10),
            ("2", ActionKind::Closed, 20),
            ("3", ActionKind::Comment, 30),
        ]);
        let deleted = Action::new("3", ActionKind::Comment, Timestamp::from_millis(30))
            .with_pending(PendingState::Delete);
        c.insert(deleted.id.clone(), Arc::new(deleted));

        let view = sorted_for_display(&c, Direction::Descending);
        assert_eq!(ids(&view), vec!["1"]);

        let narrowed = visible_only(&sorted_view(&c, Direction::Descending));
        assert_eq!(ids(&narrowed), ids(&view));
    }

    #[test]
    fn empty_collection() {
        let view = sorted_view(&Collection::new(), Direction::Descending);
        assert!(view.is_empty());
        assert!(view.first().is_none());
        assert_eq!(SortedView::empty(Direction::Ascending).len(), 0);
    }
}
