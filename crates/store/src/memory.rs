use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use threadview_core::{Action, ActionId, ActionPatch, Collection, PendingState, ReportId, SubscriptionId};

use crate::error::StoreError;
use crate::traits::{ActionSource, ChangeCallback, CollectionSnapshot};

struct ReportState {
    version: u64,
    actions: Arc<Collection>,
}

struct Subscriber {
    report_id: ReportId,
    callback: ChangeCallback,
}

/// In-memory source of truth for report actions.
///
/// Snapshots share their collection with the store; a mutation after a
/// snapshot was taken copies the map (entries stay shared) so outstanding
/// snapshots never change underneath their holders.
pub struct ActionStore {
    reports: RwLock<HashMap<ReportId, ReportState>>,
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    /// Store-wide so a cleared and repopulated report never repeats a version.
    next_version: AtomicU64,
}

impl Default for ActionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionStore {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            next_version: AtomicU64::new(1),
        }
    }

    fn bump(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed)
    }

    /// Run `mutate` against a report's collection and publish the new version.
    fn mutate<T>(
        &self,
        report_id: ReportId,
        create: bool,
        mutate: impl FnOnce(&mut Collection) -> Result<T, StoreError>,
    ) -> Result<(T, u64), StoreError> {
        let (out, version) = {
            let mut reports = self.reports.write();
            let fresh = !reports.contains_key(&report_id);
            if fresh && !create {
                return Err(StoreError::ReportNotFound(report_id));
            }
            let state = reports.entry(report_id).or_insert_with(|| ReportState {
                version: 0,
                actions: Arc::new(Collection::new()),
            });
            match mutate(Arc::make_mut(&mut state.actions)) {
                Ok(out) => {
                    state.version = self.bump();
                    (out, state.version)
                }
                Err(e) => {
                    if fresh {
                        reports.remove(&report_id);
                    }
                    return Err(e);
                }
            }
        };
        tracing::debug!(%report_id, version, "report changed");
        self.notify(report_id, version);
        Ok((out, version))
    }

    fn notify(&self, report_id: ReportId, version: u64) {
        // Collect first so callbacks may call back into the store.
        let callbacks: Vec<ChangeCallback> = self
            .subscribers
            .read()
            .values()
            .filter(|s| s.report_id == report_id)
            .map(|s| Arc::clone(&s.callback))
            .collect();
        for callback in callbacks {
            callback(report_id, version);
        }
    }

    /// Insert or replace many actions at once. Creates the report if needed.
    /// Returns the new version.
    pub fn set_actions(
        &self,
        report_id: ReportId,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<u64, StoreError> {
        let ((), version) = self.mutate(report_id, true, |collection| {
            for action in actions {
                collection.insert(action.id.clone(), Arc::new(action));
            }
            Ok(())
        })?;
        Ok(version)
    }

    pub fn upsert_action(&self, report_id: ReportId, action: Action) -> Result<u64, StoreError> {
        self.set_actions(report_id, [action])
    }

    pub fn remove_action(&self, report_id: ReportId, action_id: &ActionId) -> Result<Arc<Action>, StoreError> {
        let (removed, _) = self.mutate(report_id, false, |collection| {
            collection.remove(action_id).ok_or_else(|| StoreError::ActionNotFound {
                report_id,
                action_id: action_id.clone(),
            })
        })?;
        Ok(removed)
    }

    /// Fold a confirmed local edit into the collection.
    ///
    /// The result is a confirmed action: pending state cleared, no previous
    /// message, no errors. A confirmed delete removes the action. Ids unknown
    /// to the store are created from the patch alone.
    pub fn commit_patch(
        &self,
        report_id: ReportId,
        action_id: &ActionId,
        patch: &ActionPatch,
    ) -> Result<u64, StoreError> {
        let ((), version) = self.mutate(report_id, true, |collection| {
            if patch.pending_state() == Some(PendingState::Delete) {
                collection.remove(action_id);
                return Ok(());
            }
            let mut committed = match collection.get(action_id) {
                Some(existing) => patch.apply_to(existing),
                None => patch.synthesize(action_id)?,
            };
            committed.pending = PendingState::None;
            committed.previous_message = None;
            committed.errors.clear();
            collection.insert(action_id.clone(), Arc::new(committed));
            Ok(())
        })?;
        Ok(version)
    }

    /// Drop a report entirely. Returns the version subscribers are notified
    /// with; it is fresh like any other mutation's.
    pub fn clear_report(&self, report_id: ReportId) -> Result<u64, StoreError> {
        let removed = self.reports.write().remove(&report_id);
        if removed.is_none() {
            return Err(StoreError::ReportNotFound(report_id));
        }
        let version = self.bump();
        tracing::debug!(%report_id, version, "report cleared");
        self.notify(report_id, version);
        Ok(version)
    }

    pub fn subscribe(&self, report_id: ReportId, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers
            .write()
            .insert(id, Subscriber { report_id, callback });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), StoreError> {
        self.subscribers
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::SubscriptionNotFound(id))
    }

}

impl ActionSource for ActionStore {
    fn snapshot(&self, report_id: ReportId) -> Option<CollectionSnapshot> {
        self.reports.read().get(&report_id).map(|state| CollectionSnapshot {
            report_id,
            version: state.version,
            actions: Arc::clone(&state.actions),
        })
    }

    fn version(&self, report_id: ReportId) -> Option<u64> {
        self.reports.read().get(&report_id).map(|state| state.version)
    }
}
