use std::sync::Arc;

use threadview_core::{Collection, ReportId};

/// Immutable view of one report's actions at a given version.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub report_id: ReportId,
    /// Bumped by the store on every mutation of this report. Never reused,
    /// even after the report is cleared and repopulated.
    pub version: u64,
    pub actions: Arc<Collection>,
}

impl CollectionSnapshot {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Callback invoked with `(report, new_version)` after a report changes.
pub type ChangeCallback = Arc<dyn Fn(ReportId, u64) + Send + Sync>;

/// Read side of the source of truth, as seen by the query engine.
pub trait ActionSource {
    fn snapshot(&self, report_id: ReportId) -> Option<CollectionSnapshot>;

    fn version(&self, report_id: ReportId) -> Option<u64> {
        self.snapshot(report_id).map(|s| s.version)
    }
}

impl<S: ActionSource + ?Sized> ActionSource for Arc<S> {
    fn snapshot(&self, report_id: ReportId) -> Option<CollectionSnapshot> {
        (**self).snapshot(report_id)
    }

    fn version(&self, report_id: ReportId) -> Option<u64> {
        (**self).version(report_id)
    }
}
