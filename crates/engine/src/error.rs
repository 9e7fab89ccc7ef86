use threadview_core::{ActionId, CoreError, ReportId};
use threadview_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("invalid config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("no local edit for action {action_id} in report {report_id}")]
    OverlayEntryNotFound {
        report_id: ReportId,
        action_id: ActionId,
    },

    #[error("action {action_id} not found in report {report_id}")]
    ActionNotFound {
        report_id: ReportId,
        action_id: ActionId,
    },

    #[error("action {action_id} already exists in report {report_id}")]
    ActionAlreadyExists {
        report_id: ReportId,
        action_id: ActionId,
    },
}
