use threadview_core::{ActionId, ReportId, SubscriptionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report not found: {0}")]
    ReportNotFound(ReportId),

    #[error("action {action_id} not found in report {report_id}")]
    ActionNotFound {
        report_id: ReportId,
        action_id: ActionId,
    },

    #[error("subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("core error: {0}")]
    Core(#[from] threadview_core::CoreError),
}
