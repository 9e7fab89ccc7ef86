//! Which actions count as visible to the end user.

use serde::{Deserialize, Serialize};
use threadview_core::{Action, ActionKind, PendingState};

/// How a kind participates in display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindClass {
    /// User-facing content.
    Content,
    /// Marks the report as closed. Hidden from general views; looked up
    /// directly by closure queries.
    ClosureMarker,
    /// Carries nothing displayable.
    Structural,
}

pub fn kind_class(kind: &ActionKind) -> KindClass {
    match kind {
        ActionKind::Comment
        | ActionKind::MoneyRequest
        | ActionKind::Created
        | ActionKind::ReportPreview
        | ActionKind::SystemWhisper => KindClass::Content,
        ActionKind::Closed => KindClass::ClosureMarker,
        ActionKind::Unsupported(_) => KindClass::Structural,
    }
}

/// Visible in the default report view.
///
/// Evaluate on the merged action so a pending local delete hides it at once.
pub fn is_visible(action: &Action) -> bool {
    if action.pending == PendingState::Delete {
        return false;
    }
    if action.is_deleted_parent_placeholder() {
        return false;
    }
    kind_class(&action.kind) == KindClass::Content
}

/// Extra rules applied when choosing a report's last action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityPolicy {
    /// Skip actions whose local commit failed.
    pub hide_failed: bool,
}

pub fn is_visible_as_last_action(action: &Action, policy: &VisibilityPolicy) -> bool {
    is_visible(action) && !(policy.hide_failed && action.has_errors())
}
