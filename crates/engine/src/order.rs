//! Total order over actions.

use std::cmp::Ordering;

use threadview_core::{Action, ActionKind};

/// Position of a kind among actions sharing a timestamp.
fn tie_break_rank(kind: &ActionKind) -> u8 {
    match kind {
        ActionKind::Created => 0,
        ActionKind::Comment
        | ActionKind::MoneyRequest
        | ActionKind::Closed
        | ActionKind::SystemWhisper
        | ActionKind::Unsupported(_) => 1,
        ActionKind::ReportPreview => 2,
    }
}

/// Chronological comparison.
///
/// `created_at` first; on a tie the report's `Created` entry goes first and
/// report previews go last; remaining ties fall to [`ActionId`] order, which is
/// total, so two distinct actions never compare equal.
///
/// [`ActionId`]: threadview_core::ActionId
pub fn compare(a: &Action, b: &Action) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| tie_break_rank(&a.kind).cmp(&tie_break_rank(&b.kind)))
        .then_with(|| a.id.cmp(&b.id))
}
