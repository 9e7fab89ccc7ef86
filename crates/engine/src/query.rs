//! Derived views consumed by the display layer.
//!
//! The collection-level functions (`last_visible_action`, `last_visible_message`,
//! `last_closure_marker`) merge and sort on every call. The `*_in` variants take
//! an already sorted view so several queries can share one sort, which is how
//! [`crate::Engine`] runs them against its cache.

use std::sync::Arc;

use threadview_core::{Action, ActionId, ActionKind, Collection, Overlay};

use crate::config::DisplayTexts;
use crate::merge::merge;
use crate::order::compare;
use crate::sorted::{Direction, SortedView, sorted_view};
use crate::visibility::{VisibilityPolicy, is_visible_as_last_action};

/// Preview of a report's most recent visible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastMessage {
    pub action_id: ActionId,
    pub text: String,
    /// The current message carries an edit marker.
    pub is_edited: bool,
}

pub fn last_visible_action(base: &Arc<Collection>, overlay: Option<&Overlay>) -> Option<Arc<Action>> {
    let effective = merge(base, overlay);
    let view = sorted_view(&effective, Direction::Descending);
    last_visible_in(&view, &VisibilityPolicy::default()).cloned()
}

/// Most recent action of `view` that passes the visibility rules.
pub fn last_visible_in<'a>(view: &'a SortedView, policy: &VisibilityPolicy) -> Option<&'a Arc<Action>> {
    view.latest_first()
        .find(|action| is_visible_as_last_action(action, policy))
}

pub fn last_visible_message(
    base: &Arc<Collection>,
    overlay: Option<&Overlay>,
    texts: &DisplayTexts,
) -> Option<LastMessage> {
    last_visible_action(base, overlay).map(|action| describe_last_message(&action, texts))
}

/// Display text for `action` as a last-message preview.
///
/// Pending updates show their current (edited) message; `previous_message` is
/// never displayed here.
pub fn describe_last_message(action: &Action, texts: &DisplayTexts) -> LastMessage {
    let text = match &action.kind {
        ActionKind::Created => String::new(),
        _ if action.has_attachment() => texts.attachment.clone(),
        ActionKind::MoneyRequest if action.is_message_deleted() => {
            texts.deleted_money_request.clone()
        }
        _ if action.is_message_deleted() => texts.deleted_message.clone(),
        _ => preview_text(&action.message_text(), texts.max_len),
    };
    LastMessage {
        action_id: action.id.clone(),
        text,
        is_edited: action.is_edited(),
    }
}

/// Fold line breaks to spaces, cut to `max_len` characters, trim.
fn preview_text(text: &str, max_len: usize) -> String {
    let single_line = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    single_line.chars().take(max_len).collect::<String>().trim().to_string()
}

/// First action of `kind` in `seq`.
///
/// `seq` must already be sorted most recent first; nothing is sorted here so
/// one sort can serve several queries.
pub fn most_recent_of_kind<'a, I>(seq: I, kind: &ActionKind) -> Option<&'a Arc<Action>>
where
    I: IntoIterator<Item = &'a Arc<Action>>,
{
    seq.into_iter().find(|action| &action.kind == kind)
}

pub fn most_recent_id_of_kind<'a, I>(seq: I, kind: &ActionKind) -> Option<ActionId>
where
    I: IntoIterator<Item = &'a Arc<Action>>,
{
    most_recent_of_kind(seq, kind).map(|action| action.id.clone())
}

/// Most recent closure marker, regardless of general visibility.
pub fn last_closure_marker(base: &Collection) -> Option<Arc<Action>> {
    base.values()
        .filter(|action| action.kind == ActionKind::Closed)
        .max_by(|a, b| compare(a, b))
        .cloned()
}

pub fn last_closure_marker_in(view: &SortedView) -> Option<&Arc<Action>> {
    most_recent_of_kind(view.latest_first(), &ActionKind::Closed)
}
