//! Conversation log entries.
//!
//! An [`Action`] is one entry in a report's log. The store hands out
//! collections of them keyed by [`ActionId`]; order is never stored, it is
//! always derived from `created_at` and the id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::EnumString;

use crate::ids::{ActionId, ReportId};
use crate::timestamp::Timestamp;

/// A report's actions keyed by id. Entries are shared so unchanged actions can
/// pass through derived collections without copying.
pub type Collection = BTreeMap<ActionId, Arc<Action>>;

/// Closed set of action kinds.
///
/// Tags outside the known set parse as [`ActionKind::Unsupported`] so a newer
/// store never fails ingestion; those entries are hidden from display.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumString)]
pub enum ActionKind {
    #[strum(serialize = "ADDCOMMENT")]
    Comment,
    /// Request for money (IOU).
    #[strum(serialize = "IOU")]
    MoneyRequest,
    /// First entry of every report.
    #[strum(serialize = "CREATED")]
    Created,
    /// Closure marker.
    #[strum(serialize = "CLOSED")]
    Closed,
    /// Preview card of a child report.
    #[strum(serialize = "REPORTPREVIEW")]
    ReportPreview,
    #[strum(serialize = "SYSTEMWHISPER")]
    SystemWhisper,
    #[strum(default)]
    Unsupported(String),
}

impl ActionKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.parse::<ActionKind>() {
            Ok(kind) => kind,
            Err(_) => Self::Unsupported(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Comment => "ADDCOMMENT",
            Self::MoneyRequest => "IOU",
            Self::Created => "CREATED",
            Self::Closed => "CLOSED",
            Self::ReportPreview => "REPORTPREVIEW",
            Self::SystemWhisper => "SYSTEMWHISPER",
            Self::Unsupported(tag) => tag,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// Marks entries not yet confirmed by the source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingState {
    #[default]
    None,
    Add,
    Update,
    Delete,
}

impl PendingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One piece of an action's message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFragment {
    pub html: String,
    pub text: String,
    pub is_edited: bool,
    pub is_deleted: bool,
    /// Placeholder left behind when a thread's parent was deleted.
    pub is_deleted_parent_action: bool,
    pub is_attachment: bool,
}

impl MessageFragment {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            html: text.clone(),
            text,
            ..Self::default()
        }
    }

    pub fn edited(mut self) -> Self {
        self.is_edited = true;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub created_at: Timestamp,
    #[serde(default)]
    pub pending: PendingState,
    #[serde(default)]
    pub message: Vec<MessageFragment>,
    #[serde(default)]
    pub previous_message: Option<Vec<MessageFragment>>,
    #[serde(default)]
    pub parent_id: Option<ActionId>,
    #[serde(default)]
    pub parent_report_id: Option<ReportId>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl Action {
    pub fn new(id: impl Into<ActionId>, kind: ActionKind, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            kind,
            created_at,
            pending: PendingState::None,
            message: Vec::new(),
            previous_message: None,
            parent_id: None,
            parent_report_id: None,
            errors: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: Vec<MessageFragment>) -> Self {
        self.message = message;
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_message(vec![MessageFragment::text(text)])
    }

    pub fn with_pending(mut self, pending: PendingState) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_parent(mut self, parent_id: ActionId, parent_report_id: Option<ReportId>) -> Self {
        self.parent_id = Some(parent_id);
        self.parent_report_id = parent_report_id;
        self
    }

    /// The message before a pending edit. `None` unless the action is a
    /// pending update.
    pub fn previous_message(&self) -> Option<&[MessageFragment]> {
        match self.pending {
            PendingState::Update => self.previous_message.as_deref(),
            _ => None,
        }
    }

    pub fn is_deleted_parent_placeholder(&self) -> bool {
        self.message.iter().any(|f| f.is_deleted_parent_action)
    }

    /// No fragments, or every fragment marked deleted.
    pub fn is_message_deleted(&self) -> bool {
        self.message.iter().all(|f| f.is_deleted)
    }

    pub fn is_edited(&self) -> bool {
        self.message.iter().any(|f| f.is_edited)
    }

    pub fn has_attachment(&self) -> bool {
        self.message.iter().any(|f| f.is_attachment && !f.is_deleted)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Concatenated text of the live fragments.
    pub fn message_text(&self) -> String {
        self.message
            .iter()
            .filter(|f| !f.is_deleted)
            .map(|f| f.text.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_parse_and_print() {
        for tag in ["ADDCOMMENT", "IOU", "CREATED", "CLOSED", "REPORTPREVIEW", "SYSTEMWHISPER"] {
            let kind = ActionKind::from_tag(tag);
            assert!(!matches!(kind, ActionKind::Unsupported(_)), "{tag} should be known");
            assert_eq!(kind.as_str(), tag);
        }
        assert_eq!(
            ActionKind::from_tag("POLICYCHANGELOG_ADD_TAG"),
            ActionKind::Unsupported("POLICYCHANGELOG_ADD_TAG".into())
        );
    }

    #[test]
    fn previous_message_only_for_pending_update() {
        let mut action = Action::new("1", ActionKind::Comment, Timestamp::from_millis(1))
            .with_text("new");
        action.previous_message = Some(vec![MessageFragment::text("old")]);
        assert!(action.previous_message().is_none());

        action.pending = PendingState::Update;
        assert_eq!(action.previous_message().map(|m| m[0].text.as_str()), Some("old"));

        action.pending = PendingState::Delete;
        assert!(action.previous_message().is_none());
    }

    #[test]
    fn message_deletion_flags() {
        let empty = Action::new("1", ActionKind::Comment, Timestamp::from_millis(1));
        assert!(empty.is_message_deleted());

        let partial = empty.clone().with_message(vec![
            MessageFragment::text("kept"),
            MessageFragment::text("gone").deleted(),
        ]);
        assert!(!partial.is_message_deleted());
        assert_eq!(partial.message_text(), "kept");

        let all = empty.with_message(vec![MessageFragment::text("gone").deleted()]);
        assert!(all.is_message_deleted());
    }

    #[test]
    fn action_deserializes_with_defaults() {
        let json = r#"{"id": "42", "kind": "ADDCOMMENT", "created_at": "10.0",
                       "message": [{"text": "hi", "html": "<b>hi</b>"}]}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.id, ActionId::new("42"));
        assert_eq!(action.kind, ActionKind::Comment);
        assert_eq!(action.pending, PendingState::None);
        assert_eq!(action.message_text(), "hi");
        assert!(action.errors.is_empty());
    }
}
