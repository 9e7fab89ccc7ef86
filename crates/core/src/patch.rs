//! Sparse partial updates to actions.
//!
//! A [`Patch`] distinguishes "field not touched" ([`Patch::Keep`]) from "field
//! set", and for optional fields `Set(None)` explicitly clears the value. In
//! serialized form a kept field is simply absent and a cleared field is `null`.
//! Unknown fields are ignored when deserializing.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::action::{Action, ActionKind, MessageFragment, PendingState};
use crate::error::CoreError;
use crate::ids::{ActionId, ReportId};
use crate::timestamp::Timestamp;

/// Unconfirmed local edits for one report, keyed by the action they touch.
pub type Overlay = BTreeMap<ActionId, ActionPatch>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Keep => None,
            Patch::Set(value) => Some(value),
        }
    }

    /// `later` wins when it sets the field.
    pub fn overridden_by(self, later: Patch<T>) -> Patch<T> {
        match later {
            Patch::Keep => self,
            set => set,
        }
    }
}

impl<T: Clone> Patch<T> {
    pub fn resolve(&self, base: &T) -> T {
        match self {
            Patch::Keep => base.clone(),
            Patch::Set(value) => value.clone(),
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Keep => serializer.serialize_unit(),
            Patch::Set(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPatch {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub kind: Patch<ActionKind>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub created_at: Patch<Timestamp>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub pending: Patch<PendingState>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub message: Patch<Vec<MessageFragment>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub previous_message: Patch<Option<Vec<MessageFragment>>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub parent_id: Patch<Option<ActionId>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub parent_report_id: Patch<Option<ReportId>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub errors: Patch<Option<BTreeMap<String, String>>>,
}

impl ActionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: ActionKind) -> Self {
        self.kind = Patch::Set(kind);
        self
    }

    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Patch::Set(created_at);
        self
    }

    pub fn with_pending(mut self, pending: PendingState) -> Self {
        self.pending = Patch::Set(pending);
        self
    }

    pub fn with_message(mut self, message: Vec<MessageFragment>) -> Self {
        self.message = Patch::Set(message);
        self
    }

    pub fn with_previous_message(mut self, previous: Option<Vec<MessageFragment>>) -> Self {
        self.previous_message = Patch::Set(previous);
        self
    }

    pub fn with_errors(mut self, errors: Option<BTreeMap<String, String>>) -> Self {
        self.errors = Patch::Set(errors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The pending state this patch sets, if any.
    pub fn pending_state(&self) -> Option<PendingState> {
        self.pending.as_set().copied()
    }

    /// Stack a later patch on top of this one; fields set by `later` win.
    pub fn merge_from(&mut self, later: ActionPatch) {
        let earlier = std::mem::take(self);
        *self = ActionPatch {
            kind: earlier.kind.overridden_by(later.kind),
            created_at: earlier.created_at.overridden_by(later.created_at),
            pending: earlier.pending.overridden_by(later.pending),
            message: earlier.message.overridden_by(later.message),
            previous_message: earlier.previous_message.overridden_by(later.previous_message),
            parent_id: earlier.parent_id.overridden_by(later.parent_id),
            parent_report_id: earlier.parent_report_id.overridden_by(later.parent_report_id),
            errors: earlier.errors.overridden_by(later.errors),
        };
    }

    /// Field-level overlay of this patch on `base`. `base` is not modified.
    pub fn apply_to(&self, base: &Action) -> Action {
        Action {
            id: base.id.clone(),
            kind: self.kind.resolve(&base.kind),
            created_at: self.created_at.resolve(&base.created_at),
            pending: self.pending.resolve(&base.pending),
            message: self.message.resolve(&base.message),
            previous_message: self.previous_message.resolve(&base.previous_message),
            parent_id: self.parent_id.resolve(&base.parent_id),
            parent_report_id: self.parent_report_id.resolve(&base.parent_report_id),
            errors: match &self.errors {
                Patch::Keep => base.errors.clone(),
                Patch::Set(errors) => errors.clone().unwrap_or_default(),
            },
        }
    }

    /// Build a complete action from this patch alone, for ids the base
    /// collection does not know yet.
    ///
    /// `kind` and `created_at` must be set. Missing optional fields take their
    /// empty defaults; the pending state is returned as given and callers
    /// decide what to do with a non-`Add` state.
    pub fn synthesize(&self, id: &ActionId) -> Result<Action, CoreError> {
        let kind = self.kind.as_set().cloned().ok_or_else(|| CoreError::IncompleteAction {
            id: id.to_string(),
            field: "kind",
        })?;
        let created_at = self.created_at.as_set().copied().ok_or_else(|| {
            CoreError::IncompleteAction {
                id: id.to_string(),
                field: "created_at",
            }
        })?;
        Ok(self.apply_to(&Action::new(id.clone(), kind, created_at)))
    }

    /// Canonical named MessagePack encoding. Field order is fixed by the struct
    /// and overlays are `BTreeMap`s, so equal patches encode to equal bytes.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec_named(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}
