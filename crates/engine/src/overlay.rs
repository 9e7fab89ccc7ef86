//! Unconfirmed local edits, kept per report until the store confirms or
//! rejects them.
//!
//! Single writer. Patches staged for the same action stack field by field,
//! later fields winning, with two exceptions: a locally added action stays an
//! add when edited, and deleting it drops the entry since nothing was ever
//! confirmed.

use std::collections::{BTreeMap, HashMap};

use threadview_core::{
    Action, ActionId, ActionKind, ActionPatch, MessageFragment, Overlay, PendingState, ReportId,
    Timestamp, TimestampClock,
};

use crate::cache::OverlaySignature;
use crate::error::EngineError;

#[derive(Default)]
struct ReportOverlay {
    entries: Overlay,
    signature: OverlaySignature,
}

pub struct OverlayBuffer {
    reports: HashMap<ReportId, ReportOverlay>,
    clock: TimestampClock,
}

impl Default for OverlayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayBuffer {
    pub fn new() -> Self {
        Self {
            reports: HashMap::new(),
            clock: TimestampClock::new(),
        }
    }

    pub fn overlay(&self, report_id: ReportId) -> Option<&Overlay> {
        self.reports
            .get(&report_id)
            .map(|r| &r.entries)
            .filter(|entries| !entries.is_empty())
    }

    pub fn get(&self, report_id: ReportId, action_id: &ActionId) -> Option<&ActionPatch> {
        self.reports.get(&report_id)?.entries.get(action_id)
    }

    /// Signature of the report's current overlay, maintained on every change.
    pub fn signature(&self, report_id: ReportId) -> OverlaySignature {
        self.reports
            .get(&report_id)
            .map(|r| r.signature)
            .unwrap_or(OverlaySignature::EMPTY)
    }

    pub fn pending_count(&self, report_id: ReportId) -> usize {
        self.reports.get(&report_id).map_or(0, |r| r.entries.len())
    }

    /// Reports with at least one unconfirmed edit.
    pub fn report_ids(&self) -> Vec<ReportId> {
        self.reports.keys().copied().collect()
    }

    /// Make the next locally stamped timestamp land after `seen`.
    pub fn observe(&mut self, seen: Timestamp) {
        self.clock.observe(seen);
    }

    /// Stack `patch` onto whatever is staged for `action_id`.
    pub fn stage(
        &mut self,
        report_id: ReportId,
        action_id: ActionId,
        patch: ActionPatch,
    ) -> Result<(), EngineError> {
        let report = self.reports.entry(report_id).or_default();
        match report.entries.remove(&action_id) {
            None => {
                report.entries.insert(action_id, patch);
            }
            Some(existing) => {
                if let Some(stacked) = stack(existing, patch) {
                    report.entries.insert(action_id, stacked);
                } else {
                    tracing::debug!(%report_id, %action_id, "local add deleted before confirmation");
                }
            }
        }
        self.refresh(report_id)
    }

    /// Stage a new optimistic comment. The caller allocates `action_id`.
    pub fn stage_comment(
        &mut self,
        report_id: ReportId,
        action_id: ActionId,
        message: Vec<MessageFragment>,
    ) -> Result<Timestamp, EngineError> {
        if self.get(report_id, &action_id).is_some() {
            return Err(EngineError::ActionAlreadyExists { report_id, action_id });
        }
        let created_at = self.clock.tick()?;
        let patch = ActionPatch::new()
            .with_kind(ActionKind::Comment)
            .with_created_at(created_at)
            .with_pending(PendingState::Add)
            .with_message(message);
        self.stage(report_id, action_id, patch)?;
        Ok(created_at)
    }

    /// Stage an edit of `current`, the action as the user sees it now.
    ///
    /// The message shown before the first unconfirmed edit is kept as the
    /// previous message; later edits do not replace it.
    pub fn stage_edit(
        &mut self,
        report_id: ReportId,
        current: &Action,
        message: Vec<MessageFragment>,
    ) -> Result<(), EngineError> {
        let message = message.into_iter().map(MessageFragment::edited).collect();
        let mut patch = ActionPatch::new()
            .with_pending(PendingState::Update)
            .with_message(message);
        let keeps_previous = self
            .get(report_id, &current.id)
            .is_some_and(|p| !p.previous_message.is_keep() || p.pending_state() == Some(PendingState::Add));
        if !keeps_previous {
            patch = patch.with_previous_message(Some(current.message.clone()));
        }
        self.stage(report_id, current.id.clone(), patch)
    }

    pub fn stage_delete(&mut self, report_id: ReportId, action_id: ActionId) -> Result<(), EngineError> {
        self.stage(
            report_id,
            action_id,
            ActionPatch::new().with_pending(PendingState::Delete),
        )
    }

    /// Attach errors to a staged edit whose commit failed. The edit stays
    /// staged so it can be retried or rejected.
    pub fn mark_failed(
        &mut self,
        report_id: ReportId,
        action_id: &ActionId,
        errors: BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        if self.get(report_id, action_id).is_none() {
            return Err(EngineError::OverlayEntryNotFound {
                report_id,
                action_id: action_id.clone(),
            });
        }
        tracing::debug!(%report_id, %action_id, errors = errors.len(), "local edit failed");
        self.stage(
            report_id,
            action_id.clone(),
            ActionPatch::new().with_errors(Some(errors)),
        )
    }

    /// Drop a staged edit after the store has committed it. Returns the patch
    /// so the caller can fold it into the store.
    pub fn confirm(&mut self, report_id: ReportId, action_id: &ActionId) -> Result<ActionPatch, EngineError> {
        let patch = self.take(report_id, action_id)?;
        tracing::debug!(%report_id, %action_id, "local edit confirmed");
        Ok(patch)
    }

    /// Drop a staged edit the store refused.
    pub fn reject(&mut self, report_id: ReportId, action_id: &ActionId) -> Result<ActionPatch, EngineError> {
        let patch = self.take(report_id, action_id)?;
        tracing::debug!(%report_id, %action_id, "local edit rejected");
        Ok(patch)
    }

    /// Drop every staged edit for a report.
    pub fn clear_report(&mut self, report_id: ReportId) {
        self.reports.remove(&report_id);
    }

    fn take(&mut self, report_id: ReportId, action_id: &ActionId) -> Result<ActionPatch, EngineError> {
        let patch = self
            .reports
            .get_mut(&report_id)
            .and_then(|r| r.entries.remove(action_id))
            .ok_or_else(|| EngineError::OverlayEntryNotFound {
                report_id,
                action_id: action_id.clone(),
            })?;
        self.refresh(report_id)?;
        Ok(patch)
    }

    fn refresh(&mut self, report_id: ReportId) -> Result<(), EngineError> {
        let Some(report) = self.reports.get_mut(&report_id) else {
            return Ok(());
        };
        if report.entries.is_empty() {
            self.reports.remove(&report_id);
            return Ok(());
        }
        report.signature = OverlaySignature::of(Some(&report.entries))?;
        Ok(())
    }
}

/// Combine two patches for one action. `None` means the entry goes away.
fn stack(mut earlier: ActionPatch, later: ActionPatch) -> Option<ActionPatch> {
    let was_added = earlier.pending_state() == Some(PendingState::Add);
    match later.pending_state() {
        Some(PendingState::Delete) if was_added => None,
        Some(PendingState::Update) if was_added => {
            earlier.merge_from(later.with_pending(PendingState::Add));
            Some(earlier)
        }
        _ => {
            earlier.merge_from(later);
            Some(earlier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadview_core::Patch;

    fn text(s: &str) -> Vec<MessageFragment> {
        vec![MessageFragment::text(s)]
    }

    #[test]
    fn staged_comment_is_pending_add_with_fresh_timestamp() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        buffer.observe(Timestamp::new(u64::MAX / 2, 0));

        let ts = buffer.stage_comment(report, ActionId::from("local-1"), text("hi")).unwrap();
        assert!(ts > Timestamp::new(u64::MAX / 2, 0));

        let patch = buffer.get(report, &ActionId::from("local-1")).unwrap();
        assert_eq!(patch.pending_state(), Some(PendingState::Add));
        assert_eq!(patch.created_at, Patch::Set(ts));
        assert_eq!(buffer.pending_count(report), 1);
    }

    #[test]
    fn duplicate_comment_id_is_rejected() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        buffer.stage_comment(report, ActionId::from("a"), text("x")).unwrap();
        assert!(matches!(
            buffer.stage_comment(report, ActionId::from("a"), text("y")),
            Err(EngineError::ActionAlreadyExists { .. })
        ));
    }

    #[test]
    fn edit_keeps_first_previous_message() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        let original = Action::new(1u64, ActionKind::Comment, Timestamp::from_millis(1)).with_text("one");

        buffer.stage_edit(report, &original, text("two")).unwrap();
        let shown = buffer.get(report, &original.id).unwrap().apply_to(&original);
        buffer.stage_edit(report, &shown, text("three")).unwrap();

        let patch = buffer.get(report, &original.id).unwrap();
        assert_eq!(patch.pending_state(), Some(PendingState::Update));
        assert_eq!(patch.previous_message, Patch::Set(Some(text("one"))));
        let merged = patch.apply_to(&original);
        assert_eq!(merged.message_text(), "three");
        assert!(merged.is_edited());
    }

    #[test]
    fn editing_local_add_stays_add() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        let id = ActionId::from("local");
        buffer.stage_comment(report, id.clone(), text("draft")).unwrap();
        let current = buffer.get(report, &id).unwrap().synthesize(&id).unwrap();
        buffer.stage_edit(report, &current, text("final")).unwrap();

        let patch = buffer.get(report, &id).unwrap();
        assert_eq!(patch.pending_state(), Some(PendingState::Add));
        assert!(patch.previous_message.is_keep());
        assert_eq!(patch.synthesize(&id).unwrap().message_text(), "final");
    }

    #[test]
    fn deleting_local_add_drops_entry() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        let id = ActionId::from("local");
        buffer.stage_comment(report, id.clone(), text("oops")).unwrap();
        buffer.stage_delete(report, id.clone()).unwrap();
        assert!(buffer.get(report, &id).is_none());
        assert!(buffer.overlay(report).is_none());
        assert_eq!(buffer.signature(report), OverlaySignature::EMPTY);
    }

    #[test]
    fn delete_overrides_edit() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        let action = Action::new(5u64, ActionKind::Comment, Timestamp::from_millis(5)).with_text("a");
        buffer.stage_edit(report, &action, text("b")).unwrap();
        buffer.stage_delete(report, action.id.clone()).unwrap();
        assert_eq!(
            buffer.get(report, &action.id).unwrap().pending_state(),
            Some(PendingState::Delete)
        );
    }

    #[test]
    fn mark_failed_needs_staged_entry() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        let id = ActionId::from(9u64);
        let errors = BTreeMap::from([("1".to_string(), "network".to_string())]);
        assert!(matches!(
            buffer.mark_failed(report, &id, errors.clone()),
            Err(EngineError::OverlayEntryNotFound { .. })
        ));

        buffer.stage_delete(report, id.clone()).unwrap();
        buffer.mark_failed(report, &id, errors.clone()).unwrap();
        let patch = buffer.get(report, &id).unwrap();
        assert_eq!(patch.errors, Patch::Set(Some(errors)));
        assert_eq!(patch.pending_state(), Some(PendingState::Delete));
    }

    #[test]
    fn confirm_and_reject_remove_entries() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        buffer.stage_delete(report, ActionId::from(1u64)).unwrap();
        buffer.stage_delete(report, ActionId::from(2u64)).unwrap();

        let confirmed = buffer.confirm(report, &ActionId::from(1u64)).unwrap();
        assert_eq!(confirmed.pending_state(), Some(PendingState::Delete));
        buffer.reject(report, &ActionId::from(2u64)).unwrap();

        assert_eq!(buffer.pending_count(report), 0);
        assert!(buffer.report_ids().is_empty());
        assert!(matches!(
            buffer.confirm(report, &ActionId::from(1u64)),
            Err(EngineError::OverlayEntryNotFound { .. })
        ));
    }

    #[test]
    fn signature_follows_changes() {
        let mut buffer = OverlayBuffer::new();
        let report = ReportId::new();
        assert_eq!(buffer.signature(report), OverlaySignature::EMPTY);

        buffer.stage_delete(report, ActionId::from(1u64)).unwrap();
        let one = buffer.signature(report);
        assert_ne!(one, OverlaySignature::EMPTY);
        assert_eq!(one, OverlaySignature::of(buffer.overlay(report)).unwrap());

        buffer.stage_delete(report, ActionId::from(2u64)).unwrap();
        assert_ne!(buffer.signature(report), one);

        buffer.clear_report(report);
        assert_eq!(buffer.signature(report), OverlaySignature::EMPTY);
    }
}
