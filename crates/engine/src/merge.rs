//! Overlay merge: base collection + unconfirmed local edits → effective collection.

use std::sync::Arc;

use threadview_core::{Action, ActionId, ActionPatch, Collection, Overlay, PendingState};

/// Combine `base` with `overlay` without touching either.
///
/// Ids only in `base` keep their `Arc` (pointer-equal in the result). An absent
/// or empty overlay returns `base` itself. Overlay ids unknown to `base` are
/// synthesized from the patch; patches that cannot be synthesized are skipped.
pub fn merge(base: &Arc<Collection>, overlay: Option<&Overlay>) -> Arc<Collection> {
    let overlay = match overlay {
        Some(overlay) if !overlay.is_empty() => overlay,
        _ => return Arc::clone(base),
    };

    let mut effective: Collection = (**base).clone();
    for (id, patch) in overlay {
        if let Some(action) = merge_action(id, base.get(id), Some(patch)) {
            effective.insert(id.clone(), action);
        }
    }
    Arc::new(effective)
}

/// Effective state of a single action.
pub fn merge_action(
    id: &ActionId,
    base: Option<&Arc<Action>>,
    patch: Option<&ActionPatch>,
) -> Option<Arc<Action>> {
    match (base, patch) {
        (base, None) => base.cloned(),
        (Some(base), Some(patch)) if patch.is_empty() => Some(Arc::clone(base)),
        (Some(base), Some(patch)) => Some(Arc::new(patch.apply_to(base))),
        (None, Some(patch)) => synthesize(id, patch).map(Arc::new),
    }
}

fn synthesize(id: &ActionId, patch: &ActionPatch) -> Option<Action> {
    let mut action = match patch.synthesize(id) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("skipping local action {id}: {e}");
            return None;
        }
    };
    // Delete and update keep their state; only a missing one becomes an add.
    if action.pending == PendingState::None {
        tracing::debug!("local action {id} has no pending state, treating as add");
        action.pending = PendingState::Add;
    }
    Some(action)
}
