use std::sync::Arc;

use threadview_core::{Action, ActionId, ActionKind, ActionPatch, Overlay, PendingState, Timestamp};
use threadview_engine::{
    Direction, DisplayTexts, EngineConfig, VisibilityPolicy,
    merge, query, sorted_view,
};
use threadview_harness::{TestReport, closed, comment, init_tracing, money_request, to_collection};

// ============================================================================
// Collection-level queries
// ============================================================================

#[test]
fn closure_marker_is_not_the_last_visible_action() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let base = to_collection([comment(1, 10, "a"), comment(2, 20, "b"), closed(3, 30)]);

    let last = query::last_visible_action(&base, None).ok_or("no visible action")?;
    assert_eq!(last.id, ActionId::from(2u64));
    let marker = query::last_closure_marker(&base).ok_or("no closure marker")?;
    assert_eq!(marker.id, ActionId::from(3u64));
    Ok(())
}

#[test]
fn pending_delete_falls_back_to_previous_action() -> Result<(), Box<dyn std::error::Error>> {
    let base = to_collection([comment(1, 10, "a"), comment(2, 20, "b"), closed(3, 30)]);
    let mut overlay = Overlay::new();
    overlay.insert(ActionId::from(2u64), ActionPatch::new().with_pending(PendingState::Delete));

    let last = query::last_visible_action(&base, Some(&overlay)).ok_or("no visible action")?;
    assert_eq!(last.id, ActionId::from(1u64));

    // The base is untouched.
    assert_eq!(base[&ActionId::from(2u64)].pending, PendingState::None);
    Ok(())
}

#[test]
fn most_recent_money_request_in_descending_view() -> Result<(), Box<dyn std::error::Error>> {
    let base = to_collection([money_request(1, 5), comment(2, 15, "after")]);
    let view = sorted_view(&base, Direction::Descending);
    let found = query::most_recent_of_kind(&view, &ActionKind::MoneyRequest).ok_or("not found")?;
    assert_eq!(found.id, ActionId::from(1u64));
    Ok(())
}

#[test]
fn merge_shares_untouched_entries() {
    let base = to_collection([comment(1, 10, "a"), comment(2, 20, "b")]);
    let mut overlay = Overlay::new();
    overlay.insert(ActionId::from(2u64), ActionPatch::new().with_pending(PendingState::Delete));

    let effective = merge(&base, Some(&overlay));
    assert!(Arc::ptr_eq(&effective[&ActionId::from(1u64)], &base[&ActionId::from(1u64)]));
    assert!(!Arc::ptr_eq(&effective[&ActionId::from(2u64)], &base[&ActionId::from(2u64)]));
    assert!(Arc::ptr_eq(&merge(&base, None), &base));
}

// ============================================================================
// Engine queries
// ============================================================================

#[test]
fn engine_answers_match_collection_queries() -> Result<(), Box<dyn std::error::Error>> {
    let report = TestReport::new(vec![
        comment(1, 10, "hello"),
        money_request(2, 15),
        comment(3, 20, "world"),
        closed(4, 30),
    ])?;
    let engine = &report.engine;
    let id = report.report_id;

    assert_eq!(engine.last_visible_action(id).map(|a| a.id.clone()), Some(ActionId::from(3u64)));
    assert_eq!(engine.most_recent_money_request_id(id), Some(ActionId::from(2u64)));
    assert_eq!(engine.last_closure_marker(id).map(|a| a.id.clone()), Some(ActionId::from(4u64)));

    let message = engine.last_visible_message(id).ok_or("no message")?;
    assert_eq!(message.text, "world");
    assert!(!message.is_edited);

    let display: Vec<String> = engine
        .sorted_for_display(id, Direction::Ascending)
        .iter()
        .map(|a| a.id.to_string())
        .collect();
    assert_eq!(display, vec!["1", "2", "3"]);

    let all = engine.sorted_actions(id, Direction::Descending);
    assert_eq!(all.len(), 4);
    assert_eq!(all.first().map(|a| a.kind.clone()), Some(ActionKind::Closed));
    Ok(())
}

#[test]
fn configured_texts_and_policy_apply() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_ron(
        r#"(
            texts: (deleted_money_request: "[expense removed]"),
            visibility: (hide_failed: true),
        )"#,
    )?;
    assert_eq!(config.visibility, VisibilityPolicy { hide_failed: true });
    assert_ne!(config.texts, DisplayTexts::default());

    let mut failed = comment(3, 30, "did not send");
    failed.errors.insert("1".into(), "offline".into());
    let deleted_request = money_request(2, 20).with_message(Vec::new());

    let report = TestReport::with_config(vec![comment(1, 10, "a"), deleted_request, failed], config)?;
    let message = report.engine.last_visible_message(report.report_id).ok_or("no message")?;
    assert_eq!(message.action_id, ActionId::from(2u64));
    assert_eq!(message.text, "[expense removed]");
    Ok(())
}

#[test]
fn equal_timestamps_order_created_first_and_previews_last() -> Result<(), Box<dyn std::error::Error>> {
    let at = Timestamp::from_millis(100);
    let report = TestReport::new(vec![
        Action::new(7u64, ActionKind::ReportPreview, at),
        Action::new(9u64, ActionKind::Comment, at).with_text("hi"),
        Action::new(8u64, ActionKind::Created, at),
    ])?;
    let ids = report
        .engine
        .sorted_actions(report.report_id, Direction::Ascending)
        .ids();
    assert_eq!(ids, vec![ActionId::from(8u64), ActionId::from(9u64), ActionId::from(7u64)]);
    Ok(())
}
