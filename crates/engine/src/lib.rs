pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod order;
pub mod overlay;
pub mod query;
pub mod sorted;
pub mod visibility;

pub use cache::{CacheStats, OverlaySignature, ViewCache};
pub use config::{DisplayTexts, EngineConfig};
pub use error::EngineError;
pub use merge::{merge, merge_action};
pub use order::compare;
pub use overlay::OverlayBuffer;
pub use query::{LastMessage, describe_last_message, last_closure_marker, most_recent_of_kind};
pub use sorted::{Direction, SortedView, sorted_for_display, sorted_view, visible_only};
pub use visibility::{KindClass, VisibilityPolicy, is_visible, kind_class};

use std::sync::Arc;

use threadview_core::{Action, ActionId, ActionKind, Collection, MessageFragment, ReportId, Timestamp};
use threadview_store::ActionSource;

/// Per-report queries over a source of confirmed actions plus local edits.
///
/// Every query reads one snapshot of the source, merges the report's staged
/// edits and answers from a sorted view. Sorted views are memoized per
/// `(version, overlay signature)` unless the config disables the cache.
pub struct Engine<S> {
    source: S,
    buffer: OverlayBuffer,
    cache: ViewCache,
    config: EngineConfig,
}

/// One report's merged actions at a given source version.
struct Effective {
    version: u64,
    actions: Arc<Collection>,
}

impl<S: ActionSource> Engine<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: S, config: EngineConfig) -> Self {
        Self {
            source,
            buffer: OverlayBuffer::new(),
            cache: ViewCache::new(config.cache_max_entries),
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &OverlayBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut OverlayBuffer {
        &mut self.buffer
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// A report absent from the source but with staged edits is treated as
    /// empty at version 0.
    fn effective(&self, report_id: ReportId) -> Option<Effective> {
        let overlay = self.buffer.overlay(report_id);
        let (version, base) = match self.source.snapshot(report_id) {
            Some(snapshot) => (snapshot.version, snapshot.actions),
            None if overlay.is_some() => (0, Arc::new(Collection::new())),
            None => return None,
        };
        Some(Effective {
            version,
            actions: merge(&base, overlay),
        })
    }

    /// The report's actions with staged edits applied.
    pub fn effective_view(&self, report_id: ReportId) -> Option<Arc<Collection>> {
        self.effective(report_id).map(|e| e.actions)
    }

    fn view(&self, report_id: ReportId, direction: Direction) -> Option<SortedView> {
        if !self.config.cache_enabled {
            let effective = self.effective(report_id)?;
            return Some(sorted_view(&effective.actions, direction));
        }

        let signature = self.buffer.signature(report_id);
        let version = match self.source.version(report_id) {
            Some(version) => version,
            None if self.buffer.overlay(report_id).is_some() => 0,
            None => return None,
        };
        if let Some(view) = self.cache.get(report_id, version, signature, direction) {
            return Some(view);
        }
        // Snapshot again: the version read above may be stale by now.
        let effective = self.effective(report_id)?;
        let view = sorted_view(&effective.actions, direction);
        self.cache.insert(report_id, effective.version, signature, &view);
        Some(view)
    }

    /// All actions of the report in `direction`, hidden ones included.
    pub fn sorted_actions(&self, report_id: ReportId, direction: Direction) -> SortedView {
        self.view(report_id, direction)
            .unwrap_or_else(|| SortedView::empty(direction))
    }

    /// Visible actions of the report in `direction`.
    pub fn sorted_for_display(&self, report_id: ReportId, direction: Direction) -> SortedView {
        visible_only(&self.sorted_actions(report_id, direction))
    }

    pub fn last_visible_action(&self, report_id: ReportId) -> Option<Arc<Action>> {
        let view = self.view(report_id, Direction::Descending)?;
        query::last_visible_in(&view, &self.config.visibility).cloned()
    }

    pub fn last_visible_message(&self, report_id: ReportId) -> Option<LastMessage> {
        self.last_visible_action(report_id)
            .map(|action| describe_last_message(&action, &self.config.texts))
    }

    pub fn most_recent_money_request_id(&self, report_id: ReportId) -> Option<ActionId> {
        let view = self.view(report_id, Direction::Descending)?;
        query::most_recent_id_of_kind(view.latest_first(), &ActionKind::MoneyRequest)
    }

    /// Latest closure marker among confirmed actions. Staged edits are not
    /// consulted.
    pub fn last_closure_marker(&self, report_id: ReportId) -> Option<Arc<Action>> {
        let snapshot = self.source.snapshot(report_id)?;
        last_closure_marker(&snapshot.actions)
    }

    /// Stage a new comment stamped after everything the report already holds.
    pub fn stage_comment(
        &mut self,
        report_id: ReportId,
        action_id: ActionId,
        message: Vec<MessageFragment>,
    ) -> Result<Timestamp, EngineError> {
        if let Some(effective) = self.effective(report_id) {
            if effective.actions.contains_key(&action_id) {
                return Err(EngineError::ActionAlreadyExists { report_id, action_id });
            }
            if let Some(latest) = effective.actions.values().map(|a| a.created_at).max() {
                self.buffer.observe(latest);
            }
        }
        self.buffer.stage_comment(report_id, action_id, message)
    }

    /// Stage an edit of an action the report currently shows.
    pub fn stage_edit(
        &mut self,
        report_id: ReportId,
        action_id: &ActionId,
        message: Vec<MessageFragment>,
    ) -> Result<(), EngineError> {
        let current = self
            .effective(report_id)
            .and_then(|e| e.actions.get(action_id).cloned())
            .ok_or_else(|| EngineError::ActionNotFound {
                report_id,
                action_id: action_id.clone(),
            })?;
        self.buffer.stage_edit(report_id, &current, message)
    }
}
