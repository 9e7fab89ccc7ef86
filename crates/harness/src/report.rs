use std::sync::Arc;

use threadview_core::{Action, ActionId, ReportId};
use threadview_engine::{Engine, EngineConfig, EngineError};
use threadview_store::{ActionSource, ActionStore, StoreError};

/// One report wired to a store and an engine, as a client would hold it.
pub struct TestReport {
    pub report_id: ReportId,
    pub store: Arc<ActionStore>,
    pub engine: Engine<Arc<ActionStore>>,
}

impl TestReport {
    pub fn new(actions: Vec<Action>) -> Result<Self, StoreError> {
        Self::with_config(actions, EngineConfig::default())
    }

    pub fn with_config(actions: Vec<Action>, config: EngineConfig) -> Result<Self, StoreError> {
        let store = Arc::new(ActionStore::new());
        let report_id = ReportId::new();
        store.set_actions(report_id, actions)?;
        Ok(Self {
            report_id,
            engine: Engine::with_config(Arc::clone(&store), config),
            store,
        })
    }

    /// A confirmed action arriving from the server.
    pub fn receive(&self, action: Action) -> Result<u64, StoreError> {
        self.store.upsert_action(self.report_id, action)
    }

    /// Fold a staged edit into the store, then drop it from the buffer.
    pub fn confirm(&mut self, action_id: &ActionId) -> Result<u64, Box<dyn std::error::Error>> {
        let patch = self
            .engine
            .buffer()
            .get(self.report_id, action_id)
            .cloned()
            .ok_or_else(|| EngineError::OverlayEntryNotFound {
                report_id: self.report_id,
                action_id: action_id.clone(),
            })?;
        let version = self.store.commit_patch(self.report_id, action_id, &patch)?;
        self.engine.buffer_mut().confirm(self.report_id, action_id)?;
        Ok(version)
    }

    pub fn reject(&mut self, action_id: &ActionId) -> Result<(), EngineError> {
        self.engine.buffer_mut().reject(self.report_id, action_id)?;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.store.version(self.report_id).unwrap_or(0)
    }
}
