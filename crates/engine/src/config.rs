use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::visibility::VisibilityPolicy;

const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;
const LAST_MESSAGE_TEXT_MAX_LENGTH: usize = 200;

/// Fallback strings used when a last message has no displayable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayTexts {
    pub deleted_message: String,
    pub deleted_money_request: String,
    pub attachment: String,
    /// Longest last-message preview, in characters.
    pub max_len: usize,
}

impl Default for DisplayTexts {
    fn default() -> Self {
        Self {
            deleted_message: "[Deleted message]".into(),
            deleted_money_request: "[Deleted expense]".into(),
            attachment: "[Attachment]".into(),
            max_len: LAST_MESSAGE_TEXT_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Memoize sorted views. Turning this off changes cost, never results.
    pub cache_enabled: bool,
    /// Reports kept in the view cache before the least recently used is evicted.
    pub cache_max_entries: usize,
    pub texts: DisplayTexts,
    pub visibility: VisibilityPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            texts: DisplayTexts::default(),
            visibility: VisibilityPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a RON document. Missing fields keep their defaults.
    pub fn from_ron(text: &str) -> Result<Self, EngineError> {
        Ok(ron::from_str(text)?)
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}
