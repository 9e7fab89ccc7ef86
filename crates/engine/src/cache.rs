//! Memoized sorted views.
//!
//! One slot per report holding the ascending view computed for a given
//! `(version, overlay signature)`. A lookup with any other version or signature
//! misses; the next populate replaces the slot whole. Concurrent populates race
//! harmlessly: the last writer wins and every candidate is a correct view.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use threadview_core::{Overlay, ReportId};

use crate::error::EngineError;
use crate::sorted::{Direction, SortedView};

/// BLAKE3 digest of an overlay's canonical encoding.
///
/// The default is [`OverlaySignature::EMPTY`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OverlaySignature([u8; 32]);

impl OverlaySignature {
    /// Signature of an absent or empty overlay.
    pub const EMPTY: OverlaySignature = OverlaySignature([0u8; 32]);

    pub fn of(overlay: Option<&Overlay>) -> Result<Self, EngineError> {
        let overlay = match overlay {
            Some(overlay) if !overlay.is_empty() => overlay,
            _ => return Ok(Self::EMPTY),
        };
        let mut hasher = blake3::Hasher::new();
        for (id, patch) in overlay {
            let id = id.as_str().as_bytes();
            hasher.update(&(id.len() as u64).to_le_bytes());
            hasher.update(id);
            let encoded = patch.to_msgpack()?;
            hasher.update(&(encoded.len() as u64).to_le_bytes());
            hasher.update(&encoded);
        }
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for OverlaySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OverlaySignature({:02x}{:02x}...)", self.0[0], self.0[1])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Slot {
    version: u64,
    signature: OverlaySignature,
    /// Always ascending; callers pick the direction.
    view: SortedView,
    last_access: AtomicU64,
}

pub struct ViewCache {
    slots: RwLock<HashMap<ReportId, Slot>>,
    max_entries: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ViewCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Cached view for exactly this version and overlay, in `direction`.
    pub fn get(
        &self,
        report_id: ReportId,
        version: u64,
        signature: OverlaySignature,
        direction: Direction,
    ) -> Option<SortedView> {
        let slots = self.slots.read();
        match slots.get(&report_id) {
            Some(slot) if slot.version == version && slot.signature == signature => {
                slot.last_access.store(self.tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%report_id, version, "view cache hit");
                Some(slot.view.with_direction(direction))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%report_id, version, "view cache miss");
                None
            }
        }
    }

    /// Store `view` for this version and overlay, replacing the report's slot.
    pub fn insert(&self, report_id: ReportId, version: u64, signature: OverlaySignature, view: &SortedView) {
        let slot = Slot {
            version,
            signature,
            view: view.with_direction(Direction::Ascending),
            last_access: AtomicU64::new(self.tick()),
        };
        let mut slots = self.slots.write();
        if !slots.contains_key(&report_id) {
            self.evict_if_needed(&mut slots);
        }
        slots.insert(report_id, slot);
    }

    /// Return the cached view or build, store and return a new one.
    pub fn get_or_build(
        &self,
        report_id: ReportId,
        version: u64,
        signature: OverlaySignature,
        direction: Direction,
        build: impl FnOnce() -> SortedView,
    ) -> SortedView {
        if let Some(view) = self.get(report_id, version, signature, direction) {
            return view;
        }
        // Built outside the lock; a racing builder may overwrite this slot.
        let view = build();
        self.insert(report_id, version, signature, &view);
        view.with_direction(direction)
    }

    fn evict_if_needed(&self, slots: &mut HashMap<ReportId, Slot>) {
        while slots.len() >= self.max_entries {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access.load(Ordering::Relaxed))
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    slots.remove(&id);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(report_id = %id, "evicted cached view");
                }
                None => break,
            }
        }
    }

    pub fn invalidate(&self, report_id: ReportId) {
        self.slots.write().remove(&report_id);
    }

    pub fn clear(&self) {
        self.slots.write().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
