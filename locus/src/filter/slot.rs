//! Process-wide holder for the active [`TraceFilter`].
//!
//! Readers get an `Arc` clone, so a filter stays alive for as long as any
//! sample still uses it, even after a newer one has been installed. The slot
//! lock is held only long enough to clone or swap the handle.

use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

use super::TraceFilter;

/// Holds the current filter, replaced wholesale on each registration.
pub struct FilterSlot {
    current: RwLock<Option<Arc<TraceFilter>>>,
}

impl FilterSlot {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: parking_lot::const_rwlock(None) }
    }

    /// Publish `filter` as the current one and hand back the previous handle.
    ///
    /// The previous filter is freed when its last reader drops it, never
    /// while the slot lock is held.
    pub fn install(&self, filter: TraceFilter) -> Option<Arc<TraceFilter>> {
        let filter = Arc::new(filter);
        info!("Installing trace filter with {} pattern(s)", filter.patterns().len());
        std::mem::replace(&mut *self.current.write(), Some(filter))
    }

    /// Handle to the current filter, if one has been installed.
    #[must_use]
    pub fn current(&self) -> Option<Arc<TraceFilter>> {
        self.current.read().clone()
    }

    /// Remove the current filter.
    pub fn clear(&self) -> Option<Arc<TraceFilter>> {
        self.current.write().take()
    }
}

impl Default for FilterSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot consulted by the free functions below and by registration.
static GLOBAL_SLOT: FilterSlot = FilterSlot::new();

/// Get the process-wide filter slot.
pub fn global() -> &'static FilterSlot {
    &GLOBAL_SLOT
}

/// Install a filter in the process-wide slot.
pub fn install(filter: TraceFilter) -> Option<Arc<TraceFilter>> {
    GLOBAL_SLOT.install(filter)
}

/// Current filter from the process-wide slot.
#[must_use]
pub fn current() -> Option<Arc<TraceFilter>> {
    GLOBAL_SLOT.current()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_slot() {
        let slot = FilterSlot::new();
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_install_returns_previous() {
        let slot = FilterSlot::new();
        assert!(slot.install(TraceFilter::new(["a"], "", false)).is_none());

        let previous = slot.install(TraceFilter::new(["b"], "", false)).unwrap();
        assert_eq!(previous.patterns(), ["a"]);
        assert_eq!(slot.current().unwrap().patterns(), ["b"]);
    }

    #[test]
    fn test_reader_handle_survives_replacement() {
        let slot = FilterSlot::new();
        slot.install(TraceFilter::new(["old"], "", false));

        let held = slot.current().unwrap();
        drop(slot.install(TraceFilter::new(["new"], "", false)));

        // Still usable after the slot dropped its own reference
        assert!(held.should_trace("/src/old/x.py"));
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn test_concurrent_install_and_read() {
        let slot = FilterSlot::new();
        slot.install(TraceFilter::new(["gen0"], "", false));

        thread::scope(|s| {
            for w in 0..4 {
                let slot = &slot;
                s.spawn(move || {
                    for i in 0..500 {
                        slot.install(TraceFilter::new([format!("gen{w}-{i}")], "", false));
                    }
                });
            }
            for _ in 0..8 {
                let slot = &slot;
                s.spawn(move || {
                    for _ in 0..2_000 {
                        let filter = slot.current().unwrap();
                        let pattern = filter.patterns()[0].clone();
                        assert!(filter.should_trace(&format!("/src/{pattern}/x.py")));
                    }
                });
            }
        });
    }

    #[test]
    fn test_clear() {
        let slot = FilterSlot::new();
        slot.install(TraceFilter::new(["a"], "", false));
        assert!(slot.clear().is_some());
        assert!(slot.current().is_none());
    }
}
