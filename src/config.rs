//! Compile-time parameters (§6), exposed as a runtime builder so tests can
//! shrink them — mirrors the teacher crate's
//! `ArenaAllocator::with_arena_size` / `with_heap_threshold` pattern.

/// Default slots per page (`MRB_HEAP_PAGE_SIZE` in the original).
pub const DEFAULT_HEAP_PAGE_SIZE: usize = 1024;

/// Default arena (C-API pin set) capacity (`MRB_ARENA_SIZE`).
pub const DEFAULT_ARENA_SIZE: usize = 100;

/// Reserved for a future incremental collector; unused by this stop-the-world
/// implementation, carried only so the knob exists (`GC_STEP_SIZE`).
pub const DEFAULT_STEP_SIZE: usize = 1024;

/// Number of arena slots reserved so a raise triggered by an overflow can
/// itself allocate (§4.D, §7).
pub const ARENA_SLACK: usize = 4;

/// Accepted-for-compatibility default for `GC.interval_ratio` (§6). This
/// collector has no generational/incremental mode for the ratio to tune, so
/// the value is only ever stored and echoed back.
pub const DEFAULT_INTERVAL_RATIO: i32 = 200;

/// Accepted-for-compatibility default for `GC.step_ratio` (§6), same caveat.
pub const DEFAULT_STEP_RATIO: i32 = 200;

#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    pub(crate) heap_page_size: usize,
    pub(crate) arena_size: usize,
    pub(crate) step_size: usize,
    pub(crate) interval_ratio: i32,
    pub(crate) step_ratio: i32,
    pub(crate) generational_mode: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            heap_page_size: DEFAULT_HEAP_PAGE_SIZE,
            arena_size: DEFAULT_ARENA_SIZE,
            step_size: DEFAULT_STEP_SIZE,
            interval_ratio: DEFAULT_INTERVAL_RATIO,
            step_ratio: DEFAULT_STEP_RATIO,
            generational_mode: false,
        }
    }
}

impl GcConfig {
    #[must_use]
    pub fn with_heap_page_size(mut self, slots: usize) -> Self {
        assert!(slots > 0, "heap page size must hold at least one slot");
        self.heap_page_size = slots;
        self
    }

    #[must_use]
    pub fn with_arena_size(mut self, size: usize) -> Self {
        assert!(
            size > ARENA_SLACK,
            "arena must be larger than the reserved slack of {ARENA_SLACK}"
        );
        self.arena_size = size;
        self
    }

    #[must_use]
    pub fn with_step_size(mut self, size: usize) -> Self {
        self.step_size = size;
        self
    }

    #[must_use]
    pub fn with_interval_ratio(mut self, ratio: i32) -> Self {
        self.interval_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_step_ratio(mut self, ratio: i32) -> Self {
        self.step_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_generational_mode(mut self, enabled: bool) -> Self {
        self.generational_mode = enabled;
        self
    }

    pub fn heap_page_size(&self) -> usize {
        self.heap_page_size
    }

    pub fn arena_size(&self) -> usize {
        self.arena_size
    }

    pub fn step_size(&self) -> usize {
        self.step_size
    }
}

/// Compatibility knobs exposed by `GC.interval_ratio`/`GC.step_ratio`/
/// `GC.generational_mode` (§6): this collector is always stop-the-world
/// mark-sweep, so these are read/write storage only — nothing in `Heap`
/// consults them.
pub struct CompatSettings {
    interval_ratio: core::cell::Cell<i32>,
    step_ratio: core::cell::Cell<i32>,
    generational_mode: core::cell::Cell<bool>,
}

impl CompatSettings {
    pub fn new(config: &GcConfig) -> Self {
        Self {
            interval_ratio: core::cell::Cell::new(config.interval_ratio),
            step_ratio: core::cell::Cell::new(config.step_ratio),
            generational_mode: core::cell::Cell::new(config.generational_mode),
        }
    }

    pub fn interval_ratio(&self) -> i32 {
        self.interval_ratio.get()
    }

    /// Always accepted; returns `true` per the spec's table (§6).
    pub fn set_interval_ratio(&self, ratio: i32) -> bool {
        self.interval_ratio.set(ratio);
        true
    }

    pub fn step_ratio(&self) -> i32 {
        self.step_ratio.get()
    }

    pub fn set_step_ratio(&self, ratio: i32) -> bool {
        self.step_ratio.set(ratio);
        true
    }

    pub fn generational_mode(&self) -> bool {
        self.generational_mode.get()
    }

    pub fn set_generational_mode(&self, enabled: bool) -> bool {
        self.generational_mode.set(enabled);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compat_settings_round_trip_and_always_report_success() {
        let settings = CompatSettings::new(&GcConfig::default());
        assert_eq!(settings.interval_ratio(), DEFAULT_INTERVAL_RATIO);
        assert!(settings.set_interval_ratio(300));
        assert_eq!(settings.interval_ratio(), 300);

        assert!(settings.set_step_ratio(150));
        assert_eq!(settings.step_ratio(), 150);

        assert!(!settings.generational_mode());
        assert!(settings.set_generational_mode(true));
        assert!(settings.generational_mode());
    }
}
