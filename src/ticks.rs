//! Flags shared between interrupt context and the foreground loop.
//!
//! Interrupt handlers only ever set flags; the foreground loop consumes them
//! with a single atomic swap. A flag that is raised again before it was
//! consumed stays "pending" once, it does not count.
//!
//! The whole [`Signals`] block is `const`-constructible so firmware can keep
//! it in a plain `static`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::ClockConfig;

/// Event raised by an edge interrupt (e.g. the RTC's 1 Hz square wave).
pub struct EdgeFlag {
    pending: AtomicBool,
}

impl EdgeFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Interrupt side.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Foreground side: read and reset in one step.
    pub fn test_and_clear(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

impl Default for EdgeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Flag raised every `period_ms` of elapsed timer time.
pub struct PeriodicFlag {
    period_ms: u32,
    /// Only touched from the timer interrupt.
    elapsed_ms: AtomicU32,
    pending: AtomicBool,
}

impl PeriodicFlag {
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms: if period_ms == 0 { 1 } else { period_ms },
            elapsed_ms: AtomicU32::new(0),
            pending: AtomicBool::new(false),
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Interrupt side: account for `elapsed_ms` of timer time.
    pub fn advance(&self, elapsed_ms: u32) {
        let total = self.elapsed_ms.load(Ordering::Relaxed).saturating_add(elapsed_ms);
        if total >= self.period_ms {
            self.pending.store(true, Ordering::Release);
        }
        self.elapsed_ms.store(total % self.period_ms, Ordering::Relaxed);
    }

    /// Foreground side: "has the period elapsed since the last check?"
    pub fn test_and_clear(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Every flag the controller consumes.
pub struct Signals {
    /// Button scan / application tick.
    pub scan: PeriodicFlag,
    /// Cursor blink phase.
    pub blink: PeriodicFlag,
    /// RTC re-synchronisation.
    pub sync: PeriodicFlag,
    /// RTC 1 Hz output edge.
    pub seconds: EdgeFlag,
}

impl Signals {
    pub const fn new(config: &ClockConfig) -> Self {
        Self {
            scan: PeriodicFlag::new(config.scan_period_ms),
            blink: PeriodicFlag::new(config.blink_period_ms),
            sync: PeriodicFlag::new(config.sync_period_ms),
            seconds: EdgeFlag::new(),
        }
    }

    /// Periodic timer interrupt.
    pub fn on_timer_tick(&self, elapsed_ms: u32) {
        self.scan.advance(elapsed_ms);
        self.blink.advance(elapsed_ms);
        self.sync.advance(elapsed_ms);
    }

    /// RTC square-wave edge interrupt.
    pub fn on_seconds_edge(&self) {
        self.seconds.raise();
    }
}
