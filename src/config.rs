//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Timing

/// Button scan / application tick period (ms).
pub const APP_TICK_MS: u32 = 10;

/// Cursor blink half-period (ms).
pub const BLINK_TICK_MS: u32 = 300;

/// Interval between re-synchronisations from the RTC (ms).
pub const SYNC_TICK_MS: u32 = 60 * 1000;

/// Granularity of the firmware timebase that feeds the tick flags (ms).
/// Every period above must be a multiple of it.
pub const TIMEBASE_MS: u32 = 10;

// Buttons

/// Level must be stable this long before it is accepted (ms).
pub const BUTTON_DEBOUNCE_MS: u32 = 100;

/// Auto-repeat interval while a button is held (ms).
pub const BUTTON_REPEAT_MS: u32 = 1000;

/// Inactivity before the selected digit is released and the edit committed (ms).
pub const IDLE_TIMEOUT_MS: u32 = 2000;

// Display

/// Number of digits on the display (10 decimal digits cover `u32::MAX`).
pub const NUM_DIGITS: usize = 10;

// RTC

/// DS3231 7-bit I²C address.
pub const DS3231_ADDRESS: u8 = 0x68;

/// An outstanding device request is abandoned after this long (ms).
pub const DEVICE_TIMEOUT_MS: u32 = 500;

/// Extra attempts for a failed or timed-out device request.
pub const DEVICE_RETRIES: u8 = 2;

/// Upper bound on pump calls during the blocking boot handshake.
pub const BOOT_POLL_LIMIT: u32 = 100_000;

/// Oldest time the RTC may report at boot, stamped by `build.rs`.
pub const BUILD_BASELINE: u32 = parse_decimal(env!("UNIX_CLOCK_BASELINE"));

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button UP      → P0.11
//   Button DOWN    → P0.12
//   Button SELECT  → P0.24
//   RTC SQW        → P0.25
//   RTC SDA/SCL    → P0.26 / P0.27   (TWIM0)
//   OLED SDA/SCL   → P0.30 / P0.31   (TWIM1)

/// Runtime view of the timing parameters.
///
/// Firmware uses [`ClockConfig::DEFAULT`]; tests build their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    pub scan_period_ms: u32,
    pub blink_period_ms: u32,
    pub sync_period_ms: u32,
    pub debounce_ms: u32,
    pub repeat_ms: u32,
    pub idle_timeout_ms: u32,
    pub device_timeout_ms: u32,
    pub device_retries: u8,
    pub baseline: u32,
}

impl ClockConfig {
    pub const DEFAULT: Self = Self {
        scan_period_ms: APP_TICK_MS,
        blink_period_ms: BLINK_TICK_MS,
        sync_period_ms: SYNC_TICK_MS,
        debounce_ms: BUTTON_DEBOUNCE_MS,
        repeat_ms: BUTTON_REPEAT_MS,
        idle_timeout_ms: IDLE_TIMEOUT_MS,
        device_timeout_ms: DEVICE_TIMEOUT_MS,
        device_retries: DEVICE_RETRIES,
        baseline: BUILD_BASELINE,
    };

    /// Debounce threshold in scan ticks (at least one).
    pub const fn debounce_ticks(&self) -> u16 {
        ticks(self.debounce_ms, self.scan_period_ms)
    }

    /// Auto-repeat threshold in scan ticks (at least one).
    pub const fn repeat_ticks(&self) -> u16 {
        ticks(self.repeat_ms, self.scan_period_ms)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const fn ticks(duration_ms: u32, period_ms: u32) -> u16 {
    let period = if period_ms == 0 { 1 } else { period_ms };
    let n = duration_ms / period;
    if n == 0 {
        1
    } else if n > u16::MAX as u32 {
        u16::MAX
    } else {
        n as u16
    }
}

const fn parse_decimal(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        assert!(b.is_ascii_digit(), "UNIX_CLOCK_BASELINE must be decimal");
        value = value * 10 + (b - b'0') as u32;
        i += 1;
    }
    value
}
