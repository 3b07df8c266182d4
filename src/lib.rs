//! Library interface for unix-clock.
//!
//! Everything except the Embassy firmware entry point lives here so the
//! controller, codec, debounce, state machine and RTC driver can be tested
//! on the host (no embedded hardware required).
//!
//! Usage: `cargo test --lib` (unit) or `cargo test` (unit + integration)
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and is only built with `--features embedded`.

#![cfg_attr(not(test), no_std)]

// Must come first: the logging macros are textually scoped.
mod fmt;

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod fsm;
pub mod rtc;
pub mod ticks;
pub mod ui;

pub use clock::UnixClock;
pub use codec::Digits;
pub use config::ClockConfig;
pub use error::{DeviceError, Error};
pub use fsm::{Event, State};
pub use ticks::Signals;
