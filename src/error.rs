//! Unified error type for unix-clock.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

use core::fmt;

use crate::fsm::{EventKind, State};

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // RTC
    /// The timekeeping device reported a failure.
    Device(DeviceError),

    /// A device operation was requested while another one is in flight.
    Busy,

    /// A calendar time does not fit in a 32-bit Unix timestamp.
    TimestampRange,

    // FSM
    /// The transition table declares the same (state, event) key twice.
    DuplicateTransition(State, EventKind),

    /// A declared state cannot be reached from the initial state.
    UnreachableState(State),

    // UI / Display
    /// I²C transaction to the display failed.
    Display,
}

/// Subset of timekeeper errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// The I²C transaction was not acknowledged or aborted.
    Bus,
    /// Register contents do not form a valid calendar time.
    InvalidData,
    /// The time cannot be stored by the device (year outside 2000..=2199).
    OutOfRange,
    /// The device is still executing a previous request.
    Busy,
    /// The request did not complete within the configured time.
    Timeout,
}

impl DeviceError {
    /// Retrying the same request cannot change the outcome.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeviceError::InvalidData | DeviceError::OutOfRange)
    }
}

// Convenience conversions

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Device(e) => write!(f, "timekeeper error: {e}"),
            Error::Busy => f.write_str("device operation already in flight"),
            Error::TimestampRange => f.write_str("time outside the 32-bit timestamp range"),
            Error::DuplicateTransition(state, event) => {
                write!(f, "duplicate transition for {state:?} on {event:?}")
            }
            Error::UnreachableState(state) => write!(f, "state {state:?} is unreachable"),
            Error::Display => f.write_str("display write failed"),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DeviceError::Bus => "bus transaction failed",
            DeviceError::InvalidData => "invalid register data",
            DeviceError::OutOfRange => "time out of device range",
            DeviceError::Busy => "device busy",
            DeviceError::Timeout => "timed out",
        };
        f.write_str(msg)
    }
}
