//! Timekeeping device access.
//!
//! The RTC speaks calendar time; the clock speaks Unix seconds. This module
//! holds the device contract ([`Timekeeper`]) and [`DeviceSync`], which
//! converts between the two and enforces "one request at a time". Requests
//! never block: the foreground loop calls [`DeviceSync::pump`] every
//! iteration and gets a [`Completion`] back once the transaction is done.
//!
//! A request that fails, or is still outstanding after the configured
//! timeout, is aborted and retried a bounded number of times before it is
//! reported as [`Completion::Failed`].

pub mod ds3231;

use chrono::{DateTime, NaiveDateTime};

use crate::error::{DeviceError, Error};

/// Request in device terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    /// Enable the 1 Hz square-wave output that drives the seconds edge.
    EnableSecondsOutput,
    Read,
    Write(NaiveDateTime),
}

/// Successful device reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Configured,
    Time(NaiveDateTime),
    Written,
}

/// Contract of the external timekeeping device.
pub trait Timekeeper {
    /// Begin a transaction. Fails with [`DeviceError::Busy`] if one is
    /// already running.
    fn start(&mut self, request: Request) -> Result<(), DeviceError>;

    /// Drive the running transaction forward. Returns its outcome once it
    /// has finished, `None` while still in progress or idle.
    fn pump(&mut self) -> Option<Result<Reply, DeviceError>>;

    fn is_idle(&self) -> bool;

    /// Forget the running transaction.
    fn abort(&mut self);
}

/// Operation in clock terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceOp {
    Configure,
    Read,
    Write(u32),
}

/// Outcome of an operation, delivered from [`DeviceSync::pump`] or
/// [`DeviceSync::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    Configured,
    Read(u32),
    Written,
    Failed(DeviceOp, Error),
}

/// Convert a timestamp to UTC calendar time.
pub fn to_calendar(timestamp: u32) -> NaiveDateTime {
    // Every u32 is inside chrono's range, the fallback is never taken.
    DateTime::from_timestamp(i64::from(timestamp), 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// Convert UTC calendar time to a timestamp.
pub fn from_calendar(time: &NaiveDateTime) -> Result<u32, Error> {
    u32::try_from(time.and_utc().timestamp()).map_err(|_| Error::TimestampRange)
}

/// The in-flight operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pending {
    pub op: DeviceOp,
    pub elapsed_ms: u32,
    pub attempt: u8,
}

/// Request/completion wrapper around a [`Timekeeper`].
pub struct DeviceSync<T> {
    device: T,
    pending: Option<Pending>,
    timeout_ms: u32,
    retries: u8,
}

impl<T: Timekeeper> DeviceSync<T> {
    pub fn new(device: T, timeout_ms: u32, retries: u8) -> Self {
        Self {
            device,
            pending: None,
            timeout_ms,
            retries,
        }
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut T {
        &mut self.device
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Start `op`. Only one operation may be outstanding.
    pub fn request(&mut self, op: DeviceOp) -> Result<(), Error> {
        if self.pending.is_some() {
            warn!("rtc: {} refused, {} still in flight", op, self.pending);
            return Err(Error::Busy);
        }
        self.start_device(op)?;
        debug!("rtc: {} started", op);
        self.pending = Some(Pending {
            op,
            elapsed_ms: 0,
            attempt: 0,
        });
        Ok(())
    }

    /// Drive the device. Call once per foreground iteration.
    pub fn pump(&mut self) -> Option<Completion> {
        let pending = self.pending?;
        match self.device.pump()? {
            Ok(reply) => {
                self.pending = None;
                Some(self.complete(pending.op, reply))
            }
            Err(e) if e.is_permanent() => {
                warn!("rtc: {} rejected: {}", pending.op, e);
                self.pending = None;
                Some(Completion::Failed(pending.op, Error::Device(e)))
            }
            Err(e) => {
                warn!("rtc: {} attempt {} failed: {}", pending.op, pending.attempt, e);
                self.retry_or_fail(pending, Error::Device(e))
            }
        }
    }

    /// Account for elapsed time; reports a failure once an operation has
    /// run out of time and retries.
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<Completion> {
        let mut pending = self.pending?;
        pending.elapsed_ms = pending.elapsed_ms.saturating_add(elapsed_ms);
        self.pending = Some(pending);

        if pending.elapsed_ms < self.timeout_ms {
            return None;
        }
        warn!("rtc: {} timed out after {} ms", pending.op, pending.elapsed_ms);
        self.device.abort();
        self.retry_or_fail(pending, Error::Device(DeviceError::Timeout))
    }

    /// Run `op` to completion by spinning on [`pump`](Self::pump).
    ///
    /// Only for the boot handshake, before the foreground loop exists.
    pub fn run_blocking(&mut self, op: DeviceOp, poll_limit: u32) -> Result<Completion, Error> {
        self.request(op)?;
        for _ in 0..poll_limit {
            match self.pump() {
                Some(Completion::Failed(_, e)) => return Err(e),
                Some(done) => return Ok(done),
                None => {}
            }
        }
        warn!("rtc: {} did not finish within {} polls", op, poll_limit);
        self.device.abort();
        self.pending = None;
        Err(Error::Device(DeviceError::Timeout))
    }

    fn start_device(&mut self, op: DeviceOp) -> Result<(), Error> {
        let request = match op {
            DeviceOp::Configure => Request::EnableSecondsOutput,
            DeviceOp::Read => Request::Read,
            DeviceOp::Write(timestamp) => Request::Write(to_calendar(timestamp)),
        };
        self.device.start(request)?;
        Ok(())
    }

    fn retry_or_fail(&mut self, pending: Pending, cause: Error) -> Option<Completion> {
        self.pending = None;
        if pending.attempt < self.retries && self.start_device(pending.op).is_ok() {
            self.pending = Some(Pending {
                op: pending.op,
                elapsed_ms: 0,
                attempt: pending.attempt + 1,
            });
            return None;
        }
        error!("rtc: {} given up: {}", pending.op, cause);
        Some(Completion::Failed(pending.op, cause))
    }

    fn complete(&self, op: DeviceOp, reply: Reply) -> Completion {
        match (op, reply) {
            (DeviceOp::Configure, Reply::Configured) => Completion::Configured,
            (DeviceOp::Write(_), Reply::Written) => Completion::Written,
            (DeviceOp::Read, Reply::Time(time)) => match from_calendar(&time) {
                Ok(timestamp) => Completion::Read(timestamp),
                Err(e) => Completion::Failed(op, e),
            },
            _ => Completion::Failed(op, Error::Device(DeviceError::InvalidData)),
        }
    }
}
