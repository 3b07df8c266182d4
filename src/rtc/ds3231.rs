//! DS3231 real-time clock driver.
//!
//! Based on the DS3231 datasheet:
//! - I²C address: 0x68
//! - Time registers 0x00..=0x06 in BCD: seconds, minutes, hours,
//!   weekday (1-7), date, month (bit 7 = century), year (00-99)
//! - Control register 0x0E: INTCN=0 with RS2:RS1=00 routes a 1 Hz square
//!   wave to the INT/SQW pin
//! - Status register 0x0F: OSF (bit 7) is set whenever the oscillator
//!   stopped, i.e. the stored time cannot be trusted
//!
//! Each request is a single bus transaction and finishes on the first
//! [`Timekeeper::pump`] after it was started. The driver is generic over
//! any blocking `embedded-hal` 1.0 I²C bus.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use embedded_hal::i2c::I2c;

use super::{Reply, Request, Timekeeper};
use crate::config::DS3231_ADDRESS;
use crate::error::DeviceError;

/// Register addresses
pub mod registers {
    pub const SECONDS: u8 = 0x00;
    // Sequential: Minutes=0x01, Hours=0x02, Weekday=0x03, Date=0x04, Century_Month=0x05, Year=0x06
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
}

const HOUR_12H: u8 = 1 << 6;
const HOUR_PM: u8 = 1 << 5;
const CENTURY: u8 = 1 << 7;
const STATUS_OSF: u8 = 1 << 7;
/// Oscillator on, square wave on SQW at 1 Hz, alarms off.
const CONTROL_SQW_1HZ: u8 = 0x00;

fn bcd_to_dec(bcd: u8) -> u8 {
    ((bcd >> 4) * 10) + (bcd & 0x0F)
}

fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}

/// Parse the seven time registers.
pub fn decode_registers(regs: &[u8; 7]) -> Result<NaiveDateTime, DeviceError> {
    let second = bcd_to_dec(regs[0] & 0x7F);
    let minute = bcd_to_dec(regs[1] & 0x7F);
    let hour = if regs[2] & HOUR_12H != 0 {
        let h12 = bcd_to_dec(regs[2] & 0x1F) % 12;
        if regs[2] & HOUR_PM != 0 {
            h12 + 12
        } else {
            h12
        }
    } else {
        bcd_to_dec(regs[2] & 0x3F)
    };
    let day = bcd_to_dec(regs[4] & 0x3F);
    let month = bcd_to_dec(regs[5] & 0x1F);
    let century: i32 = if regs[5] & CENTURY != 0 { 2100 } else { 2000 };
    let year = century + i32::from(bcd_to_dec(regs[6]));

    NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))
        .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
        .ok_or(DeviceError::InvalidData)
}

/// Build the seven time registers (24 h mode).
pub fn encode_registers(time: &NaiveDateTime) -> Result<[u8; 7], DeviceError> {
    let year = time.year();
    if !(2000..=2199).contains(&year) {
        return Err(DeviceError::OutOfRange);
    }
    let century = if year >= 2100 { CENTURY } else { 0 };
    // All fields below are < 100, the casts cannot truncate.
    Ok([
        dec_to_bcd(time.second() as u8),
        dec_to_bcd(time.minute() as u8),
        dec_to_bcd(time.hour() as u8),
        time.weekday().number_from_monday() as u8,
        dec_to_bcd(time.day() as u8),
        dec_to_bcd(time.month() as u8) | century,
        dec_to_bcd((year % 100) as u8),
    ])
}

/// DS3231 driver
pub struct Ds3231<I2C> {
    i2c: I2C,
    address: u8,
    pending: Option<Request>,
}

impl<I2C: I2c> Ds3231<I2C> {
    /// Create a driver at the default address.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DS3231_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            pending: None,
        }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Start the 1 Hz output and clear the oscillator-stop flag.
    pub fn enable_seconds_output(&mut self) -> Result<(), DeviceError> {
        self.write_register(registers::CONTROL, CONTROL_SQW_1HZ)?;
        let status = self.read_register(registers::STATUS)?;
        if status & STATUS_OSF != 0 {
            warn!("ds3231: oscillator had stopped, time may be stale");
            self.write_register(registers::STATUS, status & !STATUS_OSF)?;
        }
        Ok(())
    }

    /// Read current date and time
    pub fn read_time(&mut self) -> Result<NaiveDateTime, DeviceError> {
        let mut regs = [0u8; 7];
        self.i2c
            .write_read(self.address, &[registers::SECONDS], &mut regs)
            .map_err(|_| DeviceError::Bus)?;
        decode_registers(&regs)
    }

    pub fn write_time(&mut self, time: &NaiveDateTime) -> Result<(), DeviceError> {
        let regs = encode_registers(time)?;
        let mut frame = [0u8; 8];
        frame[0] = registers::SECONDS;
        frame[1..].copy_from_slice(&regs);
        self.i2c
            .write(self.address, &frame)
            .map_err(|_| DeviceError::Bus)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), DeviceError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|_| DeviceError::Bus)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, DeviceError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut value)
            .map_err(|_| DeviceError::Bus)?;
        Ok(value[0])
    }
}

impl<I2C: I2c> Timekeeper for Ds3231<I2C> {
    fn start(&mut self, request: Request) -> Result<(), DeviceError> {
        if self.pending.is_some() {
            return Err(DeviceError::Busy);
        }
        self.pending = Some(request);
        Ok(())
    }

    fn pump(&mut self) -> Option<Result<Reply, DeviceError>> {
        let request = self.pending.take()?;
        let result = match request {
            Request::EnableSecondsOutput => self.enable_seconds_output().map(|()| Reply::Configured),
            Request::Read => self.read_time().map(Reply::Time),
            Request::Write(time) => self.write_time(&time).map(|()| Reply::Written),
        };
        Some(result)
    }

    fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    fn abort(&mut self) {
        self.pending = None;
    }
}
