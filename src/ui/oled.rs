//! SSD1306 OLED digit sink.

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use super::display::DigitSink;
use crate::config::NUM_DIGITS;
use crate::error::Error;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Initialise the SSD1306 display and clear the screen.
///
/// A missing or unresponsive panel is logged, not fatal: the clock keeps
/// time without it and later frames are still sent.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    if display.init().is_err() {
        warn!("oled: init failed, running without display");
    }
    display.clear_buffer();
    let _ = display.flush();
    display
}

fn digit_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(BinaryColor::On)
        .build()
}

fn label_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

/// Ten 10x20 digits centred on a 128x64 panel, ASCII glyphs.
pub struct OledDigits<I2C> {
    display: Display<I2C>,
}

impl<I2C> OledDigits<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(display: Display<I2C>) -> Self {
        Self { display }
    }

    pub fn release(self) -> Display<I2C> {
        self.display
    }
}

impl<I2C> DigitSink for OledDigits<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Glyph = u8;

    fn glyph(&self, digit: u8) -> u8 {
        b'0' + digit % 10
    }

    fn blank(&self) -> u8 {
        b' '
    }

    fn render(&mut self, glyphs: &[u8; NUM_DIGITS]) -> Result<(), Error> {
        let mut line: heapless::String<NUM_DIGITS> = heapless::String::new();
        for &glyph in glyphs {
            line.push(char::from(glyph)).map_err(|_| Error::Display)?;
        }

        self.display.clear_buffer();
        let _ = Text::new("unix time", Point::new(37, 14), label_style()).draw(&mut self.display);
        let _ = Text::new(line.as_str(), Point::new(14, 40), digit_style()).draw(&mut self.display);
        self.display.flush().map_err(|_| Error::Display)
    }
}
