//! Dirty-flag display refresh with a blinking edit cursor.
//!
//! The core only knows digit values, which digit is selected and the blink
//! phase. Turning a digit into something the hardware can show is the
//! sink's job ([`DigitSink::glyph`]).

use crate::codec::Digits;
use crate::config::NUM_DIGITS;
use crate::error::Error;

/// Output side of the display.
pub trait DigitSink {
    /// Per-digit pattern understood by the hardware (segments, ASCII, ...).
    type Glyph: Copy;

    /// Glyph for a decimal digit in `0..=9`.
    fn glyph(&self, digit: u8) -> Self::Glyph;

    /// Glyph with every segment off.
    fn blank(&self) -> Self::Glyph;

    /// Push a full frame, most significant digit first.
    fn render(&mut self, glyphs: &[Self::Glyph; NUM_DIGITS]) -> Result<(), Error>;
}

/// Tracks whether the frame on the display is stale.
#[derive(Clone, Debug)]
pub struct DisplayRefresh {
    dirty: bool,
    blink_on: bool,
}

impl DisplayRefresh {
    /// Starts dirty so the first refresh always draws.
    pub const fn new() -> Self {
        Self {
            dirty: true,
            blink_on: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    /// Flip the cursor phase; always forces a redraw.
    pub fn toggle_blink(&mut self) {
        self.blink_on = !self.blink_on;
        self.dirty = true;
    }

    /// Build the frame for `digits` with the cursor applied.
    pub fn compose<S: DigitSink>(
        &self,
        digits: &Digits,
        selected: Option<usize>,
        sink: &S,
    ) -> [S::Glyph; NUM_DIGITS] {
        let mut glyphs = [sink.blank(); NUM_DIGITS];
        for (index, (glyph, &digit)) in glyphs.iter_mut().zip(digits.as_array()).enumerate() {
            let hidden = selected == Some(index) && !self.blink_on;
            *glyph = if hidden { sink.blank() } else { sink.glyph(digit) };
        }
        glyphs
    }

    /// Redraw if dirty. Returns `Ok(true)` when a frame was sent.
    ///
    /// A failed render leaves the flag set so the next call retries.
    pub fn refresh<S: DigitSink>(
        &mut self,
        digits: &Digits,
        selected: Option<usize>,
        sink: &mut S,
    ) -> Result<bool, Error> {
        if !self.dirty {
            return Ok(false);
        }
        let frame = self.compose(digits, selected, sink);
        sink.render(&frame)?;
        self.dirty = false;
        Ok(true)
    }
}

impl Default for DisplayRefresh {
    fn default() -> Self {
        Self::new()
    }
}
