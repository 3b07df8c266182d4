//! Digit cursor: which of the ten digits is being edited.

use crate::config::NUM_DIGITS;

/// Emitted when the idle timeout releases the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deselected;

/// Move the cursor one digit to the right, wrapping after the last one.
/// No selection starts at the leftmost digit.
pub fn select_next(selected: Option<usize>) -> usize {
    match selected {
        Some(index) if index + 1 < NUM_DIGITS => index + 1,
        _ => 0,
    }
}

/// Selected digit plus the idle timer that releases it.
#[derive(Clone, Debug)]
pub struct DigitSelector {
    selected: Option<usize>,
    idle_ms: u32,
    idle_timeout_ms: u32,
    scan_period_ms: u32,
}

impl DigitSelector {
    pub const fn new(scan_period_ms: u32, idle_timeout_ms: u32) -> Self {
        Self {
            selected: None,
            idle_ms: 0,
            idle_timeout_ms,
            scan_period_ms,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// SELECT pressed or repeating.
    pub fn advance(&mut self) {
        self.selected = Some(select_next(self.selected));
        self.idle_ms = 0;
    }

    /// UP/DOWN pressed: make sure something is selected before it is edited.
    pub fn ensure_selected(&mut self) {
        if self.selected.is_none() {
            self.selected = Some(0);
        }
        self.idle_ms = 0;
    }

    /// Drop the selection without reporting it.
    pub fn clear(&mut self) {
        self.selected = None;
        self.idle_ms = 0;
    }

    /// Advance the idle timer by one scan tick.
    ///
    /// `any_active` is the raw level of all buttons; idle time only
    /// accumulates while every button is released.
    pub fn tick(&mut self, any_active: bool) -> Option<Deselected> {
        if any_active {
            self.idle_ms = 0;
            return None;
        }

        self.selected?;

        self.idle_ms = self.idle_ms.saturating_add(self.scan_period_ms);
        if self.idle_ms >= self.idle_timeout_ms {
            self.clear();
            return Some(Deselected);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: u32 = 10;
    const IDLE: u32 = 2000;

    fn idle_ticks(selector: &mut DigitSelector, ticks: u32) -> Option<Deselected> {
        let mut out = None;
        for _ in 0..ticks {
            if let Some(ev) = selector.tick(false) {
                out = Some(ev);
            }
        }
        out
    }

    #[test]
    fn select_next_wraps() {
        assert_eq!(select_next(None), 0);
        assert_eq!(select_next(Some(0)), 1);
        assert_eq!(select_next(Some(8)), 9);
        assert_eq!(select_next(Some(9)), 0);
    }

    #[test]
    fn advance_walks_all_digits() {
        let mut s = DigitSelector::new(SCAN, IDLE);
        assert_eq!(s.selected(), None);
        for expected in (0..NUM_DIGITS).chain(0..2) {
            s.advance();
            assert_eq!(s.selected(), Some(expected));
        }
    }

    #[test]
    fn ensure_selected_keeps_existing_cursor() {
        let mut s = DigitSelector::new(SCAN, IDLE);
        s.ensure_selected();
        assert_eq!(s.selected(), Some(0));
        s.advance();
        s.advance();
        s.ensure_selected();
        assert_eq!(s.selected(), Some(2));
    }

    #[test]
    fn deselects_after_exactly_the_idle_time() {
        let mut s = DigitSelector::new(SCAN, IDLE);
        s.advance();
        assert_eq!(idle_ticks(&mut s, IDLE / SCAN - 1), None);
        assert_eq!(s.selected(), Some(0));
        assert_eq!(s.tick(false), Some(Deselected));
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn activity_restarts_the_idle_timer() {
        let mut s = DigitSelector::new(SCAN, IDLE);
        s.advance();
        assert_eq!(idle_ticks(&mut s, IDLE / SCAN - 1), None);
        assert_eq!(s.tick(true), None);
        assert_eq!(idle_ticks(&mut s, IDLE / SCAN - 1), None);
        assert_eq!(s.selected(), Some(0));
        assert_eq!(s.tick(false), Some(Deselected));
    }

    #[test]
    fn selection_event_restarts_the_idle_timer() {
        let mut s = DigitSelector::new(SCAN, IDLE);
        s.advance();
        idle_ticks(&mut s, IDLE / SCAN - 1);
        s.advance();
        assert_eq!(idle_ticks(&mut s, IDLE / SCAN - 1), None);
        assert_eq!(s.selected(), Some(1));
    }

    #[test]
    fn nothing_selected_never_times_out() {
        let mut s = DigitSelector::new(SCAN, IDLE);
        assert_eq!(idle_ticks(&mut s, 10 * IDLE / SCAN), None);
    }
}
