//! Software debounce and auto-repeat for the momentary buttons.
//!
//! Each button is sampled once per scan tick. A level change must persist
//! for the debounce threshold before it is accepted; while the accepted
//! level is active a second counter produces one repeat per repeat
//! threshold. Both thresholds are counted in scan ticks, so behaviour does
//! not depend on how fast the foreground loop spins.

use super::ButtonId;

/// Debounced output of one scan tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEdge {
    /// Accepted inactive → active transition (the "first press").
    Pressed,
    /// Held for another repeat interval.
    Repeat,
    /// Accepted active → inactive transition.
    Released,
}

/// Raw (undebounced) sample of every button, `true` = pressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonLevels {
    pub up: bool,
    pub down: bool,
    pub select: bool,
}

impl ButtonLevels {
    pub fn level(&self, id: ButtonId) -> bool {
        match id {
            ButtonId::Up => self.up,
            ButtonId::Down => self.down,
            ButtonId::Select => self.select,
        }
    }

    pub fn any_active(&self) -> bool {
        self.up || self.down || self.select
    }
}

/// Anything that can sample the raw button levels.
pub trait ButtonSource {
    fn sample(&mut self) -> ButtonLevels;
}

impl<F> ButtonSource for F
where
    F: FnMut() -> ButtonLevels,
{
    fn sample(&mut self) -> ButtonLevels {
        self()
    }
}

/// Debounce / repeat state of a single button.
#[derive(Clone, Debug)]
pub struct DebouncedButton {
    active: bool,
    debounce_count: u16,
    repeat_count: u16,
    debounce_threshold: u16,
    repeat_threshold: u16,
}

impl DebouncedButton {
    /// Thresholds are in scan ticks; zero is treated as one.
    pub const fn new(debounce_threshold: u16, repeat_threshold: u16) -> Self {
        Self {
            active: false,
            debounce_count: 0,
            repeat_count: 0,
            debounce_threshold: if debounce_threshold == 0 { 1 } else { debounce_threshold },
            repeat_threshold: if repeat_threshold == 0 { 1 } else { repeat_threshold },
        }
    }

    /// Debounced level.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.debounce_count = 0;
        self.repeat_count = 0;
    }

    /// Feed one raw sample. Call exactly once per scan tick.
    pub fn update(&mut self, level: bool) -> Option<ButtonEdge> {
        if level != self.active {
            self.debounce_count += 1;
            if self.debounce_count >= self.debounce_threshold {
                self.active = level;
                self.debounce_count = 0;
                self.repeat_count = 0;
                return Some(if level {
                    ButtonEdge::Pressed
                } else {
                    ButtonEdge::Released
                });
            }
        } else {
            self.debounce_count = 0;
        }

        if self.active {
            self.repeat_count += 1;
            if self.repeat_count >= self.repeat_threshold {
                self.repeat_count = 0;
                return Some(ButtonEdge::Repeat);
            }
        }

        None
    }
}

/// The three buttons of the clock, scanned together.
#[derive(Clone, Debug)]
pub struct ButtonPanel {
    up: DebouncedButton,
    down: DebouncedButton,
    select: DebouncedButton,
}

impl ButtonPanel {
    pub const fn new(debounce_threshold: u16, repeat_threshold: u16) -> Self {
        Self {
            up: DebouncedButton::new(debounce_threshold, repeat_threshold),
            down: DebouncedButton::new(debounce_threshold, repeat_threshold),
            select: DebouncedButton::new(debounce_threshold, repeat_threshold),
        }
    }

    /// Feed one raw sample of every button; edges are returned in
    /// [`ButtonId::ALL`] order.
    pub fn scan(&mut self, levels: ButtonLevels) -> [Option<ButtonEdge>; 3] {
        ButtonId::ALL.map(|id| self.button_mut(id).update(levels.level(id)))
    }

    pub fn button(&self, id: ButtonId) -> &DebouncedButton {
        match id {
            ButtonId::Up => &self.up,
            ButtonId::Down => &self.down,
            ButtonId::Select => &self.select,
        }
    }

    fn button_mut(&mut self, id: ButtonId) -> &mut DebouncedButton {
        match id {
            ButtonId::Up => &mut self.up,
            ButtonId::Down => &mut self.down,
            ButtonId::Select => &mut self.select,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: u16 = 10;
    const REPEAT: u16 = 100;

    fn feed(button: &mut DebouncedButton, level: bool, ticks: usize) -> Vec<ButtonEdge> {
        (0..ticks).filter_map(|_| button.update(level)).collect()
    }

    #[test]
    fn short_glitch_never_commits() {
        let mut b = DebouncedButton::new(DEBOUNCE, REPEAT);
        for _ in 0..20 {
            assert!(feed(&mut b, true, DEBOUNCE as usize - 1).is_empty());
            assert!(feed(&mut b, false, 1).is_empty());
        }
        assert!(!b.is_active());
    }

    #[test]
    fn sustained_press_commits_on_threshold() {
        let mut b = DebouncedButton::new(DEBOUNCE, REPEAT);
        assert!(feed(&mut b, true, DEBOUNCE as usize - 1).is_empty());
        assert_eq!(b.update(true), Some(ButtonEdge::Pressed));
        assert!(b.is_active());
    }

    #[test]
    fn holding_fires_one_repeat_per_interval() {
        let mut b = DebouncedButton::new(DEBOUNCE, REPEAT);
        assert_eq!(feed(&mut b, true, DEBOUNCE as usize), [ButtonEdge::Pressed]);

        for n in [1usize, 3, 7] {
            let mut held = DebouncedButton::new(DEBOUNCE, REPEAT);
            feed(&mut held, true, DEBOUNCE as usize);
            let edges = feed(&mut held, true, n * REPEAT as usize);
            assert_eq!(edges.len(), n);
            assert!(edges.iter().all(|e| *e == ButtonEdge::Repeat));
        }
    }

    #[test]
    fn release_is_debounced_too() {
        let mut b = DebouncedButton::new(DEBOUNCE, REPEAT);
        feed(&mut b, true, DEBOUNCE as usize);
        // Bounce on release: short low glitches are ignored.
        assert!(feed(&mut b, false, DEBOUNCE as usize - 1).is_empty());
        assert!(b.is_active());
        assert_eq!(b.update(false), Some(ButtonEdge::Released));
        assert!(!b.is_active());
        assert!(feed(&mut b, false, 10 * REPEAT as usize).is_empty());
    }

    #[test]
    fn bounce_restarts_the_debounce_count() {
        let mut b = DebouncedButton::new(DEBOUNCE, REPEAT);
        feed(&mut b, true, DEBOUNCE as usize - 2);
        b.update(false);
        assert!(feed(&mut b, true, DEBOUNCE as usize - 1).is_empty());
        assert_eq!(b.update(true), Some(ButtonEdge::Pressed));
    }

    #[test]
    fn zero_thresholds_behave_as_one() {
        let mut b = DebouncedButton::new(0, 0);
        assert_eq!(b.update(true), Some(ButtonEdge::Pressed));
        assert_eq!(b.update(true), Some(ButtonEdge::Repeat));
    }

    #[test]
    fn panel_reports_per_button() {
        let mut panel = ButtonPanel::new(2, 50);
        let press_up = ButtonLevels { up: true, ..Default::default() };
        assert_eq!(panel.scan(press_up), [None, None, None]);
        assert_eq!(panel.scan(press_up), [Some(ButtonEdge::Pressed), None, None]);
        assert!(panel.button(ButtonId::Up).is_active());
        assert!(!panel.button(ButtonId::Select).is_active());
    }

    #[test]
    fn closures_are_button_sources() {
        let mut source = || ButtonLevels { select: true, ..Default::default() };
        let levels = source.sample();
        assert!(levels.any_active());
        assert!(levels.level(ButtonId::Select));
        assert!(!levels.level(ButtonId::Up));
    }
}
