//! User interface subsystem - 10-digit display + physical buttons.
//!
//! ## Components
//!
//! - **Buttons**: up to 3 tactile switches with software debounce and
//!   auto-repeat (UP, DOWN, SELECT)
//! - **Input logic**: which digit is being edited, idle release
//! - **Display**: dirty-flag refresh with a blinking cursor
//! - **OLED**: SSD1306 digit sink (embedded builds only)

pub mod buttons;
pub mod display;
pub mod input_logic;
#[cfg(feature = "embedded")]
pub mod oled;

/// Physical buttons.
///
/// A two-button build simply never reports DOWN as active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    Up,
    Down,
    Select,
}

impl ButtonId {
    pub const ALL: [ButtonId; 3] = [ButtonId::Up, ButtonId::Down, ButtonId::Select];
}
