//! unix-clock - standalone Unix-timestamp clock
//!
//! Shows seconds since 1970-01-01 UTC as ten digits on an SSD1306 OLED and
//! lets the user edit them with three buttons. A DS3231 keeps the time
//! across power loss and drives the seconds tick through its 1 Hz output.
//!
//! Architecture:
//! - Timebase task: 10 ms ticker feeding the periodic flags in `SIGNALS`
//! - Seconds task: falling edge on the DS3231 SQW pin
//! - Main loop: `UnixClock::poll`, the only owner of application state
//!
//! Hardware: nRF52840 (any devboard), DS3231 on TWIM0, SSD1306 on TWIM1.

#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Input, Pin, Pull};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::{Duration, Ticker};
use panic_probe as _;

use unix_clock::config::{ClockConfig, TIMEBASE_MS};
use unix_clock::rtc::ds3231::Ds3231;
use unix_clock::ui::buttons::{ButtonLevels, ButtonSource};
use unix_clock::ui::oled::{self, OledDigits};
use unix_clock::{Signals, UnixClock};

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    TWISPI1 => twim::InterruptHandler<peripherals::TWISPI1>;
});

static SIGNALS: Signals = Signals::new(&ClockConfig::DEFAULT);

/// Active-low buttons with internal pull-ups.
struct Buttons {
    up: Input<'static>,
    down: Input<'static>,
    select: Input<'static>,
}

impl ButtonSource for Buttons {
    fn sample(&mut self) -> ButtonLevels {
        ButtonLevels {
            up: self.up.is_low(),
            down: self.down.is_low(),
            select: self.select.is_low(),
        }
    }
}

#[embassy_executor::task]
async fn timebase_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(TIMEBASE_MS)));
    loop {
        ticker.next().await;
        SIGNALS.on_timer_tick(TIMEBASE_MS);
    }
}

#[embassy_executor::task]
async fn seconds_task(pin: AnyPin) -> ! {
    // SQW is open-drain.
    let mut sqw = Input::new(pin, Pull::Up);
    loop {
        sqw.wait_for_falling_edge().await;
        SIGNALS.on_seconds_edge();
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("unix-clock starting");

    let mut bus_config = twim::Config::default();
    bus_config.frequency = twim::Frequency::K400;

    // DS3231: SDA P0.26, SCL P0.27
    let rtc_bus = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, bus_config);
    // SSD1306: SDA P0.30, SCL P0.31
    let oled_bus = Twim::new(p.TWISPI1, Irqs, p.P0_30, p.P0_31, twim::Config::default());

    let mut sink = OledDigits::new(oled::init(oled_bus));

    let mut buttons = Buttons {
        up: Input::new(p.P0_11, Pull::Up),
        down: Input::new(p.P0_12, Pull::Up),
        select: Input::new(p.P0_24, Pull::Up),
    };

    let mut clock = match UnixClock::new(Ds3231::new(rtc_bus), ClockConfig::DEFAULT) {
        Ok(clock) => clock,
        Err(e) => {
            error!("controller init failed: {}", e);
            panic!("bad transition table");
        }
    };

    if let Err(e) = clock.bootstrap() {
        warn!("RTC unavailable, showing baseline: {}", e);
    }

    if spawner.spawn(timebase_task()).is_err() {
        error!("timebase task not spawned");
    }
    if spawner.spawn(seconds_task(p.P0_25.degrade())).is_err() {
        error!("seconds task not spawned");
    }

    loop {
        clock.poll(&SIGNALS, &mut buttons, &mut sink);
        embassy_futures::yield_now().await;
    }
}
