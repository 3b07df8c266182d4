//! The clock controller.
//!
//! [`UnixClock`] owns every piece of mutable application state: timestamp,
//! digit buffer, selection, button debouncers, state machine and the RTC
//! request slot. Interrupt handlers never touch it; they raise flags in
//! [`Signals`] and [`UnixClock::poll`] consumes them from the foreground
//! loop, so there is exactly one writer and no locking.
//!
//! One `poll` runs, in order: button scan, digit mutation, seconds edge,
//! blink phase, RTC sync request, display refresh, RTC pump.

use crate::codec::{self, Digits, MAX_TIMESTAMP};
use crate::config::{ClockConfig, BOOT_POLL_LIMIT};
use crate::error::{DeviceError, Error};
use crate::fsm::{Action, Event, State, StateMachine, Transition, TRANSITIONS};
use crate::rtc::{Completion, DeviceOp, DeviceSync, Timekeeper};
use crate::ticks::Signals;
use crate::ui::buttons::{ButtonEdge, ButtonLevels, ButtonPanel, ButtonSource};
use crate::ui::display::{DigitSink, DisplayRefresh};
use crate::ui::input_logic::DigitSelector;
use crate::ui::ButtonId;

pub struct UnixClock<T> {
    config: ClockConfig,
    fsm: StateMachine,
    buttons: ButtonPanel,
    selector: DigitSelector,
    display: DisplayRefresh,
    sync: DeviceSync<T>,
    timestamp: u32,
    digits: Digits,
    clock_set: bool,
}

impl<T: Timekeeper> UnixClock<T> {
    /// Build the controller around `device`. The timestamp starts at the
    /// configured baseline until [`bootstrap`](Self::bootstrap) runs.
    pub fn new(device: T, config: ClockConfig) -> Result<Self, Error> {
        Ok(Self {
            fsm: StateMachine::new(&TRANSITIONS)?,
            buttons: ButtonPanel::new(config.debounce_ticks(), config.repeat_ticks()),
            selector: DigitSelector::new(config.scan_period_ms, config.idle_timeout_ms),
            display: DisplayRefresh::new(),
            sync: DeviceSync::new(device, config.device_timeout_ms, config.device_retries),
            timestamp: config.baseline,
            digits: codec::encode(config.baseline),
            clock_set: false,
            config,
        })
    }

    /// One-time blocking handshake with the RTC.
    ///
    /// Enables the 1 Hz output, reads the stored time and, if it is older
    /// than the baseline, overwrites it with the baseline. On a failed read
    /// or write the baseline is shown, [`is_clock_set`](Self::is_clock_set)
    /// stays `false` and the error is returned.
    pub fn bootstrap(&mut self) -> Result<u32, Error> {
        let baseline = self.config.baseline;
        info!("boot: baseline {}", baseline);

        if let Err(e) = self.sync.run_blocking(DeviceOp::Configure, BOOT_POLL_LIMIT) {
            warn!("boot: 1 Hz output not enabled: {}", e);
        }

        let read = self
            .sync
            .run_blocking(DeviceOp::Read, BOOT_POLL_LIMIT)
            .and_then(|done| match done {
                Completion::Read(t) => Ok(t),
                _ => Err(Error::Device(DeviceError::InvalidData)),
            });

        let device_time = match read {
            Ok(t) => t,
            Err(e) => {
                error!("boot: RTC read failed: {}", e);
                self.set_timestamp(baseline);
                self.clock_set = false;
                return Err(e);
            }
        };

        if device_time < baseline {
            warn!("boot: RTC time {} predates baseline, resetting", device_time);
            self.set_timestamp(baseline);
            if let Err(e) = self.sync.run_blocking(DeviceOp::Write(baseline), BOOT_POLL_LIMIT) {
                error!("boot: RTC write failed: {}", e);
                self.clock_set = false;
                return Err(e);
            }
        } else {
            self.set_timestamp(device_time);
        }

        self.clock_set = true;
        info!("boot: time is {}", self.timestamp);
        Ok(self.timestamp)
    }

    /// Run one foreground iteration.
    pub fn poll<B, S>(&mut self, signals: &Signals, buttons: &mut B, sink: &mut S)
    where
        B: ButtonSource,
        S: DigitSink,
    {
        if signals.scan.test_and_clear() {
            self.scan_buttons(buttons.sample());
            if let Some(done) = self.sync.tick(self.config.scan_period_ms) {
                self.on_completion(done);
            }
        }

        if signals.seconds.test_and_clear() {
            self.seconds_edge();
        }

        if signals.blink.test_and_clear() {
            self.display.toggle_blink();
        }

        if signals.sync.test_and_clear() {
            self.dispatch(Event::SyncDue);
        }

        if let Err(e) = self.refresh(sink) {
            warn!("display: refresh failed: {}", e);
        }

        if let Some(done) = self.sync.pump() {
            self.on_completion(done);
        }
    }

    /// Process one scan tick of raw button levels.
    pub fn scan_buttons(&mut self, levels: ButtonLevels) {
        let edges = self.buttons.scan(levels);

        for (id, edge) in ButtonId::ALL.into_iter().zip(edges) {
            let Some(edge) = edge else { continue };
            trace!("button: {} {}", id, edge);
            if edge == ButtonEdge::Released || !self.accepts_input() {
                continue;
            }
            match id {
                ButtonId::Select => {
                    self.selector.advance();
                    self.display.mark_dirty();
                    self.dispatch(Event::DigitSelect);
                }
                // A repeat can arrive without an accepted press when the
                // button was already held during a transaction.
                ButtonId::Up => {
                    self.selector.ensure_selected();
                    self.display.mark_dirty();
                    self.dispatch(Event::Up);
                }
                ButtonId::Down => {
                    self.selector.ensure_selected();
                    self.display.mark_dirty();
                    self.dispatch(Event::Down);
                }
            }
        }

        if self.selector.tick(levels.any_active()).is_some() {
            self.display.mark_dirty();
            self.dispatch(Event::IdleDeselected);
        }
    }

    /// RTC 1 Hz edge. Only the running display advances; an edit in
    /// progress must not drift.
    pub fn seconds_edge(&mut self) {
        if self.fsm.state() != State::Display {
            return;
        }
        self.set_timestamp(self.timestamp.saturating_add(1));
    }

    /// Feed one event to the state machine and carry out its action.
    pub fn dispatch(&mut self, event: Event) {
        let Some(transition) = self.fsm.dispatch(event) else {
            return;
        };
        self.apply(transition, event);

        if transition.to == State::Display && transition.from != State::Display {
            self.digits = codec::encode(self.timestamp);
            self.display.mark_dirty();
        }
    }

    /// Redraw the display if anything changed.
    pub fn refresh<S: DigitSink>(&mut self, sink: &mut S) -> Result<bool, Error> {
        self.display
            .refresh(&self.digits, self.selector.selected(), sink)
    }

    pub fn state(&self) -> State {
        self.fsm.state()
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn digits(&self) -> &Digits {
        &self.digits
    }

    pub fn selected(&self) -> Option<usize> {
        self.selector.selected()
    }

    /// `false` until the RTC has confirmed a plausible time.
    pub fn is_clock_set(&self) -> bool {
        self.clock_set
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn sync(&self) -> &DeviceSync<T> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut DeviceSync<T> {
        &mut self.sync
    }

    fn accepts_input(&self) -> bool {
        matches!(self.fsm.state(), State::Display | State::Edit)
    }

    fn apply(&mut self, transition: Transition, event: Event) {
        match transition.action {
            Action::None => {}
            Action::IncrementDigit => {
                if let Some(index) = self.selector.selected() {
                    self.digits.increment(index);
                    self.display.mark_dirty();
                }
            }
            Action::DecrementDigit => {
                if let Some(index) = self.selector.selected() {
                    self.digits.decrement(index);
                    self.display.mark_dirty();
                }
            }
            Action::Commit => self.commit(),
            Action::StartRead => {
                if let Err(e) = self.sync.request(DeviceOp::Read) {
                    warn!("sync: read not started: {}", e);
                    self.dispatch(Event::ReadFailed);
                }
            }
            Action::AcceptRead => {
                if let Event::ReadComplete(timestamp) = event {
                    if timestamp != self.timestamp {
                        debug!("sync: corrected {} -> {}", self.timestamp, timestamp);
                    }
                    self.set_timestamp(timestamp);
                    self.clock_set = true;
                }
            }
        }
    }

    fn commit(&mut self) {
        let wide = codec::decode_wide(&self.digits);
        if wide > u64::from(MAX_TIMESTAMP) {
            warn!("edit: {} exceeds 32 bits, saturating", wide);
        }
        self.set_timestamp(codec::decode(&self.digits));
        info!("edit: committing {}", self.timestamp);

        if let Err(e) = self.sync.request(DeviceOp::Write(self.timestamp)) {
            error!("edit: write not started: {}", e);
            self.dispatch(Event::WriteFailed);
        }
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Written => {
                self.clock_set = true;
                self.dispatch(Event::WriteComplete);
            }
            Completion::Read(timestamp) => self.dispatch(Event::ReadComplete(timestamp)),
            Completion::Configured => {}
            Completion::Failed(DeviceOp::Write(timestamp), Error::Device(e)) if e.is_permanent() => {
                warn!("edit: RTC cannot store {} ({}), edit rejected", timestamp, e);
                self.dispatch(Event::WriteFailed);
            }
            Completion::Failed(DeviceOp::Write(_), _) => self.dispatch(Event::WriteFailed),
            Completion::Failed(DeviceOp::Read, _) => self.dispatch(Event::ReadFailed),
            Completion::Failed(DeviceOp::Configure, e) => {
                warn!("sync: configure failed: {}", e);
            }
        }
    }

    fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
        self.digits = codec::encode(timestamp);
        self.display.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::{Reply, Request};
    use chrono::NaiveDateTime;

    /// RTC that completes on the next pump and remembers its time.
    struct MemoryRtc {
        now: Option<NaiveDateTime>,
        running: Option<Request>,
        fail: bool,
    }

    impl MemoryRtc {
        fn at(timestamp: u32) -> Self {
            Self {
                now: Some(crate::rtc::to_calendar(timestamp)),
                running: None,
                fail: false,
            }
        }
    }

    impl Timekeeper for MemoryRtc {
        fn start(&mut self, request: Request) -> Result<(), DeviceError> {
            if self.running.is_some() {
                return Err(DeviceError::Busy);
            }
            self.running = Some(request);
            Ok(())
        }

        fn pump(&mut self) -> Option<Result<Reply, DeviceError>> {
            let request = self.running.take()?;
            if self.fail {
                return Some(Err(DeviceError::Bus));
            }
            Some(match request {
                Request::EnableSecondsOutput => Ok(Reply::Configured),
                Request::Read => self.now.map(Reply::Time).ok_or(DeviceError::InvalidData),
                Request::Write(t) => {
                    self.now = Some(t);
                    Ok(Reply::Written)
                }
            })
        }

        fn is_idle(&self) -> bool {
            self.running.is_none()
        }

        fn abort(&mut self) {
            self.running = None;
        }
    }

    const BASELINE: u32 = 1_700_000_000;

    fn config() -> ClockConfig {
        ClockConfig {
            baseline: BASELINE,
            ..ClockConfig::DEFAULT
        }
    }

    #[test]
    fn bootstrap_keeps_plausible_rtc_time() {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE + 500), config()).unwrap();
        assert!(!clock.is_clock_set());
        assert_eq!(clock.bootstrap(), Ok(BASELINE + 500));
        assert!(clock.is_clock_set());
        assert_eq!(clock.digits(), &codec::encode(BASELINE + 500));
        assert_eq!(clock.state(), State::Display);
    }

    #[test]
    fn bootstrap_resets_stale_rtc_to_baseline() {
        let mut clock = UnixClock::new(MemoryRtc::at(946_684_800), config()).unwrap();
        assert_eq!(clock.bootstrap(), Ok(BASELINE));
        let stored = clock.sync().device().now.unwrap();
        assert_eq!(crate::rtc::from_calendar(&stored), Ok(BASELINE));
    }

    #[test]
    fn bootstrap_read_failure_is_surfaced() {
        let mut rtc = MemoryRtc::at(BASELINE);
        rtc.fail = true;
        let mut clock = UnixClock::new(rtc, config()).unwrap();
        assert_eq!(clock.bootstrap(), Err(Error::Device(DeviceError::Bus)));
        assert!(!clock.is_clock_set());
        assert_eq!(clock.timestamp(), BASELINE);
    }

    #[test]
    fn seconds_edge_only_counts_in_display() {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE), config()).unwrap();
        clock.bootstrap().unwrap();
        clock.seconds_edge();
        assert_eq!(clock.timestamp(), BASELINE + 1);

        clock.dispatch(Event::DigitSelect);
        assert_eq!(clock.state(), State::Edit);
        clock.seconds_edge();
        assert_eq!(clock.timestamp(), BASELINE + 1);
    }

    #[test]
    fn seconds_edge_saturates() {
        let cfg = ClockConfig {
            baseline: u32::MAX,
            ..ClockConfig::DEFAULT
        };
        let mut clock = UnixClock::new(MemoryRtc::at(u32::MAX), cfg).unwrap();
        clock.seconds_edge();
        assert_eq!(clock.timestamp(), u32::MAX);
    }

    #[test]
    fn increment_without_selection_is_noop() {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE), config()).unwrap();
        clock.bootstrap().unwrap();
        let before = *clock.digits();
        clock.dispatch(Event::Up);
        assert_eq!(clock.state(), State::Edit);
        assert_eq!(clock.digits(), &before);
    }

    #[test]
    fn commit_saturates_oversized_edit() {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE), config()).unwrap();
        clock.bootstrap().unwrap();
        // Hold SELECT past the debounce to pick digit 0 (a "1"), then roll
        // it up to 9: 9 700 000 000.
        let debounce = usize::from(clock.config().debounce_ticks());
        for _ in 0..=debounce {
            clock.scan_buttons(ButtonLevels { select: true, ..Default::default() });
        }
        assert_eq!(clock.selected(), Some(0));
        for _ in 0..8 {
            clock.dispatch(Event::Up);
        }
        assert_eq!(clock.digits().get(0), Some(9));

        clock.dispatch(Event::IdleDeselected);
        assert_eq!(clock.state(), State::Writing);
        assert_eq!(clock.timestamp(), MAX_TIMESTAMP);
        assert_eq!(clock.digits(), &codec::encode(MAX_TIMESTAMP));
    }

    /// Clock in `state`, with a digit selected when editing.
    fn clock_in(state: State) -> UnixClock<MemoryRtc> {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE), config()).unwrap();
        clock.bootstrap().unwrap();
        match state {
            State::Display => {}
            State::Reading => clock.dispatch(Event::SyncDue),
            State::Edit | State::Writing => {
                clock.selector.advance();
                clock.dispatch(Event::DigitSelect);
                if state == State::Writing {
                    clock.dispatch(Event::IdleDeselected);
                }
            }
        }
        assert_eq!(clock.state(), state);
        clock
    }

    #[test]
    fn unlisted_events_leave_buffer_and_time_alone() {
        let events = [
            Event::DigitSelect,
            Event::Up,
            Event::Down,
            Event::IdleDeselected,
            Event::SyncDue,
            Event::ReadComplete(BASELINE + 999),
            Event::ReadFailed,
            Event::WriteComplete,
            Event::WriteFailed,
        ];
        for state in State::ALL {
            for event in events {
                let listed = TRANSITIONS
                    .iter()
                    .any(|t| t.from == state && t.on == event.kind());
                if listed {
                    continue;
                }
                let mut clock = clock_in(state);
                let digits = *clock.digits();
                let timestamp = clock.timestamp();
                clock.dispatch(event);
                assert_eq!(clock.state(), state, "{state:?} / {event:?}");
                assert_eq!(clock.digits(), &digits, "{state:?} / {event:?}");
                assert_eq!(clock.timestamp(), timestamp, "{state:?} / {event:?}");
            }
        }
    }

    #[test]
    fn up_repeat_without_press_still_selects() {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE), config()).unwrap();
        clock.bootstrap().unwrap();
        let debounce = usize::from(clock.config().debounce_ticks());
        let repeat = usize::from(clock.config().repeat_ticks());
        let up = ButtonLevels { up: true, ..Default::default() };

        // The press lands while a read is outstanding and is dropped.
        clock.dispatch(Event::SyncDue);
        for _ in 0..debounce {
            clock.scan_buttons(up);
        }
        assert_eq!(clock.selected(), None);
        clock.dispatch(Event::ReadFailed);
        assert_eq!(clock.state(), State::Display);

        for _ in 0..repeat {
            clock.scan_buttons(up);
        }
        assert_eq!(clock.state(), State::Edit);
        assert_eq!(clock.selected(), Some(0));
        assert_eq!(clock.digits().get(0), Some(2));
    }

    #[test]
    fn sync_read_corrects_drift() {
        let mut clock = UnixClock::new(MemoryRtc::at(BASELINE), config()).unwrap();
        clock.bootstrap().unwrap();
        clock.sync_mut().device_mut().now = Some(crate::rtc::to_calendar(BASELINE + 60));

        clock.dispatch(Event::SyncDue);
        assert_eq!(clock.state(), State::Reading);
        let done = clock.sync_mut().pump().unwrap();
        clock.on_completion(done);
        assert_eq!(clock.state(), State::Display);
        assert_eq!(clock.timestamp(), BASELINE + 60);
    }
}
