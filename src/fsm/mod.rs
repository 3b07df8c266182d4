//! Table-driven application state machine.
//!
//! Transitions are plain data: `(state, event) -> (action, next)`. The
//! machine only decides; the controller in [`crate::clock`] carries out
//! the returned [`Action`]. Pairs missing from the table are discarded
//! without changing state.


use crate::error::Error;

/// Application states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Showing the running time.
    Display,
    /// A digit is being edited; the seconds edge is ignored.
    Edit,
    /// Committed value is being written to the RTC.
    Writing,
    /// Periodic re-read from the RTC is in flight.
    Reading,
}

impl State {
    pub const ALL: [State; 4] = [State::Display, State::Edit, State::Writing, State::Reading];
}

/// Inputs to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    DigitSelect,
    Up,
    Down,
    /// The cursor was released after the idle timeout.
    IdleDeselected,
    /// Time to re-read the RTC.
    SyncDue,
    /// RTC read finished with this timestamp.
    ReadComplete(u32),
    ReadFailed,
    WriteComplete,
    WriteFailed,
}

/// Table key: an [`Event`] without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    DigitSelect,
    Up,
    Down,
    IdleDeselected,
    SyncDue,
    ReadComplete,
    ReadFailed,
    WriteComplete,
    WriteFailed,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DigitSelect => EventKind::DigitSelect,
            Event::Up => EventKind::Up,
            Event::Down => EventKind::Down,
            Event::IdleDeselected => EventKind::IdleDeselected,
            Event::SyncDue => EventKind::SyncDue,
            Event::ReadComplete(_) => EventKind::ReadComplete,
            Event::ReadFailed => EventKind::ReadFailed,
            Event::WriteComplete => EventKind::WriteComplete,
            Event::WriteFailed => EventKind::WriteFailed,
        }
    }
}

/// Work the controller performs when a transition fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    None,
    /// Increment the selected digit (9 rolls to 0).
    IncrementDigit,
    /// Decrement the selected digit (0 rolls to 9).
    DecrementDigit,
    /// Fold the digits into the timestamp and start an RTC write.
    Commit,
    /// Start an RTC read.
    StartRead,
    /// Replace the timestamp with the value the RTC returned.
    AcceptRead,
}

/// One row of the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub on: EventKind,
    pub action: Action,
    pub to: State,
}

const fn row(from: State, on: EventKind, action: Action, to: State) -> Transition {
    Transition { from, on, action, to }
}

/// The clock's transition table.
pub static TRANSITIONS: [Transition; 12] = [
    row(State::Display, EventKind::DigitSelect, Action::None, State::Edit),
    row(State::Display, EventKind::Up, Action::IncrementDigit, State::Edit),
    row(State::Display, EventKind::Down, Action::DecrementDigit, State::Edit),
    row(State::Display, EventKind::SyncDue, Action::StartRead, State::Reading),
    //
    row(State::Edit, EventKind::Up, Action::IncrementDigit, State::Edit),
    row(State::Edit, EventKind::Down, Action::DecrementDigit, State::Edit),
    row(State::Edit, EventKind::DigitSelect, Action::None, State::Edit),
    row(State::Edit, EventKind::IdleDeselected, Action::Commit, State::Writing),
    //
    row(State::Writing, EventKind::WriteComplete, Action::None, State::Display),
    row(State::Writing, EventKind::WriteFailed, Action::None, State::Display),
    //
    row(State::Reading, EventKind::ReadComplete, Action::AcceptRead, State::Display),
    row(State::Reading, EventKind::ReadFailed, Action::None, State::Display),
];

/// Check a table before use: no `(state, event)` key twice and every
/// state reachable from `initial`.
pub fn validate(table: &[Transition], initial: State) -> Result<(), Error> {
    for (i, a) in table.iter().enumerate() {
        if table[i + 1..].iter().any(|b| a.from == b.from && a.on == b.on) {
            return Err(Error::DuplicateTransition(a.from, a.on));
        }
    }

    let mut reached = [false; State::ALL.len()];
    reached[index_of(initial)] = true;
    // Fixed-point walk; the state set is tiny.
    let mut changed = true;
    while changed {
        changed = false;
        for t in table {
            if reached[index_of(t.from)] && !reached[index_of(t.to)] {
                reached[index_of(t.to)] = true;
                changed = true;
            }
        }
    }

    match State::ALL.iter().find(|s| !reached[index_of(**s)]) {
        Some(state) => Err(Error::UnreachableState(*state)),
        None => Ok(()),
    }
}

fn index_of(state: State) -> usize {
    match state {
        State::Display => 0,
        State::Edit => 1,
        State::Writing => 2,
        State::Reading => 3,
    }
}

/// The running machine.
#[derive(Clone, Debug)]
pub struct StateMachine {
    state: State,
    table: &'static [Transition],
}

impl StateMachine {
    /// Validates `table` and starts in [`State::Display`].
    pub fn new(table: &'static [Transition]) -> Result<Self, Error> {
        validate(table, State::Display)?;
        Ok(Self {
            state: State::Display,
            table,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Look up and apply the transition for `event`.
    ///
    /// Returns the fired row, or `None` when the pair is not in the table
    /// (state unchanged).
    pub fn dispatch(&mut self, event: Event) -> Option<Transition> {
        let kind = event.kind();
        let Some(t) = self
            .table
            .iter()
            .find(|t| t.from == self.state && t.on == kind)
        else {
            debug!("fsm: {} ignored in {}", kind, self.state);
            return None;
        };

        if t.to != self.state {
            info!("fsm: {} -> {} on {}", self.state, t.to, kind);
        }
        self.state = t.to;
        Some(*t)
    }
}
