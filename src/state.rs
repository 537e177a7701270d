use std::sync::atomic::{AtomicU8, Ordering};

/// The three lifecycle values a process can be in from the orchestrator's
/// point of view.
///
/// `SERVER_IS_SHUTTING_DOWN` is terminal: once entered, every later
/// transition attempt is a silent no-op rather than an error, matching the
/// source contract that `signalNotReady` after shutdown has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    NotReady = 0,
    Ready = 1,
    ShuttingDown = 2,
}

impl State {
    /// The exact literal this state is reported as in probe bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            State::NotReady => "SERVER_IS_NOT_READY",
            State::Ready => "SERVER_IS_READY",
            State::ShuttingDown => "SERVER_IS_SHUTTING_DOWN",
        }
    }

    fn from_u8(v: u8) -> State {
        match v {
            0 => State::NotReady,
            1 => State::Ready,
            _ => State::ShuttingDown,
        }
    }
}

/// An atomic cell holding a [`State`] with a transition guard baked in.
///
/// Reads and writes are `SeqCst`: a read observed after a write always sees
/// that write, which is all the ordering guarantee the probe handlers and
/// the coordinator need since no multi-field invariant spans this cell.
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(initial: State) -> Self {
        StateCell(AtomicU8::new(initial as u8))
    }

    pub fn get(&self) -> State {
        State::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// NOT_READY -> READY. No-op from any other state.
    pub fn signal_ready(&self) {
        let _ = self.0.compare_exchange(
            State::NotReady as u8,
            State::Ready as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// READY -> NOT_READY. No-op from any other state (in particular, a
    /// no-op once SHUTTING_DOWN has been entered).
    pub fn signal_not_ready(&self) {
        let _ = self.0.compare_exchange(
            State::Ready as u8,
            State::NotReady as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Unconditionally enters SHUTTING_DOWN. Idempotent: entering it again
    /// is harmless since it's terminal.
    pub fn enter_shutting_down(&self) {
        self.0.store(State::ShuttingDown as u8, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.get() == State::Ready
    }

    pub fn is_shutting_down(&self) -> bool {
        self.get() == State::ShuttingDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_ready() {
        let cell = StateCell::new(State::NotReady);
        assert_eq!(cell.get(), State::NotReady);
        assert!(!cell.is_ready());
        assert!(!cell.is_shutting_down());
    }

    #[test]
    fn ready_round_trip() {
        let cell = StateCell::new(State::NotReady);
        cell.signal_ready();
        assert!(cell.is_ready());
        cell.signal_not_ready();
        assert!(!cell.is_ready());
        assert_eq!(cell.get(), State::NotReady);
    }

    #[test]
    fn shutting_down_is_terminal() {
        let cell = StateCell::new(State::NotReady);
        cell.signal_ready();
        cell.enter_shutting_down();
        assert!(cell.is_shutting_down());

        // Neither signal can move it out of SHUTTING_DOWN.
        cell.signal_ready();
        assert!(cell.is_shutting_down());
        cell.signal_not_ready();
        assert!(cell.is_shutting_down());
    }
}
