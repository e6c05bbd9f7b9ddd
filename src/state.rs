//! The node state signal.
//!
//! A node's state is never forced from outside. External callers (the graph,
//! pin notifications) write *requested* states into the signal; the node's own
//! worker thread observes them at its loop checkpoints and settles them into
//! `Started` / `Paused`, or returns for `StopRequested`.
//!
//! The signal is a guarded cell with a wait-for-predicate wake primitive, not
//! a plain atomic: the execution loops block on multi-condition predicates
//! ("either `StartRequested` or `StopRequested`") and every such predicate
//! includes `StopRequested` so a stop request always wakes the thread.

use std::sync::{Condvar, Mutex};

/// The state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The node has been requested to transition to `Started`.
    StartRequested,
    /// The node is running its role loop.
    Started,
    /// A connected input pin has signalled that a packet is waiting.
    Incoming,
    /// The node has been requested to transition to `Paused`.
    PauseRequested,
    /// The node's loop is frozen; node-internal progress is untouched.
    Paused,
    /// The node has been requested to exit its execution loop.
    StopRequested,
}

/// Guarded state cell shared by a node's worker thread, external callers of
/// `start`/`pause`/`stop`, and every input pin owned by the node.
#[derive(Debug)]
pub struct StateSignal {
    cell: Mutex<State>,
    wake: Condvar,
}

impl StateSignal {
    /// Creates a signal in the initial `Paused` state.
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(State::Paused),
            wake: Condvar::new(),
        }
    }

    /// Reads the current state without blocking.
    pub fn get(&self) -> State {
        *self.cell.lock().unwrap()
    }

    /// Writes a state and wakes any waiter. Requests are idempotent
    /// overwrites, so duplicate or late requests are benign.
    pub fn set(&self, state: State) {
        *self.cell.lock().unwrap() = state;
        self.wake.notify_all();
    }

    /// Writes a settled state from the owning loop and returns it, so the
    /// loop can keep its local observation in sync. A pending `StopRequested`
    /// is never overwritten: a stop that lands between the loop observing a
    /// request and settling it (including before the loop's very first
    /// instruction) must survive, or the node would run forever and `stop`
    /// would block in its join.
    pub fn settle(&self, state: State) -> State {
        let mut cell = self.cell.lock().unwrap();
        if *cell == State::StopRequested {
            return State::StopRequested;
        }
        *cell = state;
        self.wake.notify_all();
        state
    }

    /// Transitions `Started` to `Incoming`, used by input pins on packet
    /// arrival. Any other state is left untouched: in particular a `Paused`
    /// node does not queue a pending wake, it re-discovers packets via `peek`
    /// once it runs again. Returns whether the transition fired.
    pub fn mark_incoming_if_started(&self) -> bool {
        let mut cell = self.cell.lock().unwrap();
        if *cell == State::Started {
            *cell = State::Incoming;
            self.wake.notify_all();
            true
        } else {
            false
        }
    }

    /// Blocks until `pred` holds for the current state, then returns it.
    /// Callers must include `StopRequested` in the predicate.
    pub fn wait_for(&self, pred: impl Fn(State) -> bool) -> State {
        let mut cell = self.cell.lock().unwrap();
        while !pred(*cell) {
            cell = self.wake.wait(cell).unwrap();
        }
        *cell
    }
}

impl Default for StateSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_initial_state_is_paused() {
        assert_eq!(StateSignal::new().get(), State::Paused);
    }

    #[test]
    fn test_mark_incoming_only_from_started() {
        let signal = StateSignal::new();
        assert!(!signal.mark_incoming_if_started());
        assert_eq!(signal.get(), State::Paused);

        signal.set(State::Started);
        assert!(signal.mark_incoming_if_started());
        assert_eq!(signal.get(), State::Incoming);

        // Already incoming: a second arrival is not a second wake.
        assert!(!signal.mark_incoming_if_started());
        assert_eq!(signal.get(), State::Incoming);
    }

    #[test]
    fn test_settle_never_overwrites_a_stop_request() {
        let signal = StateSignal::new();
        signal.set(State::StopRequested);
        assert_eq!(signal.settle(State::Started), State::StopRequested);
        assert_eq!(signal.get(), State::StopRequested);
    }

    #[test]
    fn test_wait_for_wakes_on_stop() {
        let signal = Arc::new(StateSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                signal.wait_for(|s| {
                    matches!(s, State::StartRequested | State::StopRequested)
                })
            })
        };
        thread::sleep(Duration::from_millis(20));
        signal.set(State::StopRequested);
        assert_eq!(waiter.join().unwrap(), State::StopRequested);
    }
}
