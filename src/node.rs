//! Nodes: independently scheduled processing stages.
//!
//! The three roles share one state-machine implementation by composition
//! rather than inheritance: each node struct owns a name, a [`StateSignal`],
//! its pins, and a boxed role callback. The graph runs a node's execution
//! loop on a dedicated worker thread; `start`/`pause`/`stop` are
//! fire-and-forget writes to the signal that the loop observes at its
//! checkpoints.
//!
//! Pause freezes only the scheduling loop. Whatever progress a concrete
//! callback keeps across `produce`/`ready` calls survives a pause/resume
//! cycle untouched. Stop is cooperative: it is observed at the next loop
//! checkpoint, and both blocking waits include `StopRequested` in their wake
//! predicate so a paused or idle node wakes promptly.
//!
//! No lock is held while a `produce` or `ready` callback runs.

use std::sync::Arc;

use crate::named::Named;
use crate::pin::{Inpin, Outpin};
use crate::state::{State, StateSignal};

/// Role callback for a pure producer: called once per loop iteration while
/// the node is `Started`. Implementations push packets to the output pins and
/// handle rejection themselves (retry later or drop).
pub trait Produce<T>: Send {
    fn produce(&mut self, outputs: &[Outpin<T>]);
}

/// Role callback for a pure consumer: called with the index of an input pin
/// that has at least one packet waiting.
pub trait Consume<T>: Send {
    fn ready(&mut self, pin: usize, inputs: &[Inpin<T>]);
}

/// Role callback for a transformer: like [`Consume`] but with the output pins
/// in reach, so the implementation reads inputs and pushes results from the
/// same thread.
pub trait Transform<T>: Send {
    fn ready(&mut self, pin: usize, inputs: &[Inpin<T>], outputs: &[Outpin<T>]);
}

fn make_outpins<T>(node: &str, outs: usize) -> Vec<Outpin<T>> {
    (0..outs)
        .map(|i| Outpin::new(format!("{node}_out{i}")))
        .collect()
}

fn make_inpins<T>(node: &str, ins: usize, signal: &Arc<StateSignal>) -> Vec<Inpin<T>> {
    (0..ins)
        .map(|i| Inpin::new(format!("{node}_in{i}"), Arc::clone(signal)))
        .collect()
}

/// The producer execution loop.
///
/// Settles to `Started` on entry, then until `StopRequested` is observed:
/// blocks while `Paused` (waking on `StartRequested` or `StopRequested`),
/// settles requested states, and invokes the work callback once per
/// iteration while `Started`.
fn producing_loop(signal: &StateSignal, mut work: impl FnMut()) {
    let mut s = signal.settle(State::Started);
    while s != State::StopRequested {
        if s == State::Paused {
            s = signal.wait_for(|s| {
                matches!(s, State::StartRequested | State::StopRequested)
            });
        } else {
            s = signal.get();
        }

        if s == State::PauseRequested {
            s = signal.settle(State::Paused);
        } else if s == State::StartRequested {
            s = signal.settle(State::Started);
        }

        if s == State::Started {
            work();
        }
    }
}

/// The consumer execution loop, also run verbatim by transformers.
///
/// Idles in a blocking wait while `Started` with no pending wake; a pin
/// notification (`Incoming`) or any external request ends the wait. On an
/// `Incoming` observation every input pin is scanned in index order and
/// `service` is called for each non-empty one, so a single wake may service
/// several pins; pins not ready are skipped without waiting.
fn consuming_loop<T>(signal: &StateSignal, inputs: &[Inpin<T>], mut service: impl FnMut(usize)) {
    let mut s = signal.settle(State::Started);
    while s != State::StopRequested {
        if s == State::Paused {
            s = signal.wait_for(|s| {
                matches!(s, State::StartRequested | State::StopRequested)
            });
        } else if s == State::Started {
            s = signal.wait_for(|s| s != State::Started);
        } else {
            s = signal.get();
        }

        match s {
            State::PauseRequested => s = signal.settle(State::Paused),
            State::StartRequested => s = signal.settle(State::Started),
            State::Incoming => {
                // Settle back to Started before servicing, so pushes that
                // arrive during the scan can raise a fresh wake.
                signal.settle(State::Started);
            }
            _ => {}
        }

        if s == State::Incoming {
            for i in 0..inputs.len() {
                if inputs[i].peek() {
                    service(i);
                }
            }
        }
    }
}

/// A node with only output pins.
pub struct Producer<T> {
    name: Named,
    signal: Arc<StateSignal>,
    outputs: Vec<Outpin<T>>,
    logic: Box<dyn Produce<T>>,
}

impl<T> Producer<T> {
    pub fn new(name: impl Into<String>, outs: usize, logic: impl Produce<T> + 'static) -> Self {
        let name = Named::new(name);
        let signal = Arc::new(StateSignal::new());
        let outputs = make_outpins(name.name(), outs);
        Self {
            name,
            signal,
            outputs,
            logic: Box::new(logic),
        }
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn outs(&self) -> usize {
        self.outputs.len()
    }

    /// Handle to the `n`-th output pin.
    pub fn output(&self, n: usize) -> Outpin<T> {
        self.outputs[n].clone()
    }

    /// Requests a transition to `Started`. Applied asynchronously by the
    /// node's own loop.
    pub fn start(&self) {
        self.signal.set(State::StartRequested);
    }

    /// Requests a transition to `Paused`.
    pub fn pause(&self) {
        self.signal.set(State::PauseRequested);
    }

    /// Requests the node to exit its execution loop.
    pub fn stop(&self) {
        self.signal.set(State::StopRequested);
    }

    pub(crate) fn signal(&self) -> Arc<StateSignal> {
        Arc::clone(&self.signal)
    }

    pub(crate) fn run(&mut self) {
        let Self {
            signal,
            outputs,
            logic,
            ..
        } = self;
        let outputs: &[Outpin<T>] = outputs;
        producing_loop(signal, || logic.produce(outputs));
    }
}

/// A node with only input pins.
pub struct Consumer<T> {
    name: Named,
    signal: Arc<StateSignal>,
    inputs: Vec<Inpin<T>>,
    logic: Box<dyn Consume<T>>,
}

impl<T> Consumer<T> {
    pub fn new(name: impl Into<String>, ins: usize, logic: impl Consume<T> + 'static) -> Self {
        let name = Named::new(name);
        let signal = Arc::new(StateSignal::new());
        let inputs = make_inpins(name.name(), ins, &signal);
        Self {
            name,
            signal,
            inputs,
            logic: Box::new(logic),
        }
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn ins(&self) -> usize {
        self.inputs.len()
    }

    /// Handle to the `n`-th input pin.
    pub fn input(&self, n: usize) -> Inpin<T> {
        self.inputs[n].clone()
    }

    pub fn start(&self) {
        self.signal.set(State::StartRequested);
    }

    pub fn pause(&self) {
        self.signal.set(State::PauseRequested);
    }

    pub fn stop(&self) {
        self.signal.set(State::StopRequested);
    }

    pub(crate) fn signal(&self) -> Arc<StateSignal> {
        Arc::clone(&self.signal)
    }

    pub(crate) fn run(&mut self) {
        let Self {
            signal,
            inputs,
            logic,
            ..
        } = self;
        let inputs: &[Inpin<T>] = inputs;
        consuming_loop(signal, inputs, |i| logic.ready(i, inputs));
    }
}

/// A node with both input and output pins. Runs the consumer loop verbatim;
/// it has no produce hook.
pub struct Transformer<T> {
    name: Named,
    signal: Arc<StateSignal>,
    inputs: Vec<Inpin<T>>,
    outputs: Vec<Outpin<T>>,
    logic: Box<dyn Transform<T>>,
}

impl<T> Transformer<T> {
    pub fn new(
        name: impl Into<String>,
        ins: usize,
        outs: usize,
        logic: impl Transform<T> + 'static,
    ) -> Self {
        let name = Named::new(name);
        let signal = Arc::new(StateSignal::new());
        let inputs = make_inpins(name.name(), ins, &signal);
        let outputs = make_outpins(name.name(), outs);
        Self {
            name,
            signal,
            inputs,
            outputs,
            logic: Box::new(logic),
        }
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn ins(&self) -> usize {
        self.inputs.len()
    }

    pub fn outs(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self, n: usize) -> Inpin<T> {
        self.inputs[n].clone()
    }

    pub fn output(&self, n: usize) -> Outpin<T> {
        self.outputs[n].clone()
    }

    pub fn start(&self) {
        self.signal.set(State::StartRequested);
    }

    pub fn pause(&self) {
        self.signal.set(State::PauseRequested);
    }

    pub fn stop(&self) {
        self.signal.set(State::StopRequested);
    }

    pub(crate) fn signal(&self) -> Arc<StateSignal> {
        Arc::clone(&self.signal)
    }

    pub(crate) fn run(&mut self) {
        let Self {
            signal,
            inputs,
            outputs,
            logic,
            ..
        } = self;
        let inputs: &[Inpin<T>] = inputs;
        let outputs: &[Outpin<T>] = outputs;
        consuming_loop(signal, inputs, |i| logic.ready(i, inputs, outputs));
    }
}

/// Closed set of node roles, so the graph can manage any node uniformly.
pub enum NodeKind<T> {
    Producer(Producer<T>),
    Consumer(Consumer<T>),
    Transformer(Transformer<T>),
}

impl<T> NodeKind<T> {
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Producer(n) => n.name(),
            NodeKind::Consumer(n) => n.name(),
            NodeKind::Transformer(n) => n.name(),
        }
    }

    /// Handle to the `n`-th output pin, if this role has one.
    pub fn output(&self, n: usize) -> Option<Outpin<T>> {
        match self {
            NodeKind::Producer(p) => p.outputs.get(n).cloned(),
            NodeKind::Transformer(t) => t.outputs.get(n).cloned(),
            NodeKind::Consumer(_) => None,
        }
    }

    /// Handle to the `n`-th input pin, if this role has one.
    pub fn input(&self, n: usize) -> Option<Inpin<T>> {
        match self {
            NodeKind::Consumer(c) => c.inputs.get(n).cloned(),
            NodeKind::Transformer(t) => t.inputs.get(n).cloned(),
            NodeKind::Producer(_) => None,
        }
    }

    pub(crate) fn signal(&self) -> Arc<StateSignal> {
        match self {
            NodeKind::Producer(n) => n.signal(),
            NodeKind::Consumer(n) => n.signal(),
            NodeKind::Transformer(n) => n.signal(),
        }
    }

    pub(crate) fn run(&mut self) {
        match self {
            NodeKind::Producer(n) => n.run(),
            NodeKind::Consumer(n) => n.run(),
            NodeKind::Transformer(n) => n.run(),
        }
    }
}

impl<T> From<Producer<T>> for NodeKind<T> {
    fn from(node: Producer<T>) -> Self {
        NodeKind::Producer(node)
    }
}

impl<T> From<Consumer<T>> for NodeKind<T> {
    fn from(node: Consumer<T>) -> Self {
        NodeKind::Consumer(node)
    }
}

impl<T> From<Transformer<T>> for NodeKind<T> {
    fn from(node: Transformer<T>) -> Self {
        NodeKind::Transformer(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    struct CountUp {
        next: u64,
    }

    impl Produce<u64> for CountUp {
        fn produce(&mut self, outputs: &[Outpin<u64>]) {
            // Pace the loop so a test can pause it mid-run.
            thread::sleep(Duration::from_millis(1));
            if outputs[0].push(crate::packet::Packet::new(self.next)).is_ok() {
                self.next += 1;
            }
        }
    }

    #[test]
    fn test_pins_are_auto_named() {
        let p = Producer::new("gen", 2, CountUp { next: 0 });
        assert_eq!(p.output(0).name(), "gen_out0");
        assert_eq!(p.output(1).name(), "gen_out1");

        struct Sink;
        impl Consume<u64> for Sink {
            fn ready(&mut self, _pin: usize, _inputs: &[Inpin<u64>]) {}
        }
        let c = Consumer::new("sink", 1, Sink);
        assert_eq!(c.input(0).name(), "sink_in0");
    }

    #[test]
    fn test_producer_loop_stops_from_paused_wait() {
        let mut node = Producer::new("gen", 1, CountUp { next: 0 });
        let signal = node.signal();
        let worker = thread::spawn(move || node.run());

        // Loop entry settles Started; park it, then stop it while parked.
        thread::sleep(Duration::from_millis(10));
        signal.set(State::PauseRequested);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(signal.get(), State::Paused);

        signal.set(State::StopRequested);
        worker.join().unwrap();
    }

    #[test]
    fn test_stop_requested_before_loop_entry_is_honored() {
        // A stop can land between thread spawn and the loop's entry settle;
        // the loop must exit instead of overwriting the request.
        let mut node = Producer::new("gen", 1, CountUp { next: 0 });
        let signal = node.signal();
        signal.set(State::StopRequested);
        let worker = thread::spawn(move || node.run());
        worker.join().unwrap();

        struct Sink;
        impl Consume<u64> for Sink {
            fn ready(&mut self, _pin: usize, _inputs: &[Inpin<u64>]) {}
        }
        let mut node = Consumer::new("sink", 1, Sink);
        let signal = node.signal();
        signal.set(State::StopRequested);
        let worker = thread::spawn(move || node.run());
        worker.join().unwrap();
    }

    #[test]
    fn test_consumer_loop_stops_from_idle_wait() {
        struct Sink;
        impl Consume<u64> for Sink {
            fn ready(&mut self, _pin: usize, _inputs: &[Inpin<u64>]) {}
        }
        let mut node = Consumer::new("sink", 1, Sink);
        let signal = node.signal();
        let worker = thread::spawn(move || node.run());

        // The consumer idles in the Started wait; no packet is needed for
        // stop to take effect.
        thread::sleep(Duration::from_millis(10));
        signal.set(State::StopRequested);
        worker.join().unwrap();
    }
}
