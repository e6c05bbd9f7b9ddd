//! The bounded handoff queue connecting two pins.
//!
//! A pipe is a FIFO of packets with two capacity caps: a packet count
//! (`max_length`) and a cumulative weight (`max_weight`), each `0` meaning
//! unbounded. `push` never blocks; when either cap would be exceeded it
//! returns the packet to the caller, which is the whole backpressure
//! mechanism: the producer retries later or drops.
//!
//! Both connected pins share one pipe through [`SharedPipe`]. The pipe stays
//! alive as long as either endpoint still holds its reference, even after the
//! other side disconnected, so in-flight packets are never dropped by a
//! disconnect. Every operation is one critical section; nothing is called
//! outside the pipe while its lock is held (the post-push notification runs
//! after the lock is released, see the pin module).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use crate::named::Named;
use crate::packet::Packet;
use crate::state::StateSignal;

/// Reference-counted, lock-guarded pipe handle shared by both endpoints.
pub type SharedPipe<T> = Arc<Mutex<Pipe<T>>>;

/// The pipe-reference slot inside a pin: at most one pipe per pin.
pub(crate) type PinSlot<T> = Arc<Mutex<Option<SharedPipe<T>>>>;

/// Weight measure applied to packets as they enter a pipe.
pub type Weigher<T> = fn(&Packet<T>) -> usize;

fn unit_weight<T>(_: &Packet<T>) -> usize {
    1
}

/// Handle to the consuming endpoint, kept by the pipe so the producing pin
/// can notify the consumer's node after a successful push.
#[derive(Debug, Clone)]
pub(crate) struct InpinLink {
    pub(crate) name: String,
    pub(crate) signal: Arc<StateSignal>,
}

impl InpinLink {
    /// Fires the consumer-side arrival notification.
    pub(crate) fn notify(&self) {
        self.signal.mark_incoming_if_started();
    }
}

/// Handle to the producing endpoint. The weak slot backlink lets a reused
/// pipe detach its previous producer, keeping the invariant that an output
/// pin's pipe always names that pin as its producing end.
#[derive(Debug, Clone)]
pub(crate) struct OutpinLink<T> {
    pub(crate) name: String,
    pub(crate) slot: Weak<Mutex<Option<SharedPipe<T>>>>,
}

/// A bounded FIFO queue of packets connecting one output pin to one input pin.
#[derive(Debug)]
pub struct Pipe<T> {
    name: Named,
    // Weight is recorded at push time so a later weigher change cannot
    // desynchronize the running total.
    queue: VecDeque<(Packet<T>, usize)>,
    weight: usize,
    max_length: usize,
    max_weight: usize,
    weigher: Weigher<T>,
    output_end: Option<OutpinLink<T>>,
    input_end: Option<InpinLink>,
}

impl<T> Pipe<T> {
    /// Creates an empty pipe. A cap of `0` means unbounded.
    pub fn new(name: impl Into<String>, max_length: usize, max_weight: usize) -> Self {
        Self {
            name: Named::new(name),
            queue: VecDeque::new(),
            weight: 0,
            max_length,
            max_weight,
            weigher: unit_weight,
            output_end: None,
            input_end: None,
        }
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    /// Renames the pipe. Invoked on every (re)connection with the
    /// `"<producer>_to_<consumer>"` convention.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name.rename(name);
    }

    /// Appends a packet if both capacity constraints hold after insertion.
    /// Non-blocking: on rejection the packet is returned intact and ownership
    /// stays with the caller.
    pub fn push(&mut self, packet: Packet<T>) -> Result<(), Packet<T>> {
        if self.max_length != 0 && self.queue.len() + 1 > self.max_length {
            return Err(packet);
        }
        let w = (self.weigher)(&packet);
        if self.max_weight != 0 && self.weight + w > self.max_weight {
            return Err(packet);
        }
        self.queue.push_back((packet, w));
        self.weight += w;
        Ok(())
    }

    /// Removes and returns the front packet, if any. Non-blocking.
    pub fn pop(&mut self) -> Option<Packet<T>> {
        let (packet, w) = self.queue.pop_front()?;
        self.weight -= w;
        Some(packet)
    }

    /// Number of queued packets.
    pub fn length(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Caps the packet count. Never evicts: an over-cap queue drains
    /// naturally as the consumer pops.
    pub fn cap_length(&mut self, max_length: usize) {
        self.max_length = max_length;
    }

    /// Caps the cumulative weight. Never evicts.
    pub fn cap_weight(&mut self, max_weight: usize) {
        self.max_weight = max_weight;
    }

    /// Updates both capacity caps.
    pub fn set_caps(&mut self, max_length: usize, max_weight: usize) {
        self.max_length = max_length;
        self.max_weight = max_weight;
    }

    /// Replaces the weight measure. Applies to packets pushed from now on;
    /// packets already queued keep the weight recorded at push time.
    pub fn set_weigher(&mut self, weigher: Weigher<T>) {
        self.weigher = weigher;
    }

    pub(crate) fn set_output_end(&mut self, link: OutpinLink<T>) {
        self.output_end = Some(link);
    }

    /// Installs a new producing endpoint, returning the one it displaces.
    pub(crate) fn replace_output_end(&mut self, link: OutpinLink<T>) -> Option<OutpinLink<T>> {
        self.output_end.replace(link)
    }

    pub(crate) fn clear_output_end(&mut self) {
        self.output_end = None;
    }

    pub(crate) fn set_input_end(&mut self, link: InpinLink) {
        self.input_end = Some(link);
    }

    pub(crate) fn clear_input_end(&mut self) {
        self.input_end = None;
    }

    /// Clone of the consuming endpoint link, if that side is still connected.
    pub(crate) fn input_link(&self) -> Option<InpinLink> {
        self.input_end.clone()
    }

    /// Name of the producing pin, if that side is still connected.
    pub fn output_name(&self) -> Option<&str> {
        self.output_end.as_ref().map(|l| l.name.as_str())
    }

    /// Name of the consuming pin, if that side is still connected.
    pub fn input_name(&self) -> Option<&str> {
        self.input_end.as_ref().map(|l| l.name.as_str())
    }
}
