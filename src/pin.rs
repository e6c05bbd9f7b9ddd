//! Node inlets and outlets, and the connect/disconnect/steal protocol.
//!
//! Pins are cheap-to-clone handles: user code, the graph, and the owning
//! node's worker thread may all hold one, which is what allows connecting and
//! disconnecting at any time regardless of run state. A pin references at
//! most one pipe.
//!
//! The protocol reproduces a deliberate loss-minimization rule: disconnecting
//! one side never destroys the pipe while the other side still holds it, and
//! stealing an output pin away from its previous consumer leaves that
//! consumer with the (now one-ended) pipe so already-queued packets can still
//! be drained.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::packet::Packet;
use crate::pipe::{InpinLink, OutpinLink, Pipe, PinSlot, SharedPipe, Weigher};
use crate::state::StateSignal;

/// A node outlet. Packets leave the owning node through here.
#[derive(Debug)]
pub struct Outpin<T> {
    name: Arc<String>,
    slot: PinSlot<T>,
}

/// A node inlet. Carries the owning node's state signal so a connected
/// producer can notify it on packet arrival.
#[derive(Debug)]
pub struct Inpin<T> {
    name: Arc<String>,
    slot: PinSlot<T>,
    signal: Arc<StateSignal>,
}

impl<T> Clone for Outpin<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Clone for Inpin<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            slot: Arc::clone(&self.slot),
            signal: Arc::clone(&self.signal),
        }
    }
}

impl<T> Outpin<T> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::new(name.into()),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Connects this pin to an input pin. Convenience form: delegates to
    /// [`Inpin::connect`].
    pub fn connect(&self, inpin: &Inpin<T>, max_length: usize, max_weight: usize) {
        inpin.connect(self, max_length, max_weight);
    }

    /// Releases this pin's pipe reference. The consuming side keeps the pipe
    /// and can still drain queued packets.
    pub fn disconnect(&self) {
        let mut slot = self.slot.lock().unwrap();
        if let Some(pipe) = slot.take() {
            pipe.lock().unwrap().clear_output_end();
            debug!(pin = %self.name, "output pin disconnected");
        }
    }

    /// Moves a packet into the pipe.
    ///
    /// `Ok(())` means the pipe accepted the packet; `Err` returns it intact
    /// when this pin is unconnected or the pipe is at capacity. The connected
    /// consumer is notified exactly once per accepted push, after the pipe
    /// lock has been released, and never for a rejected one.
    pub fn push(&self, packet: Packet<T>) -> Result<(), Packet<T>> {
        let link = {
            let slot = self.slot.lock().unwrap();
            let pipe = match slot.as_ref() {
                Some(pipe) => pipe,
                None => return Err(packet),
            };
            let mut pipe = pipe.lock().unwrap();
            match pipe.push(packet) {
                Ok(()) => pipe.input_link(),
                Err(packet) => return Err(packet),
            }
        };
        if let Some(link) = link {
            link.notify();
        }
        Ok(())
    }

    /// Updates the connected pipe's capacity caps. No-op when unconnected.
    pub fn set_caps(&self, max_length: usize, max_weight: usize) {
        if let Some(pipe) = self.pipe() {
            pipe.lock().unwrap().set_caps(max_length, max_weight);
        }
    }

    /// Replaces the connected pipe's weight measure. No-op when unconnected.
    pub fn set_weigher(&self, weigher: Weigher<T>) {
        if let Some(pipe) = self.pipe() {
            pipe.lock().unwrap().set_weigher(weigher);
        }
    }

    pub(crate) fn pipe(&self) -> Option<SharedPipe<T>> {
        self.slot.lock().unwrap().clone()
    }

    fn link(&self) -> OutpinLink<T> {
        OutpinLink {
            name: self.name.as_ref().clone(),
            slot: Arc::downgrade(&self.slot),
        }
    }
}

impl<T> Inpin<T> {
    pub(crate) fn new(name: impl Into<String>, signal: Arc<StateSignal>) -> Self {
        Self {
            name: Arc::new(name.into()),
            slot: Arc::new(Mutex::new(None)),
            signal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Connects this pin to an output pin with a pipe.
    ///
    /// If the output pin already has a pipe it is silently stolen from its
    /// previous consumer. No error is raised; the previous consumer keeps
    /// the orphaned pipe and its queued packets. If this input pin already
    /// owns a pipe it is reused: the output pin attaches to it (displacing
    /// any previous producing endpoint), the pipe is renamed
    /// `"<out>_to_<in>"`, and non-zero caps are applied. Otherwise a fresh
    /// pipe is created with the given caps (`0` = unbounded).
    pub fn connect(&self, outpin: &Outpin<T>, max_length: usize, max_weight: usize) {
        let mut displaced = None;
        let reused_pipe;
        {
            let mut out_slot = outpin.slot.lock().unwrap();
            if let Some(old) = out_slot.take() {
                let mut old = old.lock().unwrap();
                old.clear_output_end();
                debug!(
                    pipe = %old.name(),
                    stolen_by = %self.name,
                    "output pin stolen from its previous consumer"
                );
            }

            let mut this_slot = self.slot.lock().unwrap();
            let pipe_name = format!("{}_to_{}", outpin.name(), self.name());
            match this_slot.as_ref() {
                Some(existing) => {
                    let mut pipe = existing.lock().unwrap();
                    displaced = pipe.replace_output_end(outpin.link());
                    pipe.set_input_end(self.link());
                    pipe.rename(pipe_name);
                    if max_length != 0 {
                        pipe.cap_length(max_length);
                    }
                    if max_weight != 0 {
                        pipe.cap_weight(max_weight);
                    }
                    *out_slot = Some(Arc::clone(existing));
                    reused_pipe = Some(Arc::clone(existing));
                }
                None => {
                    let mut pipe = Pipe::new(pipe_name, max_length, max_weight);
                    pipe.set_output_end(outpin.link());
                    pipe.set_input_end(self.link());
                    let shared = Arc::new(Mutex::new(pipe));
                    *this_slot = Some(Arc::clone(&shared));
                    *out_slot = Some(shared);
                    reused_pipe = None;
                }
            }
        }

        // A reused pipe may have displaced another producer; detach it now
        // that no pipe or slot lock is held, and only if its slot still
        // references this very pipe.
        if let (Some(stale), Some(pipe)) = (displaced.take(), reused_pipe) {
            if let Some(slot) = stale.slot.upgrade() {
                let mut guard = slot.lock().unwrap();
                let still_attached = guard
                    .as_ref()
                    .map_or(false, |p| Arc::ptr_eq(p, &pipe));
                if still_attached {
                    *guard = None;
                    debug!(pin = %stale.name, "previous producer displaced");
                }
            }
        }
        debug!(outpin = %outpin.name(), inpin = %self.name, "pins connected");
    }

    /// Releases this pin's pipe reference. The producing side keeps the pipe;
    /// its pushes will still be accepted but no longer notify anyone.
    pub fn disconnect(&self) {
        let mut slot = self.slot.lock().unwrap();
        if let Some(pipe) = slot.take() {
            pipe.lock().unwrap().clear_input_end();
            debug!(pin = %self.name, "input pin disconnected");
        }
    }

    /// Whether a connected pipe holds at least one packet. `false` when
    /// unconnected.
    pub fn peek(&self) -> bool {
        match self.slot.lock().unwrap().as_ref() {
            Some(pipe) => !pipe.lock().unwrap().is_empty(),
            None => false,
        }
    }

    /// Extracts the next packet from the connected pipe; `None` when
    /// unconnected or empty.
    pub fn pop(&self) -> Option<Packet<T>> {
        // Clone the Arc out of the slot so the slot lock is released before
        // the pipe lock is taken.
        let pipe = self.pipe()?;
        let packet = pipe.lock().unwrap().pop();
        packet
    }

    /// Arrival notification: transitions the owning node's state from
    /// `Started` to `Incoming`, a no-op in any other state. Invoked by the
    /// connected producing pin after each accepted push.
    pub fn incoming(&self) {
        self.signal.mark_incoming_if_started();
    }

    /// Updates the connected pipe's capacity caps. No-op when unconnected.
    pub fn set_caps(&self, max_length: usize, max_weight: usize) {
        if let Some(pipe) = self.pipe() {
            pipe.lock().unwrap().set_caps(max_length, max_weight);
        }
    }

    /// Replaces the connected pipe's weight measure. No-op when unconnected.
    pub fn set_weigher(&self, weigher: Weigher<T>) {
        if let Some(pipe) = self.pipe() {
            pipe.lock().unwrap().set_weigher(weigher);
        }
    }

    pub(crate) fn pipe(&self) -> Option<SharedPipe<T>> {
        self.slot.lock().unwrap().clone()
    }

    fn link(&self) -> InpinLink {
        InpinLink {
            name: self.name.as_ref().clone(),
            signal: Arc::clone(&self.signal),
        }
    }
}
