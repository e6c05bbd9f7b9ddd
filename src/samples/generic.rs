//! Domain-neutral producers and consumers.

use std::fmt::Display;
use std::io::Write;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::node::{Consume, Produce, Transform};
use crate::packet::{Consumable, Packet};
use crate::pin::{Inpin, Outpin};
use crate::timer::MonotonousTimer;

/// Paced producer: on each tick of a fixed-period timer it calls a closure
/// for a fresh value and pushes one packet per output pin.
///
/// With a `lifetime`, each packet carries a consumption deadline of tick
/// time plus that duration. A push rejected by a full pipe drops the packet;
/// a paced source has no use for stale retries.
pub struct Generator<F> {
    timer: MonotonousTimer,
    make: F,
    lifetime: Option<Duration>,
}

impl<F> Generator<F> {
    pub fn new(period: Duration, make: F) -> Self {
        Self {
            timer: MonotonousTimer::new(period),
            make,
            lifetime: None,
        }
    }

    /// Stamps every produced packet with a deadline of tick time plus
    /// `lifetime`.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }
}

impl<T, F> Produce<T> for Generator<F>
where
    T: Clone,
    F: FnMut() -> T + Send,
{
    fn produce(&mut self, outputs: &[Outpin<T>]) {
        let tick = self.timer.wait();
        let value = (self.make)();
        for out in outputs {
            let packet = match self.lifetime {
                Some(lifetime) => Packet::at(value.clone(), tick + lifetime),
                None => Packet::new(value.clone()),
            };
            if out.push(packet).is_err() {
                debug!(pin = %out.name(), "packet dropped, pipe at capacity");
            }
        }
    }
}

/// Text sink: writes each payload as one line to the wrapped writer.
///
/// Deadlines are honored here, at the point of consumption: a packet due in
/// the future is held (the worker thread sleeps) until its time, an expired
/// one is discarded.
pub struct Ostreamer<W> {
    sink: W,
}

impl<W> Ostreamer<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Gives back the wrapped writer.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<T, W> Consume<T> for Ostreamer<W>
where
    T: Display,
    W: Write + Send,
{
    fn ready(&mut self, pin: usize, inputs: &[Inpin<T>]) {
        while let Some(packet) = inputs[pin].pop() {
            match packet.deadline_state(SystemTime::now()) {
                Consumable::Now => {}
                Consumable::At(when) => {
                    if let Ok(until) = when.duration_since(SystemTime::now()) {
                        thread::sleep(until);
                    }
                }
                Consumable::Expired => {
                    debug!(pin = %inputs[pin].name(), "expired packet discarded");
                    continue;
                }
            }
            if writeln!(self.sink, "{}", packet.payload()).is_err() {
                warn!(pin = %inputs[pin].name(), "write to sink failed");
            }
        }
    }
}

/// Fan-out transformer: every packet read from any input is duplicated to
/// all outputs, deadline included.
pub struct Tee;

impl<T: Clone> Transform<T> for Tee {
    fn ready(&mut self, pin: usize, inputs: &[Inpin<T>], outputs: &[Outpin<T>]) {
        while let Some(packet) = inputs[pin].pop() {
            let deadline = packet.consumption_time();
            let payload = packet.into_payload();
            for out in outputs {
                let copy = match deadline {
                    Some(when) => Packet::at(payload.clone(), when),
                    None => Packet::new(payload.clone()),
                };
                if out.push(copy).is_err() {
                    debug!(pin = %out.name(), "packet dropped, pipe at capacity");
                }
            }
        }
    }
}
