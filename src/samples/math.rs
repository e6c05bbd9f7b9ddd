//! Arithmetic transformers.

use std::ops::Add;
use std::time::SystemTime;

use tracing::debug;

use crate::node::Transform;
use crate::packet::Packet;
use crate::pin::{Inpin, Outpin};

/// N-ary adder: holds one packet per input pin and, once every pin has
/// contributed, pushes their sum to the first output.
///
/// Inputs are matched positionally, one packet from each pin per sum. The
/// sum carries the latest deadline of its contributors when all of them had
/// one, otherwise none.
pub struct Adder<T> {
    pending: Vec<Option<Packet<T>>>,
}

impl<T> Adder<T> {
    pub fn new(ins: usize) -> Self {
        Self {
            pending: (0..ins).map(|_| None).collect(),
        }
    }
}

impl<T> Transform<T> for Adder<T>
where
    T: Add<Output = T> + Send,
{
    fn ready(&mut self, _pin: usize, inputs: &[Inpin<T>], outputs: &[Outpin<T>]) {
        loop {
            for (slot, input) in self.pending.iter_mut().zip(inputs) {
                if slot.is_none() {
                    *slot = input.pop();
                }
            }
            if self.pending.is_empty() || self.pending.iter().any(|slot| slot.is_none()) {
                return;
            }

            let mut latest: Option<SystemTime> = None;
            let mut all_dated = true;
            let mut sum: Option<T> = None;
            for packet in self.pending.iter_mut().filter_map(Option::take) {
                match packet.consumption_time() {
                    Some(when) => latest = Some(latest.map_or(when, |l| l.max(when))),
                    None => all_dated = false,
                }
                let payload = packet.into_payload();
                sum = Some(match sum {
                    Some(acc) => acc + payload,
                    None => payload,
                });
            }

            let Some(sum) = sum else { return };
            let packet = match latest.filter(|_| all_dated) {
                Some(when) => Packet::at(sum, when),
                None => Packet::new(sum),
            };
            if outputs[0].push(packet).is_err() {
                debug!(pin = %outputs[0].name(), "sum dropped, pipe at capacity");
            }
        }
    }
}
