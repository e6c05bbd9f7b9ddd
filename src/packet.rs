//! The unit of streamed data.
//!
//! A packet wraps one payload value and an optional consumption deadline. It
//! is a move-only value: at any instant exactly one holder owns it (a pipe
//! slot, a pin in transit, or a node callback). Pipes and pins hand packets
//! over by value and return them by value when a push is rejected, so the
//! single-owner rule is enforced by the type system rather than convention.

use std::time::SystemTime;

/// One unit of payload data flowing through the graph.
#[derive(Debug)]
pub struct Packet<T> {
    payload: T,
    consumption_time: Option<SystemTime>,
}

/// Where a packet stands relative to its consumption deadline.
///
/// Deadline enforcement is the concrete consumer's responsibility, not the
/// scheduling loop's: a consumer that sees `At(t)` is expected to wait until
/// `t` before consuming, and one that sees `Expired` discards the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumable {
    /// No deadline, or the deadline is now: consume immediately.
    Now,
    /// The deadline is in the future; consume at the given time.
    At(SystemTime),
    /// The deadline has passed; discard unconsumed.
    Expired,
}

impl<T> Packet<T> {
    /// Creates a packet with no consumption deadline.
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            consumption_time: None,
        }
    }

    /// Creates a packet to be consumed at `when`.
    pub fn at(payload: T, when: SystemTime) -> Self {
        Self {
            payload,
            consumption_time: Some(when),
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    /// Consumes the packet, yielding its payload.
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// The consumption deadline, if one was assigned.
    pub fn consumption_time(&self) -> Option<SystemTime> {
        self.consumption_time
    }

    /// Classifies the packet against the given clock reading.
    pub fn deadline_state(&self, now: SystemTime) -> Consumable {
        match self.consumption_time {
            None => Consumable::Now,
            Some(when) if when <= now => {
                if when == now {
                    Consumable::Now
                } else {
                    Consumable::Expired
                }
            }
            Some(when) => Consumable::At(when),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_packet_without_deadline_is_consumable_now() {
        let pkt = Packet::new(7u32);
        assert_eq!(pkt.deadline_state(SystemTime::now()), Consumable::Now);
        assert_eq!(pkt.into_payload(), 7);
    }

    #[test]
    fn test_future_deadline() {
        let now = SystemTime::now();
        let when = now + Duration::from_secs(5);
        let pkt = Packet::at("data", when);
        assert_eq!(pkt.deadline_state(now), Consumable::At(when));
        assert_eq!(pkt.consumption_time(), Some(when));
    }

    #[test]
    fn test_past_deadline_is_expired() {
        let now = SystemTime::now();
        let pkt = Packet::at("late", now - Duration::from_secs(1));
        assert_eq!(pkt.deadline_state(now), Consumable::Expired);
    }
}
