//! Ready-made node callbacks for common graph roles.
//!
//! These are small, composable building blocks: paced generation, fan-out,
//! text output, and elementwise arithmetic. They double as worked examples of
//! the [`Produce`](crate::node::Produce), [`Consume`](crate::node::Consume)
//! and [`Transform`](crate::node::Transform) traits.

pub mod generic;
pub mod math;

pub use generic::{Generator, Ostreamer, Tee};
pub use math::Adder;
