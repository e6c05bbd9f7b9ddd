//! A small dataflow execution engine.
//!
//! Data travels as [`Packet`]s through a directed graph of processing nodes.
//! Each node runs its own execution loop on a dedicated worker thread and
//! exchanges packets with its neighbors through bounded FIFO [`Pipe`]s
//! attached to named pins. Producers push without blocking (a full pipe
//! rejects the packet back to them), consumers are woken by per-push
//! notifications, and the whole graph is started, paused, and stopped as a
//! unit through [`Graph`].
//!
//! ```no_run
//! use std::time::Duration;
//! use flowgraph::{Graph, GraphConfig};
//! use flowgraph::samples::{Generator, Ostreamer};
//!
//! let mut graph = Graph::new("hello");
//! let mut n = 0u32;
//! graph
//!     .add_producer("ticker", 1, Generator::new(Duration::from_millis(100), move || {
//!         n += 1;
//!         n
//!     }))
//!     .unwrap();
//! graph
//!     .add_consumer("printer", 1, Ostreamer::new(std::io::stdout()))
//!     .unwrap();
//!
//! let config = GraphConfig::from_json(
//!     r#"{ "connections": [ { "from": "ticker.out0", "to": "printer.in0", "max_length": 8 } ] }"#,
//! )
//! .unwrap();
//! graph.wire(&config).unwrap();
//!
//! graph.start();
//! std::thread::sleep(Duration::from_secs(1));
//! graph.stop();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod named;
pub mod node;
pub mod packet;
pub mod pin;
pub mod pipe;
pub mod samples;
pub mod state;
pub mod timer;

pub use config::{Connection, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use graph::Graph;
pub use node::{Consume, Consumer, NodeKind, Produce, Producer, Transform, Transformer};
pub use packet::{Consumable, Packet};
pub use pin::{Inpin, Outpin};
pub use pipe::{Pipe, SharedPipe, Weigher};
pub use state::{State, StateSignal};
pub use timer::MonotonousTimer;
