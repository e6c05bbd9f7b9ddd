//! Error types for graph management.
//!
//! Only programming-contract violations surface as errors. Ordinary runtime
//! conditions (a full pipe, an empty pipe, an unconnected pin) are local
//! `Result<(), Packet<T>>` / `Option` / `bool` outcomes on the hot path and
//! never reach this type.

use thiserror::Error;

/// Graph-level contract violations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("node not found: {name}")]
    UnknownNode { name: String },

    #[error("duplicate node name: {name}")]
    DuplicateName { name: String },

    #[error("node '{name}' still has a live worker thread")]
    NodeRunning { name: String },

    #[error("node '{name}' has no {direction} pin {pin}")]
    UnknownPin {
        name: String,
        direction: &'static str,
        pin: usize,
    },

    #[error("invalid graph configuration: {message}")]
    BadConfig { message: String },

    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
