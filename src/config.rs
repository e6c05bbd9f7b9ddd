//! Declarative wiring configuration.
//!
//! A [`GraphConfig`] lists connections between pins of already-added nodes
//! using `"<node>.out<n>"` / `"<node>.in<n>"` endpoint strings, for example:
//!
//! ```json
//! {
//!   "connections": [
//!     { "from": "ticker.out0", "to": "doubler.in0", "max_length": 8 },
//!     { "from": "doubler.out0", "to": "printer.in0" }
//!   ]
//! }
//! ```
//!
//! Capacity fields default to `0`, meaning unbounded.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// One directed connection between an output pin and an input pin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Producing endpoint, `"<node>.out<n>"`.
    pub from: String,
    /// Consuming endpoint, `"<node>.in<n>"`.
    pub to: String,
    /// Pipe packet-count cap, `0` for unbounded.
    #[serde(default)]
    pub max_length: usize,
    /// Pipe cumulative-weight cap, `0` for unbounded.
    #[serde(default)]
    pub max_weight: usize,
}

impl Connection {
    /// Parses the producing endpoint into `(node, pin_index)`.
    pub fn from_endpoint(&self) -> GraphResult<(&str, usize)> {
        parse_endpoint(&self.from, "out")
    }

    /// Parses the consuming endpoint into `(node, pin_index)`.
    pub fn to_endpoint(&self) -> GraphResult<(&str, usize)> {
        parse_endpoint(&self.to, "in")
    }
}

/// Wiring description for a graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl GraphConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> GraphResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every endpoint string for well-formedness and rejects input
    /// pins that appear more than once (an input pin holds at most one pipe,
    /// a second connection would silently replace the first).
    pub fn validate(&self) -> GraphResult<()> {
        let mut seen_inputs: Vec<&str> = Vec::new();
        for conn in &self.connections {
            conn.from_endpoint()?;
            conn.to_endpoint()?;
            if seen_inputs.contains(&conn.to.as_str()) {
                return Err(GraphError::BadConfig {
                    message: format!("input endpoint '{}' connected twice", conn.to),
                });
            }
            seen_inputs.push(&conn.to);
        }
        Ok(())
    }
}

fn parse_endpoint<'a>(raw: &'a str, prefix: &str) -> GraphResult<(&'a str, usize)> {
    let bad = || GraphError::BadConfig {
        message: format!("malformed endpoint '{raw}', expected '<node>.{prefix}<n>'"),
    };
    let (node, port) = raw.split_once('.').ok_or_else(bad)?;
    if node.is_empty() {
        return Err(bad());
    }
    let index = port
        .strip_prefix(prefix)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(bad)?;
    Ok((node, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_defaults() {
        let config = GraphConfig::from_json(
            r#"{
                "connections": [
                    { "from": "gen.out0", "to": "sink.in0", "max_length": 4 },
                    { "from": "gen.out1", "to": "sink.in1" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.connections[0].from_endpoint().unwrap(), ("gen", 0));
        assert_eq!(config.connections[0].max_length, 4);
        assert_eq!(config.connections[1].max_length, 0);
        assert_eq!(config.connections[1].to_endpoint().unwrap(), ("sink", 1));
    }

    #[test]
    fn test_malformed_endpoints_rejected() {
        for raw in ["gen", "gen.", ".out0", "gen.out", "gen.in0", "gen.outx"] {
            let conn = Connection {
                from: raw.to_string(),
                to: "sink.in0".to_string(),
                max_length: 0,
                max_weight: 0,
            };
            assert!(conn.from_endpoint().is_err(), "accepted '{raw}'");
        }
    }

    #[test]
    fn test_duplicate_input_endpoint_rejected() {
        let result = GraphConfig::from_json(
            r#"{
                "connections": [
                    { "from": "a.out0", "to": "sink.in0" },
                    { "from": "b.out0", "to": "sink.in0" }
                ]
            }"#,
        );
        assert!(matches!(result, Err(GraphError::BadConfig { .. })));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = GraphConfig::from_json("{}").unwrap();
        assert!(config.connections.is_empty());
    }
}
