//! Mutable display names for graph objects.
//!
//! Every building block in the crate carries a `Named` by composition: nodes,
//! pins, pipes and the graph itself. Names exist for diagnostics and for the
//! auto-generated pipe names (`"<producer>_to_<consumer>"`); nothing in the
//! engine keys off them except the graph's node lookup.

/// A mutable display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    name: String,
}

impl Named {
    /// Creates a new name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The current name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the name. Owners rename freely; pipes do this on every
    /// (re)connection.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename() {
        let mut n = Named::new("gen0");
        assert_eq!(n.name(), "gen0");
        n.rename("gen0_to_sink0");
        assert_eq!(n.name(), "gen0_to_sink0");
    }
}
