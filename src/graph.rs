//! Graph orchestration: node ownership and worker-thread lifecycle.
//!
//! The graph owns its nodes and binds state transitions to thread lifetime:
//! `start` spawns one worker thread per node that has none, `stop` signals
//! every node and then joins every thread. A worker thread runs the node's
//! role loop and nothing else; it is never forcibly terminated.
//!
//! Requests are applied to the whole managed set as one batch; this version
//! offers no per-node staggering. Structural operations (add, remove,
//! connect, disconnect) are legal at any time regardless of run state; only
//! `remove` is gated on the node's worker having terminated.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};
use crate::named::Named;
use crate::node::{NodeKind, Consumer, Producer, Transformer};
use crate::pin::{Inpin, Outpin};
use crate::state::{State, StateSignal};

struct ManagedNode<T> {
    name: String,
    body: Arc<Mutex<NodeKind<T>>>,
    signal: Arc<StateSignal>,
    // Pin handles cloned at add time, so lookups never contend with the
    // worker thread, which holds the body lock for its entire run.
    inputs: Vec<Inpin<T>>,
    outputs: Vec<Outpin<T>>,
    worker: Option<JoinHandle<()>>,
}

/// Owner and orchestrator of a node set.
pub struct Graph<T> {
    name: Named,
    nodes: Vec<ManagedNode<T>>,
}

impl<T: Send + 'static> Graph<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Named::new(name),
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node to the managed set. Node names must be unique, they are
    /// the lookup key for pin access and removal.
    pub fn add(&mut self, node: impl Into<NodeKind<T>>) -> GraphResult<()> {
        let node = node.into();
        let name = node.name().to_string();
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(GraphError::DuplicateName { name });
        }

        let signal = node.signal();
        let inputs = (0..).map_while(|i| node.input(i)).collect();
        let outputs = (0..).map_while(|i| node.output(i)).collect();
        debug!(graph = %self.name.name(), node = %name, "node added");
        self.nodes.push(ManagedNode {
            name,
            body: Arc::new(Mutex::new(node)),
            signal,
            inputs,
            outputs,
            worker: None,
        });
        Ok(())
    }

    /// Removes a node and returns it. Rejected while the node's worker
    /// thread is live: stop the graph first.
    pub fn remove(&mut self, name: &str) -> GraphResult<NodeKind<T>> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| GraphError::UnknownNode {
                name: name.to_string(),
            })?;

        if let Some(worker) = &self.nodes[idx].worker {
            if !worker.is_finished() {
                return Err(GraphError::NodeRunning {
                    name: name.to_string(),
                });
            }
        }

        let mut managed = self.nodes.remove(idx);
        if let Some(worker) = managed.worker.take() {
            join_worker(&managed.name, worker);
        }
        match Arc::try_unwrap(managed.body) {
            Ok(body) => {
                debug!(graph = %self.name.name(), node = %name, "node removed");
                Ok(body.into_inner().unwrap())
            }
            Err(body) => {
                // The joined thread has dropped its clone; anything else
                // still holding the body means the node is not done. Put the
                // entry back untouched so later lookups still work.
                self.nodes.insert(
                    idx,
                    ManagedNode {
                        name: managed.name,
                        body,
                        signal: managed.signal,
                        inputs: managed.inputs,
                        outputs: managed.outputs,
                        worker: None,
                    },
                );
                Err(GraphError::NodeRunning {
                    name: name.to_string(),
                })
            }
        }
    }

    /// Handle to the `n`-th output pin of the named node.
    pub fn output_pin(&self, node: &str, n: usize) -> GraphResult<Outpin<T>> {
        let managed = self.find(node)?;
        managed
            .outputs
            .get(n)
            .cloned()
            .ok_or_else(|| GraphError::UnknownPin {
                name: node.to_string(),
                direction: "output",
                pin: n,
            })
    }

    /// Handle to the `n`-th input pin of the named node.
    pub fn input_pin(&self, node: &str, n: usize) -> GraphResult<Inpin<T>> {
        let managed = self.find(node)?;
        managed
            .inputs
            .get(n)
            .cloned()
            .ok_or_else(|| GraphError::UnknownPin {
                name: node.to_string(),
                direction: "input",
                pin: n,
            })
    }

    /// Connects an output pin to an input pin. Legal in any run state.
    pub fn connect(
        &self,
        outpin: &Outpin<T>,
        inpin: &Inpin<T>,
        max_length: usize,
        max_weight: usize,
    ) {
        inpin.connect(outpin, max_length, max_weight);
    }

    /// Releases an output pin's pipe reference. The consuming side keeps the
    /// pipe and can still drain it.
    pub fn disconnect_output(&self, outpin: &Outpin<T>) {
        outpin.disconnect();
    }

    /// Releases an input pin's pipe reference. The producing side keeps the
    /// pipe.
    pub fn disconnect_input(&self, inpin: &Inpin<T>) {
        inpin.disconnect();
    }

    /// Applies a declarative wiring description to the managed nodes.
    pub fn wire(&self, config: &GraphConfig) -> GraphResult<()> {
        config.validate()?;
        for conn in &config.connections {
            let (from_node, out_idx) = conn.from_endpoint()?;
            let (to_node, in_idx) = conn.to_endpoint()?;
            let outpin = self.output_pin(from_node, out_idx)?;
            let inpin = self.input_pin(to_node, in_idx)?;
            inpin.connect(&outpin, conn.max_length, conn.max_weight);
            info!(
                graph = %self.name.name(),
                from = %conn.from,
                to = %conn.to,
                "wired connection"
            );
        }
        Ok(())
    }

    /// Requests every managed node to run, spawning one worker thread per
    /// node that has none. Eventually consistent: the settled transition
    /// happens on each node's own thread.
    pub fn start(&mut self) {
        info!(graph = %self.name.name(), "starting all nodes");
        for managed in &mut self.nodes {
            let live = managed
                .worker
                .as_ref()
                .map_or(false, |w| !w.is_finished());
            if live {
                managed.signal.set(State::StartRequested);
                continue;
            }
            if let Some(worker) = managed.worker.take() {
                join_worker(&managed.name, worker);
            }

            let body = Arc::clone(&managed.body);
            let name = managed.name.clone();
            let worker = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    debug!(node = %name, "worker thread started");
                    body.lock().unwrap().run();
                    debug!(node = %name, "worker thread finished");
                })
                .unwrap();
            managed.worker = Some(worker);
        }
    }

    /// Requests every managed node to pause. The loops freeze at their next
    /// checkpoint; node-internal progress is untouched.
    pub fn pause(&self) {
        info!(graph = %self.name.name(), "pausing all nodes");
        for managed in &self.nodes {
            managed.signal.set(State::PauseRequested);
        }
    }

    /// Requests every managed node to stop, then joins every worker thread.
    /// Cooperative but prompt: both blocking waits in the role loops wake on
    /// `StopRequested`.
    pub fn stop(&mut self) {
        info!(graph = %self.name.name(), "stopping all nodes");
        for managed in &self.nodes {
            managed.signal.set(State::StopRequested);
        }
        for managed in &mut self.nodes {
            if let Some(worker) = managed.worker.take() {
                join_worker(&managed.name, worker);
            }
        }
        info!(graph = %self.name.name(), "all workers joined");
    }

    fn find(&self, name: &str) -> GraphResult<&ManagedNode<T>> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| GraphError::UnknownNode {
                name: name.to_string(),
            })
    }
}

impl<T: Send + 'static> Graph<T> {
    /// Convenience constructor-and-add for a producer node.
    pub fn add_producer(
        &mut self,
        name: impl Into<String>,
        outs: usize,
        logic: impl crate::node::Produce<T> + 'static,
    ) -> GraphResult<()> {
        self.add(Producer::new(name, outs, logic))
    }

    /// Convenience constructor-and-add for a consumer node.
    pub fn add_consumer(
        &mut self,
        name: impl Into<String>,
        ins: usize,
        logic: impl crate::node::Consume<T> + 'static,
    ) -> GraphResult<()> {
        self.add(Consumer::new(name, ins, logic))
    }

    /// Convenience constructor-and-add for a transformer node.
    pub fn add_transformer(
        &mut self,
        name: impl Into<String>,
        ins: usize,
        outs: usize,
        logic: impl crate::node::Transform<T> + 'static,
    ) -> GraphResult<()> {
        self.add(Transformer::new(name, ins, outs, logic))
    }
}

fn join_worker(name: &str, worker: JoinHandle<()>) {
    if worker.join().is_err() {
        warn!(node = %name, "worker thread panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Consume, Produce};
    use std::time::Duration;

    struct Idle;
    impl Produce<u32> for Idle {
        fn produce(&mut self, _outputs: &[Outpin<u32>]) {
            thread::sleep(Duration::from_millis(1));
        }
    }

    struct Drain;
    impl Consume<u32> for Drain {
        fn ready(&mut self, pin: usize, inputs: &[Inpin<u32>]) {
            while inputs[pin].pop().is_some() {}
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut graph = Graph::new("g");
        graph.add_producer("gen", 1, Idle).unwrap();
        let err = graph.add_producer("gen", 1, Idle).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName { .. }));
    }

    #[test]
    fn test_remove_rejected_while_running() {
        let mut graph = Graph::new("g");
        graph.add_producer("gen", 1, Idle).unwrap();
        graph.start();
        let Err(err) = graph.remove("gen") else {
            panic!("remove succeeded while the worker was live");
        };
        assert!(matches!(err, GraphError::NodeRunning { .. }));
        // The rejected removal leaves the node fully managed.
        assert!(graph.output_pin("gen", 0).is_ok());

        graph.stop();
        let node = graph.remove("gen").unwrap();
        assert_eq!(node.name(), "gen");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_stop_joins_all_workers() {
        let mut graph = Graph::new("g");
        graph.add_producer("gen", 1, Idle).unwrap();
        graph.add_consumer("sink", 1, Drain).unwrap();
        let out = graph.output_pin("gen", 0).unwrap();
        let inp = graph.input_pin("sink", 0).unwrap();
        graph.connect(&out, &inp, 4, 0);

        graph.start();
        thread::sleep(Duration::from_millis(20));
        // Must return without any further packet or external event.
        graph.stop();
    }

    #[test]
    fn test_restart_after_stop_spawns_fresh_workers() {
        let mut graph = Graph::new("g");
        graph.add_producer("gen", 1, Idle).unwrap();
        graph.start();
        graph.stop();
        graph.start();
        thread::sleep(Duration::from_millis(5));
        graph.stop();
    }

    #[test]
    fn test_pin_lookup_errors() {
        let mut graph = Graph::new("g");
        graph.add_producer("gen", 1, Idle).unwrap();
        assert!(matches!(
            graph.output_pin("gen", 3),
            Err(GraphError::UnknownPin { .. })
        ));
        assert!(matches!(
            graph.input_pin("gen", 0),
            Err(GraphError::UnknownPin { .. })
        ));
        assert!(matches!(
            graph.output_pin("nope", 0),
            Err(GraphError::UnknownNode { .. })
        ));
    }
}
