use chrono::Utc;
use dashmap::DashSet;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::{OnFailure, RunnerConfig};
use super::events::{Emitter, EventSink, RunEvent};
use super::metrics::{MetricsSnapshot, RunMetrics};
use super::ready_queue::ReadyQueue;
use super::report::{GraphRunReport, NodeDisposition, NodeOutcome};
use crate::core::errors::{DagrunError, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::status::{GraphStatus, StatusCode};

/// Status code reported for a node that exceeded `node_timeout`.
pub const NODE_TIMEOUT: &str = "NODE_TIMEOUT";
/// Status code reported for a node whose element panicked.
pub const NODE_PANICKED: &str = "NODE_PANICKED";
/// Status code reported when the runner could not resolve a node.
pub const NODE_INTERNAL: &str = "NODE_INTERNAL";

/// Executes graphs: releases nodes whose predecessors completed, runs them on
/// the blocking pool and folds their results into one verdict.
///
/// Must be used from within a tokio runtime.
pub struct GraphRunner {
    config: RunnerConfig,
    event_sink: Option<Arc<dyn EventSink>>,
    metrics: Arc<RunMetrics>,
}

/// Worker to coordinator messages.
enum Signal {
    /// The node's bookkeeping is complete. Always the last message a worker sends.
    Finished(NodeId),
    /// A released node did not fit into the ready queue.
    Overflow(NodeId),
}

/// State shared by the coordinator and the workers of one run.
struct RunShared {
    graph: Arc<Graph>,
    status: GraphStatus,
    ready: ReadyQueue<NodeId>,
    outcomes: Mutex<Vec<NodeOutcome>>,
    settled: DashSet<NodeId>,
    emitter: Emitter,
    metrics: Arc<RunMetrics>,
}

impl RunShared {
    /// Queue a node whose counter reached zero. Returns the id back if the
    /// queue is full.
    fn release(&self, node: &Node) -> Option<NodeId> {
        debug!(node = %node.name(), "node released");
        self.emitter.emit(RunEvent::NodeReleased {
            node: node.name().to_string(),
        });
        self.ready.push(node.id()).err()
    }

    fn settle(&self, outcome: NodeOutcome) {
        self.settled.insert(outcome.node_id);
        self.outcomes.lock().push(outcome);
    }
}

impl GraphRunner {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            event_sink: None,
            metrics: Arc::new(RunMetrics::new()),
        })
    }

    /// Send run events to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Counters accumulated over every run of this runner.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run the graph once and return its verdict.
    ///
    /// Fails only on misuse (the graph is already running) or when the worker
    /// pool is unusable; node failures are reported inside the report.
    pub async fn run(&self, graph: &Arc<Graph>) -> Result<GraphRunReport> {
        let _guard = graph.begin_run()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        self.metrics.record_run_started();

        let capacity = self.config.queue_capacity.unwrap_or(graph.len()).max(1);
        let shared = Arc::new(RunShared {
            graph: Arc::clone(graph),
            status: GraphStatus::new(),
            ready: ReadyQueue::new(capacity),
            outcomes: Mutex::new(Vec::with_capacity(graph.len())),
            settled: DashSet::new(),
            emitter: Emitter::new(run_id, self.event_sink.clone()),
            metrics: Arc::clone(&self.metrics),
        });

        let sources = graph.sources();
        info!(
            run_id = %run_id,
            nodes = graph.len(),
            sources = sources.len(),
            workers = self.config.max_workers,
            policy = ?self.config.on_failure,
            "starting graph run"
        );
        shared.emitter.emit(RunEvent::RunStarted {
            nodes: graph.len(),
            sources: sources.len(),
        });

        let mut backlog = VecDeque::new();
        for id in sources {
            if let Some(overflow) = shared.release(graph.node(id)?) {
                backlog.push_back(overflow);
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut outstanding = 0usize;

        loop {
            while let Some(id) = shared.ready.pop().or_else(|| backlog.pop_front()) {
                let node = graph.node(id)?;
                if let Some(reason) = self.skip_reason(&shared, node) {
                    self.skip(&shared, node, reason, &mut backlog)?;
                    continue;
                }

                let permit = Arc::clone(&semaphore).acquire_owned().await?;
                // The verdict may have changed while waiting for a worker slot.
                if let Some(reason) = self.skip_reason(&shared, node) {
                    drop(permit);
                    self.skip(&shared, node, reason, &mut backlog)?;
                    continue;
                }

                outstanding += 1;
                let worker = Worker {
                    shared: Arc::clone(&shared),
                    timeout: self.config.node_timeout,
                    tx: tx.clone(),
                };
                tokio::spawn(worker.execute(id, permit));
            }

            if outstanding == 0 {
                break;
            }

            match rx.recv().await {
                Some(Signal::Finished(_)) => outstanding -= 1,
                Some(Signal::Overflow(id)) => backlog.push_back(id),
                None => break,
            }
        }

        let mut outcomes = std::mem::take(&mut *shared.outcomes.lock());
        for node in graph.nodes() {
            if !shared.settled.contains(&node.id()) {
                outcomes.push(NodeOutcome::not_executed(
                    node.id(),
                    node.name(),
                    NodeDisposition::NotReached,
                ));
            }
        }

        let status = shared.status.current();
        let errors = shared.status.errors();
        let worst_non_error = shared.status.worst_non_error();
        let elapsed = clock.elapsed();
        let executed = outcomes.iter().filter(|o| o.disposition.executed()).count();

        shared.emitter.emit(RunEvent::RunFinished {
            kind: status.kind(),
            code: status.code().to_string(),
            executed,
            duration_ms: elapsed.as_millis() as u64,
        });
        if status.is_error() {
            self.metrics.record_run_failed();
            warn!(
                run_id = %run_id,
                code = %status.code(),
                errors = errors.len(),
                executed,
                elapsed_ms = elapsed.as_millis() as u64,
                "graph run finished with errors"
            );
        } else {
            info!(
                run_id = %run_id,
                executed,
                elapsed_ms = elapsed.as_millis() as u64,
                "graph run finished"
            );
        }

        Ok(GraphRunReport {
            run_id,
            status,
            errors,
            worst_non_error,
            outcomes,
            teardown: Vec::new(),
            started_at,
            elapsed,
        })
    }

    /// Run the graph once, then destroy every node. Destroy failures are
    /// attached to the report and never change its verdict.
    pub async fn run_and_teardown(&self, graph: &Arc<Graph>) -> Result<GraphRunReport> {
        let mut report = self.run(graph).await?;
        let graph = Arc::clone(graph);
        report.teardown = task::spawn_blocking(move || graph.destroy())
            .await
            .map_err(|e| DagrunError::concurrency("join graph teardown", e))??;
        Ok(report)
    }

    fn skip_reason(&self, shared: &RunShared, node: &Node) -> Option<&'static str> {
        match self.config.on_failure {
            OnFailure::Stop if shared.status.is_error() => Some("run is stopping after a failure"),
            OnFailure::SkipDependents if node.is_poisoned() => {
                Some("a predecessor failed or was skipped")
            }
            _ => None,
        }
    }

    /// Settle a released node without executing it.
    ///
    /// Under `Stop` the node is left `NotReached` and nothing downstream is
    /// released. Under `SkipDependents` it is `Skipped` but still completes
    /// structurally, so its successors are released (and skipped in turn).
    fn skip(
        &self,
        shared: &RunShared,
        node: &Node,
        reason: &str,
        backlog: &mut VecDeque<NodeId>,
    ) -> Result<()> {
        if self.config.on_failure == OnFailure::Stop {
            debug!(node = %node.name(), reason, "node not dispatched");
            shared.settle(NodeOutcome::not_executed(
                node.id(),
                node.name(),
                NodeDisposition::NotReached,
            ));
            return Ok(());
        }

        debug!(node = %node.name(), reason, "node skipped");
        shared.metrics.record_skipped();
        shared.emitter.emit(RunEvent::NodeSkipped {
            node: node.name().to_string(),
            reason: reason.to_string(),
        });
        shared.settle(NodeOutcome::not_executed(
            node.id(),
            node.name(),
            NodeDisposition::Skipped,
        ));

        for id in node.successors() {
            let successor = shared.graph.node(*id)?;
            successor.poison();
            if successor.on_predecessor_completed() {
                if let Some(overflow) = shared.release(successor) {
                    backlog.push_back(overflow);
                }
            }
        }
        Ok(())
    }
}

fn timeout_status() -> StatusCode {
    StatusCode::error(NODE_TIMEOUT, "node.timeout")
}

/// Executes one node and performs its completion bookkeeping.
///
/// A node that outlives `node_timeout` is reported as timed out at once, but
/// keeps its worker slot and only releases its successors after the body
/// has returned.
struct Worker {
    shared: Arc<RunShared>,
    timeout: Option<Duration>,
    tx: UnboundedSender<Signal>,
}

impl Worker {
    async fn execute(self, id: NodeId, permit: OwnedSemaphorePermit) {
        let Ok(node) = self.shared.graph.node(id) else {
            error!(node = %id, "dispatched node is not part of the graph");
            let _ = self.tx.send(Signal::Finished(id));
            return;
        };

        debug!(node = %node.name(), "node dispatched");
        self.shared.emitter.emit(RunEvent::NodeStarted {
            node: node.name().to_string(),
        });

        let clock = Instant::now();
        let graph = Arc::clone(&self.shared.graph);
        let mut handle = task::spawn_blocking(move || graph.node(id).map(Node::execute));
        let mut timed_out = false;
        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    timed_out = true;
                    warn!(
                        node = %node.name(),
                        timeout_ms = limit.as_millis() as u64,
                        "node exceeded its deadline, waiting for the body to return"
                    );
                    // The verdict changes now so `Stop` halts dispatch; the slot
                    // and the successors stay held until the body returns.
                    if self.shared.status.absorb(&timeout_status()) {
                        info!(node = %node.name(), code = NODE_TIMEOUT, "graph status is now an error");
                    }
                    handle.await
                }
            },
            None => handle.await,
        };
        let elapsed = clock.elapsed();
        drop(permit);

        let (mut status, iterations, mut disposition) = match joined {
            Ok(Ok(run)) => {
                let disposition = if run.status.is_error() {
                    NodeDisposition::Failed
                } else {
                    NodeDisposition::Succeeded
                };
                (run.status, run.iterations, disposition)
            }
            Ok(Err(e)) => {
                error!(node = %node.name(), error = %e, "node could not be executed");
                (
                    StatusCode::error(NODE_INTERNAL, "node.internal"),
                    0,
                    NodeDisposition::Failed,
                )
            }
            Err(e) => {
                error!(node = %node.name(), error = %e, "element body panicked");
                (
                    StatusCode::error(NODE_PANICKED, "node.panicked"),
                    0,
                    NodeDisposition::Failed,
                )
            }
        };
        if timed_out {
            status = timeout_status();
            disposition = NodeDisposition::TimedOut;
        }

        match disposition {
            NodeDisposition::TimedOut => self.shared.metrics.record_timeout(elapsed),
            _ => self
                .shared
                .metrics
                .record_node(status.is_error(), iterations, elapsed),
        }
        if status.is_error() {
            warn!(node = %node.name(), status = %status, iterations, "node failed");
        } else {
            debug!(node = %node.name(), status = %status, iterations, "node completed");
        }
        if !timed_out && self.shared.status.absorb(&status) {
            info!(node = %node.name(), code = %status.code(), "graph status is now an error");
        }

        self.shared.emitter.emit(RunEvent::NodeCompleted {
            node: node.name().to_string(),
            kind: status.kind(),
            code: status.code().to_string(),
            iterations,
            duration_ms: elapsed.as_millis() as u64,
        });
        let failed = status.is_error();
        self.shared.settle(NodeOutcome {
            node_id: id,
            name: node.name().to_string(),
            status,
            disposition,
            iterations,
            duration: elapsed,
        });

        for successor_id in node.successors() {
            let Ok(successor) = self.shared.graph.node(*successor_id) else {
                continue;
            };
            if failed {
                successor.poison();
            }
            if successor.on_predecessor_completed() {
                if let Some(overflow) = self.shared.release(successor) {
                    let _ = self.tx.send(Signal::Overflow(overflow));
                }
            }
        }

        let _ = self.tx.send(Signal::Finished(id));
    }
}
