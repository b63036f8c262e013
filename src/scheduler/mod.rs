//! Parallel execution of a [`Graph`](crate::graph::Graph).
//!
//! A coordinator task pops released nodes from the [`ReadyQueue`], dispatches
//! each onto a worker bounded by `max_workers`, and counts outstanding work.
//! Workers fold results into the shared verdict and release successors.

pub mod config;
pub mod events;
pub mod metrics;
pub mod ready_queue;
pub mod report;
pub mod runner;

pub use config::{OnFailure, RunnerConfig, RunnerConfigBuilder};
pub use events::{BufferingEventSink, EventSink, LoggingEventSink, RunEvent, RunEventEnvelope};
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use ready_queue::ReadyQueue;
pub use report::{GraphRunReport, NodeDisposition, NodeOutcome};
pub use runner::{GraphRunner, NODE_INTERNAL, NODE_PANICKED, NODE_TIMEOUT};
