//! Dependency-graph execution.
//!
//! Build a [`Graph`] of nodes with [`GraphBuilder`], attach an [`Element`] to
//! each, and run it with a [`GraphRunner`]. A node runs only after all of its
//! predecessors completed; independent nodes run in parallel. Every node
//! result is folded into one [`StatusCode`] verdict, which can be rendered in
//! any registered language through a [`StatusFormatter`].

// Core infrastructure modules
pub mod core;

pub mod graph; // Arena, builder and elements
pub mod lang; // Language tags and message catalogs
pub mod logging;
pub mod scheduler; // Ready queue, runner, events, metrics
pub mod status; // Status codes and aggregation

// Re-exports for convenience
pub use crate::core::errors::{DagrunError, Result};
pub use graph::{Element, FnElement, Graph, GraphBuilder, Node, NodeId, NodeRun, NodeState, TryFnElement};
pub use lang::{InMemoryCatalog, LangRegistry, MessageCatalog, StatusFormatter, EN_US, ZH_CN};
pub use scheduler::{
    BufferingEventSink, EventSink, GraphRunReport, GraphRunner, LoggingEventSink, MetricsSnapshot,
    NodeDisposition, NodeOutcome, OnFailure, ReadyQueue, RunEvent, RunEventEnvelope, RunnerConfig,
    RunnerConfigBuilder,
};
pub use status::{combine, GraphStatus, StatusCode, StatusKind};
