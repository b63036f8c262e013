//! Graph model: nodes in an arena, wired by index handles.

pub mod builder;
pub mod dag;
pub mod element;
pub mod node;

pub use builder::GraphBuilder;
pub use dag::{Graph, RunGuard};
pub use element::{Element, FnElement, TryFnElement};
pub use node::{Node, NodeId, NodeRun, NodeState};
