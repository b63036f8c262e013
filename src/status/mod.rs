//! Outcome classification and graph-level aggregation.

pub mod code;
pub mod graph_status;

pub use code::{combine, StatusCode, StatusKind};
pub use graph_status::GraphStatus;
