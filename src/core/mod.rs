//! Shared infrastructure.

pub mod errors;

pub use errors::{DagrunError, Result};
