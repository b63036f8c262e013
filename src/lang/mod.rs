//! Language tags and message lookup for status display text.

pub mod catalog;
pub mod registry;

pub use catalog::{InMemoryCatalog, MessageCatalog, StatusFormatter};
pub use registry::{LangRegistry, EN_US, ZH_CN};
