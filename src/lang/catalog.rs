use dashmap::DashMap;
use std::sync::Arc;

use super::registry::LangRegistry;
use crate::core::errors::Result;
use crate::status::StatusCode;

/// Source of display text for message keys.
///
/// `tag` is always a canonical tag produced by a [`LangRegistry`].
pub trait MessageCatalog: Send + Sync {
    fn lookup(&self, key: &str, tag: &str) -> Option<String>;
}

/// Concurrent in-memory catalog.
///
/// Entries are keyed by the canonical tags of the catalog's own registry. A
/// [`StatusFormatter`] reading it must normalize with the same registry; use
/// [`StatusFormatter::for_catalog`] to get one that does.
pub struct InMemoryCatalog {
    registry: Arc<LangRegistry>,
    messages: DashMap<(String, String), String>,
}

impl InMemoryCatalog {
    pub fn new(registry: Arc<LangRegistry>) -> Self {
        Self {
            registry,
            messages: DashMap::new(),
        }
    }

    /// Register text for a key. Unsupported tags are a caller error.
    pub fn insert(&self, key: &str, tag: &str, text: impl Into<String>) -> Result<()> {
        let tag = self.registry.resolve(tag)?.to_string();
        self.messages.insert((key.to_string(), tag), text.into());
        Ok(())
    }

    /// Chainable form of [`insert`](Self::insert).
    pub fn with(self, key: &str, tag: &str, text: impl Into<String>) -> Result<Self> {
        self.insert(key, tag, text)?;
        Ok(self)
    }

    pub fn registry(&self) -> &Arc<LangRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageCatalog for InMemoryCatalog {
    fn lookup(&self, key: &str, tag: &str) -> Option<String> {
        self.messages
            .get(&(key.to_string(), tag.to_string()))
            .map(|entry| entry.value().clone())
    }
}

/// Turns status values into display text.
///
/// Lookup order: the requested language (normalized), then the registry's
/// default language, then the caller-supplied default.
#[derive(Clone)]
pub struct StatusFormatter {
    registry: Arc<LangRegistry>,
    catalog: Arc<dyn MessageCatalog>,
}

impl StatusFormatter {
    /// `catalog` must key its entries by canonical tags of `registry`.
    pub fn new(registry: Arc<LangRegistry>, catalog: Arc<dyn MessageCatalog>) -> Self {
        Self { registry, catalog }
    }

    /// Formatter sharing the catalog's registry.
    pub fn for_catalog(catalog: Arc<InMemoryCatalog>) -> Self {
        let registry = Arc::clone(catalog.registry());
        Self { registry, catalog }
    }

    pub fn registry(&self) -> &LangRegistry {
        &self.registry
    }

    pub fn text(&self, key: &str, tag: &str, default: &str) -> String {
        if key.is_empty() {
            return default.to_string();
        }
        let normalized = self.registry.normalize(tag);
        self.catalog
            .lookup(key, normalized)
            .or_else(|| self.catalog.lookup(key, self.registry.default_tag()))
            .unwrap_or_else(|| default.to_string())
    }

    pub fn message(&self, status: &StatusCode, tag: &str, default: &str) -> String {
        self.text(status.message_key(), tag, default)
    }
}
