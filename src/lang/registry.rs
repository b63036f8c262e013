use std::collections::HashMap;

use crate::core::errors::{DagrunError, Result};

/// Canonical simplified-Chinese tag, also the default fallback.
pub const ZH_CN: &str = "zh-CN";
/// Canonical English tag.
pub const EN_US: &str = "en-US";

/// Supported display languages and the aliases that map onto them.
///
/// A registry is an ordinary value handed to the components that need it
/// (catalogs, formatters), so tests can build their own without touching any
/// process-wide state.
#[derive(Debug, Clone)]
pub struct LangRegistry {
    languages: Vec<String>,
    // lowercase alias -> index into `languages`
    aliases: HashMap<String, usize>,
    default: usize,
}

impl LangRegistry {
    /// Registry with a single language that is also the default.
    pub fn new(default_tag: &str) -> Self {
        let mut registry = Self {
            languages: Vec::new(),
            aliases: HashMap::new(),
            default: 0,
        };
        registry.insert_language(default_tag, &[]);
        registry
    }

    /// Add a language (or more aliases for an existing one).
    pub fn with_language(mut self, tag: &str, aliases: &[&str]) -> Self {
        self.insert_language(tag, aliases);
        self
    }

    /// Change the fallback language. The tag must already be registered.
    pub fn with_default(mut self, tag: &str) -> Result<Self> {
        let idx = self.index_of(tag).ok_or_else(|| DagrunError::unsupported_language(tag))?;
        self.default = idx;
        Ok(self)
    }

    fn insert_language(&mut self, tag: &str, aliases: &[&str]) {
        let key = tag.trim().to_ascii_lowercase();
        let idx = match self.aliases.get(&key) {
            Some(idx) => *idx,
            None => {
                self.languages.push(tag.trim().to_string());
                let idx = self.languages.len() - 1;
                self.aliases.insert(key, idx);
                idx
            }
        };
        for alias in aliases {
            self.aliases.insert(alias.trim().to_ascii_lowercase(), idx);
        }
    }

    fn index_of(&self, tag: &str) -> Option<usize> {
        self.aliases.get(&tag.trim().to_ascii_lowercase()).copied()
    }

    /// The fallback tag.
    pub fn default_tag(&self) -> &str {
        &self.languages[self.default]
    }

    /// Canonical tags in registration order.
    pub fn supported(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(String::as_str)
    }

    /// Map any input to a canonical tag. Blank or unknown tags fall back to
    /// the default language; this never fails.
    pub fn normalize(&self, tag: &str) -> &str {
        match self.index_of(tag) {
            Some(idx) => &self.languages[idx],
            None => self.default_tag(),
        }
    }

    /// Strict lookup used when registering content for a language. Blank
    /// input means the default language; anything unknown is rejected.
    pub fn resolve(&self, tag: &str) -> Result<&str> {
        if tag.trim().is_empty() {
            return Ok(self.default_tag());
        }
        self.index_of(tag)
            .map(|idx| self.languages[idx].as_str())
            .ok_or_else(|| DagrunError::unsupported_language(tag))
    }

    pub fn is_supported(&self, tag: &str) -> bool {
        self.index_of(tag).is_some()
    }
}

impl Default for LangRegistry {
    fn default() -> Self {
        LangRegistry::new(ZH_CN)
            .with_language(ZH_CN, &["zh", "zh-hans", "zh_cn"])
            .with_language(EN_US, &["en", "en_us"])
    }
}
