use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::{DagrunError, Result};

/// Severity of an outcome. Variants are declared in ascending severity so the
/// derived ordering is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Ok = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Ok => "ok",
            StatusKind::Info => "info",
            StatusKind::Warning => "warning",
            StatusKind::Error => "error",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusKind {
    type Err = DagrunError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" => Ok(StatusKind::Ok),
            "info" => Ok(StatusKind::Info),
            "warning" | "warn" => Ok(StatusKind::Warning),
            "error" => Ok(StatusKind::Error),
            other => Err(DagrunError::invalid_field(
                format!("unrecognized status kind '{}'", other),
                "kind",
            )),
        }
    }
}

impl TryFrom<u8> for StatusKind {
    type Error = DagrunError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(StatusKind::Ok),
            1 => Ok(StatusKind::Info),
            2 => Ok(StatusKind::Warning),
            3 => Ok(StatusKind::Error),
            other => Err(DagrunError::invalid_field(
                format!("unrecognized status kind {}", other),
                "kind",
            )),
        }
    }
}

/// Immutable outcome of an element call: a classification, a machine code and
/// a message key resolved to text by a [`MessageCatalog`](crate::lang::MessageCatalog).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode {
    code: String,
    kind: StatusKind,
    message_key: String,
}

impl StatusCode {
    pub const DEFAULT_CODE: &'static str = "OK";

    pub fn new(code: impl Into<String>, kind: StatusKind, message_key: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind,
            message_key: message_key.into(),
        }
    }

    /// Build a status from an untyped kind, e.g. one read from a config file.
    pub fn parse(code: impl Into<String>, kind: &str, message_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(code, kind.parse()?, message_key))
    }

    /// The identity of [`combine`].
    pub fn ok() -> Self {
        Self::new(Self::DEFAULT_CODE, StatusKind::Ok, "")
    }

    pub fn info(code: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(code, StatusKind::Info, message_key)
    }

    pub fn warning(code: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(code, StatusKind::Warning, message_key)
    }

    pub fn error(code: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(code, StatusKind::Error, message_key)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn message_key(&self) -> &str {
        &self.message_key
    }

    pub fn is_ok(&self) -> bool {
        self.kind == StatusKind::Ok
    }

    pub fn is_warning_or_info(&self) -> bool {
        matches!(self.kind, StatusKind::Warning | StatusKind::Info)
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }

    /// Fold `other` into `self`: an error already held wins, otherwise an
    /// error in `other` wins, otherwise `self` is kept.
    pub fn combine(self, other: StatusCode) -> StatusCode {
        combine(self, other)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message_key.is_empty() {
            write!(f, "{} ({})", self.code, self.kind)
        } else {
            write!(f, "{} ({}): {}", self.code, self.kind, self.message_key)
        }
    }
}

/// Pure combination rule for status values. The result is always one of the
/// inputs and errors are absorbing.
pub fn combine(a: StatusCode, b: StatusCode) -> StatusCode {
    if a.is_error() {
        a
    } else if b.is_error() {
        b
    } else {
        a
    }
}

impl std::ops::Add for StatusCode {
    type Output = StatusCode;

    fn add(self, rhs: StatusCode) -> StatusCode {
        combine(self, rhs)
    }
}

impl std::ops::AddAssign for StatusCode {
    fn add_assign(&mut self, rhs: StatusCode) {
        if !self.is_error() && rhs.is_error() {
            *self = rhs;
        }
    }
}

impl std::iter::Sum for StatusCode {
    fn sum<I: Iterator<Item = StatusCode>>(iter: I) -> Self {
        iter.fold(StatusCode::ok(), combine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(code: &str) -> StatusCode {
        StatusCode::error(code, "error.key")
    }

    #[test]
    fn test_kind_order() {
        assert!(StatusKind::Error > StatusKind::Warning);
        assert!(StatusKind::Warning > StatusKind::Info);
        assert!(StatusKind::Info > StatusKind::Ok);
    }

    #[test]
    fn test_predicates() {
        assert!(StatusCode::ok().is_ok());
        assert!(!StatusCode::ok().is_error());
        assert!(StatusCode::info("I", "k").is_warning_or_info());
        assert!(StatusCode::warning("W", "k").is_warning_or_info());
        assert!(err("E").is_error());
        assert!(!err("E").is_warning_or_info());
    }

    #[test]
    fn test_combine_identity() {
        assert_eq!(combine(StatusCode::ok(), StatusCode::ok()), StatusCode::ok());
    }

    #[test]
    fn test_combine_error_absorbs() {
        let others = [
            StatusCode::ok(),
            StatusCode::info("I", "info.key"),
            StatusCode::warning("W", "warn.key"),
        ];
        for x in others {
            assert_eq!(combine(err("E"), x.clone()), err("E"));
            assert_eq!(combine(x, err("E")), err("E"));
        }
    }

    #[test]
    fn test_combine_first_error_wins() {
        assert_eq!(combine(err("FIRST"), err("SECOND")).code(), "FIRST");
    }

    #[test]
    fn test_combine_non_error_keeps_left() {
        let w = StatusCode::warning("W", "warn.key");
        assert_eq!(combine(w.clone(), StatusCode::ok()), w);
        assert_eq!(combine(StatusCode::ok(), w), StatusCode::ok());
    }

    #[test]
    fn test_operators() {
        let mut acc = StatusCode::ok();
        acc += StatusCode::warning("W", "k");
        assert!(acc.is_ok());
        acc += err("E1");
        acc += err("E2");
        assert_eq!(acc.code(), "E1");

        let summed: StatusCode = vec![StatusCode::ok(), err("E"), StatusCode::ok()]
            .into_iter()
            .sum();
        assert!(summed.is_error());
        assert!((StatusCode::ok() + StatusCode::ok()).is_ok());
    }

    #[test]
    fn test_parse_kind() {
        let status = StatusCode::parse("W1", "Warning", "disk.low").unwrap();
        assert_eq!(status.kind(), StatusKind::Warning);

        let rejected = StatusCode::parse("X", "fatal", "k");
        assert!(matches!(rejected, Err(DagrunError::InvalidArgument { .. })));
        assert!(StatusKind::try_from(7u8).is_err());
        assert_eq!(StatusKind::try_from(3u8).unwrap(), StatusKind::Error);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::ok().to_string(), "OK (ok)");
        assert_eq!(err("E").to_string(), "E (error): error.key");
    }
}
