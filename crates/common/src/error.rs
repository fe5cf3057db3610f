//! Shared error taxonomy.
//!
//! Every module keeps its own `thiserror` enum. Each of them reports an
//! [`ErrorKind`] so callers at the edges (HTTP handlers, the CLI) can map a
//! failure to a status without matching on module internals.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input: bad chunk size, truncated capsule, count mismatch.
    Validation,
    /// The signed challenge did not verify against the requester key.
    Auth,
    /// The requester holds none of the required token.
    AccessDenied,
    /// No stored key or job under the given identifier.
    NotFound,
    /// A cryptographic operation on capsules or fragments failed.
    Translation,
    /// The blob store was unreachable or misbehaved.
    Storage,
    /// The chain-state reader was unreachable or misbehaved.
    Rpc,
    /// Local failures that are none of the above (disk, task joins).
    Internal,
}

impl ErrorKind {
    /// Transient collaborator failures may succeed on retry, everything
    /// else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Storage | ErrorKind::Rpc)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Translation => "translation",
            ErrorKind::Storage => "storage",
            ErrorKind::Rpc => "rpc",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every module error so it can be classified.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_collaborator_failures_retry() {
        assert!(ErrorKind::Storage.is_retryable());
        assert!(ErrorKind::Rpc.is_retryable());
        assert!(!ErrorKind::Auth.is_retryable());
        assert!(!ErrorKind::Translation.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AccessDenied).unwrap();
        assert_eq!(json, "\"access_denied\"");
        assert_eq!(ErrorKind::AccessDenied.to_string(), "access_denied");
    }
}
