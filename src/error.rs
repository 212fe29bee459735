//! Shared error classification
//!
//! Every module owns its own `thiserror` enum. Those enums expose a
//! [`ErrorKind`] so callers can branch on what went wrong without looking at
//! message text, and the HTTP layer tags error envelopes with the [`Stage`]
//! that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy shared by server and client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input caught before any network call
    Validation,
    /// Remote resource unreachable or non-OK
    Fetch,
    /// Storage or remote-file upload failure
    Upload,
    /// Polling ceiling exceeded
    Timeout,
    /// Malformed or incomplete remote JSON
    InvalidResponse,
    /// Bad or expired request signature
    Auth,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Upload => "upload",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Auth => "auth",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline step an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Analysis,
    Screenshots,
    Assembly,
    Cleanup,
}
