use std::collections::BTreeSet;

use ulid::Ulid;

use crate::model::Slot;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    /// Status value or transition outside the workflow's closed set.
    InvalidState(String),
    /// Malformed input that should have been caught upstream.
    Validation(String),
    /// An approved reservation already holds these slots.
    Conflict { slots: BTreeSet<Slot> },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Short machine-readable code used on the wire and in metrics.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidState(_) => "invalid_state",
            EngineError::Validation(_) => "validation",
            EngineError::Conflict { .. } => "conflict",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::WalError(_) => "internal",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            EngineError::Validation(msg) => write!(f, "validation failure: {msg}"),
            EngineError::Conflict { slots } => {
                let labels: Vec<String> = slots.iter().map(Slot::to_string).collect();
                write!(f, "conflict with approved reservation on slots: {}", labels.join(", "))
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
