//! Line protocol: one JSON object per line in each direction.
//!
//! Requests are tagged by `op`. Replies are `{"ok":true,"result":...}` or
//! `{"ok":false,"error":{"code":...,"message":...}}`.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

/// Parsed request from one input line.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CheckConflicts {
        date: NaiveDate,
        slots: Vec<Slot>,
        granularity: Granularity,
        #[serde(default)]
        exclude_id: Option<Ulid>,
    },
    Availability {
        date: NaiveDate,
    },
    Submit {
        date: NaiveDate,
        slots: Vec<Slot>,
        granularity: Granularity,
        #[serde(default)]
        requester: Requester,
    },
    Amend {
        id: Ulid,
        slots: Vec<Slot>,
        granularity: Granularity,
    },
    /// Present an admin token to unlock the privileged operations below.
    Authenticate {
        token: String,
    },
    Get {
        id: Ulid,
    },
    List {
        #[serde(default)]
        date: Option<NaiveDate>,
        #[serde(default)]
        status: Option<String>,
    },
    /// `status` stays a string so values outside the closed set surface as
    /// `invalid_state` rather than a parse failure.
    Transition {
        id: Ulid,
        status: String,
        #[serde(default)]
        note: Option<String>,
    },
    Reopen {
        id: Ulid,
        #[serde(default)]
        note: Option<String>,
    },
}

impl Request {
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Request::Get { .. }
                | Request::List { .. }
                | Request::Transition { .. }
                | Request::Reopen { .. }
        )
    }
}

pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }
    serde_json::from_str(trimmed).map_err(|e| ProtocolError::Parse(e.to_string()))
}

/// Collapse a slot list into the set the engine works on.
pub fn slot_set(slots: Vec<Slot>) -> BTreeSet<Slot> {
    slots.into_iter().collect()
}

// ── Replies ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Reply {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"ok":false,"error":{{"code":"internal","message":"encode: {e}"}}}}"#)
        })
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ProtocolError {
    Parse(String),
    Empty,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Parse(s) => write!(f, "parse error: {s}"),
            ProtocolError::Empty => write!(f, "empty request"),
        }
    }
}

impl std::error::Error for ProtocolError {}
