use crate::model::Status;

use super::EngineError;

/// Validate a workflow transition.
///
/// Only `Pending → Approved` and `Pending → Declined` are allowed. A terminal
/// record cannot be moved again here; use [`check_reopen`] for that.
pub fn check_transition(current: Status, target: Status) -> Result<(), EngineError> {
    match (current, target) {
        (Status::Pending, Status::Approved | Status::Declined) => Ok(()),
        (_, Status::Pending) => Err(EngineError::InvalidState(
            "cannot transition into pending; reopen the request instead".into(),
        )),
        (Status::Approved | Status::Declined, _) => Err(EngineError::InvalidState(format!(
            "request is already {current}; reopen it before deciding again"
        ))),
    }
}

/// Validate the administrative reopen override (terminal → pending).
pub fn check_reopen(current: Status) -> Result<(), EngineError> {
    if current.is_terminal() {
        Ok(())
    } else {
        Err(EngineError::InvalidState(format!("request is already {current}")))
    }
}
