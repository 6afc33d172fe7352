use serde::Serialize;
use std::fmt;

/// Why a profile stopped on one of its intentional rollback branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AbortReason {
    /// NewOrder referenced an item id that does not exist.
    InvalidItem { i_id: i64 },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::InvalidItem { i_id } => write!(f, "Item number is not valid: {}", i_id),
        }
    }
}

/// Normal result of a transaction profile.
///
/// Infrastructure and modeling failures are reported through the `Err` side
/// of [`Result`](crate::core::Result); this type only separates a completed
/// run from an expected abort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TxnOutcome<T> {
    Completed(T),
    Aborted(AbortReason),
}

impl<T> TxnOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TxnOutcome::Completed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TxnOutcome::Aborted(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            TxnOutcome::Completed(value) => Some(value),
            TxnOutcome::Aborted(_) => None,
        }
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            TxnOutcome::Completed(_) => None,
            TxnOutcome::Aborted(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TxnOutcome<U> {
        match self {
            TxnOutcome::Completed(value) => TxnOutcome::Completed(f(value)),
            TxnOutcome::Aborted(reason) => TxnOutcome::Aborted(reason),
        }
    }
}
