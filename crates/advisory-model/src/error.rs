//! Error types for the data model

use crate::status::RequestStatus;

/// Model-level validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Identifier could not be parsed
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Status label is not one the portal knows
    #[error("unknown request status: {0}")]
    UnknownStatus(String),

    /// Billability percentage outside `[1, 100]`
    #[error("billability percentage must be between 1 and 100, got {0}")]
    BillabilityOutOfRange(i64),

    /// Billability input is not an integer
    #[error("billability percentage must be a whole number, got {0:?}")]
    BillabilityNotNumeric(String),

    /// Required field is empty
    #[error("{field} is required")]
    MissingField {
        /// Field name as shown on the form
        field: &'static str,
    },

    /// Stored row is internally inconsistent
    #[error("inconsistent row for status {status}: {reason}")]
    InconsistentRow {
        /// Status on the row
        status: RequestStatus,
        /// What is wrong
        reason: String,
    },
}
