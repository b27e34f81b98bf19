//! Error types for the portal services
//!
//! One enum per concern, all converging on [`PortalError`]:
//! - Backend failures (network, missing rows, row-level policy denials)
//! - Authentication and lockout
//! - Client-side input validation
//! - Workflow rule violations (from `advisory-workflow`)
//!
//! [`PortalError::kind`] maps every failure onto the four user-facing
//! categories, and [`UserNotice`] turns it into the message a screen shows.

use advisory_model::ModelError;
use advisory_workflow::WorkflowError;

/// Main portal error type
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Authentication failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Input rejected before any backend call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Workflow rule refused the operation
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Model-level validation (request form, comments, stored rows)
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// User-facing failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Backend unreachable or failed; generic toast, no retry
    Network,
    /// Bad input; inline field error
    Validation,
    /// Missing privilege or session; redirect to a login page
    Authorization,
    /// Status change not allowed from the current status
    IllegalTransition,
}

impl PortalError {
    /// Classify for presentation
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Backend(BackendError::PermissionDenied(_)) => ErrorKind::Authorization,
            Self::Backend(_) | Self::Config(_) => ErrorKind::Network,
            Self::Auth(AuthError::Provider(_)) => ErrorKind::Network,
            Self::Auth(_) => ErrorKind::Authorization,
            Self::Validation(_) | Self::Model(_) => ErrorKind::Validation,
            Self::Workflow(e) if e.is_authorization() => ErrorKind::Authorization,
            Self::Workflow(e) if e.is_validation() => ErrorKind::Validation,
            Self::Workflow(_) => ErrorKind::IllegalTransition,
        }
    }

    /// Shorthand for a missing row
    #[inline]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::Backend(BackendError::NotFound {
            entity,
            id: id.to_string(),
        })
    }
}

/// Errors reported by a [`PortalBackend`](crate::backend::PortalBackend)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Transport failure or service outage
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Row does not exist (or is hidden by row-level policy)
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table or entity name
        entity: &'static str,
        /// Id looked up
        id: String,
    },

    /// Row-level policy refused the write
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Stored row could not be mapped onto the model
    #[error("stored row is inconsistent: {0}")]
    Corrupt(#[from] ModelError),
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Wrong e-mail or password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Wrong credentials, and the lock is getting close
    #[error("invalid email or password; {remaining} attempts left before sign-in is locked")]
    LockoutWarning {
        /// Failures left before the lock
        remaining: u32,
    },

    /// No active session
    #[error("please sign in to continue")]
    NotAuthenticated,

    /// Signed in, but not an administrator
    #[error("administrator access required")]
    AdminRequired,

    /// Too many failed attempts
    #[error("too many failed attempts, try again in {remaining_minutes} minutes")]
    LockedOut {
        /// Whole minutes until the lock expires, rounded up
        remaining_minutes: i64,
    },

    /// Profile row missing for an authenticated user
    #[error("no profile for this account")]
    MissingProfile,

    /// Auth provider failed for a reason other than bad credentials
    #[error("authentication service error: {0}")]
    Provider(String),
}

/// Client-side input validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required field left empty
    #[error("{0} is required")]
    Required(&'static str),

    /// Not an e-mail address
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    /// Password below the minimum length
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length
        min: usize,
    },

    /// Password and confirmation differ
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Catalog row refers to a parent that does not exist
    #[error("unknown {entity} '{id}'")]
    UnknownParent {
        /// Parent entity name
        entity: &'static str,
        /// Id referenced
        id: String,
    },

    /// Hourly rate must be finite and non-negative
    #[error("hourly rate must be a non-negative number, got {0}")]
    InvalidRate(f64),

    /// Hours must be finite and non-negative
    #[error("estimated hours must be a non-negative number, got {0}")]
    InvalidHours(f64),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How a notice is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeStyle {
    /// Transient toast
    Toast,
    /// Message next to the offending field
    Inline,
}

/// Message shown to the user for a failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    /// Presentation
    pub style: NoticeStyle,
    /// Text
    pub message: String,
    /// Page to send the user to, if any
    pub redirect: Option<&'static str>,
}

impl From<&PortalError> for UserNotice {
    fn from(error: &PortalError) -> Self {
        match error.kind() {
            ErrorKind::Network => Self {
                style: NoticeStyle::Toast,
                message: "Something went wrong. Please try again later.".to_string(),
                redirect: None,
            },
            ErrorKind::Validation => Self {
                style: NoticeStyle::Inline,
                message: error.to_string(),
                redirect: None,
            },
            ErrorKind::Authorization => Self {
                style: NoticeStyle::Toast,
                message: error.to_string(),
                redirect: match error {
                    PortalError::Auth(AuthError::AdminRequired) => Some("/admin-login"),
                    PortalError::Auth(AuthError::NotAuthenticated) => Some("/login"),
                    _ => None,
                },
            },
            ErrorKind::IllegalTransition => Self {
                style: NoticeStyle::Toast,
                message: error.to_string(),
                redirect: None,
            },
        }
    }
}
