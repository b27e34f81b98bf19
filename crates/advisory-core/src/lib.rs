//! Advisory Core - portal services over a hosted backend
//!
//! Ties the model, estimation and workflow crates to the outside world:
//! - [`PortalBackend`] / [`AuthProvider`]: the hosted data and auth service
//! - [`RequestService`]: submission, status changes, estimates, reassignment, comments, lists
//! - [`AdminService`]: catalogs, team roster and settings
//! - [`AuthService`] with [`LoginLockout`]: sign-in flows and progressive lockout
//! - [`DraftStore`]: anonymous form drafts with expiry
//! - [`Route`] / [`guard`]: which pages a visitor may open
//! - [`PortalError`]: one error type, classified for presentation
//!
//! # Example
//!
//! ```rust,ignore
//! use advisory_core::{PortalConfig, RequestService};
//! use advisory_model::NewRequest;
//!
//! # async fn example(backend: std::sync::Arc<dyn advisory_core::PortalBackend>, me: advisory_model::Profile)
//! #     -> Result<(), advisory_core::PortalError> {
//! let service = RequestService::new(backend, PortalConfig::new());
//! let request = service
//!     .submit(&me, NewRequest::new("Review our vendor onboarding").with_service("svc-process").submitted())
//!     .await?;
//! println!("created {}", request.request_number);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod admin;
pub mod auth;
pub mod backend;
pub mod config;
pub mod draft;
pub mod error;
pub mod local;
pub mod routing;
pub mod service;
pub mod telemetry;
pub mod validation;
pub mod views;

pub use admin::{require_admin, validate_record, AdminService};
pub use auth::{AuthService, FailureOutcome, LockoutPolicy, LoginLockout};
pub use backend::{AuthProvider, CatalogRecord, CatalogSet, PortalBackend, Session};
pub use config::{PortalConfig, TEAM_EMAIL_SETTING_KEY};
pub use draft::DraftStore;
pub use error::{
    AuthError, BackendError, ConfigError, ErrorKind, NoticeStyle, PortalError, UserNotice,
    ValidationError,
};
pub use local::{Clock, FileStore, LocalStore, ManualClock, MemoryStore, SystemClock};
pub use routing::{guard, Access, GuardDecision, Route};
pub use service::RequestService;
pub use telemetry::{init_tracing, LogFormat};
pub use validation::{validate_email, validate_new_password, SignupForm, MIN_PASSWORD_LEN};
pub use views::{CatalogMaps, DashboardStats, RequestFilter, RequestSummary};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the portal services
    pub use crate::{
        AuthService, PortalBackend, PortalConfig, PortalError, RequestFilter, RequestService,
        RequestSummary, Route,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
