//! Sign-in, sign-out and progressive login lockout
//!
//! Failed sign-ins are counted in client-local storage. After
//! [`LockoutPolicy::warn_after`] failures the user is warned; after
//! [`LockoutPolicy::lock_after`] further attempts are refused for
//! [`LockoutPolicy::lock_minutes`] without contacting the auth provider.

use crate::backend::{AuthProvider, PortalBackend, Session};
use crate::error::{AuthError, PortalError};
use crate::local::{Clock, LocalStore};
use crate::validation::{validate_email, validate_new_password, SignupForm};
use advisory_model::{Profile, Role};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LOCKOUT_KEY: &str = "login_lockout";

/// Lockout thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    /// Failures before the warning is shown
    pub warn_after: u32,
    /// Failures before sign-in is locked
    pub lock_after: u32,
    /// Lock length
    pub lock_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            warn_after: 5,
            lock_after: 10,
            lock_minutes: 60,
        }
    }
}

impl LockoutPolicy {
    /// Longest accepted lock, one week
    pub const MAX_LOCK_MINUTES: i64 = 7 * 24 * 60;

    /// Thresholds are usable: positive, the warning comes first and the
    /// lock lasts at most [`Self::MAX_LOCK_MINUTES`]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.warn_after > 0
            && self.warn_after < self.lock_after
            && (1..=Self::MAX_LOCK_MINUTES).contains(&self.lock_minutes)
    }

    /// Lock expiry for a lock starting at `now`; the length is clamped to
    /// between one minute and [`Self::MAX_LOCK_MINUTES`]
    #[must_use]
    pub fn lock_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let length = Duration::minutes(self.lock_minutes.clamp(1, Self::MAX_LOCK_MINUTES));
        now.checked_add_signed(length).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Persisted counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LockoutState {
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// What a recorded failure means for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Nothing to report beyond the bad credentials
    Counted {
        /// Consecutive failures so far
        attempts: u32,
    },
    /// Close to the lock
    Warning {
        /// Consecutive failures so far
        attempts: u32,
        /// Failures left before the lock
        remaining: u32,
    },
    /// Lock engaged
    Locked {
        /// Lock expiry
        until: DateTime<Utc>,
    },
}

/// Failed-attempt counter with an injected clock and store
pub struct LoginLockout {
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
    store: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for LoginLockout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginLockout")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl LoginLockout {
    /// Create over the given clock and store
    #[must_use]
    pub fn new(policy: LockoutPolicy, clock: Arc<dyn Clock>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            policy,
            clock,
            store,
        }
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    fn load(&self) -> LockoutState {
        self.store
            .get(LOCKOUT_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn save(&self, state: LockoutState) {
        if state == LockoutState::default() {
            self.store.remove(LOCKOUT_KEY);
            return;
        }
        match serde_json::to_string(&state) {
            Ok(raw) => self.store.set(LOCKOUT_KEY, raw),
            Err(e) => tracing::warn!(error = %e, "cannot persist lockout state"),
        }
    }

    /// Refuse while locked. An expired lock clears the counter.
    ///
    /// # Errors
    /// `AuthError::LockedOut` with the minutes left, rounded up.
    pub fn check(&self) -> Result<(), AuthError> {
        let state = self.load();
        let Some(until) = state.locked_until else {
            return Ok(());
        };
        let now = self.clock.now();
        if now < until {
            let seconds = (until - now).num_seconds();
            return Err(AuthError::LockedOut {
                remaining_minutes: (seconds + 59) / 60,
            });
        }
        tracing::info!("login lock expired, counter cleared");
        self.save(LockoutState::default());
        Ok(())
    }

    /// Count a failed sign-in
    pub fn record_failure(&self) -> FailureOutcome {
        let mut state = self.load();
        state.failed_attempts = state.failed_attempts.saturating_add(1);
        let attempts = state.failed_attempts;

        let outcome = if attempts >= self.policy.lock_after {
            let until = self.policy.lock_until(self.clock.now());
            state.locked_until = Some(until);
            tracing::warn!(attempts, %until, "login locked after repeated failures");
            FailureOutcome::Locked { until }
        } else if attempts >= self.policy.warn_after {
            tracing::warn!(attempts, "repeated login failures");
            FailureOutcome::Warning {
                attempts,
                remaining: self.policy.lock_after - attempts,
            }
        } else {
            FailureOutcome::Counted { attempts }
        };
        self.save(state);
        outcome
    }

    /// Reset after a successful sign-in
    pub fn record_success(&self) {
        self.save(LockoutState::default());
    }

    /// Consecutive failures currently counted
    #[must_use]
    pub fn failed_attempts(&self) -> u32 {
        self.load().failed_attempts
    }
}

/// Sign-in flows for users and admins
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    backend: Arc<dyn PortalBackend>,
    lockout: LoginLockout,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("lockout", &self.lockout)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create a service
    #[must_use]
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        backend: Arc<dyn PortalBackend>,
        lockout: LoginLockout,
    ) -> Self {
        Self {
            provider,
            backend,
            lockout,
        }
    }

    /// Lockout counter
    #[inline]
    #[must_use]
    pub fn lockout(&self) -> &LoginLockout {
        &self.lockout
    }

    async fn profile_for(&self, session: &Session) -> Result<Profile, PortalError> {
        self.backend
            .fetch_profile(session.user_id)
            .await?
            .ok_or(PortalError::Auth(AuthError::MissingProfile))
    }

    /// Sign in and load the profile.
    ///
    /// # Errors
    /// - `AuthError::LockedOut` while locked, without contacting the provider
    /// - `AuthError::LockoutWarning` for a bad password once the warning threshold is reached
    /// - `AuthError::InvalidCredentials` for other bad passwords
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, PortalError> {
        validate_email(email)?;
        self.lockout.check()?;

        let session = match self.provider.sign_in(email.trim(), password).await {
            Ok(session) => session,
            Err(AuthError::InvalidCredentials) => {
                let err = match self.lockout.record_failure() {
                    FailureOutcome::Counted { .. } => AuthError::InvalidCredentials,
                    FailureOutcome::Warning { remaining, .. } => {
                        AuthError::LockoutWarning { remaining }
                    }
                    FailureOutcome::Locked { .. } => AuthError::LockedOut {
                        remaining_minutes: self.lockout.policy().lock_minutes,
                    },
                };
                return Err(err.into());
            }
            Err(e) => return Err(e.into()),
        };

        self.lockout.record_success();
        let profile = self.profile_for(&session).await?;
        tracing::info!(user = %profile.id, "signed in");
        Ok(profile)
    }

    /// Sign in through the admin page; non-admins are signed out again.
    ///
    /// # Errors
    /// As [`login`](Self::login), plus `AuthError::AdminRequired`.
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Profile, PortalError> {
        let profile = self.login(email, password).await?;
        if profile.role != Role::Admin {
            tracing::warn!(user = %profile.id, "non-admin attempted admin sign-in");
            self.provider.sign_out().await?;
            return Err(AuthError::AdminRequired.into());
        }
        Ok(profile)
    }

    /// Profile of the signed-in user, if any
    ///
    /// # Errors
    /// Provider or backend failures.
    pub async fn current_profile(&self) -> Result<Option<Profile>, PortalError> {
        match self.provider.session().await? {
            Some(session) => self.profile_for(&session).await.map(Some),
            None => Ok(None),
        }
    }

    /// Sign out
    ///
    /// # Errors
    /// Provider failures.
    pub async fn logout(&self) -> Result<(), PortalError> {
        self.provider.sign_out().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Send a reset link
    ///
    /// # Errors
    /// Invalid e-mail or provider failure.
    pub async fn forgot_password(&self, email: &str) -> Result<(), PortalError> {
        validate_email(email)?;
        self.provider.request_password_reset(email.trim()).await?;
        Ok(())
    }

    /// Change the signed-in user's password
    ///
    /// # Errors
    /// Validation failure or provider failure.
    pub async fn update_password(
        &self,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), PortalError> {
        validate_new_password(new_password, confirmation)?;
        self.provider.update_password(new_password).await?;
        Ok(())
    }

    /// Create an account after field validation
    ///
    /// # Errors
    /// Validation failure or provider failure.
    pub async fn signup(&self, form: &SignupForm) -> Result<Session, PortalError> {
        form.validate()?;
        let session = self
            .provider
            .sign_up(form.full_name.trim(), form.email.trim(), &form.password)
            .await?;
        tracing::info!(user = %session.user_id, "account created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{ManualClock, MemoryStore};

    fn lockout(clock: Arc<ManualClock>) -> LoginLockout {
        LoginLockout::new(LockoutPolicy::default(), clock, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn huge_lock_length_is_capped_at_a_week() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let policy = LockoutPolicy {
            lock_minutes: 1_000_000_000_000,
            ..LockoutPolicy::default()
        };
        assert!(!policy.is_consistent());

        let lockout = LoginLockout::new(policy, clock.clone(), Arc::new(MemoryStore::new()));
        let mut last = None;
        for _ in 0..policy.lock_after {
            last = Some(lockout.record_failure());
        }
        assert_eq!(
            last,
            Some(FailureOutcome::Locked {
                until: start + Duration::minutes(LockoutPolicy::MAX_LOCK_MINUTES)
            })
        );
        assert!(matches!(lockout.check(), Err(AuthError::LockedOut { .. })));
        clock.advance(Duration::weeks(1));
        assert_eq!(lockout.check(), Ok(()));
    }

    #[test]
    fn warns_at_five_locks_at_ten() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let lockout = lockout(clock.clone());

        for n in 1..=4 {
            assert_eq!(lockout.record_failure(), FailureOutcome::Counted { attempts: n });
        }
        assert_eq!(
            lockout.record_failure(),
            FailureOutcome::Warning {
                attempts: 5,
                remaining: 5
            }
        );
        for _ in 6..=9 {
            assert!(matches!(lockout.record_failure(), FailureOutcome::Warning { .. }));
        }
        assert!(matches!(lockout.record_failure(), FailureOutcome::Locked { .. }));
        assert_eq!(
            lockout.check(),
            Err(AuthError::LockedOut {
                remaining_minutes: 60
            })
        );

        clock.advance(Duration::minutes(59) + Duration::seconds(30));
        assert_eq!(
            lockout.check(),
            Err(AuthError::LockedOut {
                remaining_minutes: 1
            })
        );

        clock.advance(Duration::seconds(30));
        assert_eq!(lockout.check(), Ok(()));
        assert_eq!(lockout.failed_attempts(), 0);
    }

    #[test]
    fn success_resets_counter() {
        let lockout = lockout(Arc::new(ManualClock::new(Utc::now())));
        for _ in 0..7 {
            lockout.record_failure();
        }
        lockout.record_success();
        assert_eq!(lockout.failed_attempts(), 0);
        assert_eq!(lockout.record_failure(), FailureOutcome::Counted { attempts: 1 });
    }

    #[test]
    fn policy_consistency() {
        assert!(LockoutPolicy::default().is_consistent());
        let inverted = LockoutPolicy {
            warn_after: 10,
            lock_after: 5,
            lock_minutes: 60,
        };
        assert!(!inverted.is_consistent());
    }
}
