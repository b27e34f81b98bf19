use advisory_core::{
    AuthError, AuthProvider, AuthService, ErrorKind, LockoutPolicy, LoginLockout, ManualClock,
    MemoryStore, PortalError, Session, SignupForm, UserNotice, ValidationError,
};
use advisory_test_utils::{seeded_backend, Cast, InMemoryAuth};
use chrono::{Duration, Utc};
use mockall::mock;
use std::sync::Arc;

mock! {
    Provider {}

    #[async_trait::async_trait]
    impl AuthProvider for Provider {
        async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
        async fn sign_up(&self, full_name: &str, email: &str, password: &str) -> Result<Session, AuthError>;
        async fn session(&self) -> Result<Option<Session>, AuthError>;
        async fn sign_out(&self) -> Result<(), AuthError>;
        async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;
        async fn update_password(&self, new_password: &str) -> Result<(), AuthError>;
    }
}

struct Harness {
    cast: Cast,
    clock: Arc<ManualClock>,
    auth: Arc<InMemoryAuth>,
    service: AuthService,
}

fn harness() -> Harness {
    let cast = Cast::new();
    let backend = seeded_backend(&cast);
    let auth = Arc::new(InMemoryAuth::new());
    for profile in cast.everyone() {
        auth.register(&profile.email, "correct horse", profile.id);
    }
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let lockout = LoginLockout::new(
        LockoutPolicy::default(),
        clock.clone(),
        Arc::new(MemoryStore::new()),
    );
    let service = AuthService::new(auth.clone(), backend, lockout);
    Harness {
        cast,
        clock,
        auth,
        service,
    }
}

#[tokio::test]
async fn login_loads_profile_and_resets_counter() {
    let h = harness();
    for _ in 0..3 {
        assert!(h.service.login("rita@example.com", "wrong").await.is_err());
    }
    assert_eq!(h.service.lockout().failed_attempts(), 3);

    let profile = h.service.login("rita@example.com", "correct horse").await.unwrap();
    assert_eq!(profile.id, h.cast.requestor.id);
    assert_eq!(h.service.lockout().failed_attempts(), 0);
    assert_eq!(
        h.service.current_profile().await.unwrap().map(|p| p.id),
        Some(h.cast.requestor.id)
    );
}

#[tokio::test]
async fn fifth_failure_warns_tenth_locks_for_an_hour() {
    let h = harness();
    for _ in 0..4 {
        let err = h.service.login("rita@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, PortalError::Auth(AuthError::InvalidCredentials)));
    }
    let err = h.service.login("rita@example.com", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Auth(AuthError::LockoutWarning { remaining: 5 })
    ));

    for _ in 0..4 {
        h.service.login("rita@example.com", "wrong").await.unwrap_err();
    }
    let err = h.service.login("rita@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, PortalError::Auth(AuthError::LockedOut { .. })));
    let calls = h.auth.sign_in_calls();

    // even the right password is refused without asking the provider
    let err = h
        .service
        .login("rita@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Auth(AuthError::LockedOut { .. })));
    assert_eq!(h.auth.sign_in_calls(), calls);

    h.clock.advance(Duration::hours(1));
    assert!(h.service.login("rita@example.com", "correct horse").await.is_ok());
}

#[tokio::test]
async fn locked_client_never_calls_provider() {
    let cast = Cast::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let lockout = LoginLockout::new(
        LockoutPolicy::default(),
        clock,
        Arc::new(MemoryStore::new()),
    );
    for _ in 0..10 {
        lockout.record_failure();
    }

    let mut provider = MockProvider::new();
    provider.expect_sign_in().never();
    let service = AuthService::new(Arc::new(provider), seeded_backend(&cast), lockout);

    let err = service.login("ada@example.com", "anything").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn admin_login_rejects_and_signs_out_non_admins() {
    let h = harness();
    let err = h
        .service
        .admin_login("cy@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Auth(AuthError::AdminRequired)));
    assert_eq!(UserNotice::from(&err).redirect, Some("/admin-login"));
    assert!(h.auth.current().is_none());

    let admin = h
        .service
        .admin_login("ada@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(admin.id, h.cast.admin.id);
}

#[tokio::test]
async fn provider_outage_is_not_counted() {
    let cast = Cast::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let lockout = LoginLockout::new(LockoutPolicy::default(), clock, Arc::new(MemoryStore::new()));

    let mut provider = MockProvider::new();
    provider
        .expect_sign_in()
        .times(1)
        .returning(|_, _| Err(AuthError::Provider("503".into())));
    let service = AuthService::new(Arc::new(provider), seeded_backend(&cast), lockout);

    let err = service.login("ada@example.com", "pw").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(service.lockout().failed_attempts(), 0);
}

#[tokio::test]
async fn password_flows_validate_first() {
    let h = harness();
    let err = h.service.forgot_password("not-an-email").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    h.service.forgot_password("rita@example.com").await.unwrap();
    assert_eq!(h.auth.password_resets(), vec!["rita@example.com".to_string()]);

    h.service.login("rita@example.com", "correct horse").await.unwrap();
    let err = h.service.update_password("short", "short").await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::Validation(ValidationError::PasswordTooShort { min: 8 })
    ));
    h.service
        .update_password("a much longer one", "a much longer one")
        .await
        .unwrap();
    assert_eq!(h.auth.password_updates(), 1);

    h.service.logout().await.unwrap();
    assert!(h.service.current_profile().await.unwrap().is_none());
}

#[tokio::test]
async fn signup_validates_then_creates_session() {
    let h = harness();
    let mut form = SignupForm {
        full_name: "New Person".into(),
        email: "new@example.com".into(),
        password: "long enough".into(),
        confirm_password: "different".into(),
    };
    assert!(matches!(
        h.service.signup(&form).await,
        Err(PortalError::Validation(ValidationError::PasswordMismatch))
    ));

    form.confirm_password = form.password.clone();
    let session = h.service.signup(&form).await.unwrap();
    assert_eq!(session.email, "new@example.com");
}
