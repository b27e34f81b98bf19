//! In-memory stand-ins for the hosted backend and auth service

use advisory_core::{AuthError, AuthProvider, BackendError, CatalogRecord, CatalogSet, PortalBackend, Session};
use advisory_model::{
    AdvisoryTeamMember, AssigneeHistoryEntry, CatalogEntry, Comment, CompletionRecord, Profile,
    Request, RequestId, RequestRow, UserId,
};
use async_trait::async_trait;
use chrono::Datelike;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Backend held in process memory
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    requests: DashMap<RequestId, RequestRow>,
    comments: Mutex<Vec<Comment>>,
    catalog: RwLock<CatalogSet>,
    profiles: DashMap<UserId, Profile>,
    team: DashMap<UserId, AdvisoryTeamMember>,
    ledger: Mutex<Vec<AssigneeHistoryEntry>>,
    completions: Mutex<Vec<CompletionRecord>>,
    settings: DashMap<String, String>,
    offline: AtomicBool,
    reject_completions: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn add_team_member(&self, member: AdvisoryTeamMember) {
        self.team.insert(member.user_id, member);
    }

    pub fn set_catalog(&self, catalog: CatalogSet) {
        *self.catalog.write() = catalog;
    }

    pub fn catalog(&self) -> CatalogSet {
        self.catalog.read().clone()
    }

    pub fn seed_request(&self, request: &Request) {
        self.requests.insert(request.id, RequestRow::from(request));
    }

    pub fn seed_row(&self, row: RequestRow) {
        self.requests.insert(row.id, row);
    }

    pub fn row(&self, id: RequestId) -> Option<RequestRow> {
        self.requests.get(&id).map(|r| r.value().clone())
    }

    pub fn stored(&self, id: RequestId) -> Option<Request> {
        self.row(id).and_then(|row| Request::try_from(row).ok())
    }

    pub fn ledger(&self) -> Vec<AssigneeHistoryEntry> {
        self.ledger.lock().clone()
    }

    pub fn completion_log(&self) -> Vec<CompletionRecord> {
        self.completions.lock().clone()
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).map(|v| v.value().clone())
    }

    /// Make every call fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail only completion appends, leaving every other call working
    pub fn set_reject_completions(&self, reject: bool) {
        self.reject_completions.store(reject, Ordering::SeqCst);
    }

    fn online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("backend offline".into()))
        } else {
            Ok(())
        }
    }
}

fn upsert<T: CatalogEntry>(rows: &mut Vec<T>, row: T) {
    match rows.iter_mut().find(|r| r.id() == row.id()) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

#[async_trait]
impl PortalBackend for InMemoryBackend {
    async fn list_requests(&self) -> Result<Vec<RequestRow>, BackendError> {
        self.online()?;
        Ok(self.requests.iter().map(|r| r.value().clone()).collect())
    }

    async fn fetch_request(&self, id: RequestId) -> Result<Option<RequestRow>, BackendError> {
        self.online()?;
        Ok(self.row(id))
    }

    async fn insert_request(&self, row: RequestRow) -> Result<(), BackendError> {
        self.online()?;
        self.requests.insert(row.id, row);
        Ok(())
    }

    async fn update_request(&self, row: RequestRow) -> Result<(), BackendError> {
        self.online()?;
        if !self.requests.contains_key(&row.id) {
            return Err(BackendError::NotFound {
                entity: "request",
                id: row.id.to_string(),
            });
        }
        self.requests.insert(row.id, row);
        Ok(())
    }

    async fn count_requests_in_year(&self, year: i32) -> Result<u32, BackendError> {
        self.online()?;
        let count = self
            .requests
            .iter()
            .filter(|r| r.submission_date.year() == year)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list_comments(&self, request_id: RequestId) -> Result<Vec<Comment>, BackendError> {
        self.online()?;
        Ok(self
            .comments
            .lock()
            .iter()
            .filter(|c| c.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn insert_comment(&self, comment: Comment) -> Result<(), BackendError> {
        self.online()?;
        self.comments.lock().push(comment);
        Ok(())
    }

    async fn fetch_catalog(&self) -> Result<CatalogSet, BackendError> {
        self.online()?;
        Ok(self.catalog())
    }

    async fn upsert_catalog(&self, record: CatalogRecord) -> Result<(), BackendError> {
        self.online()?;
        let mut catalog = self.catalog.write();
        match record {
            CatalogRecord::Service(row) => upsert(&mut catalog.services, row),
            CatalogRecord::Offering(row) => upsert(&mut catalog.offerings, row),
            CatalogRecord::Activity(row) => upsert(&mut catalog.activities, row),
            CatalogRecord::SubActivity(row) => upsert(&mut catalog.sub_activities, row),
            CatalogRecord::Dropdown(row) => upsert(&mut catalog.dropdowns, row),
        }
        Ok(())
    }

    async fn fetch_profile(&self, id: UserId) -> Result<Option<Profile>, BackendError> {
        self.online()?;
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        self.online()?;
        Ok(self.profiles.iter().map(|p| p.value().clone()).collect())
    }

    async fn team_members(&self) -> Result<Vec<AdvisoryTeamMember>, BackendError> {
        self.online()?;
        Ok(self.team.iter().map(|m| m.value().clone()).collect())
    }

    async fn update_team_member(&self, member: AdvisoryTeamMember) -> Result<(), BackendError> {
        self.online()?;
        self.team.insert(member.user_id, member);
        Ok(())
    }

    async fn append_assignee_history(&self, entry: AssigneeHistoryEntry) -> Result<(), BackendError> {
        self.online()?;
        self.ledger.lock().push(entry);
        Ok(())
    }

    async fn assignee_history(&self) -> Result<Vec<AssigneeHistoryEntry>, BackendError> {
        self.online()?;
        Ok(self.ledger())
    }

    async fn append_completion(&self, record: CompletionRecord) -> Result<(), BackendError> {
        self.online()?;
        if self.reject_completions.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("completion history write failed".into()));
        }
        self.completions.lock().push(record);
        Ok(())
    }

    async fn completions(&self, request_id: RequestId) -> Result<Vec<CompletionRecord>, BackendError> {
        self.online()?;
        Ok(self
            .completions
            .lock()
            .iter()
            .filter(|c| c.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.online()?;
        Ok(self.setting(key))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.online()?;
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Auth service held in process memory
#[derive(Debug, Default)]
pub struct InMemoryAuth {
    accounts: DashMap<String, (String, UserId)>,
    session: Mutex<Option<Session>>,
    sign_in_calls: AtomicUsize,
    password_resets: Mutex<Vec<String>>,
    password_updates: AtomicUsize,
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, email: &str, password: &str, user_id: UserId) {
        self.accounts
            .insert(email.to_lowercase(), (password.to_string(), user_id));
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn password_resets(&self) -> Vec<String> {
        self.password_resets.lock().clone()
    }

    pub fn password_updates(&self) -> usize {
        self.password_updates.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Session> {
        self.session.lock().clone()
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let email = email.to_lowercase();
        let account = self.accounts.get(&email).map(|a| a.value().clone());
        match account {
            Some((stored, user_id)) if stored == password => {
                let session = Session { user_id, email };
                *self.session.lock() = Some(session.clone());
                Ok(session)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, _full_name: &str, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.to_lowercase();
        if self.accounts.contains_key(&email) {
            return Err(AuthError::Provider("user already registered".into()));
        }
        let user_id = UserId::new();
        self.accounts.insert(email.clone(), (password.to_string(), user_id));
        let session = Session { user_id, email };
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }

    async fn session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.current())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.session.lock() = None;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.password_resets.lock().push(email.to_string());
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        let session = self.current().ok_or(AuthError::NotAuthenticated)?;
        if let Some(mut account) = self.accounts.get_mut(&session.email) {
            account.0 = new_password.to_string();
        }
        self.password_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
