//! Anonymous request-form drafts kept in client-local storage

use crate::local::{Clock, LocalStore};
use advisory_model::NewRequest;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DRAFT_KEY: &str = "request_form_draft";

#[derive(Debug, Serialize, Deserialize)]
struct StoredDraft {
    form: NewRequest,
    expires_at: DateTime<Utc>,
}

/// Draft of the request form with an expiry
pub struct DraftStore {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    store: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl DraftStore {
    /// Create with a lifetime (24 hours by default configuration)
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>, store: Arc<dyn LocalStore>) -> Self {
        Self { ttl, clock, store }
    }

    /// Save, restarting the expiry
    pub fn save(&self, form: &NewRequest) {
        let draft = StoredDraft {
            form: form.clone(),
            expires_at: self
                .clock
                .now()
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        match serde_json::to_string(&draft) {
            Ok(raw) => self.store.set(DRAFT_KEY, raw),
            Err(e) => tracing::warn!(error = %e, "cannot persist request draft"),
        }
    }

    /// Load a live draft; expired or unreadable drafts are deleted
    #[must_use]
    pub fn load(&self) -> Option<NewRequest> {
        let raw = self.store.get(DRAFT_KEY)?;
        match serde_json::from_str::<StoredDraft>(&raw) {
            Ok(draft) if self.clock.now() < draft.expires_at => Some(draft.form),
            Ok(_) => {
                tracing::debug!("request draft expired");
                self.clear();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable request draft");
                self.clear();
                None
            }
        }
    }

    /// Delete the draft, e.g. after submission
    pub fn clear(&self) {
        self.store.remove(DRAFT_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{ManualClock, MemoryStore};
    use pretty_assertions::assert_eq;

    fn setup() -> (Arc<ManualClock>, Arc<MemoryStore>, DraftStore) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryStore::new());
        let drafts = DraftStore::new(Duration::hours(24), clock.clone(), store.clone());
        (clock, store, drafts)
    }

    #[test]
    fn draft_lives_for_a_day() {
        let (clock, store, drafts) = setup();
        let form = NewRequest::new("Half-typed description").with_service("svc");
        drafts.save(&form);

        clock.advance(Duration::hours(23));
        assert_eq!(drafts.load(), Some(form));

        clock.advance(Duration::hours(1));
        assert_eq!(drafts.load(), None);
        assert_eq!(store.get(DRAFT_KEY), None);
    }

    #[test]
    fn saving_again_extends_expiry() {
        let (clock, _, drafts) = setup();
        drafts.save(&NewRequest::new("first"));
        clock.advance(Duration::hours(20));
        drafts.save(&NewRequest::new("second"));
        clock.advance(Duration::hours(20));
        assert_eq!(drafts.load().map(|f| f.description), Some("second".to_string()));
    }

    #[test]
    fn garbage_is_discarded() {
        let (_, store, drafts) = setup();
        store.set(DRAFT_KEY, "{".into());
        assert_eq!(drafts.load(), None);
        assert_eq!(store.get(DRAFT_KEY), None);
    }
}
