//! Request service
//!
//! Orchestrates one user action at a time: fetch the rows it needs, run the
//! pure workflow or estimation logic, then write the results back. A failed
//! step abandons the action; nothing is retried.

use crate::admin::require_admin;
use crate::backend::{CatalogSet, PortalBackend};
use crate::config::PortalConfig;
use crate::error::{BackendError, PortalError};
use crate::views::{my_items, my_queue, my_requests, CatalogMaps, DashboardStats, RequestFilter, RequestSummary};
use advisory_estimation::{CatalogSnapshot, HoursAggregator};
use advisory_model::{
    CatalogId, Comment, NewRequest, Profile, Request, RequestId, RequestNumber, RequestRow,
    RequestStatus, UserId,
};
use advisory_workflow::{
    apply_transition, legal_next_states, reassign, save_estimation, set_billability, ActorContext,
    FreezeInputs, Guard, TransitionContext, TransitionOutcome, WorkflowError,
};
use chrono::{Datelike, NaiveDate, Utc};
use std::sync::Arc;

/// Catalog data fetched once for a view or action
struct ViewData {
    catalog: CatalogSnapshot,
    maps: CatalogMaps,
}

/// Request lifecycle operations backed by a [`PortalBackend`]
#[derive(Clone)]
pub struct RequestService {
    backend: Arc<dyn PortalBackend>,
    config: PortalConfig,
}

impl std::fmt::Debug for RequestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestService {
    /// Create a service
    #[must_use]
    pub fn new(backend: Arc<dyn PortalBackend>, config: PortalConfig) -> Self {
        Self { backend, config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    fn aggregator<'a>(&self, catalog: &'a CatalogSnapshot) -> HoursAggregator<'a, CatalogSnapshot> {
        HoursAggregator::new(catalog)
            .with_precedence(self.config.shape_precedence)
            .with_hours_per_day(self.config.hours_per_day)
    }

    async fn view_data(&self) -> Result<ViewData, PortalError> {
        let catalog: CatalogSet = self.backend.fetch_catalog().await?;
        let profiles = self.backend.list_profiles().await?;
        let roster = self.backend.team_members().await?;
        Ok(ViewData {
            catalog: catalog.sub_activity_hours(),
            maps: CatalogMaps::new(&catalog, &profiles).with_roster(&roster),
        })
    }

    /// Load one request
    ///
    /// # Errors
    /// Missing or inconsistent row, or backend failure.
    pub async fn load(&self, id: RequestId) -> Result<Request, PortalError> {
        let row = self
            .backend
            .fetch_request(id)
            .await?
            .ok_or_else(|| PortalError::not_found("request", id))?;
        Request::try_from(row).map_err(|e| BackendError::Corrupt(e).into())
    }

    /// Every visible request; rows that fail to map are skipped
    ///
    /// # Errors
    /// Backend failure.
    pub async fn list(&self) -> Result<Vec<Request>, PortalError> {
        let rows = self.backend.list_requests().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                Request::try_from(row)
                    .map_err(|e| tracing::warn!(request = %id, error = %e, "skipping inconsistent request row"))
                    .ok()
            })
            .collect())
    }

    async fn store(&self, request: &Request) -> Result<(), PortalError> {
        self.backend.update_request(RequestRow::from(request)).await?;
        Ok(())
    }

    /// Create a request from the submission form
    ///
    /// # Errors
    /// Form validation or backend failure.
    pub async fn submit(&self, requestor: &Profile, form: NewRequest) -> Result<Request, PortalError> {
        form.validate()?;
        let now = Utc::now();
        let year = now.year();
        let sequence = self.backend.count_requests_in_year(year).await? + 1;
        let request = form.into_request(requestor.id, RequestNumber::format(year, sequence), now)?;
        self.backend.insert_request(RequestRow::from(&request)).await?;
        tracing::info!(request = %request.request_number, requestor = %requestor.id, status = %request.status, "request created");
        Ok(request)
    }

    /// Statuses `actor` may choose next
    ///
    /// # Errors
    /// Loading failure.
    pub async fn next_statuses(&self, actor: &Profile, id: RequestId) -> Result<Vec<RequestStatus>, PortalError> {
        let request = self.load(id).await?;
        let ctx = ActorContext::for_request(actor, &request);
        Ok(legal_next_states(request.status, &ctx))
    }

    /// Live totals plus the assignee's rate and title from the team roster.
    ///
    /// An assignee missing from the roster falls back to their profile.
    async fn freeze_inputs(&self, request: &Request) -> Result<FreezeInputs, PortalError> {
        let catalog = self.backend.fetch_catalog().await?.sub_activity_hours();
        let aggregator = self.aggregator(&catalog);
        let Some(assignee) = request.assignee_id else {
            return Ok(FreezeInputs::new(aggregator.for_request(request, 0.0), None));
        };

        let roster = self.backend.team_members().await?;
        if let Some(member) = roster.iter().find(|m| m.user_id == assignee) {
            let rate = member.rate_per_hour.unwrap_or(0.0);
            return Ok(FreezeInputs::from_roster(aggregator.for_request(request, rate), member));
        }

        let profile = self.backend.fetch_profile(assignee).await?;
        let rate = profile.as_ref().and_then(|p| p.rate_per_hour).unwrap_or(0.0);
        Ok(FreezeInputs::new(aggregator.for_request(request, rate), profile.as_ref()))
    }

    /// Change status and persist the side effects
    ///
    /// # Errors
    /// Workflow refusal, loading or backend failure.
    pub async fn transition(
        &self,
        actor: &Profile,
        id: RequestId,
        to: RequestStatus,
    ) -> Result<TransitionOutcome, PortalError> {
        let request = self.load(id).await?;
        let ctx = ActorContext::for_request(actor, &request);
        let mut transition_ctx = TransitionContext::new(Utc::now());
        if request.status == RequestStatus::Estimation && to == RequestStatus::Review {
            transition_ctx = transition_ctx.with_freeze(self.freeze_inputs(&request).await?);
        }

        let outcome = apply_transition(&request, &ctx, to, &transition_ctx)?;
        // history first: a terminal status without its completion row cannot be repaired
        if let Some(record) = outcome.completion() {
            self.backend.append_completion(record.clone()).await?;
        }
        self.store(&outcome.request).await?;
        Ok(outcome)
    }

    /// Re-save the estimate while in Estimation
    ///
    /// # Errors
    /// Workflow refusal, loading or backend failure.
    pub async fn save_estimation(&self, actor: &Profile, id: RequestId) -> Result<Request, PortalError> {
        let request = self.load(id).await?;
        let ctx = ActorContext::for_request(actor, &request);
        let freeze = self.freeze_inputs(&request).await?;
        let updated = save_estimation(&request, &ctx, &freeze, Utc::now())?;
        self.store(&updated).await?;
        Ok(updated)
    }

    /// Record the assignee's billability percentage
    ///
    /// # Errors
    /// Workflow refusal (including invalid input), loading or backend failure.
    pub async fn set_billability(&self, actor: &Profile, id: RequestId, raw: &str) -> Result<Request, PortalError> {
        let request = self.load(id).await?;
        let ctx = ActorContext::for_request(actor, &request);
        let updated = set_billability(&request, &ctx, raw, Utc::now())?;
        self.store(&updated).await?;
        Ok(updated)
    }

    /// Hand the request to another consultant
    ///
    /// # Errors
    /// Workflow refusal, unknown assignee, loading or backend failure.
    pub async fn reassign(&self, actor: &Profile, id: RequestId, assignee: UserId) -> Result<Request, PortalError> {
        let request = self.load(id).await?;
        let new_assignee = self
            .backend
            .fetch_profile(assignee)
            .await?
            .ok_or_else(|| PortalError::not_found("profile", assignee))?;
        let ctx = ActorContext::for_request(actor, &request);
        let outcome = reassign(&request, &ctx, &new_assignee, Utc::now())?;
        if let Some(entry) = outcome.ledger_entry {
            self.backend.append_assignee_history(entry).await?;
        }
        self.store(&outcome.request).await?;
        Ok(outcome.request)
    }

    /// Tick or untick a day for a sub-activity
    ///
    /// # Errors
    /// Not in an implementation status, not the assignee or an admin, or backend failure.
    pub async fn mark_timesheet(
        &self,
        actor: &Profile,
        id: RequestId,
        sub_activity: CatalogId,
        day: NaiveDate,
        completed: bool,
    ) -> Result<Request, PortalError> {
        let mut request = self.load(id).await?;
        let ctx = ActorContext::for_request(actor, &request);
        if !Guard::AssigneeOrAdmin.permits(&ctx) {
            return Err(WorkflowError::NotPermitted {
                action: "update the timesheet",
                required: Guard::AssigneeOrAdmin,
            }
            .into());
        }
        if !matches!(
            request.status,
            RequestStatus::Implementing | RequestStatus::AwaitingFeedback | RequestStatus::FeedbackReceived
        ) {
            return Err(WorkflowError::TimesheetNotEditable {
                status: request.status,
            }
            .into());
        }
        request.timesheet_data.mark(sub_activity, day, completed);
        request.touch(Utc::now());
        self.store(&request).await?;
        Ok(request)
    }

    /// Add a comment
    ///
    /// # Errors
    /// Empty body, unknown request or backend failure.
    pub async fn add_comment(&self, author: &Profile, id: RequestId, body: &str) -> Result<Comment, PortalError> {
        let request = self.load(id).await?;
        let comment = Comment::new(request.id, author.id, body.trim(), Utc::now())?;
        self.backend.insert_comment(comment.clone()).await?;
        tracing::debug!(request = %request.request_number, author = %author.id, "comment added");
        Ok(comment)
    }

    /// Comments, oldest first
    ///
    /// # Errors
    /// Backend failure.
    pub async fn comments(&self, id: RequestId) -> Result<Vec<Comment>, PortalError> {
        let mut comments = self.backend.list_comments(id).await?;
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn summaries<'a>(&self, requests: impl IntoIterator<Item = &'a Request>) -> Result<Vec<RequestSummary>, PortalError> {
        let data = self.view_data().await?;
        let aggregator = self.aggregator(&data.catalog);
        Ok(requests
            .into_iter()
            .map(|r| RequestSummary::build(r, &data.maps, &aggregator))
            .collect())
    }

    /// One request as a list row, with frozen or live totals
    ///
    /// # Errors
    /// Loading or backend failure.
    pub async fn summary(&self, id: RequestId) -> Result<RequestSummary, PortalError> {
        let request = self.load(id).await?;
        let mut rows = self.summaries([&request]).await?;
        rows.pop().ok_or_else(|| PortalError::not_found("request", id))
    }

    /// Filtered list, newest first
    ///
    /// # Errors
    /// Backend failure.
    pub async fn search(&self, filter: &RequestFilter) -> Result<Vec<RequestSummary>, PortalError> {
        let requests = self.list().await?;
        Ok(filter.apply(self.summaries(&requests).await?))
    }

    /// Requests the user submitted
    ///
    /// # Errors
    /// Backend failure.
    pub async fn my_requests(&self, user: UserId) -> Result<Vec<RequestSummary>, PortalError> {
        let requests = self.list().await?;
        let rows = self.summaries(my_requests(&requests, user)).await?;
        Ok(RequestFilter::new().apply(rows))
    }

    /// Requests assigned to the user
    ///
    /// # Errors
    /// Backend failure.
    pub async fn my_items(&self, user: UserId) -> Result<Vec<RequestSummary>, PortalError> {
        let requests = self.list().await?;
        let rows = self.summaries(my_items(&requests, user)).await?;
        Ok(RequestFilter::new().apply(rows))
    }

    /// Requests the user handed on
    ///
    /// # Errors
    /// Backend failure.
    pub async fn my_queue(&self, user: UserId) -> Result<Vec<RequestSummary>, PortalError> {
        let requests = self.list().await?;
        let ledger = self.backend.assignee_history().await?;
        let rows = self.summaries(my_queue(&requests, &ledger, user)).await?;
        Ok(RequestFilter::new().apply(rows))
    }

    /// Admin dashboard figures
    ///
    /// # Errors
    /// Authorization or backend failure.
    pub async fn admin_dashboard(&self, actor: &Profile) -> Result<DashboardStats, PortalError> {
        require_admin(actor)?;
        let requests = self.list().await?;
        let rows = self.summaries(&requests).await?;
        Ok(DashboardStats::from_rows(&rows))
    }
}
