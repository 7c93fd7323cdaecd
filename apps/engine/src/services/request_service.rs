//! # Request Service
//!
//! Job creation, editing, quoting, status moves and tips.
//!
//! ## Write Path
//! ```text
//! load (live) ──► core rule on Job ──► JobRepository::update (CAS on version)
//!                                            │
//!                                            └── version moved? ──► Conflict
//! ```
//!
//! Reads (`preview_quote`, `get_job`) take no lock. Writes are optimistic:
//! the repository refuses a save whose version is stale, so two writers on
//! one job never lose each other's changes silently.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use moowwee_core::lifecycle::{create_job, generate_request_number};
use moowwee_core::tips;
use moowwee_core::{
    Actor, CoreError, Job, JobStatus, JobUpdate, NewJob, PriceBreakdown, PricingEngine, RouteInfo,
    TipInput, TipsDistribution,
};
use moowwee_db::Database;
use moowwee_routing::RouteResolver;

use crate::error::{EngineError, EngineResult};

/// Attempts at drawing an unused request number before giving up.
const REQUEST_NUMBER_ATTEMPTS: usize = 10;

/// Default page size for job listings.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// A priced job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub request_number: String,
    pub breakdown: PriceBreakdown,
    pub route: RouteInfo,
    /// Tier that produced the route (`routes_api`, `directions_api`,
    /// `haversine`).
    pub route_source: &'static str,
}

/// Orchestrates the job aggregate.
#[derive(Clone)]
pub struct RequestService {
    db: Database,
    resolver: Arc<RouteResolver>,
}

impl RequestService {
    pub fn new(db: Database, resolver: Arc<RouteResolver>) -> Self {
        RequestService { db, resolver }
    }

    // =========================================================================
    // Creation and Queries
    // =========================================================================

    /// Creates a pending job owned by `actor`.
    pub async fn create_job(&self, actor: &Actor, input: NewJob) -> EngineResult<Job> {
        let rates = self.db.rates().load().await?;
        let request_number = self.unused_request_number().await?;
        let job = create_job(input, actor, request_number, &rates, Utc::now())?;

        self.db.jobs().insert(&job).await?;

        info!(
            job = %job.request_number,
            user = %actor.user_id,
            stops = job.stops.len(),
            crew_size = job.crew_size,
            "Job created"
        );
        Ok(job)
    }

    async fn unused_request_number(&self) -> EngineResult<String> {
        for _ in 0..REQUEST_NUMBER_ATTEMPTS {
            let candidate = generate_request_number();
            if !self.db.jobs().number_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!(candidate = %candidate, "Request number taken, drawing again");
        }
        Err(EngineError::Internal(
            "could not allocate an unused request number".to_string(),
        ))
    }

    /// Loads a live job by id.
    pub async fn get_job(&self, id: &str) -> EngineResult<Job> {
        self.db
            .jobs()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Job", id))
    }

    /// Loads a live job by request number.
    pub async fn get_by_number(&self, request_number: &str) -> EngineResult<Job> {
        self.db
            .jobs()
            .get_by_number(request_number)
            .await?
            .ok_or_else(|| EngineError::not_found("Job", request_number))
    }

    /// Loads a job even if it was soft-deleted, for billing history.
    pub async fn get_for_billing(&self, id: &str) -> EngineResult<Job> {
        self.db
            .jobs()
            .get_including_deleted(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Job", id))
    }

    /// The actor's live jobs, newest first.
    pub async fn list_jobs(&self, actor: &Actor, limit: Option<u32>) -> EngineResult<Vec<Job>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        Ok(self.db.jobs().list_for_user(&actor.user_id, limit).await?)
    }

    // =========================================================================
    // Mutation Window
    // =========================================================================

    /// Applies a partial update to a pending job. Clears any stored quote.
    pub async fn update_job(&self, actor: &Actor, id: &str, update: JobUpdate) -> EngineResult<Job> {
        let mut job = self.get_job(id).await?;
        let rates = self.db.rates().load().await?;

        job.apply_update(actor, update, &rates, Utc::now())?;
        self.save(&mut job).await?;

        info!(job = %job.request_number, version = job.version, "Job updated");
        Ok(job)
    }

    /// Soft-deletes a job. The row stays for billing history.
    pub async fn delete_job(&self, actor: &Actor, id: &str) -> EngineResult<()> {
        let mut job = self.get_job(id).await?;

        job.mark_deleted(actor, Utc::now())?;
        self.save(&mut job).await?;

        info!(job = %job.request_number, user = %actor.user_id, "Job deleted");
        Ok(())
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Resolves the route and prices the job without storing anything.
    pub async fn preview_quote(&self, id: &str) -> EngineResult<Quote> {
        let job = self.get_job(id).await?;
        self.price(&job).await
    }

    /// Prices a pending job and stores the total on it.
    pub async fn quote(&self, id: &str) -> EngineResult<Quote> {
        let mut job = self.get_job(id).await?;
        if job.status != JobStatus::Pending {
            return Err(CoreError::state_conflict(
                &job.request_number,
                job.status,
                "store a quote",
            )
            .into());
        }

        let quote = self.price(&job).await?;
        job.set_quote(quote.breakdown.total, Utc::now())?;
        self.save(&mut job).await?;

        info!(
            job = %job.request_number,
            total = %quote.breakdown.total,
            route_source = quote.route_source,
            "Quote stored"
        );
        Ok(quote)
    }

    async fn price(&self, job: &Job) -> EngineResult<Quote> {
        let rates = self.db.rates().load().await?;
        let resolved = self.resolver.resolve(&job.itinerary()).await;
        let breakdown = PricingEngine::new(&rates).quote(job, &resolved.route);

        if breakdown.has_warnings() {
            warn!(
                job = %job.request_number,
                clamped_lines = breakdown.warnings.len(),
                "Quote priced with clamped lines; check the rate configuration"
            );
        }

        Ok(Quote {
            request_number: job.request_number.clone(),
            breakdown,
            route: resolved.route,
            route_source: resolved.source,
        })
    }

    // =========================================================================
    // Operational Axis
    // =========================================================================

    /// Moves the job's operational status.
    ///
    /// Reapplying `completed` to a completed job is accepted and writes
    /// nothing.
    pub async fn transition(&self, id: &str, to: JobStatus) -> EngineResult<Job> {
        let mut job = self.get_job(id).await?;
        let from = job.status;

        if !job.transition_to(to, Utc::now())? {
            debug!(job = %job.request_number, status = %to, "Transition is a no-op");
            return Ok(job);
        }
        self.save(&mut job).await?;

        info!(job = %job.request_number, from = %from, to = %to, "Status changed");
        Ok(job)
    }

    // =========================================================================
    // Tips
    // =========================================================================

    /// Computes a tips distribution for the job's crew without saving it.
    pub async fn calculate_tips(&self, id: &str, input: TipInput) -> EngineResult<TipsDistribution> {
        let job = self.get_job(id).await?;
        Ok(tips::calculate(&job, input, job.crew_size)?)
    }

    /// Computes and saves a tips distribution. Owner only, completed jobs
    /// only.
    pub async fn save_tips(
        &self,
        actor: &Actor,
        id: &str,
        input: TipInput,
    ) -> EngineResult<Job> {
        let mut job = self.get_job(id).await?;
        job.ensure_tips_recordable(actor)?;
        let distribution = tips::calculate(&job, input, job.crew_size)?;

        job.record_tips(actor, distribution, Utc::now())?;
        self.save(&mut job).await?;

        if let Some(saved) = &job.tips {
            info!(
                job = %job.request_number,
                amount = %saved.tips_amount,
                percentage = %saved.tips_percentage,
                shares = saved.shares.len(),
                "Tips saved"
            );
        }
        Ok(job)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    async fn save(&self, job: &mut Job) -> EngineResult<()> {
        job.version = self.db.jobs().update(job).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
