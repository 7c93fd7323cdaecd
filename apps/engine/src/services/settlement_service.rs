//! # Settlement Service
//!
//! Drives the payment and tips axes through the checkout gateway.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  start_payment(actor, job)                                              │
//! │    payable_amount ──► gateway.create_session ──► store session id       │
//! │                                                                         │
//! │  confirm_payment(job, session)                                          │
//! │    gateway.retrieve_session                                             │
//! │       ├── error ───────────────► SettlementFailed, job untouched        │
//! │       ├── status != paid ──────► SettlementFailed, job untouched        │
//! │       ├── not the stored session ► SettlementFailed, job untouched     │
//! │       ├── other job's session ─► SettlementFailed, job untouched        │
//! │       ├── amount or currency off ► SettlementFailed, job untouched     │
//! │       └── paid ────────────────► payment_status = paid                  │
//! │                                                                         │
//! │  start_tips_payment / confirm_tips_payment: same shape, tips axis       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use moowwee_core::{Actor, Job, Money, PaymentStatus, TipsPaymentStatus};
use moowwee_db::Database;

use crate::error::{EngineError, EngineResult};
use crate::payment::{CheckoutGateway, CheckoutRequest, SessionStatus};

/// A checkout the customer still has to complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub request_number: String,
    pub session_id: String,
    pub redirect_url: String,
}

pub struct SettlementService {
    db: Database,
    gateway: Arc<dyn CheckoutGateway>,
    currency: String,
}

impl SettlementService {
    pub fn new(db: Database, gateway: Arc<dyn CheckoutGateway>, currency: impl Into<String>) -> Self {
        SettlementService {
            db,
            gateway,
            currency: currency.into(),
        }
    }

    // =========================================================================
    // Payment Axis
    // =========================================================================

    /// Opens a checkout session for the job's quoted price.
    pub async fn start_payment(&self, actor: &Actor, job_id: &str) -> EngineResult<PaymentSession> {
        let mut job = self.load(job_id).await?;
        let amount = job.payable_amount(actor)?;

        let request = CheckoutRequest::for_price(amount, &self.currency, &job.request_number);
        let session = self.gateway.create_session(&request).await?;

        job.attach_payment_session(session.session_id.clone(), Utc::now());
        self.save(&mut job).await?;

        info!(
            job = %job.request_number,
            amount = %amount,
            session_id = %session.session_id,
            "Payment session opened"
        );
        Ok(PaymentSession {
            request_number: job.request_number,
            session_id: session.session_id,
            redirect_url: session.redirect_url,
        })
    }

    /// Marks the job paid if the processor reports the session as paid.
    pub async fn confirm_payment(&self, job_id: &str, session_id: &str) -> EngineResult<Job> {
        let mut job = self.load(job_id).await?;
        if job.payment_status == PaymentStatus::Paid {
            debug!(job = %job.request_number, "Payment already confirmed");
            return Ok(job);
        }

        let expected = Expected {
            axis: "payment",
            session_id: job.payment_session_id.as_deref(),
            amount: job.price,
            currency: &self.currency,
        };
        expected.check_request(&job, session_id)?;
        let status = self.gateway.retrieve_session(session_id).await?;
        expected.check_status(&job, &status)?;

        if job.mark_paid(Utc::now())? {
            self.save(&mut job).await?;
            info!(job = %job.request_number, amount = %status.amount, "Payment confirmed");
        }
        Ok(job)
    }

    // =========================================================================
    // Tips Axis
    // =========================================================================

    /// Opens a checkout session for the job's saved tips.
    pub async fn start_tips_payment(
        &self,
        actor: &Actor,
        job_id: &str,
    ) -> EngineResult<PaymentSession> {
        let mut job = self.load(job_id).await?;
        let amount = job.payable_tips(actor)?;

        let request = CheckoutRequest::for_tips(amount, &self.currency, &job.request_number);
        let session = self.gateway.create_session(&request).await?;

        job.attach_tips_session(session.session_id.clone(), Utc::now());
        self.save(&mut job).await?;

        info!(
            job = %job.request_number,
            amount = %amount,
            session_id = %session.session_id,
            "Tips session opened"
        );
        Ok(PaymentSession {
            request_number: job.request_number,
            session_id: session.session_id,
            redirect_url: session.redirect_url,
        })
    }

    /// Marks the tips paid if the processor reports the session as paid.
    pub async fn confirm_tips_payment(&self, job_id: &str, session_id: &str) -> EngineResult<Job> {
        let mut job = self.load(job_id).await?;
        if job.tips_payment_status == TipsPaymentStatus::Paid {
            debug!(job = %job.request_number, "Tips payment already confirmed");
            return Ok(job);
        }

        let expected = Expected {
            axis: "tips",
            session_id: job.tips_session_id.as_deref(),
            amount: job.tips.as_ref().map(|t| t.tips_amount),
            currency: &self.currency,
        };
        expected.check_request(&job, session_id)?;
        let status = self.gateway.retrieve_session(session_id).await?;
        expected.check_status(&job, &status)?;

        if job.mark_tips_paid(Utc::now())? {
            self.save(&mut job).await?;
            info!(job = %job.request_number, amount = %status.amount, "Tips payment confirmed");
        }
        Ok(job)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, job_id: &str) -> EngineResult<Job> {
        self.db
            .jobs()
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Job", job_id))
    }

    async fn save(&self, job: &mut Job) -> EngineResult<()> {
        job.version = self.db.jobs().update(job).await?;
        Ok(())
    }
}

/// What a processor session must show to settle one axis of a job.
struct Expected<'a> {
    axis: &'static str,
    /// Session stored when the checkout was opened.
    session_id: Option<&'a str>,
    amount: Option<Money>,
    currency: &'a str,
}

impl Expected<'_> {
    /// Only the session this job opened for this axis may be confirmed.
    fn check_request(&self, job: &Job, session_id: &str) -> EngineResult<()> {
        match self.session_id {
            Some(stored) if stored == session_id => Ok(()),
            Some(stored) => Err(reject(
                job,
                session_id,
                format!("session {} is not the {} session {}", session_id, self.axis, stored),
            )),
            None => Err(reject(
                job,
                session_id,
                format!("no {} checkout was opened", self.axis),
            )),
        }
    }

    fn check_status(&self, job: &Job, status: &SessionStatus) -> EngineResult<()> {
        if status.reference.as_deref() != Some(job.request_number.as_str()) {
            return Err(reject(
                job,
                &status.session_id,
                format!(
                    "session reference {:?} does not match {}",
                    status.reference, job.request_number
                ),
            ));
        }

        if !status.is_paid() {
            return Err(reject(
                job,
                &status.session_id,
                format!("payment status is {}", status.payment_status),
            ));
        }

        if self.amount != Some(status.amount) {
            return Err(reject(
                job,
                &status.session_id,
                format!("session charged {} for the {} axis", status.amount, self.axis),
            ));
        }

        if !status.currency.eq_ignore_ascii_case(self.currency) {
            return Err(reject(
                job,
                &status.session_id,
                format!("session currency {} is not {}", status.currency, self.currency),
            ));
        }

        Ok(())
    }
}

fn reject(job: &Job, session_id: &str, reason: String) -> EngineError {
    warn!(
        job = %job.request_number,
        session_id = %session_id,
        reason = %reason,
        "Checkout session rejected"
    );
    EngineError::SettlementRejected(reason)
}

// =============================================================================
// Unit Tests
// =============================================================================
