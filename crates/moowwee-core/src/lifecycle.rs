//! # Request Lifecycle
//!
//! State machine over a job's three independent axes.
//!
//! ## Operational Axis
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ──► confirmed ──► active ──► completed ─┐                     │
//! │      │            │         │   ▲          ▲      │ (no-op)             │
//! │      │            │         ▼   │          └──────┘                     │
//! │      │            │         break                                       │
//! │      │            │           │                                         │
//! │      ▼            ▼           ▼ (via active only)                       │
//! │   cancelled ◄─────┴───────── active                                     │
//! │   (terminal)                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Axis
//! `unpaid → paid`, only on a confirmed settlement. Never regresses.
//!
//! ## Tips Axis
//! `pending → paid`. Tips can be recorded only once the job is `completed`.
//!
//! ## Mutation Window
//! Stops, materials, crew size, schedule and property details change only
//! while the job is `pending`. Any change clears a stored quote.
//!
//! Persisting the result (and bumping `version`) is the repository's job;
//! everything here is pure.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    Actor, Job, JobStatus, JobUpdate, NewJob, PaymentStatus, RateConfiguration, TipsDistribution,
    TipsPaymentStatus,
};
use crate::validation::{
    validate_crew_size, validate_material_requests, validate_new_job, validate_stops,
};
use crate::{REQUEST_NUMBER_LENGTH, REQUEST_NUMBER_PREFIX};

const REQUEST_NUMBER_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// =============================================================================
// Transition Table
// =============================================================================

impl JobStatus {
    /// Returns true if the operational axis may move from `self` to `to`.
    ///
    /// `completed → completed` is accepted as an idempotent no-op; every
    /// other same-state move is rejected.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Confirmed, Active)
                | (Active, Break)
                | (Break, Active)
                | (Active, Completed)
                | (Completed, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Active, Cancelled)
        )
    }
}

// =============================================================================
// Creation
// =============================================================================

/// Generates a candidate request number (`REQ-7GQ2K9XA`).
///
/// Uniqueness is checked by the caller against storage.
pub fn generate_request_number() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let suffix: String = bytes
        .iter()
        .take(REQUEST_NUMBER_LENGTH)
        .map(|b| REQUEST_NUMBER_ALPHABET[(*b as usize) % REQUEST_NUMBER_ALPHABET.len()] as char)
        .collect();
    format!("{}-{}", REQUEST_NUMBER_PREFIX, suffix)
}

/// Builds a validated `pending` job owned by `owner`.
///
/// Material lines referencing the catalog snapshot its current prices.
pub fn create_job(
    input: NewJob,
    owner: &Actor,
    request_number: String,
    rates: &RateConfiguration,
    now: DateTime<Utc>,
) -> CoreResult<Job> {
    validate_new_job(&input)?;
    let materials = rates.snapshot_materials(&input.materials)?;

    Ok(Job {
        id: Uuid::new_v4().to_string(),
        request_number,
        user_id: owner.user_id.clone(),
        operator_id: None,
        property_type: input.property_type,
        square_feet: input.square_feet,
        floor_count: input.floor_count,
        additional_objects: input.additional_objects,
        package: input.package,
        crew_size: input.crew_size,
        departure_time: input.departure_time,
        estimated_duration_minutes: input.estimated_duration_minutes,
        stops: input.stops,
        materials,
        price: None,
        status: JobStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        payment_session_id: None,
        tips: None,
        tips_payment_status: TipsPaymentStatus::Pending,
        tips_session_id: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        version: 1,
    })
}

// =============================================================================
// Guards
// =============================================================================

impl Job {
    fn ensure_live(&self) -> CoreResult<()> {
        if self.is_deleted() {
            return Err(CoreError::Deleted {
                job: self.request_number.clone(),
            });
        }
        Ok(())
    }

    fn ensure_owner(&self, actor: &Actor, operation: &str) -> CoreResult<()> {
        if !self.is_owned_by(actor) {
            return Err(CoreError::unauthorized(
                &self.request_number,
                &actor.user_id,
                operation,
            ));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: JobStatus, operation: &str) -> CoreResult<()> {
        if self.status != expected {
            return Err(CoreError::state_conflict(
                &self.request_number,
                self.status,
                operation,
            ));
        }
        Ok(())
    }

    /// Returns true while stops, materials and schedule may still change.
    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.status == JobStatus::Pending && !self.is_deleted()
    }

    // =========================================================================
    // Mutation Window
    // =========================================================================

    /// Applies a partial update to a pending job.
    ///
    /// Stop and material lists are replaced as a whole. A stored quote is
    /// cleared whenever anything changes.
    pub fn apply_update(
        &mut self,
        actor: &Actor,
        update: JobUpdate,
        rates: &RateConfiguration,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_live()?;
        self.ensure_owner(actor, "update job")?;
        self.ensure_status(JobStatus::Pending, "update job")?;

        if update.is_empty() {
            return Ok(());
        }

        if let Some(crew_size) = update.crew_size {
            validate_crew_size(crew_size)?;
        }
        if let Some(stops) = &update.stops {
            validate_stops(stops)?;
        }
        let materials = match &update.materials {
            Some(requests) => {
                validate_material_requests(requests)?;
                Some(rates.snapshot_materials(requests)?)
            }
            None => None,
        };
        if update.square_feet == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "square_feet".to_string(),
            }
            .into());
        }
        if update.estimated_duration_minutes == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "estimated_duration_minutes".to_string(),
            }
            .into());
        }

        if let Some(v) = update.property_type {
            self.property_type = v;
        }
        if let Some(v) = update.square_feet {
            self.square_feet = Some(v);
        }
        if let Some(v) = update.floor_count {
            self.floor_count = Some(v);
        }
        if let Some(v) = update.additional_objects {
            self.additional_objects = v;
        }
        if let Some(v) = update.package {
            self.package = v;
        }
        if let Some(v) = update.crew_size {
            self.crew_size = v;
        }
        if let Some(v) = update.departure_time {
            self.departure_time = v;
        }
        if let Some(v) = update.estimated_duration_minutes {
            self.estimated_duration_minutes = Some(v);
        }
        if let Some(v) = update.stops {
            self.stops = v;
        }
        if let Some(v) = materials {
            self.materials = v;
        }

        if self.price.take().is_some() {
            debug!(job = %self.request_number, "Stored quote cleared by update");
        }
        self.updated_at = now;
        Ok(())
    }

    /// Stores a quoted total. Only a pending job can be (re)quoted.
    pub fn set_quote(&mut self, total: Money, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_live()?;
        self.ensure_status(JobStatus::Pending, "store a quote")?;

        self.price = Some(total);
        self.updated_at = now;
        Ok(())
    }

    // =========================================================================
    // Operational Axis
    // =========================================================================

    /// Moves the operational status.
    ///
    /// Returns `Ok(false)` for the idempotent `completed → completed` case,
    /// `Ok(true)` when the status changed.
    pub fn transition_to(&mut self, to: JobStatus, now: DateTime<Utc>) -> CoreResult<bool> {
        self.ensure_live()?;

        if !self.status.can_transition_to(to) {
            return Err(CoreError::IllegalTransition {
                job: self.request_number.clone(),
                from: self.status,
                to,
            });
        }

        if self.status == to {
            return Ok(false);
        }

        debug!(job = %self.request_number, from = %self.status, to = %to, "Status transition");
        self.status = to;
        if to == JobStatus::Completed {
            self.completed_at = Some(now);
        }
        self.updated_at = now;
        Ok(true)
    }

    /// Soft-deletes the job. The row stays for billing history.
    pub fn mark_deleted(&mut self, actor: &Actor, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_live()?;
        self.ensure_owner(actor, "delete job")?;

        self.deleted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    // =========================================================================
    // Payment Axis
    // =========================================================================

    /// Checks that a checkout may start and returns the amount to charge.
    pub fn payable_amount(&self, actor: &Actor) -> CoreResult<Money> {
        self.ensure_live()?;
        self.ensure_owner(actor, "start payment")?;

        if self.payment_status == PaymentStatus::Paid {
            return Err(CoreError::PaymentAlreadySettled {
                job: self.request_number.clone(),
                status: self.payment_status,
            });
        }
        if self.status == JobStatus::Cancelled {
            return Err(CoreError::state_conflict(
                &self.request_number,
                self.status,
                "start payment",
            ));
        }

        match self.price {
            Some(price) if price.is_positive() => Ok(price),
            _ => Err(CoreError::PriceNotQuoted {
                job: self.request_number.clone(),
            }),
        }
    }

    /// Remembers the processor session opened for the price.
    pub fn attach_payment_session(&mut self, session_id: String, now: DateTime<Utc>) {
        self.payment_session_id = Some(session_id);
        self.updated_at = now;
    }

    /// Records a confirmed settlement. Returns `false` if already paid.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> CoreResult<bool> {
        self.ensure_live()?;

        if self.payment_status == PaymentStatus::Paid {
            return Ok(false);
        }
        self.payment_status = PaymentStatus::Paid;
        self.updated_at = now;
        Ok(true)
    }

    // =========================================================================
    // Tips Axis
    // =========================================================================

    /// Checks that `actor` may save tips on this job right now.
    pub fn ensure_tips_recordable(&self, actor: &Actor) -> CoreResult<()> {
        self.ensure_live()?;
        self.ensure_owner(actor, "save tips")?;
        self.ensure_status(JobStatus::Completed, "save tips")?;

        if self.tips_payment_status == TipsPaymentStatus::Paid {
            return Err(CoreError::TipsAlreadySettled {
                job: self.request_number.clone(),
                status: self.tips_payment_status,
            });
        }
        Ok(())
    }

    /// Saves a tips distribution. Requires ownership and a completed job.
    pub fn record_tips(
        &mut self,
        actor: &Actor,
        tips: TipsDistribution,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_tips_recordable(actor)?;

        self.tips = Some(tips);
        self.tips_payment_status = TipsPaymentStatus::Pending;
        self.updated_at = now;
        Ok(())
    }

    /// Checks that a tips checkout may start and returns the amount.
    pub fn payable_tips(&self, actor: &Actor) -> CoreResult<Money> {
        self.ensure_live()?;
        self.ensure_owner(actor, "start tips payment")?;

        if self.tips_payment_status == TipsPaymentStatus::Paid {
            return Err(CoreError::TipsAlreadySettled {
                job: self.request_number.clone(),
                status: self.tips_payment_status,
            });
        }

        match &self.tips {
            Some(tips) if tips.tips_amount.is_positive() => Ok(tips.tips_amount),
            _ => Err(CoreError::TipsNotRecorded {
                job: self.request_number.clone(),
            }),
        }
    }

    /// Remembers the processor session opened for the tips.
    pub fn attach_tips_session(&mut self, session_id: String, now: DateTime<Utc>) {
        self.tips_session_id = Some(session_id);
        self.updated_at = now;
    }

    /// Records a confirmed tips settlement. Returns `false` if already paid.
    pub fn mark_tips_paid(&mut self, now: DateTime<Utc>) -> CoreResult<bool> {
        self.ensure_live()?;

        if self.tips.is_none() {
            return Err(CoreError::TipsNotRecorded {
                job: self.request_number.clone(),
            });
        }
        if self.tips_payment_status == TipsPaymentStatus::Paid {
            return Ok(false);
        }
        self.tips_payment_status = TipsPaymentStatus::Paid;
        self.updated_at = now;
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::tips::{distribute, TipInput};
    use crate::types::*;
    use crate::validation::validate_request_number;

    fn rates() -> RateConfiguration {
        RateConfiguration {
            hourly_rate: Money::from_dollars(125),
            floor_fee: Money::zero(),
            per_mile_fee: Money::from_dollars(2),
            piano_fee: Money::zero(),
            gun_safe_fee: Money::zero(),
            packing_materials: vec![PackingMaterial {
                id: 1,
                name: "small_boxes".to_string(),
                display_name: "Small Boxes".to_string(),
                price: Money::from_dollars(3),
                description: None,
                is_active: true,
                is_full_service: false,
                sort_order: 1,
            }],
            updated_at: Utc::now(),
        }
    }

    fn stops() -> Vec<Stop> {
        vec![
            Stop {
                sequence: 0,
                role: StopRole::Loading,
                location: GeoPoint::new(40.7128, -74.0060),
                address: "1 Centre St".to_string(),
                category: Some(LocationCategory::Office),
            },
            Stop {
                sequence: 1,
                role: StopRole::Unloading,
                location: GeoPoint::new(40.7589, -73.9851),
                address: "1560 Broadway".to_string(),
                category: None,
            },
        ]
    }

    fn owner() -> Actor {
        Actor::new("user-1")
    }

    fn new_job() -> Job {
        let input = NewJob {
            property_type: PropertyType::Residential,
            square_feet: None,
            floor_count: None,
            additional_objects: BTreeSet::new(),
            package: ServicePackage::Standard,
            crew_size: 3,
            departure_time: Utc::now(),
            estimated_duration_minutes: None,
            stops: stops(),
            materials: vec![MaterialRequest {
                packing_material_id: Some(1),
                name: String::new(),
                quantity: 10,
                unit_price: Money::zero(),
            }],
        };
        create_job(input, &owner(), "REQ-TEST0001".to_string(), &rates(), Utc::now()).unwrap()
    }

    fn advance(job: &mut Job, path: &[JobStatus]) {
        for status in path {
            job.transition_to(*status, Utc::now()).unwrap();
        }
    }

    fn completed_job() -> Job {
        let mut job = new_job();
        job.set_quote(Money::from_dollars(200), Utc::now()).unwrap();
        advance(
            &mut job,
            &[JobStatus::Confirmed, JobStatus::Active, JobStatus::Completed],
        );
        job
    }

    #[test]
    fn test_generated_request_numbers_are_valid() {
        for _ in 0..50 {
            assert!(validate_request_number(&generate_request_number()).is_ok());
        }
    }

    #[test]
    fn test_create_job_starts_pending_with_snapshot() {
        let job = new_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.payment_status, PaymentStatus::Unpaid);
        assert_eq!(job.tips_payment_status, TipsPaymentStatus::Pending);
        assert_eq!(job.materials[0].unit_price, Money::from_dollars(3));
        assert!(job.price.is_none());
    }

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        let legal = [
            (Pending, Confirmed),
            (Confirmed, Active),
            (Active, Break),
            (Break, Active),
            (Active, Completed),
            (Completed, Completed),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
            (Active, Cancelled),
        ];
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_full_operational_path_stamps_completion() {
        let mut job = new_job();
        advance(
            &mut job,
            &[
                JobStatus::Confirmed,
                JobStatus::Active,
                JobStatus::Break,
                JobStatus::Active,
                JobStatus::Completed,
            ],
        );
        let stamped = job.completed_at;
        assert!(stamped.is_some());

        // Reapplying completed is a no-op.
        assert!(!job.transition_to(JobStatus::Completed, Utc::now()).unwrap());
        assert_eq!(job.completed_at, stamped);
    }

    #[test]
    fn test_completed_cannot_move_elsewhere() {
        let mut job = completed_job();
        for to in [
            JobStatus::Pending,
            JobStatus::Confirmed,
            JobStatus::Active,
            JobStatus::Break,
            JobStatus::Cancelled,
        ] {
            let err = job.transition_to(to, Utc::now()).unwrap_err();
            assert!(matches!(
                err,
                CoreError::IllegalTransition { from: JobStatus::Completed, .. }
            ));
        }
    }

    #[test]
    fn test_break_must_resume_before_completion() {
        let mut job = new_job();
        advance(&mut job, &[JobStatus::Confirmed, JobStatus::Active, JobStatus::Break]);
        assert!(job.transition_to(JobStatus::Completed, Utc::now()).is_err());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut job = new_job();
        advance(&mut job, &[JobStatus::Cancelled]);
        for to in JobStatus::ALL {
            assert!(job.transition_to(to, Utc::now()).is_err());
        }
    }

    #[test]
    fn test_update_rejected_once_active() {
        let mut job = new_job();
        advance(&mut job, &[JobStatus::Confirmed, JobStatus::Active]);

        let update = JobUpdate {
            stops: Some(stops()),
            ..Default::default()
        };
        let err = job.apply_update(&owner(), update, &rates(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::StateConflict { status: JobStatus::Active, .. }
        ));
    }

    #[test]
    fn test_update_clears_quote_and_replaces_lists() {
        let mut job = new_job();
        job.set_quote(Money::from_dollars(500), Utc::now()).unwrap();

        let mut new_stops = stops();
        new_stops[1].address = "350 5th Ave".to_string();
        let update = JobUpdate {
            crew_size: Some(4),
            stops: Some(new_stops),
            materials: Some(Vec::new()),
            ..Default::default()
        };
        job.apply_update(&owner(), update, &rates(), Utc::now()).unwrap();

        assert!(job.price.is_none());
        assert_eq!(job.crew_size, 4);
        assert_eq!(job.stops[1].address, "350 5th Ave");
        assert!(job.materials.is_empty());
    }

    #[test]
    fn test_update_validates_and_checks_owner() {
        let mut job = new_job();
        let bad = JobUpdate {
            crew_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            job.apply_update(&owner(), bad, &rates(), Utc::now()),
            Err(CoreError::Validation(_))
        ));

        let update = JobUpdate {
            crew_size: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            job.apply_update(&Actor::new("intruder"), update, &rates(), Utc::now()),
            Err(CoreError::Unauthorized { .. })
        ));
        assert_eq!(job.crew_size, 3);
    }

    #[test]
    fn test_quote_only_while_pending() {
        let mut job = new_job();
        advance(&mut job, &[JobStatus::Confirmed]);
        assert!(job.set_quote(Money::from_dollars(1), Utc::now()).is_err());
    }

    #[test]
    fn test_payment_axis() {
        let mut job = new_job();
        assert!(matches!(
            job.payable_amount(&owner()),
            Err(CoreError::PriceNotQuoted { .. })
        ));

        job.set_quote(Money::from_dollars(200), Utc::now()).unwrap();
        assert_eq!(job.payable_amount(&owner()).unwrap(), Money::from_dollars(200));
        assert!(job.payable_amount(&Actor::new("other")).is_err());

        assert!(job.mark_paid(Utc::now()).unwrap());
        assert!(!job.mark_paid(Utc::now()).unwrap());
        assert_eq!(job.payment_status, PaymentStatus::Paid);
        assert!(matches!(
            job.payable_amount(&owner()),
            Err(CoreError::PaymentAlreadySettled { .. })
        ));
    }

    #[test]
    fn test_tips_rejected_before_completion() {
        let mut job = new_job();
        job.set_quote(Money::from_dollars(200), Utc::now()).unwrap();
        advance(&mut job, &[JobStatus::Confirmed, JobStatus::Active]);

        let tips = distribute(
            Money::from_dollars(200),
            TipInput::Percentage(Percentage::from_whole(15)),
            3,
        )
        .unwrap();
        let err = job.record_tips(&owner(), tips, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::StateConflict { .. }));
        assert!(job.tips.is_none());
    }

    #[test]
    fn test_tips_axis_after_completion() {
        let mut job = completed_job();
        assert!(matches!(
            job.payable_tips(&owner()),
            Err(CoreError::TipsNotRecorded { .. })
        ));

        let tips = distribute(
            Money::from_dollars(200),
            TipInput::Percentage(Percentage::from_whole(15)),
            3,
        )
        .unwrap();
        assert!(job
            .record_tips(&Actor::new("other"), tips.clone(), Utc::now())
            .is_err());
        job.record_tips(&owner(), tips, Utc::now()).unwrap();

        assert_eq!(job.tips_payment_status, TipsPaymentStatus::Pending);
        assert_eq!(job.payable_tips(&owner()).unwrap(), Money::from_dollars(30));

        assert!(job.mark_tips_paid(Utc::now()).unwrap());
        assert_eq!(job.tips_payment_status, TipsPaymentStatus::Paid);
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_deleted_job_rejects_operations() {
        let mut job = new_job();
        job.mark_deleted(&owner(), Utc::now()).unwrap();
        assert!(job.is_deleted());
        assert!(!job.is_mutable());
        assert!(matches!(
            job.transition_to(JobStatus::Confirmed, Utc::now()),
            Err(CoreError::Deleted { .. })
        ));
    }
}
