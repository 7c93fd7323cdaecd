//! # Pricing Engine
//!
//! Pure function from a job, its resolved route and the rate configuration
//! to an itemised price.
//!
//! ## Line Items
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Price Breakdown                                 │
//! │                                                                         │
//! │  Labor       crew × hourly_rate × minutes / 60                         │
//! │  Floors      floor_fee × floor_count              (only if recorded)   │
//! │  Transport   per_mile_fee × meters / 1609.344                          │
//! │  Materials   Σ quantity × unit_price (snapshot)                        │
//! │  Piano       piano_fee                            (only if flagged)    │
//! │  Gun safe    gun_safe_fee                         (only if flagged)    │
//! │  ─────────────────────────────────────────────────                     │
//! │  Total       Σ lines, each clamped at $0.00                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! All math is integer cents. Each line is rounded once, half-up, at the
//! point where it leaves exact arithmetic (`Money::scale`). The total is a
//! plain sum of rounded lines.
//!
//! ## Configuration Anomalies
//! A line that comes out negative (e.g. an admin typed a negative rate) is
//! clamped to zero and reported as a [`PricingWarning`]. Pricing never fails.

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{AdditionalObject, Job, RateConfiguration, RouteInfo};
use crate::{LABOR_INCREMENT_MINUTES, MIN_LABOR_MINUTES};

/// Millimeters in one statute mile; keeps the transport line in integers.
const MILLIMETERS_PER_MILE: i64 = 1_609_344;

// =============================================================================
// Labor Duration
// =============================================================================

/// Billable labor time, in whole minutes, never below the two-hour minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LaborDuration {
    minutes: u32,
}

impl LaborDuration {
    /// Billable duration from an explicit estimate, floored at the minimum.
    pub fn from_minutes(minutes: u32) -> Self {
        LaborDuration {
            minutes: minutes.max(MIN_LABOR_MINUTES),
        }
    }

    /// Heuristic duration when no explicit estimate exists: the minimum plus
    /// driving time rounded up to the next quarter hour.
    pub fn from_drive_time(drive_seconds: u64) -> Self {
        let increment_seconds = u64::from(LABOR_INCREMENT_MINUTES) * 60;
        let increments = drive_seconds.div_ceil(increment_seconds);
        let drive_minutes = increments.saturating_mul(u64::from(LABOR_INCREMENT_MINUTES));
        let drive_minutes = u32::try_from(drive_minutes).unwrap_or(u32::MAX);

        LaborDuration {
            minutes: MIN_LABOR_MINUTES.saturating_add(drive_minutes),
        }
    }

    /// Picks the explicit estimate when present, otherwise the heuristic.
    pub fn for_job(job: &Job, route: &RouteInfo) -> Self {
        match job.estimated_duration_minutes {
            Some(minutes) => LaborDuration::from_minutes(minutes),
            None => LaborDuration::from_drive_time(route.duration_seconds),
        }
    }

    #[inline]
    pub const fn minutes(&self) -> u32 {
        self.minutes
    }
}

// =============================================================================
// Breakdown Types
// =============================================================================

/// Kind of a price line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceLineKind {
    Labor,
    Floors,
    Transport,
    Materials,
    Piano,
    GunSafe,
}

/// One named, rounded line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceLine {
    pub kind: PriceLineKind,
    pub description: String,
    pub amount: Money,
}

/// A rate misconfiguration detected while pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingWarning {
    pub kind: PriceLineKind,
    /// The negative amount before clamping.
    pub computed: Money,
}

/// Itemised quote for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceBreakdown {
    pub lines: Vec<PriceLine>,
    pub total: Money,
    pub distance_meters: u64,
    pub labor: LaborDuration,
    pub warnings: Vec<PricingWarning>,
}

impl PriceBreakdown {
    /// Amount of the first line of the given kind, or zero.
    pub fn line(&self, kind: PriceLineKind) -> Money {
        self.lines
            .iter()
            .find(|l| l.kind == kind)
            .map(|l| l.amount)
            .unwrap_or_default()
    }

    /// Returns true if any line had to be clamped.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// =============================================================================
// Pricing Engine
// =============================================================================

/// Prices jobs against one rate configuration.
///
/// ## Example
/// ```rust,ignore
/// let engine = PricingEngine::new(&rates);
/// let breakdown = engine.quote(&job, &route);
/// assert!(!breakdown.total.is_negative());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine<'a> {
    rates: &'a RateConfiguration,
}

impl<'a> PricingEngine<'a> {
    pub fn new(rates: &'a RateConfiguration) -> Self {
        PricingEngine { rates }
    }

    /// Prices a job from its resolved route, deriving labor time with
    /// [`LaborDuration::for_job`].
    pub fn quote(&self, job: &Job, route: &RouteInfo) -> PriceBreakdown {
        self.price(job, route.distance_meters, LaborDuration::for_job(job, route))
    }

    /// Prices a job. Deterministic: identical inputs give identical output.
    pub fn price(&self, job: &Job, distance_meters: u64, labor: LaborDuration) -> PriceBreakdown {
        let rates = self.rates;
        let mut builder = BreakdownBuilder::new(&job.request_number);

        let crew_minutes = i64::from(job.crew_size) * i64::from(labor.minutes());
        builder.push(
            PriceLineKind::Labor,
            format!(
                "{} movers × {} × {} min",
                job.crew_size,
                rates.hourly_rate,
                labor.minutes()
            ),
            rates.hourly_rate.scale(crew_minutes, 60),
        );

        if let Some(floors) = job.floor_count {
            builder.push(
                PriceLineKind::Floors,
                format!("{} floors × {}", floors, rates.floor_fee),
                rates.floor_fee * floors,
            );
        }

        let millimeters = i64::try_from(distance_meters)
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);
        builder.push(
            PriceLineKind::Transport,
            format!("{} m × {}/mile", distance_meters, rates.per_mile_fee),
            rates.per_mile_fee.scale(millimeters, MILLIMETERS_PER_MILE),
        );

        let materials: Money = job.materials.iter().map(|m| m.line_total()).sum();
        builder.push(
            PriceLineKind::Materials,
            format!("{} material lines", job.materials.len()),
            materials,
        );

        for object in &job.additional_objects {
            if let Some((kind, fee)) = self.surcharge(*object) {
                builder.push(kind, format!("{:?} surcharge", object), fee);
            }
        }

        builder.finish(distance_meters, labor)
    }

    /// Flat surcharge for an additional object, if it carries one.
    fn surcharge(&self, object: AdditionalObject) -> Option<(PriceLineKind, Money)> {
        match object {
            AdditionalObject::Piano => Some((PriceLineKind::Piano, self.rates.piano_fee)),
            AdditionalObject::GunSafe => Some((PriceLineKind::GunSafe, self.rates.gun_safe_fee)),
            AdditionalObject::Garage
            | AdditionalObject::Storage
            | AdditionalObject::Backyard
            | AdditionalObject::GuestHouse
            | AdditionalObject::Other => None,
        }
    }
}

/// Collects lines, clamping negatives as they arrive.
struct BreakdownBuilder<'a> {
    job: &'a str,
    lines: Vec<PriceLine>,
    warnings: Vec<PricingWarning>,
}

impl<'a> BreakdownBuilder<'a> {
    fn new(job: &'a str) -> Self {
        BreakdownBuilder {
            job,
            lines: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn push(&mut self, kind: PriceLineKind, description: String, amount: Money) {
        if amount.is_negative() {
            warn!(
                job = %self.job,
                line = ?kind,
                computed = %amount,
                "Negative price line clamped to zero; check rate configuration"
            );
            self.warnings.push(PricingWarning {
                kind,
                computed: amount,
            });
        }

        self.lines.push(PriceLine {
            kind,
            description,
            amount: amount.clamp_non_negative(),
        });
    }

    fn finish(self, distance_meters: u64, labor: LaborDuration) -> PriceBreakdown {
        let total = self.lines.iter().map(|l| l.amount).sum();
        PriceBreakdown {
            lines: self.lines,
            total,
            distance_meters,
            labor,
            warnings: self.warnings,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::types::*;

    fn rates() -> RateConfiguration {
        RateConfiguration {
            hourly_rate: Money::from_dollars(125),
            floor_fee: Money::from_dollars(25),
            per_mile_fee: Money::from_dollars(2),
            piano_fee: Money::from_dollars(150),
            gun_safe_fee: Money::from_dollars(100),
            packing_materials: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn job() -> Job {
        let now = Utc::now();
        Job {
            id: "job-1".to_string(),
            request_number: "REQ-PRICE001".to_string(),
            user_id: "user-1".to_string(),
            operator_id: None,
            property_type: PropertyType::Residential,
            square_feet: Some(1200),
            floor_count: None,
            additional_objects: BTreeSet::new(),
            package: ServicePackage::Standard,
            crew_size: 3,
            departure_time: now,
            estimated_duration_minutes: None,
            stops: Vec::new(),
            materials: vec![MaterialLine {
                packing_material_id: Some(1),
                name: "small_boxes".to_string(),
                quantity: 10,
                unit_price: Money::from_dollars(3),
            }],
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
        }
    }

    fn route(distance_meters: u64, duration_seconds: u64) -> RouteInfo {
        RouteInfo {
            distance_meters,
            duration_seconds,
            polyline: None,
        }
    }

    #[test]
    fn test_labor_duration_minimum_and_increments() {
        assert_eq!(LaborDuration::from_minutes(30).minutes(), 120);
        assert_eq!(LaborDuration::from_minutes(200).minutes(), 200);
        assert_eq!(LaborDuration::from_drive_time(0).minutes(), 120);
        assert_eq!(LaborDuration::from_drive_time(541).minutes(), 135);
        assert_eq!(LaborDuration::from_drive_time(900).minutes(), 135);
        assert_eq!(LaborDuration::from_drive_time(901).minutes(), 150);
    }

    #[test]
    fn test_labor_uses_explicit_estimate() {
        let mut job = job();
        job.estimated_duration_minutes = Some(240);
        let labor = LaborDuration::for_job(&job, &route(6015, 541));
        assert_eq!(labor.minutes(), 240);
    }

    #[test]
    fn test_quote_itemises_lines() {
        let rates = rates();
        let breakdown = PricingEngine::new(&rates).quote(&job(), &route(6015, 541));

        // 3 × $125 × 135/60 = $843.75
        assert_eq!(breakdown.line(PriceLineKind::Labor).cents(), 84_375);
        // $2 × 6015 / 1609.344 = $7.4751 → $7.48
        assert_eq!(breakdown.line(PriceLineKind::Transport).cents(), 748);
        assert_eq!(breakdown.line(PriceLineKind::Materials).cents(), 3_000);
        assert_eq!(breakdown.total.cents(), 84_375 + 748 + 3_000);
        assert_eq!(breakdown.distance_meters, 6015);
        assert!(!breakdown.has_warnings());
    }

    #[test]
    fn test_transport_rounds_half_up() {
        let rates = rates();
        // $2 × 5420 / 1609.344 = $6.7357 → $6.74
        let breakdown = PricingEngine::new(&rates).price(&job(), 5420, LaborDuration::from_minutes(120));
        assert_eq!(breakdown.line(PriceLineKind::Transport).cents(), 674);
    }

    #[test]
    fn test_floor_and_specialty_lines() {
        let rates = rates();
        let mut job = job();
        job.floor_count = Some(3);
        job.additional_objects = [
            AdditionalObject::Piano,
            AdditionalObject::GunSafe,
            AdditionalObject::Garage,
        ]
        .into_iter()
        .collect();

        let breakdown = PricingEngine::new(&rates).price(&job, 0, LaborDuration::from_minutes(120));

        assert_eq!(breakdown.line(PriceLineKind::Floors), Money::from_dollars(75));
        assert_eq!(breakdown.line(PriceLineKind::Piano), Money::from_dollars(150));
        assert_eq!(breakdown.line(PriceLineKind::GunSafe), Money::from_dollars(100));
        // labor, floors, transport, materials, piano, gun safe
        assert_eq!(breakdown.lines.len(), 6);
    }

    #[test]
    fn test_floor_line_absent_without_count() {
        let rates = rates();
        let breakdown = PricingEngine::new(&rates).price(&job(), 0, LaborDuration::from_minutes(120));
        assert!(breakdown.lines.iter().all(|l| l.kind != PriceLineKind::Floors));
    }

    #[test]
    fn test_negative_rate_is_clamped_and_flagged() {
        let mut rates = rates();
        rates.per_mile_fee = Money::from_cents(-500);
        rates.piano_fee = Money::from_cents(-1);
        let mut job = job();
        job.additional_objects.insert(AdditionalObject::Piano);

        let breakdown = PricingEngine::new(&rates).price(&job, 10_000, LaborDuration::from_minutes(120));

        assert_eq!(breakdown.line(PriceLineKind::Transport), Money::zero());
        assert_eq!(breakdown.line(PriceLineKind::Piano), Money::zero());
        assert_eq!(breakdown.warnings.len(), 2);
        assert_eq!(breakdown.warnings[0].kind, PriceLineKind::Transport);
        assert!(breakdown.total >= Money::zero());
    }

    #[test]
    fn test_total_never_negative_with_all_rates_negative() {
        let mut rates = rates();
        rates.hourly_rate = Money::from_cents(-12_500);
        rates.floor_fee = Money::from_cents(-100);
        rates.per_mile_fee = Money::from_cents(-200);
        let mut job = job();
        job.floor_count = Some(2);
        job.materials[0].unit_price = Money::from_cents(-300);

        let breakdown = PricingEngine::new(&rates).quote(&job, &route(6015, 541));
        assert_eq!(breakdown.total, Money::zero());
        assert_eq!(breakdown.warnings.len(), 4);
    }

    #[test]
    fn test_pricing_is_deterministic() {
        let rates = rates();
        let engine = PricingEngine::new(&rates);
        let job = job();
        let first = engine.quote(&job, &route(12_345, 1_234));
        for _ in 0..10 {
            assert_eq!(engine.quote(&job, &route(12_345, 1_234)), first);
        }
    }
}
