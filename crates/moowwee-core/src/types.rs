//! # Domain Types
//!
//! Core domain types used throughout Moowwee.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────┐              │
//! │  │  Job (aggregate root)                                 │              │
//! │  │  ───────────────────                                  │              │
//! │  │  id (UUID) • request_number (REQ-XXXXXXXX)            │              │
//! │  │  status • payment_status • tips_payment_status        │              │
//! │  │  price • tips • completed_at • deleted_at • version   │              │
//! │  │                                                       │              │
//! │  │   ┌─────────────────┐        ┌──────────────────┐    │              │
//! │  │   │  Vec<Stop>      │        │ Vec<MaterialLine>│    │              │
//! │  │   │  sequence, role │        │ qty × unit_price │    │              │
//! │  │   │  GeoPoint       │        │ (snapshot)       │    │              │
//! │  │   └─────────────────┘        └──────────────────┘    │              │
//! │  └──────────────────────────────────────────────────────┘              │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │ RateConfiguration   │   │  JobStatus      │   │  Percentage     │   │
//! │  │ ─────────────────── │   │  pending        │   │  bps (u32)      │   │
//! │  │ hourly, floor, mile │   │  confirmed      │   │  1500 = 15.00%  │   │
//! │  │ piano, gun safe     │   │  active ⇄ break │   └─────────────────┘   │
//! │  │ packing catalog     │   │  completed      │                          │
//! │  └─────────────────────┘   │  cancelled      │                          │
//! │                            └─────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every job has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `request_number`: human-readable, shown to customers and crews

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so a two-decimal percentage such as
/// 12.50% is stored exactly as 1250.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole number (15 → 15.00%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percentage(pct * 100)
    }

    /// Returns the percentage in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Geography
// =============================================================================

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point. Range checks live in [`crate::validation`].
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

/// Distance and duration for an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RouteInfo {
    /// Total driving distance in meters.
    pub distance_meters: u64,
    /// Total driving duration in seconds.
    pub duration_seconds: u64,
    /// Encoded overview polyline, when the provider returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

// =============================================================================
// Stops
// =============================================================================

/// Role of a stop within the itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StopRole {
    /// Where the crew picks up. Exactly one per job.
    Loading,
    /// Any number of stops in between.
    Intermediate,
    /// Where the crew drops off. Exactly one per job.
    Unloading,
}

/// Kind of place at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LocationCategory {
    Apartment,
    Storage,
    House,
    Office,
    Garage,
}

/// One waypoint of a job's itinerary.
///
/// Stops are owned by their job and only ever replaced as a full set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Stop {
    /// Zero-based position in the itinerary, strictly increasing.
    pub sequence: u32,
    pub role: StopRole,
    pub location: GeoPoint,
    /// Free-text street address.
    pub address: String,
    #[serde(default)]
    pub category: Option<LocationCategory>,
}

// =============================================================================
// Materials
// =============================================================================

/// A packing material offered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackingMaterial {
    pub id: i64,
    /// Machine name, unique (e.g. `small_boxes`).
    pub name: String,
    pub display_name: String,
    /// Current unit price.
    pub price: Money,
    pub description: Option<String>,
    pub is_active: bool,
    /// The all-inclusive "full service packing" offer.
    pub is_full_service: bool,
    pub sort_order: i32,
}

/// A billable packing-material usage on a job.
///
/// ## Snapshot Pattern
/// `unit_price` is frozen when the line is created. Later catalog price
/// changes do not touch existing jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MaterialLine {
    /// Catalog reference; `None` for freeform legacy lines.
    #[serde(default)]
    pub packing_material_id: Option<i64>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl MaterialLine {
    /// Snapshots a catalog material at its current price.
    pub fn from_catalog(material: &PackingMaterial, quantity: u32) -> Self {
        MaterialLine {
            packing_material_id: Some(material.id),
            name: material.name.clone(),
            quantity,
            unit_price: material.price,
        }
    }

    /// Returns quantity × unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Caller input for one material line, before snapshotting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequest {
    #[serde(default)]
    pub packing_material_id: Option<i64>,
    pub name: String,
    pub quantity: u32,
    /// Used only for freeform lines; catalog lines take the catalog price.
    #[serde(default)]
    pub unit_price: Money,
}

// =============================================================================
// Rate Configuration
// =============================================================================

/// Admin-editable pricing inputs, read-only to the engine.
///
/// Changes apply only to jobs priced after the change; a stored quote keeps
/// its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RateConfiguration {
    /// Per crew member, per hour.
    pub hourly_rate: Money,
    /// Per floor climbed.
    pub floor_fee: Money,
    /// Per mile driven.
    pub per_mile_fee: Money,
    /// Flat surcharge when a piano is moved.
    pub piano_fee: Money,
    /// Flat surcharge when a gun safe is moved.
    pub gun_safe_fee: Money,
    /// Packing-material catalog with per-unit prices.
    pub packing_materials: Vec<PackingMaterial>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RateConfiguration {
    /// Finds a catalog material by id.
    pub fn material(&self, id: i64) -> Option<&PackingMaterial> {
        self.packing_materials.iter().find(|m| m.id == id)
    }

    /// Finds a catalog material by machine name.
    pub fn material_by_name(&self, name: &str) -> Option<&PackingMaterial> {
        self.packing_materials.iter().find(|m| m.name == name)
    }

    /// Turns caller input into priced lines.
    ///
    /// ## Rules
    /// - Catalog lines must reference an existing, active material and take
    ///   its current price
    /// - Freeform lines keep the caller's price, which must not be negative
    pub fn snapshot_materials(
        &self,
        requests: &[MaterialRequest],
    ) -> Result<Vec<MaterialLine>, ValidationError> {
        requests
            .iter()
            .enumerate()
            .map(|(i, req)| match req.packing_material_id {
                Some(id) => {
                    let material = self
                        .material(id)
                        .filter(|m| m.is_active)
                        .ok_or_else(|| {
                            ValidationError::invalid(
                                format!("materials[{}].packing_material_id", i),
                                format!("material {} is not an active catalog entry", id),
                            )
                        })?;
                    Ok(MaterialLine::from_catalog(material, req.quantity))
                }
                None => {
                    if req.unit_price.is_negative() {
                        return Err(ValidationError::MustNotBeNegative {
                            field: format!("materials[{}].unit_price", i),
                        });
                    }
                    Ok(MaterialLine {
                        packing_material_id: None,
                        name: req.name.trim().to_string(),
                        quantity: req.quantity,
                        unit_price: req.unit_price,
                    })
                }
            })
            .collect()
    }
}

// =============================================================================
// Job Attributes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Commercial,
    Residential,
}

/// Things on the property that change how the move is done or priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalObject {
    Garage,
    Storage,
    Backyard,
    GuestHouse,
    Piano,
    GunSafe,
    Other,
}

/// Service tier booked by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ServicePackage {
    /// Crew only; the customer provides the truck.
    LaborOnly,
    /// Crew and truck.
    #[default]
    Standard,
    /// Crew, truck and packing.
    FullService,
}

// =============================================================================
// Status Axes
// =============================================================================

/// Operational status of a job.
///
/// ```text
/// pending ──► confirmed ──► active ⇄ break
///    │            │           │
///    │            │           └──────► completed
///    └────────────┴───────────┴──────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Confirmed,
    Active,
    Break,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Confirmed,
        JobStatus::Active,
        JobStatus::Break,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    /// Returns the wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Confirmed => "confirmed",
            JobStatus::Active => "active",
            JobStatus::Break => "break",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Cancelled jobs accept no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!(
                    "unknown status '{}'; expected one of pending, confirmed, active, break, completed, cancelled",
                    s
                ),
            })
    }
}

/// Payment axis: set only by a successful settlement confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => f.write_str("unpaid"),
            PaymentStatus::Paid => f.write_str("paid"),
        }
    }
}

/// Tips axis: meaningful once the job is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TipsPaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl fmt::Display for TipsPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TipsPaymentStatus::Pending => f.write_str("pending"),
            TipsPaymentStatus::Paid => f.write_str("paid"),
        }
    }
}

// =============================================================================
// Tips
// =============================================================================

/// One crew member's share of the gratuity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CrewShare {
    /// 1-based crew member number.
    pub crew_member: u32,
    pub amount: Money,
}

/// A validated gratuity and its per-crew-member split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TipsDistribution {
    pub tips_amount: Money,
    pub tips_percentage: Percentage,
    pub shares: Vec<CrewShare>,
}

impl TipsDistribution {
    /// Sum of all shares.
    pub fn shares_total(&self) -> Money {
        self.shares.iter().map(|s| s.amount).sum()
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The party performing an ownership-checked operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
        }
    }
}

// =============================================================================
// Job
// =============================================================================

/// A customer moving engagement: the aggregate root.
///
/// Operational status, payment status and tips payment status are
/// independent axes. Mutation rules live in [`crate::lifecycle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Job {
    pub id: String,
    pub request_number: String,
    /// Owning customer.
    pub user_id: String,
    /// Dispatcher assigned by the back office.
    pub operator_id: Option<String>,

    pub property_type: PropertyType,
    pub square_feet: Option<u32>,
    /// Floors the crew carries items up or down.
    pub floor_count: Option<u32>,
    pub additional_objects: BTreeSet<AdditionalObject>,
    pub package: ServicePackage,
    pub crew_size: u32,
    #[ts(as = "String")]
    pub departure_time: DateTime<Utc>,
    /// Caller-supplied duration estimate for labor, in minutes.
    pub estimated_duration_minutes: Option<u32>,

    pub stops: Vec<Stop>,
    pub materials: Vec<MaterialLine>,

    /// Quoted total; `None` until quoted or after the itinerary changes.
    pub price: Option<Money>,
    pub status: JobStatus,
    pub payment_status: PaymentStatus,
    pub payment_session_id: Option<String>,

    pub tips: Option<TipsDistribution>,
    pub tips_payment_status: TipsPaymentStatus,
    pub tips_session_id: Option<String>,

    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Tombstone; deleted jobs stay for billing history.
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped on every write.
    pub version: i64,
}

impl Job {
    /// Returns true if `actor` owns this job.
    #[inline]
    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.user_id == actor.user_id
    }

    /// Returns true if the job has been soft-deleted.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Stop coordinates in itinerary order.
    pub fn itinerary(&self) -> Vec<GeoPoint> {
        let mut stops: Vec<&Stop> = self.stops.iter().collect();
        stops.sort_by_key(|s| s.sequence);
        stops.into_iter().map(|s| s.location).collect()
    }
}

/// Input for creating a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub property_type: PropertyType,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub floor_count: Option<u32>,
    #[serde(default)]
    pub additional_objects: BTreeSet<AdditionalObject>,
    #[serde(default)]
    pub package: ServicePackage,
    pub crew_size: u32,
    pub departure_time: DateTime<Utc>,
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub materials: Vec<MaterialRequest>,
}

/// Partial update of a pending job. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub property_type: Option<PropertyType>,
    pub square_feet: Option<u32>,
    pub floor_count: Option<u32>,
    pub additional_objects: Option<BTreeSet<AdditionalObject>>,
    pub package: Option<ServicePackage>,
    pub crew_size: Option<u32>,
    pub departure_time: Option<DateTime<Utc>>,
    pub estimated_duration_minutes: Option<u32>,
    /// Replaces the full stop list.
    pub stops: Option<Vec<Stop>>,
    /// Replaces the full material list.
    pub materials: Option<Vec<MaterialRequest>>,
}

impl JobUpdate {
    /// Returns true if nothing would change.
    pub fn is_empty(&self) -> bool {
        self == &JobUpdate::default()
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// Rating of an individual crew member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MoverRating {
    /// 1-based crew member number.
    pub crew_member: u32,
    /// 1-5 stars.
    pub rating: u8,
}

/// A customer's review of a completed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub job_id: String,
    pub user_id: String,
    /// 1-5 stars.
    pub rating: u8,
    pub review_text: Option<String>,
    pub mover_ratings: Vec<MoverRating>,
    /// Reviews are published by the back office, never on creation.
    pub is_published: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Caller input for submitting or editing a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub rating: u8,
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub mover_ratings: Vec<MoverRating>,
}

// =============================================================================
// Unit Tests
// =============================================================================
