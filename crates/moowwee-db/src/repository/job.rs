//! # Job Repository
//!
//! Database operations for jobs and the stops and material lines they own.
//!
//! ## Write Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Job Write Path                                   │
//! │                                                                         │
//! │  update(job @ version N)                                               │
//! │     │                                                                   │
//! │     ├── BEGIN                                                           │
//! │     ├── UPDATE jobs SET ..., version = N + 1                           │
//! │     │        WHERE id = ? AND version = N     ← 0 rows → conflict      │
//! │     ├── DELETE FROM stops WHERE job_id = ?                             │
//! │     ├── INSERT stops (full set)                                         │
//! │     ├── DELETE FROM material_lines WHERE job_id = ?                    │
//! │     ├── INSERT material_lines (full set)                                │
//! │     └── COMMIT                                                          │
//! │                                                                         │
//! │  A reader never sees a job row without its matching stop set.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Soft Delete
//! Deleted jobs keep their rows (billing history). `get_by_id`,
//! `get_by_number` and `list_for_user` skip them;
//! `get_including_deleted` does not.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json, to_u32};
use moowwee_core::{
    CrewShare, GeoPoint, Job, JobStatus, LocationCategory, MaterialLine, Money, PaymentStatus,
    Percentage, PropertyType, ServicePackage, Stop, StopRole, TipsDistribution, TipsPaymentStatus,
};

const ENTITY: &str = "Job";

const JOB_COLUMNS: &str = r#"
    id, request_number, user_id, operator_id,
    property_type, square_feet, floor_count, additional_objects, package,
    crew_size, departure_time, estimated_duration_minutes,
    price_cents, status, payment_status, payment_session_id,
    tips_amount_cents, tips_percentage_bps, tips_distribution,
    tips_payment_status, tips_session_id,
    completed_at, created_at, updated_at, deleted_at, version
"#;

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    request_number: String,
    user_id: String,
    operator_id: Option<String>,
    property_type: PropertyType,
    square_feet: Option<i64>,
    floor_count: Option<i64>,
    additional_objects: String,
    package: ServicePackage,
    crew_size: i64,
    departure_time: DateTime<Utc>,
    estimated_duration_minutes: Option<i64>,
    price_cents: Option<i64>,
    status: JobStatus,
    payment_status: PaymentStatus,
    payment_session_id: Option<String>,
    tips_amount_cents: Option<i64>,
    tips_percentage_bps: Option<i64>,
    tips_distribution: Option<String>,
    tips_payment_status: TipsPaymentStatus,
    tips_session_id: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct StopRow {
    sequence: i64,
    role: StopRole,
    latitude: f64,
    longitude: f64,
    address: String,
    category: Option<LocationCategory>,
}

impl StopRow {
    fn into_stop(self) -> DbResult<Stop> {
        Ok(Stop {
            sequence: to_u32(self.sequence, "Stop", "sequence")?,
            role: self.role,
            location: GeoPoint::new(self.latitude, self.longitude),
            address: self.address,
            category: self.category,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MaterialRow {
    packing_material_id: Option<i64>,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
}

impl MaterialRow {
    fn into_line(self) -> DbResult<MaterialLine> {
        Ok(MaterialLine {
            packing_material_id: self.packing_material_id,
            name: self.name,
            quantity: to_u32(self.quantity, "MaterialLine", "quantity")?,
            unit_price: Money::from_cents(self.unit_price_cents),
        })
    }
}

impl JobRow {
    fn into_job(self, stops: Vec<Stop>, materials: Vec<MaterialLine>) -> DbResult<Job> {
        let opt_u32 = |value: Option<i64>, column: &str| -> DbResult<Option<u32>> {
            value.map(|v| to_u32(v, ENTITY, column)).transpose()
        };

        let tips = match self.tips_amount_cents {
            Some(amount) => {
                let bps = to_u32(self.tips_percentage_bps.unwrap_or(0), ENTITY, "tips_percentage_bps")?;
                let shares: Vec<CrewShare> = match self.tips_distribution.as_deref() {
                    Some(raw) => from_json(raw, ENTITY, "tips_distribution")?,
                    None => Vec::new(),
                };
                Some(TipsDistribution {
                    tips_amount: Money::from_cents(amount),
                    tips_percentage: Percentage::from_bps(bps),
                    shares,
                })
            }
            None => None,
        };

        Ok(Job {
            square_feet: opt_u32(self.square_feet, "square_feet")?,
            floor_count: opt_u32(self.floor_count, "floor_count")?,
            additional_objects: from_json(&self.additional_objects, ENTITY, "additional_objects")?,
            crew_size: to_u32(self.crew_size, ENTITY, "crew_size")?,
            estimated_duration_minutes: opt_u32(
                self.estimated_duration_minutes,
                "estimated_duration_minutes",
            )?,
            id: self.id,
            request_number: self.request_number,
            user_id: self.user_id,
            operator_id: self.operator_id,
            property_type: self.property_type,
            package: self.package,
            departure_time: self.departure_time,
            stops,
            materials,
            price: self.price_cents.map(Money::from_cents),
            status: self.status,
            payment_status: self.payment_status,
            payment_session_id: self.payment_session_id,
            tips,
            tips_payment_status: self.tips_payment_status,
            tips_session_id: self.tips_session_id,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            version: self.version,
        })
    }
}

/// Column values that are not plain copies of the job's fields.
struct EncodedJob {
    additional_objects: String,
    tips_amount_cents: Option<i64>,
    tips_percentage_bps: Option<i64>,
    tips_distribution: Option<String>,
}

impl EncodedJob {
    fn from_job(job: &Job) -> DbResult<Self> {
        let tips_distribution = job
            .tips
            .as_ref()
            .map(|t| to_json(&t.shares, "tips_distribution"))
            .transpose()?;

        Ok(EncodedJob {
            additional_objects: to_json(&job.additional_objects, "additional_objects")?,
            tips_amount_cents: job.tips.as_ref().map(|t| t.tips_amount.cents()),
            tips_percentage_bps: job.tips.as_ref().map(|t| i64::from(t.tips_percentage.bps())),
            tips_distribution,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for job database operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Creates a new JobRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobRepository { pool }
    }

    /// Inserts a new job together with its stops and material lines.
    ///
    /// ## Errors
    /// - `UniqueViolation` on `jobs.request_number` if the number is taken
    pub async fn insert(&self, job: &Job) -> DbResult<()> {
        debug!(id = %job.id, job = %job.request_number, "Inserting job");

        let encoded = EncodedJob::from_job(job)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, request_number, user_id, operator_id,
                property_type, square_feet, floor_count, additional_objects, package,
                crew_size, departure_time, estimated_duration_minutes,
                price_cents, status, payment_status, payment_session_id,
                tips_amount_cents, tips_percentage_bps, tips_distribution,
                tips_payment_status, tips_session_id,
                completed_at, created_at, updated_at, deleted_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19,
                ?20, ?21,
                ?22, ?23, ?24, ?25, ?26
            )
            "#,
        )
        .bind(&job.id)
        .bind(&job.request_number)
        .bind(&job.user_id)
        .bind(&job.operator_id)
        .bind(job.property_type)
        .bind(job.square_feet.map(i64::from))
        .bind(job.floor_count.map(i64::from))
        .bind(&encoded.additional_objects)
        .bind(job.package)
        .bind(i64::from(job.crew_size))
        .bind(job.departure_time)
        .bind(job.estimated_duration_minutes.map(i64::from))
        .bind(job.price.map(|p| p.cents()))
        .bind(job.status)
        .bind(job.payment_status)
        .bind(&job.payment_session_id)
        .bind(encoded.tips_amount_cents)
        .bind(encoded.tips_percentage_bps)
        .bind(&encoded.tips_distribution)
        .bind(job.tips_payment_status)
        .bind(&job.tips_session_id)
        .bind(job.completed_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.deleted_at)
        .bind(job.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("request_number") => {
                DbError::duplicate("request_number", job.request_number.clone())
            }
            other => other,
        })?;

        insert_children(&mut tx, job).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Gets a live (not deleted) job by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE id = ?1 AND deleted_at IS NULL",
            JOB_COLUMNS
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.hydrate_optional(row).await
    }

    /// Gets a live (not deleted) job by its request number.
    pub async fn get_by_number(&self, request_number: &str) -> DbResult<Option<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE request_number = ?1 AND deleted_at IS NULL",
            JOB_COLUMNS
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(request_number)
            .fetch_optional(&self.pool)
            .await?;

        self.hydrate_optional(row).await
    }

    /// Gets a job by ID whether or not it was soft-deleted.
    pub async fn get_including_deleted(&self, id: &str) -> DbResult<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.hydrate_optional(row).await
    }

    /// Returns true if any job (deleted or not) uses this request number.
    pub async fn number_exists(&self, request_number: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE request_number = ?1")
            .bind(request_number)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Lists a customer's live jobs, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Job>> {
        let sql = format!(
            r#"
            SELECT {} FROM jobs
            WHERE user_id = ?1 AND deleted_at IS NULL
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(user_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            jobs.push(self.hydrate(row).await?);
        }
        Ok(jobs)
    }

    /// Lists live jobs in a given operational status, oldest departure first.
    pub async fn list_by_status(&self, status: JobStatus) -> DbResult<Vec<Job>> {
        let sql = format!(
            r#"
            SELECT {} FROM jobs
            WHERE status = ?1 AND deleted_at IS NULL
            ORDER BY departure_time ASC
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            jobs.push(self.hydrate(row).await?);
        }
        Ok(jobs)
    }

    /// Writes the job back, replacing its stops and materials atomically.
    ///
    /// `job.version` must be the version that was read. On success the
    /// stored version is bumped and the new value returned; if another
    /// writer got there first nothing is written and `VersionConflict` is
    /// returned.
    pub async fn update(&self, job: &Job) -> DbResult<i64> {
        let next_version = job.version + 1;
        debug!(
            job = %job.request_number,
            version = job.version,
            status = %job.status,
            "Updating job"
        );

        let encoded = EncodedJob::from_job(job)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                operator_id = ?3,
                property_type = ?4,
                square_feet = ?5,
                floor_count = ?6,
                additional_objects = ?7,
                package = ?8,
                crew_size = ?9,
                departure_time = ?10,
                estimated_duration_minutes = ?11,
                price_cents = ?12,
                status = ?13,
                payment_status = ?14,
                payment_session_id = ?15,
                tips_amount_cents = ?16,
                tips_percentage_bps = ?17,
                tips_distribution = ?18,
                tips_payment_status = ?19,
                tips_session_id = ?20,
                completed_at = ?21,
                updated_at = ?22,
                deleted_at = ?23,
                version = ?24
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&job.id)
        .bind(job.version)
        .bind(&job.operator_id)
        .bind(job.property_type)
        .bind(job.square_feet.map(i64::from))
        .bind(job.floor_count.map(i64::from))
        .bind(&encoded.additional_objects)
        .bind(job.package)
        .bind(i64::from(job.crew_size))
        .bind(job.departure_time)
        .bind(job.estimated_duration_minutes.map(i64::from))
        .bind(job.price.map(|p| p.cents()))
        .bind(job.status)
        .bind(job.payment_status)
        .bind(&job.payment_session_id)
        .bind(encoded.tips_amount_cents)
        .bind(encoded.tips_percentage_bps)
        .bind(&encoded.tips_distribution)
        .bind(job.tips_payment_status)
        .bind(&job.tips_session_id)
        .bind(job.completed_at)
        .bind(job.updated_at)
        .bind(job.deleted_at)
        .bind(next_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(DbError::VersionConflict {
                entity: ENTITY.to_string(),
                id: job.request_number.clone(),
                expected: job.version,
            });
        }

        sqlx::query("DELETE FROM stops WHERE job_id = ?1")
            .bind(&job.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM material_lines WHERE job_id = ?1")
            .bind(&job.id)
            .execute(&mut *tx)
            .await?;
        insert_children(&mut tx, job).await?;

        tx.commit().await?;
        Ok(next_version)
    }

    // -------------------------------------------------------------------------
    // Hydration
    // -------------------------------------------------------------------------

    async fn hydrate_optional(&self, row: Option<JobRow>) -> DbResult<Option<Job>> {
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn hydrate(&self, row: JobRow) -> DbResult<Job> {
        let stops = sqlx::query_as::<_, StopRow>(
            r#"
            SELECT sequence, role, latitude, longitude, address, category
            FROM stops
            WHERE job_id = ?1
            ORDER BY sequence ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(StopRow::into_stop)
        .collect::<DbResult<Vec<_>>>()?;

        let materials = sqlx::query_as::<_, MaterialRow>(
            r#"
            SELECT packing_material_id, name, quantity, unit_price_cents
            FROM material_lines
            WHERE job_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(MaterialRow::into_line)
        .collect::<DbResult<Vec<_>>>()?;

        row.into_job(stops, materials)
    }
}

/// Inserts the job's full stop and material sets inside `tx`.
async fn insert_children(tx: &mut Transaction<'_, Sqlite>, job: &Job) -> DbResult<()> {
    for stop in &job.stops {
        sqlx::query(
            r#"
            INSERT INTO stops (job_id, sequence, role, latitude, longitude, address, category)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&job.id)
        .bind(i64::from(stop.sequence))
        .bind(stop.role)
        .bind(stop.location.latitude)
        .bind(stop.location.longitude)
        .bind(&stop.address)
        .bind(stop.category)
        .execute(&mut **tx)
        .await?;
    }

    for (position, line) in job.materials.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO material_lines (
                job_id, position, packing_material_id, name, quantity, unit_price_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&job.id)
        .bind(position as i64)
        .bind(line.packing_material_id)
        .bind(&line.name)
        .bind(i64::from(line.quantity))
        .bind(line.unit_price.cents())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
