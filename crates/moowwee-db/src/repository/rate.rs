//! # Rate Repository
//!
//! The singleton rate configuration row and the packing-material catalog.
//! The engine only reads these; writes come from the seed binary and
//! back-office tooling.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use moowwee_core::{Money, PackingMaterial, RateConfiguration};

#[derive(Debug, sqlx::FromRow)]
struct RateRow {
    hourly_rate_cents: i64,
    floor_fee_cents: i64,
    per_mile_fee_cents: i64,
    piano_fee_cents: i64,
    gun_safe_fee_cents: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MaterialRow {
    id: i64,
    name: String,
    display_name: String,
    price_cents: i64,
    description: Option<String>,
    is_active: bool,
    is_full_service: bool,
    sort_order: i64,
}

impl MaterialRow {
    fn into_material(self) -> DbResult<PackingMaterial> {
        let sort_order = i32::try_from(self.sort_order).map_err(|_| {
            DbError::corrupt("PackingMaterial", format!("sort_order out of range: {}", self.sort_order))
        })?;

        Ok(PackingMaterial {
            id: self.id,
            name: self.name,
            display_name: self.display_name,
            price: Money::from_cents(self.price_cents),
            description: self.description,
            is_active: self.is_active,
            is_full_service: self.is_full_service,
            sort_order,
        })
    }
}

/// Repository for pricing inputs.
#[derive(Debug, Clone)]
pub struct RateRepository {
    pool: SqlitePool,
}

impl RateRepository {
    /// Creates a new RateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RateRepository { pool }
    }

    /// Loads the rate configuration with its full catalog (active and
    /// inactive entries, in display order).
    ///
    /// ## Errors
    /// - `NotFound` if the database was never seeded
    pub async fn load(&self) -> DbResult<RateConfiguration> {
        let row = sqlx::query_as::<_, RateRow>(
            r#"
            SELECT hourly_rate_cents, floor_fee_cents, per_mile_fee_cents,
                   piano_fee_cents, gun_safe_fee_cents, updated_at
            FROM rate_configuration
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("RateConfiguration", "1"))?;

        let packing_materials = self.list_materials(false).await?;

        Ok(RateConfiguration {
            hourly_rate: Money::from_cents(row.hourly_rate_cents),
            floor_fee: Money::from_cents(row.floor_fee_cents),
            per_mile_fee: Money::from_cents(row.per_mile_fee_cents),
            piano_fee: Money::from_cents(row.piano_fee_cents),
            gun_safe_fee: Money::from_cents(row.gun_safe_fee_cents),
            packing_materials,
            updated_at: row.updated_at,
        })
    }

    /// Writes the fee fields of the singleton row. The catalog is managed
    /// separately through [`upsert_material`](Self::upsert_material).
    pub async fn save(&self, rates: &RateConfiguration) -> DbResult<()> {
        debug!(hourly = %rates.hourly_rate, per_mile = %rates.per_mile_fee, "Saving rate configuration");

        sqlx::query(
            r#"
            INSERT INTO rate_configuration (
                id, hourly_rate_cents, floor_fee_cents, per_mile_fee_cents,
                piano_fee_cents, gun_safe_fee_cents, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (id) DO UPDATE SET
                hourly_rate_cents = excluded.hourly_rate_cents,
                floor_fee_cents = excluded.floor_fee_cents,
                per_mile_fee_cents = excluded.per_mile_fee_cents,
                piano_fee_cents = excluded.piano_fee_cents,
                gun_safe_fee_cents = excluded.gun_safe_fee_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(rates.hourly_rate.cents())
        .bind(rates.floor_fee.cents())
        .bind(rates.per_mile_fee.cents())
        .bind(rates.piano_fee.cents())
        .bind(rates.gun_safe_fee.cents())
        .bind(rates.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a catalog entry or updates the one with the same machine
    /// name. `material.id` is ignored; the stored id is returned.
    pub async fn upsert_material(&self, material: &PackingMaterial) -> DbResult<i64> {
        debug!(name = %material.name, price = %material.price, "Upserting packing material");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO packing_materials (
                name, display_name, price_cents, description,
                is_active, is_full_service, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (name) DO UPDATE SET
                display_name = excluded.display_name,
                price_cents = excluded.price_cents,
                description = excluded.description,
                is_active = excluded.is_active,
                is_full_service = excluded.is_full_service,
                sort_order = excluded.sort_order
            RETURNING id
            "#,
        )
        .bind(&material.name)
        .bind(&material.display_name)
        .bind(material.price.cents())
        .bind(&material.description)
        .bind(material.is_active)
        .bind(material.is_full_service)
        .bind(i64::from(material.sort_order))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Lists catalog entries in display order.
    pub async fn list_materials(&self, active_only: bool) -> DbResult<Vec<PackingMaterial>> {
        let rows = sqlx::query_as::<_, MaterialRow>(
            r#"
            SELECT id, name, display_name, price_cents, description,
                   is_active, is_full_service, sort_order
            FROM packing_materials
            WHERE (?1 = 0 OR is_active = 1)
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MaterialRow::into_material).collect()
    }

    /// Counts catalog entries.
    pub async fn count_materials(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packing_materials")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;

    fn material(name: &str, cents: i64, active: bool, sort_order: i32) -> PackingMaterial {
        PackingMaterial {
            id: 0,
            name: name.to_string(),
            display_name: name.replace('_', " "),
            price: Money::from_cents(cents),
            description: None,
            is_active: active,
            is_full_service: false,
            sort_order,
        }
    }

    fn rates() -> RateConfiguration {
        RateConfiguration {
            hourly_rate: Money::from_dollars(125),
            floor_fee: Money::zero(),
            per_mile_fee: Money::from_dollars(2),
            piano_fee: Money::zero(),
            gun_safe_fee: Money::zero(),
            packing_materials: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_load_unseeded_is_not_found() {
        let db = Database::in_memory().await.unwrap();
        let err = db.rates().load().await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_save_and_load_rates_with_catalog() {
        let db = Database::in_memory().await.unwrap();
        db.rates().save(&rates()).await.unwrap();
        db.rates().upsert_material(&material("medium_boxes", 500, true, 2)).await.unwrap();
        db.rates().upsert_material(&material("small_boxes", 300, true, 1)).await.unwrap();
        db.rates().upsert_material(&material("retired_crate", 900, false, 9)).await.unwrap();

        let loaded = db.rates().load().await.unwrap();
        assert_eq!(loaded.hourly_rate.cents(), 12_500);
        assert_eq!(loaded.per_mile_fee.cents(), 200);
        let names: Vec<&str> = loaded.packing_materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["small_boxes", "medium_boxes", "retired_crate"]);

        let active = db.rates().list_materials(true).await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_material_keeps_id() {
        let db = Database::in_memory().await.unwrap();
        let first = db.rates().upsert_material(&material("small_boxes", 300, true, 1)).await.unwrap();
        let second = db.rates().upsert_material(&material("small_boxes", 350, true, 1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(db.rates().count_materials().await.unwrap(), 1);
        let stored = db.rates().list_materials(false).await.unwrap();
        assert_eq!(stored[0].price.cents(), 350);
    }

    #[tokio::test]
    async fn test_save_overwrites_singleton() {
        let db = Database::in_memory().await.unwrap();
        db.rates().save(&rates()).await.unwrap();

        let mut changed = rates();
        changed.piano_fee = Money::from_dollars(150);
        db.rates().save(&changed).await.unwrap();

        assert_eq!(db.rates().load().await.unwrap().piano_fee.cents(), 15_000);
    }
}
