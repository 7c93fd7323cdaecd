//! # Review Repository
//!
//! Customer reviews, at most one per job (enforced by a UNIQUE index).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use moowwee_core::{MoverRating, Review};

const ENTITY: &str = "Review";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: String,
    job_id: String,
    user_id: String,
    rating: i64,
    review_text: Option<String>,
    mover_ratings: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self) -> DbResult<Review> {
        let rating = u8::try_from(self.rating)
            .map_err(|_| DbError::corrupt(ENTITY, format!("rating out of range: {}", self.rating)))?;
        let mover_ratings: Vec<MoverRating> =
            from_json(&self.mover_ratings, ENTITY, "mover_ratings")?;

        Ok(Review {
            id: self.id,
            job_id: self.job_id,
            user_id: self.user_id,
            rating,
            review_text: self.review_text,
            mover_ratings,
            is_published: self.is_published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for review database operations.
#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Creates a new ReviewRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReviewRepository { pool }
    }

    /// Inserts a review.
    ///
    /// ## Errors
    /// - `UniqueViolation` on `job_id` if the job already has a review
    pub async fn insert(&self, review: &Review) -> DbResult<()> {
        debug!(id = %review.id, job_id = %review.job_id, "Inserting review");

        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, job_id, user_id, rating, review_text, mover_ratings,
                is_published, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&review.id)
        .bind(&review.job_id)
        .bind(&review.user_id)
        .bind(i64::from(review.rating))
        .bind(&review.review_text)
        .bind(to_json(&review.mover_ratings, "mover_ratings")?)
        .bind(review.is_published)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("job_id") => {
                DbError::duplicate("review for job", review.job_id.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    /// Gets a review by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, job_id, user_id, rating, review_text, mover_ratings,
                   is_published, created_at, updated_at
            FROM reviews
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(ReviewRow::into_review)
        .transpose()
    }

    /// Gets the review for a job, if any.
    pub async fn get_for_job(&self, job_id: &str) -> DbResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, job_id, user_id, rating, review_text, mover_ratings,
                   is_published, created_at, updated_at
            FROM reviews
            WHERE job_id = ?1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .map(ReviewRow::into_review)
        .transpose()
    }

    /// Updates the editable fields of a review.
    ///
    /// ## Errors
    /// - `NotFound` if the review does not exist
    pub async fn update(&self, review: &Review) -> DbResult<()> {
        debug!(id = %review.id, "Updating review");

        let result = sqlx::query(
            r#"
            UPDATE reviews SET
                rating = ?2,
                review_text = ?3,
                mover_ratings = ?4,
                is_published = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&review.id)
        .bind(i64::from(review.rating))
        .bind(&review.review_text)
        .bind(to_json(&review.mover_ratings, "mover_ratings")?)
        .bind(review.is_published)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, review.id.clone()));
        }
        Ok(())
    }

    /// Deletes a review. Returns false if there was nothing to delete.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting review");

        let result = sqlx::query("DELETE FROM reviews WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
