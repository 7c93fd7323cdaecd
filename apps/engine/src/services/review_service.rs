//! # Review Service
//!
//! One customer review per job, written and edited by the job's owner.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use moowwee_core::validation::validate_review;
use moowwee_core::{Actor, CoreError, Job, Review, ReviewInput};
use moowwee_db::Database;

use crate::error::{EngineError, EngineResult};

#[derive(Clone)]
pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    pub fn new(db: Database) -> Self {
        ReviewService { db }
    }

    /// Submits the owner's review of a job. Unpublished until the back office
    /// publishes it.
    pub async fn submit_review(
        &self,
        actor: &Actor,
        job_id: &str,
        input: ReviewInput,
    ) -> EngineResult<Review> {
        let job = self.owned_job(actor, job_id, "review job").await?;
        validate_review(&input, job.crew_size).map_err(CoreError::from)?;

        if self.db.reviews().get_for_job(&job.id).await?.is_some() {
            return Err(EngineError::Conflict(format!(
                "Job {} already has a review",
                job.request_number
            )));
        }

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            user_id: actor.user_id.clone(),
            rating: input.rating,
            review_text: input.review_text,
            mover_ratings: input.mover_ratings,
            is_published: false,
            created_at: now,
            updated_at: now,
        };
        self.db.reviews().insert(&review).await?;

        info!(job = %job.request_number, rating = review.rating, "Review submitted");
        Ok(review)
    }

    pub async fn get_review_for_job(&self, job_id: &str) -> EngineResult<Option<Review>> {
        Ok(self.db.reviews().get_for_job(job_id).await?)
    }

    /// Replaces rating, text and mover ratings of the owner's review.
    pub async fn update_review(
        &self,
        actor: &Actor,
        review_id: &str,
        input: ReviewInput,
    ) -> EngineResult<Review> {
        let mut review = self.owned_review(actor, review_id, "update review").await?;
        let job = self
            .db
            .jobs()
            .get_including_deleted(&review.job_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Job", &review.job_id))?;
        validate_review(&input, job.crew_size).map_err(CoreError::from)?;

        review.rating = input.rating;
        review.review_text = input.review_text;
        review.mover_ratings = input.mover_ratings;
        review.updated_at = Utc::now();
        self.db.reviews().update(&review).await?;

        info!(review = %review.id, job = %job.request_number, "Review updated");
        Ok(review)
    }

    pub async fn delete_review(&self, actor: &Actor, review_id: &str) -> EngineResult<()> {
        let review = self.owned_review(actor, review_id, "delete review").await?;
        if !self.db.reviews().delete(&review.id).await? {
            debug!(review = %review.id, "Review already gone");
        }

        info!(review = %review.id, "Review deleted");
        Ok(())
    }

    async fn owned_job(&self, actor: &Actor, job_id: &str, operation: &str) -> EngineResult<Job> {
        let job = self
            .db
            .jobs()
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Job", job_id))?;

        if !job.is_owned_by(actor) {
            return Err(CoreError::unauthorized(&job.request_number, &actor.user_id, operation).into());
        }
        Ok(job)
    }

    async fn owned_review(
        &self,
        actor: &Actor,
        review_id: &str,
        operation: &str,
    ) -> EngineResult<Review> {
        let review = self
            .db
            .reviews()
            .get_by_id(review_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Review", review_id))?;

        if review.user_id != actor.user_id {
            return Err(CoreError::unauthorized(&review.job_id, &actor.user_id, operation).into());
        }
        Ok(review)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::RequestService;
    use crate::test_support::{new_job, seeded_db};
    use moowwee_core::MoverRating;
    use moowwee_routing::RouteResolver;
    use std::sync::Arc;

    async fn setup() -> (ReviewService, Job) {
        let db = seeded_db().await;
        let requests = RequestService::new(db.clone(), Arc::new(RouteResolver::haversine_only(40.0)));
        let job = requests
            .create_job(&Actor::new("customer-1"), new_job())
            .await
            .unwrap();
        (ReviewService::new(db), job)
    }

    fn input(rating: u8) -> ReviewInput {
        ReviewInput {
            rating,
            review_text: Some("Careful with the piano, quick with the boxes".to_string()),
            mover_ratings: vec![
                MoverRating { crew_member: 1, rating: 5 },
                MoverRating { crew_member: 3, rating: 4 },
            ],
        }
    }

    #[tokio::test]
    async fn test_submit_and_read_back() {
        let (service, job) = setup().await;
        let actor = Actor::new("customer-1");

        let review = service.submit_review(&actor, &job.id, input(5)).await.unwrap();
        assert!(!review.is_published);

        let loaded = service.get_review_for_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded, review);
    }

    #[tokio::test]
    async fn test_second_review_conflicts() {
        let (service, job) = setup().await;
        let actor = Actor::new("customer-1");
        service.submit_review(&actor, &job.id, input(5)).await.unwrap();

        let err = service.submit_review(&actor, &job.id, input(4)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_only_owner_may_review() {
        let (service, job) = setup().await;

        let err = service
            .submit_review(&Actor::new("customer-2"), &job.id, input(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_mover_outside_crew_rejected() {
        let (service, job) = setup().await;
        let mut bad = input(5);
        bad.mover_ratings.push(MoverRating { crew_member: 4, rating: 5 });

        let err = service
            .submit_review(&Actor::new("customer-1"), &job.id, bad)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (service, job) = setup().await;
        let actor = Actor::new("customer-1");
        let review = service.submit_review(&actor, &job.id, input(3)).await.unwrap();

        let updated = service.update_review(&actor, &review.id, input(5)).await.unwrap();
        assert_eq!(updated.rating, 5);

        let err = service
            .delete_review(&Actor::new("customer-2"), &review.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);

        service.delete_review(&actor, &review.id).await.unwrap();
        assert!(service.get_review_for_job(&job.id).await.unwrap().is_none());
    }
}
