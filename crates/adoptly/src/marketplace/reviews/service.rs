use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::marketplace::pets::{PetId, PetRepository};
use crate::marketplace::users::User;
use crate::store::{Page, RepositoryError};

use super::domain::{NewReview, PetReviews, Review, ReviewId, ReviewUpdate};
use super::repository::ReviewRepository;

const MAX_COMMENT_LENGTH: usize = 1000;

pub struct ReviewService<R> {
    repository: Arc<R>,
}

impl<R> ReviewService<R>
where
    R: ReviewRepository + PetRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(
        &self,
        author: &User,
        pet_id: &PetId,
        new_review: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewServiceError> {
        let rating = validate_rating(new_review.rating)?;
        let comment = validate_comment(new_review.comment.as_deref().unwrap_or(""))?;
        let pet = self
            .repository
            .fetch_pet(pet_id)?
            .ok_or(ReviewServiceError::PetNotFound)?;
        if pet.owner_id == author.id {
            return Err(ReviewServiceError::OwnPet);
        }

        let review = Review {
            id: ReviewId::generate(),
            author_id: author.id.clone(),
            pet_id: pet.id,
            rating,
            comment,
            created_at: now,
            updated_at: now,
        };
        let stored = self
            .repository
            .insert_review(review)
            .map_err(|err| match err {
                RepositoryError::Conflict => ReviewServiceError::AlreadyReviewed,
                RepositoryError::NotFound => ReviewServiceError::PetNotFound,
                other => ReviewServiceError::Repository(other),
            })?;
        info!(review_id = %stored.id, pet_id = %stored.pet_id, rating, "review posted");
        Ok(stored)
    }

    pub fn list_for_pet(
        &self,
        pet_id: &PetId,
        page: Page,
    ) -> Result<PetReviews, ReviewServiceError> {
        if self.repository.fetch_pet(pet_id)?.is_none() {
            return Err(ReviewServiceError::PetNotFound);
        }
        Ok(PetReviews {
            summary: self.repository.review_summary(pet_id)?,
            reviews: self.repository.reviews_for_pet(pet_id, page)?,
        })
    }

    pub fn update(
        &self,
        author: &User,
        id: &ReviewId,
        update: ReviewUpdate,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewServiceError> {
        let mut review = self.get(id)?;
        if review.author_id != author.id {
            return Err(ReviewServiceError::NotAuthor);
        }
        if let Some(rating) = update.rating {
            review.rating = validate_rating(rating)?;
        }
        if let Some(comment) = update.comment {
            review.comment = validate_comment(&comment)?;
        }
        review.updated_at = now;

        self.repository
            .update_review(review)
            .map_err(|err| match err {
                RepositoryError::NotFound => ReviewServiceError::ReviewNotFound,
                other => ReviewServiceError::Repository(other),
            })
    }

    /// Authors may delete their own reviews; admins may delete any.
    pub fn delete(
        &self,
        actor: &User,
        id: &ReviewId,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewServiceError> {
        let review = self.get(id)?;
        if review.author_id != actor.id && !actor.is_admin() {
            return Err(ReviewServiceError::NotAuthor);
        }
        let removed = self.repository.delete_review(id, now).map_err(|err| match err {
            RepositoryError::NotFound => ReviewServiceError::ReviewNotFound,
            other => ReviewServiceError::Repository(other),
        })?;
        info!(review_id = %id, actor_id = %actor.id, "review deleted");
        Ok(removed)
    }

    pub fn get(&self, id: &ReviewId) -> Result<Review, ReviewServiceError> {
        self.repository
            .fetch_review(id)?
            .ok_or(ReviewServiceError::ReviewNotFound)
    }
}

fn validate_rating(rating: u8) -> Result<u8, ReviewServiceError> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(ReviewServiceError::Invalid(
            "rating must be between 1 and 5".to_string(),
        ))
    }
}

fn validate_comment(raw: &str) -> Result<String, ReviewServiceError> {
    let comment = raw.trim();
    if comment.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ReviewServiceError::Invalid(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(comment.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("pet not found")]
    PetNotFound,
    #[error("review not found")]
    ReviewNotFound,
    #[error("you cannot review your own pet")]
    OwnPet,
    #[error("you have already reviewed this pet")]
    AlreadyReviewed,
    #[error("only the review's author can do that")]
    NotAuthor,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::testing::{admin, list_pet, register, store};

    fn five_stars() -> NewReview {
        NewReview {
            rating: 5,
            comment: Some("Sweetest dog we ever met".to_string()),
        }
    }

    #[test]
    fn one_review_per_author_and_pet() {
        let store = store();
        let service = ReviewService::new(store.clone());
        let owner = register(&store, "owner");
        let visitor = register(&store, "visitor");
        let pet = list_pet(&store, &owner, "Biscuit");
        let now = Utc::now();

        service
            .create(&visitor, &pet.id, five_stars(), now)
            .expect("first review");
        assert!(matches!(
            service.create(&visitor, &pet.id, five_stars(), now),
            Err(ReviewServiceError::AlreadyReviewed)
        ));
        assert!(matches!(
            service.create(&owner, &pet.id, five_stars(), now),
            Err(ReviewServiceError::OwnPet)
        ));
    }

    #[test]
    fn rating_bounds_are_enforced() {
        let store = store();
        let service = ReviewService::new(store.clone());
        let owner = register(&store, "owner");
        let visitor = register(&store, "visitor");
        let pet = list_pet(&store, &owner, "Biscuit");

        for rating in [0, 6] {
            assert!(matches!(
                service.create(
                    &visitor,
                    &pet.id,
                    NewReview {
                        rating,
                        comment: None
                    },
                    Utc::now()
                ),
                Err(ReviewServiceError::Invalid(_))
            ));
        }
    }

    #[test]
    fn listing_carries_summary() {
        let store = store();
        let service = ReviewService::new(store.clone());
        let owner = register(&store, "owner");
        let pet = list_pet(&store, &owner, "Biscuit");
        let now = Utc::now();
        for (name, rating) in [("ann", 5), ("ben", 4), ("cat", 4)] {
            let author = register(&store, name);
            service
                .create(
                    &author,
                    &pet.id,
                    NewReview {
                        rating,
                        comment: None,
                    },
                    now,
                )
                .expect("review");
        }

        let listing = service
            .list_for_pet(&pet.id, Page::new(Some(1), Some(2)))
            .expect("listing");
        assert_eq!(listing.summary.count, 3);
        assert_eq!(listing.summary.average_rating, Some(4.3));
        assert_eq!(listing.reviews.items.len(), 2);
    }

    #[test]
    fn only_author_updates_but_admin_may_delete() {
        let store = store();
        let service = ReviewService::new(store.clone());
        let owner = register(&store, "owner");
        let visitor = register(&store, "visitor");
        let moderator = admin(&store, "moderator");
        let pet = list_pet(&store, &owner, "Biscuit");
        let now = Utc::now();
        let review = service
            .create(&visitor, &pet.id, five_stars(), now)
            .expect("review");

        let update = ReviewUpdate {
            rating: Some(3),
            comment: None,
        };
        assert!(matches!(
            service.update(&owner, &review.id, update.clone(), now),
            Err(ReviewServiceError::NotAuthor)
        ));
        let updated = service
            .update(&visitor, &review.id, update, now)
            .expect("author updates");
        assert_eq!(updated.rating, 3);
        assert_eq!(updated.comment, "Sweetest dog we ever met");

        assert!(matches!(
            service.delete(&owner, &review.id, now),
            Err(ReviewServiceError::NotAuthor)
        ));
        service
            .delete(&moderator, &review.id, now)
            .expect("admin deletes");
        assert!(matches!(
            service.get(&review.id),
            Err(ReviewServiceError::ReviewNotFound)
        ));
    }
}
