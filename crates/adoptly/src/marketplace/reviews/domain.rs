use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::pets::PetId;
use crate::marketplace::users::UserId;
use crate::store::Paged;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl ReviewId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub author_id: UserId,
    pub pet_id: PetId,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Aggregate over every review of one pet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub count: usize,
    /// Rounded to one decimal; `None` when there are no reviews.
    pub average_rating: Option<f64>,
}

impl ReviewSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let (count, sum) = ratings
            .into_iter()
            .fold((0usize, 0u64), |(count, sum), rating| {
                (count + 1, sum + u64::from(rating))
            });
        let average_rating =
            (count > 0).then(|| (sum as f64 / count as f64 * 10.0).round() / 10.0);
        Self {
            count,
            average_rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetReviews {
    pub summary: ReviewSummary,
    pub reviews: Paged<Review>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_rounds_average() {
        let summary = ReviewSummary::from_ratings([5, 4, 4]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_rating, Some(4.3));

        assert_eq!(
            ReviewSummary::from_ratings([]),
            ReviewSummary {
                count: 0,
                average_rating: None
            }
        );
    }
}
