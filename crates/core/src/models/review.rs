//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, ReviewId, ReviewStatus, UserId};

/// A customer review awaiting or past moderation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub user_id: UserId,
    pub author_name: String,
    /// 1-5 stars.
    pub rating: u8,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Filled and empty stars, e.g. `★★★☆☆`.
    #[must_use]
    pub fn star_string(&self) -> String {
        let filled = usize::from(self.rating.min(5));
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_string() {
        let review = Review {
            id: ReviewId::new(1),
            product_id: ProductId::new(1),
            product_name: None,
            user_id: UserId::new(1),
            author_name: "Sam".to_string(),
            rating: 3,
            title: "Fine".to_string(),
            body: "Does the job well enough.".to_string(),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
        };
        assert_eq!(review.star_string(), "★★★☆☆");
    }
}
