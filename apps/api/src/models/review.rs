use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub id: String,
    pub reviewer_id: String,
    pub reviewed_id: String,
    pub score: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Validated review: score is a half step in [1.0, 5.0] and reviewer != reviewed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub id: String,
    pub reviewer_uid: String,
    pub reviewed_uid: String,
    pub score: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
