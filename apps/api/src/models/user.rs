use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Simplified user mirrored for analytics, keyed by the primary system's uid.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub is_worker: bool,
    pub created_at: DateTime<Utc>,
    pub job_id: Option<i32>,
}

/// Validated input for a new user. `job_key` is the job's external key and
/// still has to be resolved to a local job id before the row is written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub is_worker: bool,
    pub created_at: DateTime<Utc>,
    pub job_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_worker: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the job reference.
    pub job_key: Option<Option<String>>,
}
