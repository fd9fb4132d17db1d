use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A trade (plumber, electrician, ...) mirrored from the primary system.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub firebase_key: String,
    pub name: String,
}

/// Validated input for a new job.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub name: String,
    pub firebase_key: String,
}

/// Validated partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobChanges {
    pub name: Option<String>,
    pub firebase_key: Option<String>,
}
