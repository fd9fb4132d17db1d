//! Data access for the mirror tables.
//!
//! `AppState` carries an `Arc<dyn MirrorStore>`; production wires in
//! [`PgStore`], tests wire in an in-memory store with the same contract.
//! Each write method is one transaction: lookups, then the write, then commit.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::errors::AppError;
use crate::models::job::{JobChanges, NewJob};
use crate::models::review::NewReview;
use crate::models::user::{NewUser, UserChanges};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

pub const JOB_NOT_FOUND: &str = "Job not found";
pub const USER_NOT_FOUND: &str = "User not found";
pub const REVIEW_NOT_FOUND: &str = "Review not found";

pub const DUPLICATE_JOB_KEY: &str = "job with this firebase_key already exists.";
pub const DUPLICATE_USER_UID: &str = "user with this uid already exists.";
pub const DUPLICATE_REVIEW_ID: &str = "review with this id already exists.";

pub fn unresolved_job_message(key: &str) -> String {
    format!("Job with firebase_key '{key}' does not exist; job must be synced first.")
}

pub fn unknown_user_message(uid: &str) -> String {
    format!("User '{uid}' does not exist.")
}

// ────────────────────────────────────────────────────────────────────────────
// Raw aggregate rows (rounding and formatting happen in analytics::stats)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MonthCount {
    pub month: NaiveDate,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserAggregates {
    pub total: i64,
    pub workers: i64,
    /// Ascending by month; months without users are absent.
    pub by_month: Vec<MonthCount>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct JobWorkerCount {
    pub job_id: Option<i32>,
    pub job_name: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WorkerScore {
    pub uid: String,
    pub name: String,
    pub job_name: Option<String>,
    pub avg_score: Decimal,
    pub review_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerAggregates {
    /// Descending by worker count.
    pub by_job: Vec<JobWorkerCount>,
    /// At most [`TOP_WORKERS_LIMIT`] workers that received at least one review.
    pub top_workers: Vec<WorkerScore>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct JobScore {
    pub job_name: Option<String>,
    pub avg_score: Decimal,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ScoreCount {
    pub score: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewAggregates {
    /// `None` when there are no reviews.
    pub global_average: Option<Decimal>,
    pub total: i64,
    pub by_job: Vec<JobScore>,
    /// Ascending by score, observed scores only.
    pub distribution: Vec<ScoreCount>,
}

pub const TOP_WORKERS_LIMIT: i64 = 10;

/// Storage port for the sync and analytics endpoints.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Returns the local id of the new job.
    async fn create_job(&self, job: NewJob) -> Result<i32, AppError>;
    async fn update_job(&self, id: i32, changes: JobChanges) -> Result<(), AppError>;

    async fn create_user(&self, user: NewUser) -> Result<(), AppError>;
    async fn update_user(&self, uid: &str, changes: UserChanges) -> Result<(), AppError>;

    async fn create_review(&self, review: NewReview) -> Result<(), AppError>;
    async fn delete_review(&self, id: &str) -> Result<(), AppError>;

    async fn user_aggregates(&self) -> Result<UserAggregates, AppError>;
    async fn worker_aggregates(&self) -> Result<WorkerAggregates, AppError>;
    async fn review_aggregates(&self) -> Result<ReviewAggregates, AppError>;
}
