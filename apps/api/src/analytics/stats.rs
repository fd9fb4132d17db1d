//! Presentation of raw aggregates: month keys, client counts, and 2-decimal
//! half-to-even rounding of score means. Stored and intermediate values keep full precision.

use anyhow::anyhow;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::errors::AppError;
use crate::store::{ReviewAggregates, UserAggregates, WorkerAggregates};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthTotal {
    pub month: String, // "YYYY-MM"
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserStats {
    pub total_users: i64,
    pub workers: i64,
    pub clients: i64,
    pub users_by_month: Vec<MonthTotal>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobWorkers {
    pub job_id: Option<i32>,
    pub job_name: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopWorker {
    pub uid: String,
    pub name: String,
    pub job: Option<String>,
    pub avg_score: f64,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WorkerStats {
    pub workers_by_job: Vec<JobWorkers>,
    pub top_workers: Vec<TopWorker>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobAverage {
    pub job_name: Option<String>,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreBucket {
    pub score: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewStats {
    pub global_average: f64,
    pub average_by_job: Vec<JobAverage>,
    pub total_reviews: i64,
    pub score_distribution: Vec<ScoreBucket>,
}

/// Rounds half to even at 2 places, then converts for JSON output.
pub fn present_score(value: Decimal) -> Result<f64, AppError> {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        .to_f64()
        .ok_or_else(|| AppError::Internal(anyhow!("score {value} is not representable as f64")))
}

pub fn user_stats(raw: UserAggregates) -> UserStats {
    UserStats {
        total_users: raw.total,
        workers: raw.workers,
        clients: raw.total - raw.workers,
        users_by_month: raw
            .by_month
            .into_iter()
            .map(|m| MonthTotal {
                month: m.month.format("%Y-%m").to_string(),
                total: m.total,
            })
            .collect(),
    }
}

pub fn worker_stats(raw: WorkerAggregates) -> Result<WorkerStats, AppError> {
    Ok(WorkerStats {
        workers_by_job: raw
            .by_job
            .into_iter()
            .map(|j| JobWorkers {
                job_id: j.job_id,
                job_name: j.job_name,
                total: j.total,
            })
            .collect(),
        top_workers: raw
            .top_workers
            .into_iter()
            .filter(|w| w.review_count > 0)
            .map(|w| {
                Ok(TopWorker {
                    avg_score: present_score(w.avg_score)?,
                    uid: w.uid,
                    name: w.name,
                    job: w.job_name,
                    review_count: w.review_count,
                })
            })
            .collect::<Result<_, AppError>>()?,
    })
}

pub fn review_stats(raw: ReviewAggregates) -> Result<ReviewStats, AppError> {
    let global_average = match raw.global_average {
        Some(mean) => present_score(mean)?,
        None => 0.0,
    };
    Ok(ReviewStats {
        global_average,
        average_by_job: raw
            .by_job
            .into_iter()
            .map(|j| {
                Ok(JobAverage {
                    avg_score: present_score(j.avg_score)?,
                    job_name: j.job_name,
                })
            })
            .collect::<Result<_, AppError>>()?,
        total_reviews: raw.total,
        score_distribution: raw
            .distribution
            .into_iter()
            .map(|s| {
                Ok(ScoreBucket {
                    score: present_score(s.score)?,
                    count: s.count,
                })
            })
            .collect::<Result<_, AppError>>()?,
    })
}
