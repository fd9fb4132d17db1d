//! In-memory `MirrorStore` used by handler tests. Applies the same key
//! uniqueness and reference checks as the PostgreSQL store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Datelike;
use rust_decimal::Decimal;

use crate::errors::{AppError, FieldErrors};
use crate::models::job::{JobChanges, JobRow, NewJob};
use crate::models::review::{NewReview, ReviewRow};
use crate::models::user::{NewUser, UserChanges, UserRow};
use crate::store::{
    unknown_user_message, unresolved_job_message, JobScore, JobWorkerCount, MirrorStore,
    MonthCount, ReviewAggregates, ScoreCount, UserAggregates, WorkerAggregates, WorkerScore,
    DUPLICATE_JOB_KEY, DUPLICATE_REVIEW_ID, DUPLICATE_USER_UID, JOB_NOT_FOUND, REVIEW_NOT_FOUND,
    TOP_WORKERS_LIMIT, USER_NOT_FOUND,
};

#[derive(Default)]
struct Tables {
    next_job_id: i32,
    jobs: BTreeMap<i32, JobRow>,
    users: BTreeMap<String, UserRow>,
    reviews: BTreeMap<String, ReviewRow>,
}

impl Tables {
    fn job_id_for_key(&self, key: &str) -> Option<i32> {
        self.jobs
            .values()
            .find(|j| j.firebase_key == key)
            .map(|j| j.id)
    }

    fn job_name(&self, job_id: Option<i32>) -> Option<String> {
        job_id.and_then(|id| self.jobs.get(&id)).map(|j| j.name.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, id: i32) -> Option<JobRow> {
        self.tables.lock().unwrap().jobs.get(&id).cloned()
    }

    pub fn user(&self, uid: &str) -> Option<UserRow> {
        self.tables.lock().unwrap().users.get(uid).cloned()
    }

    pub fn review(&self, id: &str) -> Option<ReviewRow> {
        self.tables.lock().unwrap().reviews.get(id).cloned()
    }

    pub fn review_count(&self) -> usize {
        self.tables.lock().unwrap().reviews.len()
    }
}

fn mean(scores: &[Decimal]) -> Option<Decimal> {
    if scores.is_empty() {
        return None;
    }
    let sum: Decimal = scores.iter().copied().sum();
    Some(sum / Decimal::from(scores.len()))
}

#[async_trait]
impl MirrorStore for MemoryStore {
    async fn create_job(&self, job: NewJob) -> Result<i32, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.job_id_for_key(&job.firebase_key).is_some() {
            return Err(AppError::validation("firebase_key", DUPLICATE_JOB_KEY));
        }
        tables.next_job_id += 1;
        let id = tables.next_job_id;
        tables.jobs.insert(
            id,
            JobRow {
                id,
                firebase_key: job.firebase_key,
                name: job.name,
            },
        );
        Ok(id)
    }

    async fn update_job(&self, id: i32, changes: JobChanges) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.jobs.contains_key(&id) {
            return Err(AppError::NotFound(JOB_NOT_FOUND.to_string()));
        }
        if let Some(key) = &changes.firebase_key {
            if matches!(tables.job_id_for_key(key), Some(other) if other != id) {
                return Err(AppError::validation("firebase_key", DUPLICATE_JOB_KEY));
            }
        }
        if let Some(job) = tables.jobs.get_mut(&id) {
            if let Some(key) = changes.firebase_key {
                job.firebase_key = key;
            }
            if let Some(name) = changes.name {
                job.name = name;
            }
        }
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        let mut errors = FieldErrors::new();
        if tables.users.contains_key(&user.uid) {
            errors.add("uid", DUPLICATE_USER_UID);
        }
        let job_id = match &user.job_key {
            Some(key) => {
                let resolved = tables.job_id_for_key(key);
                if resolved.is_none() {
                    errors.add("job", unresolved_job_message(key));
                }
                resolved
            }
            None => None,
        };
        errors.into_result()?;

        tables.users.insert(
            user.uid.clone(),
            UserRow {
                uid: user.uid,
                name: user.name,
                email: user.email,
                is_worker: user.is_worker,
                created_at: user.created_at,
                job_id,
            },
        );
        Ok(())
    }

    async fn update_user(&self, uid: &str, changes: UserChanges) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.users.contains_key(uid) {
            return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
        }
        let job_id = match &changes.job_key {
            None => None,
            Some(None) => Some(None),
            Some(Some(key)) => Some(Some(tables.job_id_for_key(key).ok_or_else(|| {
                AppError::validation("job", unresolved_job_message(key))
            })?)),
        };
        if let Some(user) = tables.users.get_mut(uid) {
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(is_worker) = changes.is_worker {
                user.is_worker = is_worker;
            }
            if let Some(created_at) = changes.created_at {
                user.created_at = created_at;
            }
            if let Some(job_id) = job_id {
                user.job_id = job_id;
            }
        }
        Ok(())
    }

    async fn create_review(&self, review: NewReview) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        let mut errors = FieldErrors::new();
        if tables.reviews.contains_key(&review.id) {
            errors.add("id", DUPLICATE_REVIEW_ID);
        }
        if !tables.users.contains_key(&review.reviewer_uid) {
            errors.add("reviewer", unknown_user_message(&review.reviewer_uid));
        }
        if !tables.users.contains_key(&review.reviewed_uid) {
            errors.add("reviewed", unknown_user_message(&review.reviewed_uid));
        }
        errors.into_result()?;

        tables.reviews.insert(
            review.id.clone(),
            ReviewRow {
                id: review.id,
                reviewer_id: review.reviewer_uid,
                reviewed_id: review.reviewed_uid,
                score: review.score,
                description: review.description,
                created_at: review.created_at,
            },
        );
        Ok(())
    }

    async fn delete_review(&self, id: &str) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .reviews
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))
    }

    async fn user_aggregates(&self) -> Result<UserAggregates, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut months: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
        for user in tables.users.values() {
            let day = user.created_at.date_naive();
            let month = day.with_day(1).unwrap_or(day);
            *months.entry(month).or_default() += 1;
        }
        Ok(UserAggregates {
            total: tables.users.len() as i64,
            workers: tables.users.values().filter(|u| u.is_worker).count() as i64,
            by_month: months
                .into_iter()
                .map(|(month, total)| MonthCount { month, total })
                .collect(),
        })
    }

    async fn worker_aggregates(&self) -> Result<WorkerAggregates, AppError> {
        let tables = self.tables.lock().unwrap();
        let workers: Vec<&UserRow> = tables.users.values().filter(|u| u.is_worker).collect();

        let mut groups: BTreeMap<Option<i32>, i64> = BTreeMap::new();
        for worker in &workers {
            *groups.entry(worker.job_id).or_default() += 1;
        }
        let mut by_job: Vec<JobWorkerCount> = groups
            .into_iter()
            .map(|(job_id, total)| JobWorkerCount {
                job_id,
                job_name: tables.job_name(job_id),
                total,
            })
            .collect();
        by_job.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| match (&a.job_name, &b.job_name) {
                    (Some(x), Some(y)) => x.cmp(y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });

        let mut top_workers: Vec<WorkerScore> = workers
            .iter()
            .filter_map(|worker| {
                let scores: Vec<Decimal> = tables
                    .reviews
                    .values()
                    .filter(|r| r.reviewed_id == worker.uid)
                    .map(|r| r.score)
                    .collect();
                mean(&scores).map(|avg_score| WorkerScore {
                    uid: worker.uid.clone(),
                    name: worker.name.clone(),
                    job_name: tables.job_name(worker.job_id),
                    avg_score,
                    review_count: scores.len() as i64,
                })
            })
            .collect();
        top_workers.sort_by(|a, b| {
            b.avg_score
                .cmp(&a.avg_score)
                .then_with(|| b.review_count.cmp(&a.review_count))
                .then_with(|| a.uid.cmp(&b.uid))
        });
        top_workers.truncate(TOP_WORKERS_LIMIT as usize);

        Ok(WorkerAggregates {
            by_job,
            top_workers,
        })
    }

    async fn review_aggregates(&self) -> Result<ReviewAggregates, AppError> {
        let tables = self.tables.lock().unwrap();
        let scores: Vec<Decimal> = tables.reviews.values().map(|r| r.score).collect();

        let mut per_job: BTreeMap<Option<String>, Vec<Decimal>> = BTreeMap::new();
        let mut per_score: BTreeMap<Decimal, i64> = BTreeMap::new();
        for review in tables.reviews.values() {
            let job_name = tables
                .users
                .get(&review.reviewed_id)
                .and_then(|u| tables.job_name(u.job_id));
            per_job.entry(job_name).or_default().push(review.score);
            *per_score.entry(review.score.normalize()).or_default() += 1;
        }

        // BTreeMap orders None first; unassigned goes last like NULLS LAST.
        let mut by_job: Vec<JobScore> = per_job
            .into_iter()
            .filter_map(|(job_name, scores)| {
                mean(&scores).map(|avg_score| JobScore {
                    job_name,
                    avg_score,
                })
            })
            .collect();
        by_job.sort_by_key(|j| j.job_name.is_none());

        Ok(ReviewAggregates {
            global_average: mean(&scores),
            total: scores.len() as i64,
            by_job,
            distribution: per_score
                .into_iter()
                .map(|(score, count)| ScoreCount { score, count })
                .collect(),
        })
    }
}
