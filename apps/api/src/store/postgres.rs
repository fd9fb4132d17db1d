use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::info;

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

/// PostgreSQL-backed mirror store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a read-only snapshot so every query of one report sees the same data.
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// Maps a unique-key violation raised by a concurrent writer to the same
/// field error the pre-check would have produced.
fn map_unique_violation(err: sqlx::Error, field: &str, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::validation(field, message)
        }
        _ => AppError::Database(err),
    }
}

async fn job_key_taken(
    conn: &mut PgConnection,
    key: &str,
    except_id: Option<i32>,
) -> Result<bool, AppError> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM analytics_job WHERE firebase_key = $1 AND ($2::INTEGER IS NULL OR id <> $2)",
    )
    .bind(key)
    .bind(except_id)
    .fetch_optional(conn)
    .await?;
    Ok(found.is_some())
}

/// Resolves a job's external key to its local id.
async fn resolve_job_key(conn: &mut PgConnection, key: &str) -> Result<Option<i32>, AppError> {
    Ok(
        sqlx::query_scalar("SELECT id FROM analytics_job WHERE firebase_key = $1")
            .bind(key)
            .fetch_optional(conn)
            .await?,
    )
}

async fn user_exists(conn: &mut PgConnection, uid: &str) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM analytics_user WHERE uid = $1)")
            .bind(uid)
            .fetch_one(conn)
            .await?,
    )
}

#[async_trait]
impl MirrorStore for PgStore {
    async fn create_job(&self, job: NewJob) -> Result<i32, AppError> {
        let mut tx = self.pool.begin().await?;

        if job_key_taken(&mut tx, &job.firebase_key, None).await? {
            return Err(AppError::validation("firebase_key", DUPLICATE_JOB_KEY));
        }

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO analytics_job (firebase_key, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(&job.firebase_key)
        .bind(&job.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "firebase_key", DUPLICATE_JOB_KEY))?;

        tx.commit().await?;
        info!("Synced new job {id} ({}) '{}'", job.firebase_key, job.name);
        Ok(id)
    }

    async fn update_job(&self, id: i32, changes: JobChanges) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, JobRow>(
            "SELECT id, firebase_key, name FROM analytics_job WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))?;

        if let Some(key) = &changes.firebase_key {
            if job_key_taken(&mut tx, key, Some(id)).await? {
                return Err(AppError::validation("firebase_key", DUPLICATE_JOB_KEY));
            }
        }

        let firebase_key = changes.firebase_key.unwrap_or(existing.firebase_key);
        let name = changes.name.unwrap_or(existing.name);

        sqlx::query("UPDATE analytics_job SET firebase_key = $1, name = $2 WHERE id = $3")
            .bind(&firebase_key)
            .bind(&name)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "firebase_key", DUPLICATE_JOB_KEY))?;

        tx.commit().await?;
        info!("Synced job update {id} ({firebase_key}) '{name}'");
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let mut errors = FieldErrors::new();

        if user_exists(&mut tx, &user.uid).await? {
            errors.add("uid", DUPLICATE_USER_UID);
        }

        let job_id = match &user.job_key {
            Some(key) => {
                let resolved = resolve_job_key(&mut tx, key).await?;
                if resolved.is_none() {
                    errors.add("job", unresolved_job_message(key));
                }
                resolved
            }
            None => None,
        };

        errors.into_result()?;

        sqlx::query(
            r#"
            INSERT INTO analytics_user (uid, name, email, is_worker, created_at, job_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&user.uid)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_worker)
        .bind(user.created_at)
        .bind(job_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "uid", DUPLICATE_USER_UID))?;

        tx.commit().await?;
        info!(
            "Synced new user {} (worker: {}, job: {:?})",
            user.uid, user.is_worker, job_id
        );
        Ok(())
    }

    async fn update_user(&self, uid: &str, changes: UserChanges) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT uid, name, email, is_worker, created_at, job_id
            FROM analytics_user
            WHERE uid = $1
            FOR UPDATE
            "#,
        )
        .bind(uid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        let job_id = match &changes.job_key {
            None => existing.job_id,
            Some(None) => None,
            Some(Some(key)) => Some(
                resolve_job_key(&mut tx, key)
                    .await?
                    .ok_or_else(|| AppError::validation("job", unresolved_job_message(key)))?,
            ),
        };

        let name = changes.name.unwrap_or(existing.name);
        let email = changes.email.unwrap_or(existing.email);
        let is_worker = changes.is_worker.unwrap_or(existing.is_worker);
        let created_at = changes.created_at.unwrap_or(existing.created_at);

        sqlx::query(
            r#"
            UPDATE analytics_user
            SET name = $1, email = $2, is_worker = $3, created_at = $4, job_id = $5
            WHERE uid = $6
            "#,
        )
        .bind(&name)
        .bind(&email)
        .bind(is_worker)
        .bind(created_at)
        .bind(job_id)
        .bind(uid)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Synced user update {uid} (worker: {is_worker}, job: {job_id:?})");
        Ok(())
    }

    async fn create_review(&self, review: NewReview) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let mut errors = FieldErrors::new();

        let id_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM analytics_review WHERE id = $1)")
                .bind(&review.id)
                .fetch_one(&mut *tx)
                .await?;
        if id_taken {
            errors.add("id", DUPLICATE_REVIEW_ID);
        }
        if !user_exists(&mut tx, &review.reviewer_uid).await? {
            errors.add("reviewer", unknown_user_message(&review.reviewer_uid));
        }
        if !user_exists(&mut tx, &review.reviewed_uid).await? {
            errors.add("reviewed", unknown_user_message(&review.reviewed_uid));
        }

        errors.into_result()?;

        sqlx::query(
            r#"
            INSERT INTO analytics_review
                (id, reviewer_id, reviewed_id, score, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&review.id)
        .bind(&review.reviewer_uid)
        .bind(&review.reviewed_uid)
        .bind(review.score)
        .bind(&review.description)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "id", DUPLICATE_REVIEW_ID))?;

        tx.commit().await?;
        info!(
            "Synced new review {} ({} -> {}, score {})",
            review.id, review.reviewer_uid, review.reviewed_uid, review.score
        );
        Ok(())
    }

    async fn delete_review(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query_as::<_, ReviewRow>(
            r#"
            DELETE FROM analytics_review
            WHERE id = $1
            RETURNING id, reviewer_id, reviewed_id, score, description, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))?;

        tx.commit().await?;
        info!(
            "Deleted review {} ({} -> {})",
            deleted.id, deleted.reviewer_id, deleted.reviewed_id
        );
        Ok(())
    }

    async fn user_aggregates(&self) -> Result<UserAggregates, AppError> {
        let mut tx = self.begin_snapshot().await?;

        let (total, workers): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_worker) FROM analytics_user",
        )
        .fetch_one(&mut *tx)
        .await?;

        let by_month = sqlx::query_as::<_, MonthCount>(
            r#"
            SELECT date_trunc('month', created_at AT TIME ZONE 'UTC')::DATE AS month,
                   COUNT(*) AS total
            FROM analytics_user
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UserAggregates {
            total,
            workers,
            by_month,
        })
    }

    async fn worker_aggregates(&self) -> Result<WorkerAggregates, AppError> {
        let mut tx = self.begin_snapshot().await?;

        let by_job = sqlx::query_as::<_, JobWorkerCount>(
            r#"
            SELECT j.id AS job_id, j.name AS job_name, COUNT(u.uid) AS total
            FROM analytics_user u
            LEFT JOIN analytics_job j ON j.id = u.job_id
            WHERE u.is_worker
            GROUP BY j.id, j.name
            ORDER BY total DESC, j.name ASC NULLS LAST
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        // Inner join on reviews: workers without received reviews have no mean.
        let top_workers = sqlx::query_as::<_, WorkerScore>(
            r#"
            SELECT u.uid, u.name, j.name AS job_name,
                   AVG(r.score) AS avg_score, COUNT(r.id) AS review_count
            FROM analytics_user u
            JOIN analytics_review r ON r.reviewed_id = u.uid
            LEFT JOIN analytics_job j ON j.id = u.job_id
            WHERE u.is_worker
            GROUP BY u.uid, u.name, j.name
            ORDER BY avg_score DESC, review_count DESC, u.uid ASC
            LIMIT $1
            "#,
        )
        .bind(TOP_WORKERS_LIMIT)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(WorkerAggregates {
            by_job,
            top_workers,
        })
    }

    async fn review_aggregates(&self) -> Result<ReviewAggregates, AppError> {
        let mut tx = self.begin_snapshot().await?;

        let (global_average, total): (Option<rust_decimal::Decimal>, i64) =
            sqlx::query_as("SELECT AVG(score), COUNT(*) FROM analytics_review")
                .fetch_one(&mut *tx)
                .await?;

        let by_job = sqlx::query_as::<_, JobScore>(
            r#"
            SELECT j.name AS job_name, AVG(r.score) AS avg_score
            FROM analytics_review r
            JOIN analytics_user u ON u.uid = r.reviewed_id
            LEFT JOIN analytics_job j ON j.id = u.job_id
            GROUP BY j.name
            ORDER BY j.name ASC NULLS LAST
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let distribution = sqlx::query_as::<_, ScoreCount>(
            r#"
            SELECT score, COUNT(*) AS count
            FROM analytics_review
            GROUP BY score
            ORDER BY score ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReviewAggregates {
            global_average,
            total,
            by_job,
            distribution,
        })
    }
}
