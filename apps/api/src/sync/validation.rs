//! Field-level validation for sync payloads.
//!
//! Each `validate_*` function turns a loosely-typed payload into a typed model
//! input or an `AppError::Validation` carrying every field error found.
//! Checks that need the database (duplicate keys, job-key resolution, user
//! existence) belong to the store.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::errors::{AppError, FieldErrors, NON_FIELD_ERRORS};
use crate::models::job::{JobChanges, NewJob};
use crate::models::review::NewReview;
use crate::models::user::{NewUser, UserChanges};
use crate::sync::payloads::{JobPayload, ReviewPayload, UserPayload};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_DATETIME: &str = "Datetime has wrong format. Use an RFC 3339 timestamp.";
pub const INVALID_NUMBER: &str = "A valid number is required.";
pub const SCORE_RANGE: &str = "Score must be between 1.0 and 5.0.";
pub const SCORE_STEP: &str = "Score must be in increments of 0.5.";
pub const DESCRIPTION_LENGTH: &str = "Description must be between 10 and 500 characters.";
pub const SELF_REVIEW: &str = "A user cannot review themselves.";

const KEY_MAX_LEN: usize = 100;
const JOB_NAME_MAX_LEN: usize = 100;
const USER_NAME_MAX_LEN: usize = 255;
const EMAIL_MAX_LEN: usize = 254;
const DESCRIPTION_MIN_LEN: usize = 10;
const DESCRIPTION_MAX_LEN: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Per-entity validation
// ────────────────────────────────────────────────────────────────────────────

pub fn validate_new_job(payload: JobPayload) -> Result<NewJob, AppError> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", payload.name, JOB_NAME_MAX_LEN);
    let firebase_key = required_text(&mut errors, "firebase_key", payload.firebase_key, KEY_MAX_LEN);

    match (name, firebase_key) {
        (Some(name), Some(firebase_key)) if errors.is_empty() => Ok(NewJob { name, firebase_key }),
        _ => Err(AppError::Validation(errors)),
    }
}

pub fn validate_job_changes(payload: JobPayload) -> Result<JobChanges, AppError> {
    let mut errors = FieldErrors::new();
    let changes = JobChanges {
        name: optional_text(&mut errors, "name", payload.name, JOB_NAME_MAX_LEN),
        firebase_key: optional_text(&mut errors, "firebase_key", payload.firebase_key, KEY_MAX_LEN),
    };
    errors.into_result()?;
    Ok(changes)
}

pub fn validate_new_user(payload: UserPayload) -> Result<NewUser, AppError> {
    let mut errors = FieldErrors::new();
    let uid = required_text(&mut errors, "uid", payload.uid, KEY_MAX_LEN);
    let name = required_text(&mut errors, "name", payload.name, USER_NAME_MAX_LEN);
    let email = match payload.email {
        Some(raw) => email(&mut errors, raw),
        None => {
            errors.add("email", REQUIRED);
            None
        }
    };
    let created_at = match payload.created_at {
        Some(raw) => timestamp(&mut errors, "created_at", &raw),
        None => {
            errors.add("created_at", REQUIRED);
            None
        }
    };
    let job_key = job_key(&mut errors, payload.job.flatten());

    match (uid, name, email, created_at) {
        (Some(uid), Some(name), Some(email), Some(created_at)) if errors.is_empty() => {
            Ok(NewUser {
                uid,
                name,
                email,
                is_worker: payload.is_worker.unwrap_or(false),
                created_at,
                job_key,
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

pub fn validate_user_changes(payload: UserPayload) -> Result<UserChanges, AppError> {
    let mut errors = FieldErrors::new();
    let changes = UserChanges {
        name: optional_text(&mut errors, "name", payload.name, USER_NAME_MAX_LEN),
        email: payload.email.and_then(|raw| email(&mut errors, raw)),
        is_worker: payload.is_worker,
        created_at: payload
            .created_at
            .and_then(|raw| timestamp(&mut errors, "created_at", &raw)),
        job_key: payload.job.map(|key| job_key(&mut errors, key)),
    };
    errors.into_result()?;
    Ok(changes)
}

pub fn validate_new_review(payload: ReviewPayload) -> Result<NewReview, AppError> {
    let mut errors = FieldErrors::new();
    let id = required_text(&mut errors, "id", payload.id, KEY_MAX_LEN);
    let reviewer_uid = required_text(&mut errors, "reviewer", payload.reviewer, KEY_MAX_LEN);
    let reviewed_uid = required_text(&mut errors, "reviewed", payload.reviewed, KEY_MAX_LEN);

    if let (Some(reviewer), Some(reviewed)) = (&reviewer_uid, &reviewed_uid) {
        if reviewer == reviewed {
            errors.add(NON_FIELD_ERRORS, SELF_REVIEW);
        }
    }

    let score = match payload.score {
        Some(Value::Null) | None => {
            errors.add("score", REQUIRED);
            None
        }
        Some(raw) => score(&mut errors, &raw),
    };

    let description = match payload.description {
        Some(raw) => description(&mut errors, &raw),
        None => {
            errors.add("description", REQUIRED);
            None
        }
    };

    let created_at = match payload.created_at {
        Some(raw) => timestamp(&mut errors, "created_at", &raw),
        None => {
            errors.add("created_at", REQUIRED);
            None
        }
    };

    match (id, reviewer_uid, reviewed_uid, score, description, created_at) {
        (
            Some(id),
            Some(reviewer_uid),
            Some(reviewed_uid),
            Some(score),
            Some(description),
            Some(created_at),
        ) if errors.is_empty() => Ok(NewReview {
            id,
            reviewer_uid,
            reviewed_uid,
            score,
            description,
            created_at,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field rules
// ────────────────────────────────────────────────────────────────────────────

fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Option<String> {
    match value {
        Some(raw) => text(errors, field, &raw, max_len),
        None => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Option<String> {
    value.and_then(|raw| text(errors, field, &raw, max_len))
}

/// Trims, then rejects blank or over-long values.
fn text(errors: &mut FieldErrors, field: &str, raw: &str, max_len: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if trimmed.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// `None` and blank keys both mean "no job".
fn job_key(errors: &mut FieldErrors, value: Option<String>) -> Option<String> {
    match value {
        Some(raw) if !raw.trim().is_empty() => text(errors, "job", &raw, KEY_MAX_LEN),
        _ => None,
    }
}

fn email(errors: &mut FieldErrors, raw: String) -> Option<String> {
    let normalized = normalize_email(&raw);
    if normalized.is_empty() {
        errors.add("email", BLANK);
        return None;
    }
    if normalized.chars().count() > EMAIL_MAX_LEN {
        errors.add(
            "email",
            format!("Ensure this field has no more than {EMAIL_MAX_LEN} characters."),
        );
        return None;
    }
    if !is_valid_email(&normalized) {
        errors.add("email", INVALID_EMAIL);
        return None;
    }
    Some(normalized)
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || local.len() > 64
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || domain.contains('@')
    {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

fn timestamp(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        errors.add(field, INVALID_DATETIME);
    }
    parsed
}

/// RFC 3339, or a naive ISO 8601 date-time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn score(errors: &mut FieldErrors, raw: &Value) -> Option<Decimal> {
    let Some(parsed) = parse_decimal(raw) else {
        errors.add("score", INVALID_NUMBER);
        return None;
    };
    let mut valid = true;
    if parsed < Decimal::ONE || parsed > Decimal::from(5) {
        errors.add("score", SCORE_RANGE);
        valid = false;
    }
    if !is_half_step(parsed) {
        errors.add("score", SCORE_STEP);
        valid = false;
    }
    valid.then(|| parsed.normalize())
}

pub fn parse_decimal(raw: &Value) -> Option<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// True when `score` is an exact multiple of 0.5.
pub fn is_half_step(score: Decimal) -> bool {
    (score * Decimal::TWO).fract().is_zero()
}

fn description(errors: &mut FieldErrors, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&len) {
        errors.add("description", DESCRIPTION_LENGTH);
        return None;
    }
    Some(trimmed.to_string())
}
