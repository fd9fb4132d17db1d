//! Request bodies accepted by the sync endpoints.
//!
//! Every field is optional at this layer so that a missing field becomes a
//! per-field validation message instead of a body rejection.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct JobPayload {
    pub name: Option<String>,
    pub firebase_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_worker: Option<bool>,
    pub created_at: Option<String>,
    /// External key of the user's job. An explicit `null` clears it on update.
    #[serde(default, deserialize_with = "present", alias = "job_key")]
    pub job: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewPayload {
    pub id: Option<String>,
    #[serde(alias = "reviewer_uid")]
    pub reviewer: Option<String>,
    #[serde(alias = "reviewed_uid")]
    pub reviewed: Option<String>,
    /// Number or numeric string; parsed as a decimal during validation.
    pub score: Option<Value>,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_job_is_none() {
        let payload: UserPayload = serde_json::from_value(json!({ "uid": "u1" })).unwrap();
        assert_eq!(payload.job, None);
    }

    #[test]
    fn test_null_job_is_explicit_clear() {
        let payload: UserPayload = serde_json::from_value(json!({ "job": null })).unwrap();
        assert_eq!(payload.job, Some(None));
    }

    #[test]
    fn test_job_key_alias() {
        let payload: UserPayload = serde_json::from_value(json!({ "job_key": "J1" })).unwrap();
        assert_eq!(payload.job, Some(Some("J1".to_string())));
    }

    #[test]
    fn test_review_uid_aliases() {
        let payload: ReviewPayload = serde_json::from_value(json!({
            "reviewer_uid": "a",
            "reviewed_uid": "b",
            "score": "4.5"
        }))
        .unwrap();
        assert_eq!(payload.reviewer.as_deref(), Some("a"));
        assert_eq!(payload.reviewed.as_deref(), Some("b"));
        assert_eq!(payload.score, Some(json!("4.5")));
    }
}
