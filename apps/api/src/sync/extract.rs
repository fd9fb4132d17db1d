use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::{AppError, NON_FIELD_ERRORS};

/// JSON body extractor whose rejections are 400 field errors instead of
/// axum's default plain-text 415/422 responses.
pub struct SyncJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for SyncJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(SyncJson(value)),
            Err(rejection) => Err(AppError::validation(
                NON_FIELD_ERRORS,
                rejection_message(&rejection),
            )),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`.".to_string()
        }
        other => other.body_text(),
    }
}
