use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::response::AppError;

/// `axum::Json<T>` whose rejection is an [`AppError`] with the JSON envelope,
/// not axum's plain-text 4xx.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection_to_app_error(rejection)),
        }
    }
}

fn json_rejection_to_app_error(rejection: JsonRejection) -> AppError {
    match rejection {
        // Unknown settings keys and wrong field types land here.
        JsonRejection::JsonDataError(e) => {
            let detail = e.body_text();
            tracing::warn!(error = %detail, "Request body does not match the expected shape");
            AppError::bad_request("VALIDATION_ERROR", &detail)
        }
        JsonRejection::JsonSyntaxError(e) => {
            tracing::warn!(error = %e, "Request body is not valid JSON");
            AppError::bad_request("INVALID_REQUEST_BODY", "Request body is not valid JSON")
        }
        JsonRejection::MissingJsonContentType(e) => {
            tracing::warn!(error = %e, "Missing JSON content type");
            AppError::bad_request("INVALID_REQUEST_BODY", "Expected Content-Type: application/json")
        }
        other => {
            tracing::warn!(error = %other, "Unreadable request body");
            AppError::bad_request("INVALID_REQUEST_BODY", "Unreadable request body")
        }
    }
}
