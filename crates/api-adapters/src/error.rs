//! Maps [`AppError`] onto HTTP responses.
//!
//! Every failure is a JSON body `{ "message", "code" }`. Store failures are
//! logged with their cause and answered with a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::AppError;
use serde::Serialize;
use tracing::error;

const STORE_FAILURE_MESSAGE: &str = "Something went wrong, please try again later.";
const UNKNOWN_ROUTE_MESSAGE: &str = "Could not find this route.";
const WRONG_METHOD_MESSAGE: &str = "This method is not supported for this route.";

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
}

/// Response-side wrapper so handlers can `?` on service results.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::ValidationFailed(vec![rejection.body_text()]))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            AppError::Unauthenticated(msg) | AppError::Forbidden(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::NotFound(entity, _) => {
                format!("Could not find {} for the provided id.", entity.to_lowercase())
            }
            AppError::ValidationFailed(problems) => problems.join(", "),
            AppError::StoreFailure(_) => STORE_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let AppError::StoreFailure(cause) = &self.0 {
            error!(cause = %cause, "request failed on the store");
        }
        let body = ErrorBody { message: self.message(), code: self.0.code() };
        (self.status(), Json(body)).into_response()
    }
}

/// Router fallback.
pub async fn unknown_route() -> Response {
    let body = ErrorBody { message: UNKNOWN_ROUTE_MESSAGE.to_string(), code: "not_found" };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Fallback for a known path hit with a method it does not serve.
pub async fn method_not_allowed() -> Response {
    let body = ErrorBody { message: WRONG_METHOD_MESSAGE.to_string(), code: "method_not_allowed" };
    (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response()
}
