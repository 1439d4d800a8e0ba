//! # Authentication gate
//!
//! `authenticate` runs in front of every collection route. It reads
//! `Authorization: Bearer <token>`, verifies it with the configured
//! [`TokenService`](domains::TokenService) and stores the resulting
//! [`Caller`] in the request extensions. CORS preflights pass straight
//! through. Ownership is not decided here; handlers hand the caller to the
//! services, which compare it against the item owner.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use domains::{AppError, AuthError, UserId};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

const USER_MISMATCH: &str = "Authentication failed! User mismatched";

/// Identity of the verified bearer, attached by [`authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
}

impl Caller {
    /// Fails when a request names a user other than the caller, either in
    /// the path (`/user/{uid}`) or in a create body (`user`).
    pub fn ensure_is(&self, claimed: UserId) -> Result<(), ApiError> {
        if self.user_id == claimed {
            Ok(())
        } else {
            warn!(caller = %self.user_id, claimed = %claimed, "caller does not match the requested user");
            Err(AppError::Unauthenticated(USER_MISMATCH.to_string()).into())
        }
    }
}

pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let user_id = bearer_token(request.headers())
        .and_then(|token| state.tokens.verify(token))
        .map_err(|err| {
            warn!(error = %err, path = %request.uri().path(), "request rejected by the authentication gate");
            ApiError::from(AppError::from(err))
        })?;

    request.extensions_mut().insert(Caller { user_id });
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingCredential)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedCredential),
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or_else(|| AppError::from(AuthError::MissingCredential).into())
    }
}
