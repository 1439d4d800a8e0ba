//! Route table and the layers wrapped around it.

use axum::extract::Request;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn};

use domains::{Book, Favourite, Recent};

use crate::auth::authenticate;
use crate::error::{method_not_allowed, unknown_route};
use crate::items::{self, HttpItem};
use crate::state::AppState;
use crate::users;

const WELCOME: &str = "Welcome to the Bookshelf API.";
const X_REQUEST_ID: &str = "x-request-id";

/// Builds the full application router.
///
/// `cors_origins` empty allows any origin.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let accounts = Router::new()
        .route("/api/users", get(users::list))
        .route("/api/users/signup", post(users::signup))
        .route("/api/users/login", post(users::login));

    Router::new()
        .route("/", get(|| async { WELCOME }))
        .route("/health", get(|| async { "ok" }))
        .merge(accounts)
        .merge(item_routes::<Book>(state.clone()))
        .merge(item_routes::<Favourite>(state.clone()))
        .merge(item_routes::<Recent>(state.clone()))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(unknown_route)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    info_span!("request", method = %request.method(), uri = %request.uri(), request_id)
                }))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID)))
                .layer(cors_layer(cors_origins)),
        )
}

/// Every route of one collection, all behind the authentication gate.
fn item_routes<T: HttpItem>(state: AppState) -> Router<AppState> {
    let base = format!("/api/{}", T::COLLECTION.as_str());
    Router::new()
        .route(&base, get(items::list_all::<T>).post(items::create::<T>))
        .route(&format!("{base}/user/{{uid}}"), get(items::list_by_user::<T>))
        .route(
            &format!("{base}/{{id}}"),
            get(items::get_one::<T>).patch(items::update::<T>).delete(items::delete::<T>),
        )
        .route_layer(from_fn_with_state(state, authenticate))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
        ])
}
