use std::path::Path;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::AppError;
use crate::middleware::{authenticate, require_auth};
use crate::state::AppState;
use crate::{snippets, users};

/// Time allowed to receive a request body.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed to produce a whole response.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com";

/// The whole application. `static_dir` is served under `/static/`.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/", get(snippets::home))
        .route("/snippet/view/{id}", get(snippets::view))
        .route("/user/signup", get(users::signup_form).post(users::signup))
        .route("/user/login", get(users::login_form).post(users::login));

    let protected_routes = Router::new()
        .route(
            "/snippet/create",
            get(snippets::create_form).post(snippets::create),
        )
        .route("/account/view", get(users::account))
        .route("/user/logout", post(users::logout))
        .route_layer(middleware::from_fn(require_auth));

    let static_files = ServeDir::new(static_dir).append_index_html_on_directories(false);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(state.sessions.clone())
        .route("/ping", get(ping))
        .nest_service("/static", static_files)
        .fallback(not_found)
        .layer(write_timeout())
        .layer(RequestBodyTimeoutLayer::new(READ_TIMEOUT))
        .layer(secure_header(
            header::CONTENT_SECURITY_POLICY,
            CONTENT_SECURITY_POLICY,
        ))
        .layer(secure_header(
            header::REFERRER_POLICY,
            "origin-when-cross-origin",
        ))
        .layer(secure_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(secure_header(header::X_FRAME_OPTIONS, "deny"))
        .layer(secure_header(header::X_XSS_PROTECTION, "0"))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// A handler still running after [`WRITE_TIMEOUT`] is abandoned with 503.
fn write_timeout() -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::SERVICE_UNAVAILABLE, WRITE_TIMEOUT)
}

fn secure_header(
    name: header::HeaderName,
    value: &'static str,
) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

async fn ping() -> &'static str {
    "OK"
}

async fn not_found() -> AppError {
    AppError::NotFound
}
