use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use snippetbox_db::DomainError;
use snippetbox_types::{User, UserId};
use std::convert::Infallible;
use tracing::debug;

use crate::error::{AppError, blocking};
use crate::session::Session;
use crate::state::AppState;

/// Session key holding the logged-in user's id.
pub const AUTH_USER_KEY: &str = "authenticatedUserID";

pub const LOGIN_PATH: &str = "/user/login";

/// Who is asking: the resolved account, if any.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// A logged-in account. Only extract this behind [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer(Some(user))) => Ok(Self(user.clone())),
            _ => Err(Redirect::to(LOGIN_PATH).into_response()),
        }
    }
}

/// Resolve the session's user id into a [`Viewer`]. A stale id (account
/// gone) is treated as anonymous.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut viewer = Viewer::default();

    if let Some(id) = session.get::<UserId>(AUTH_USER_KEY).await? {
        let users = state.users.clone();
        match blocking(move || users.get(id)).await? {
            Ok(user) => viewer = Viewer(Some(user)),
            Err(e) if e == DomainError::NoRecord => {
                debug!("Session refers to missing user {}", id);
            }
            Err(e) => return Err(AppError::server(e)),
        }
    }

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

/// Redirect anonymous callers to the login page; keep protected pages out
/// of shared caches.
pub async fn require_auth(viewer: Viewer, req: Request, next: Next) -> Response {
    if !viewer.is_authenticated() {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
