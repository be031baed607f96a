use std::panic::Location;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Everything a handler can fail with.
///
/// Server errors keep their cause and the source location that raised
/// them for the log; the client only ever sees a generic status page.
#[derive(Debug)]
pub enum AppError {
    NotFound,
    Client(StatusCode),
    Server {
        source: anyhow::Error,
        location: &'static Location<'static>,
    },
}

impl AppError {
    #[track_caller]
    pub fn server(source: impl Into<anyhow::Error>) -> Self {
        Self::Server {
            source: source.into(),
            location: Location::caller(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Client(status) => *status,
            Self::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    #[track_caller]
    fn from(source: E) -> Self {
        Self::server(source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Server { source, location } = &self {
            error!(
                "{}:{}: {:#}",
                location.file(),
                location.line(),
                source
            );
        }

        let status = self.status();
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}

/// Run a blocking model call off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AppError::server(e)
    })
}
