//! HTTP handler layer of the snippet box: routes, sessions, templates and
//! the mapping from model errors to responses.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod snippets;
pub mod state;
pub mod templates;
pub mod users;
pub mod validation;

pub use error::AppError;
pub use routes::router;
pub use session::{Session, SessionLayer, session_layer};
pub use state::{AppState, AppStateInner};
pub use templates::TemplateCache;
