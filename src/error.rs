use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while constructing or operating the authentication middleware.
///
/// Authentication *failures* (bad password, expired token, ...) are not represented here —
/// those are turned into a challenge or redirect response by the connector (see
/// [`crate::connector`]) and never bubble up as a `Result::Err`. Only construction-time and
/// backend-I/O failures reach this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested `authz_type` isn't available (backend not compiled in, or its
    /// prerequisites - e.g. a database file - aren't reachable).
    #[error("authorization backend unavailable: {0}")]
    ConfigMissing(String),

    /// `UNIX_E` was requested without the server being configured as single-client.
    #[error("UNIX_E (OS-user impersonation) requires `exclusive_server = true`")]
    ExclusiveServerRequired,

    /// A SQLite backend error.
    #[error("sqlite backend error")]
    Sqlite(#[from] rusqlite::Error),

    /// A JWT encode/decode error.
    #[error("jwt error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Reading or parsing a `File` backend's credential file failed.
    #[error("authz file error")]
    Io(#[from] std::io::Error),
}

/// Lets handlers bail out with `?` while still producing a response; mirrors the teacher's
/// `http::error::Error` -> `IntoResponse` bridge, but this crate's `Error` variants are all
/// construction-time failures so they always map to `500`.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        log::error!("auth middleware error: {}", self);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Extension trait mirroring the teacher's `ResultExt`, giving `authz::build`'s backend
/// constructors a terse way to turn a missing-prerequisite `Option` into a `ConfigMissing`
/// error with context.
pub trait ResultExt<T> {
    fn or_config_missing(self, what: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Option<T> {
    fn or_config_missing(self, what: &str) -> Result<T> {
        self.ok_or_else(|| Error::ConfigMissing(what.to_string()))
    }
}
