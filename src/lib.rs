// The normal style for documenting modules is to place the doc-comments inside the module
// files at the top with `//!`, known as internal doc comments.
//
// However, this style better facilitates a guided exploration of the code, so it's the one
// we'll be using in this project.

/// Defines the command-line / environment arguments that configure a server: which
/// authentication scheme and authorization backend to wire up, the URL protection globs,
/// and the token/session flags.
///
/// [`clap`]: https://github.com/clap-rs/clap/
pub mod config;

/// The crate-wide error type.
pub mod error;

/// Named one-way hash lookup (md5, sha1, sha224/256, sha512) used by the Basic and Digest
/// authn drivers and by the `File` authz backend to verify stored secrets.
pub mod hash;

/// Opaque session-token generation: the default 24-random-byte URL-safe generator, and the
/// JWT-backed one used when the authz backend is [`authz::jwt`].
pub mod token;

/// The `AuthSession` record attached to authenticated requests, and the per-connection
/// `ClientCtx` that remembers a client has already authenticated.
pub mod session;

/// Authorization backends: `Simple`, `File`, `Unix`, `Sqlite`, `Jwt`. Each implements
/// [`authz::AuthzBackend`].
pub mod authz;

/// Authentication schemes: `None`, `Basic`, `Digest`, `Bearer`, `OAuth2`. Each implements
/// [`authn::AuthnDriver`].
pub mod authn;

/// The middleware module itself: wiring, the per-request connector state machine, the home
/// redirect connector, and the `CurrentUser` extractor downstream handlers use to read the
/// attached `AuthSession`.
pub mod connector;

pub use config::Config;
pub use connector::{AuthMiddleware, CurrentUser, MaybeCurrentUser};
pub use error::{Error, Result};
pub use session::AuthSession;
