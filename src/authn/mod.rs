//! Authentication schemes (C3): the wire-level protocol by which credentials are conveyed and
//! verified against an [`crate::authz::AuthzBackend`].

mod basic;
mod bearer;
mod digest;
mod none;
mod oauth2;

pub use basic::BasicDriver;
pub use bearer::BearerDriver;
pub use digest::DigestDriver;
pub use none::NoneDriver;
pub use oauth2::OAuth2Driver;

use crate::authz::AuthzBackend;
use crate::config::{AuthnType, Config};
use crate::hash::HashFn;

/// Result of a successful [`AuthnDriver::check`]: enough to build an [`crate::AuthSession`].
#[derive(Debug, Clone)]
pub struct Verified {
    pub user: String,
}

/// Describes how a driver wants to challenge an unauthenticated request. Most schemes just
/// want a `WWW-Authenticate` header on a `401`; OAuth2-style schemes instead redirect the
/// browser to an external authorization endpoint - the connector (C6 S5) maps this onto the
/// CONTINUE/DONE distinction from the distilled spec: `Unauthenticated` is CONTINUE (core
/// still decides the status code), `Redirect` is DONE (driver already decided the response).
#[derive(Debug, Clone)]
pub enum Challenge {
    Unauthenticated { www_authenticate: String },
    Redirect { location: String },
}

/// The authentication scheme contract (C3).
pub trait AuthnDriver: Send + Sync {
    /// The scheme name as it appears as the first token of the `Authorization` header
    /// (`"Basic"`, `"Digest"`, `"Bearer"`, ...), matched case-insensitively against incoming
    /// credentials in S2.
    fn scheme_name(&self) -> &'static str;

    /// Per-client setup hook (e.g. seed fresh Digest nonces). Most drivers don't need it.
    fn setup(&self, _client_id: u64) {}

    fn challenge(&self, realm: &str) -> Challenge;

    /// Verify a credential. `payload` is the substring after the first space of the raw
    /// `Authorization` header (or the token-channel value). Returns the verified user on
    /// success.
    fn check(
        &self,
        method: &str,
        uri: &str,
        payload: &str,
        authz: &dyn AuthzBackend,
    ) -> Option<Verified>;
}

/// Build the configured authn driver.
pub fn build(config: &Config, hash: Option<HashFn>) -> Box<dyn AuthnDriver> {
    match config.authn_type {
        AuthnType::None => Box::new(NoneDriver),
        AuthnType::Basic => Box::new(BasicDriver::new()),
        AuthnType::Digest => Box::new(DigestDriver::new(
            config.realm.clone(),
            hash.unwrap_or(HashFn::Md5),
        )),
        AuthnType::Bearer => Box::new(BearerDriver::new()),
        AuthnType::Oauth2 => Box::new(OAuth2Driver::new(
            config.redirect.clone().unwrap_or_default(),
        )),
    }
}
