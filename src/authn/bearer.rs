use crate::authn::{AuthnDriver, Challenge, Verified};
use crate::authz::AuthzBackend;

/// RFC 6750 Bearer authentication: the payload *is* the token, verified entirely through the
/// authz backend's `check` (opaque token lookup, or JWT signature/expiry verification when
/// paired with [`crate::authz::JwtBackend`]).
pub struct BearerDriver;

impl BearerDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BearerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthnDriver for BearerDriver {
    fn scheme_name(&self) -> &'static str {
        "Bearer"
    }

    fn challenge(&self, realm: &str) -> Challenge {
        Challenge::Unauthenticated {
            www_authenticate: format!("Bearer realm=\"{realm}\""),
        }
    }

    fn check(
        &self,
        _method: &str,
        _uri: &str,
        payload: &str,
        authz: &dyn AuthzBackend,
    ) -> Option<Verified> {
        let token = payload.trim();
        if token.is_empty() {
            return None;
        }
        authz.check(token).map(|user| Verified { user })
    }
}
