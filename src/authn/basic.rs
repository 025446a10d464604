use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::authn::{AuthnDriver, Challenge, Verified};
use crate::authz::AuthzBackend;

/// RFC 7617 Basic access authentication: `base64(user:pass)` checked against the backend's
/// stored secret.
pub struct BasicDriver;

impl BasicDriver {
    pub fn new() -> Self {
        Self
    }
}

impl AuthnDriver for BasicDriver {
    fn scheme_name(&self) -> &'static str {
        "Basic"
    }

    fn challenge(&self, realm: &str) -> Challenge {
        Challenge::Unauthenticated {
            www_authenticate: format!("Basic realm=\"{realm}\""),
        }
    }

    fn check(
        &self,
        _method: &str,
        _uri: &str,
        payload: &str,
        authz: &dyn AuthzBackend,
    ) -> Option<Verified> {
        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;

        let secret = authz.passwd(user)?;
        if secret.matches(pass) {
            Some(Verified {
                user: user.to_string(),
            })
        } else {
            log::debug!("basic auth: bad password for user {user:?}");
            None
        }
    }
}

impl Default for BasicDriver {
    fn default() -> Self {
        Self::new()
    }
}
