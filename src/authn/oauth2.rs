use crate::authn::{AuthnDriver, Challenge, Verified};
use crate::authz::AuthzBackend;

/// A minimal OAuth2 bearer-token scheme: like [`crate::authn::BearerDriver`], verification is
/// delegated entirely to the authz backend's `check`, but unauthenticated requests are
/// redirected to an external authorization endpoint instead of receiving a `WWW-Authenticate`
/// challenge - a browser can't satisfy a `401` for OAuth2 the way it can for Basic/Digest.
pub struct OAuth2Driver {
    authorize_url: String,
}

impl OAuth2Driver {
    pub fn new(authorize_url: String) -> Self {
        Self { authorize_url }
    }
}

impl AuthnDriver for OAuth2Driver {
    fn scheme_name(&self) -> &'static str {
        "Bearer"
    }

    fn challenge(&self, _realm: &str) -> Challenge {
        Challenge::Redirect {
            location: self.authorize_url.clone(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_is_a_redirect() {
        let driver = OAuth2Driver::new("https://idp.example/authorize".to_string());
        match driver.challenge("auth") {
            Challenge::Redirect { location } => {
                assert_eq!(location, "https://idp.example/authorize")
            }
            other => panic!("expected a redirect, got {other:?}"),
        }
    }
}
