use crate::authn::{AuthnDriver, Challenge, Verified};
use crate::authz::AuthzBackend;

/// The `None` authentication scheme: `check` never verifies anyone, and `challenge` issues an
/// empty `WWW-Authenticate`. Only useful paired with `unprotect` (or `protect = ""`) so the
/// affected URLs are never challenged in the first place - combined with a default `protect =
/// "*"` this scheme makes every protected URL permanently unreachable.
pub struct NoneDriver;

impl AuthnDriver for NoneDriver {
    fn scheme_name(&self) -> &'static str {
        "None"
    }

    fn challenge(&self, _realm: &str) -> Challenge {
        Challenge::Unauthenticated {
            www_authenticate: String::new(),
        }
    }

    fn check(
        &self,
        _method: &str,
        _uri: &str,
        _payload: &str,
        _authz: &dyn AuthzBackend,
    ) -> Option<Verified> {
        None
    }
}
