use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::authz::{Account, AuthzBackend, StoredSecret};
use crate::error::Result;

/// JWT claims carried in a minted session token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    group: Option<String>,
    home: Option<String>,
    exp: usize,
}

/// A stateless authz backend: tokens are self-contained signed claims rather than rows in a
/// store, so `passwd`/`join` are no-ops and `check` is a signature+expiry verification instead
/// of a lookup. Paired naturally with the `Bearer`/`OAuth2` authn drivers, but can back any
/// scheme that only needs the token channel.
pub struct JwtBackend {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtBackend {
    pub fn new(hmac_secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(hmac_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(hmac_secret.as_bytes()),
        }
    }

    /// Mint a signed token for `user`, expiring in `expire_secs` seconds (0 = 10 years,
    /// there is no such thing as a non-expiring JWT in this implementation since `exp` is a
    /// mandatory claim under the default `Validation`).
    pub fn generate_token(
        &self,
        user: &str,
        group: Option<&str>,
        home: Option<&str>,
        expire_secs: u64,
    ) -> Result<String> {
        let ttl = if expire_secs == 0 {
            10 * 365 * 24 * 3600
        } else {
            expire_secs
        };
        let exp = (SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + ttl) as usize;
        let claims = Claims {
            sub: user.to_string(),
            group: group.map(str::to_string),
            home: home.map(str::to_string),
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    fn decode(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| log::debug!("jwt verification failed: {e}"))
            .ok()
    }
}

impl AuthzBackend for JwtBackend {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn passwd(&self, _user: &str) -> Option<StoredSecret> {
        // Stateless: there's no stored secret to hand back to a Basic/Digest-style matcher.
        // Verification for this backend happens entirely through `check`.
        None
    }

    fn account(&self, _user: &str) -> Account {
        Account::default()
    }

    fn check(&self, token: &str) -> Option<String> {
        self.decode(token).map(|c| c.sub)
    }

    fn supports_check(&self) -> bool {
        true
    }

    fn supports_join(&self) -> bool {
        // No-op but present - invariant I3 only clears TOKEN_E when *neither* join nor a JWT
        // path exists, and this backend *is* the JWT path.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips() {
        let backend = JwtBackend::new("test-secret");
        let token = backend
            .generate_token("alice", Some("staff"), Some("/home/alice"), 3600)
            .unwrap();
        assert_eq!(backend.check(&token), Some("alice".to_string()));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let backend = JwtBackend::new("test-secret");
        let mut token = backend.generate_token("alice", None, None, 3600).unwrap();
        token.push('x');
        assert_eq!(backend.check(&token), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let backend = JwtBackend::new("test-secret");
        // expire_secs = 1 second in the past would require sleeping; instead exercise via a
        // manually constructed claims set with exp already elapsed.
        let claims = Claims {
            sub: "alice".into(),
            group: None,
            home: None,
            exp: 1,
        };
        let token = encode(&Header::default(), &claims, &backend.encoding_key).unwrap();
        assert_eq!(backend.check(&token), None);
    }
}
