use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::authn::{AuthnDriver, Challenge, Verified};
use crate::authz::AuthzBackend;
use crate::hash::HashFn;
use crate::token::generate as generate_nonce_material;

const NONCE_TTL: Duration = Duration::from_secs(300);

/// RFC 7616 Digest access authentication. Nonces are minted on [`DigestDriver::challenge`] and
/// tracked in a shared table so [`DigestDriver::check`] can reject stale or unknown ones; this
/// plays the role the reference implementation's per-client nonce state plays, but since nonces
/// here aren't tied to a single connection they work across the keep-alive reuse an async
/// server does more aggressively than the one-thread-per-client model the spec was written
/// against.
pub struct DigestDriver {
    realm: String,
    hash: HashFn,
    nonces: Mutex<HashMap<String, Instant>>,
}

impl DigestDriver {
    pub fn new(realm: String, hash: HashFn) -> Self {
        Self {
            realm,
            hash,
            nonces: Mutex::new(HashMap::new()),
        }
    }

    fn mint_nonce(&self) -> String {
        let nonce = generate_nonce_material();
        let mut nonces = self.nonces.lock().unwrap();
        // Prune here too, not just in `nonce_is_fresh` - a client that only ever requests a
        // challenge and never sends credentials (e.g. a scanner) would otherwise grow this
        // table without bound.
        nonces.retain(|_, issued| issued.elapsed() < NONCE_TTL);
        nonces.insert(nonce.clone(), Instant::now());
        nonce
    }

    fn nonce_is_fresh(&self, nonce: &str) -> bool {
        let mut nonces = self.nonces.lock().unwrap();
        nonces.retain(|_, issued| issued.elapsed() < NONCE_TTL);
        nonces.contains_key(nonce)
    }
}

/// Parse a `key=value` Digest field list, tolerating quoted and unquoted values.
fn parse_fields(payload: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for part in payload.split(',') {
        let part = part.trim();
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        fields.insert(key.trim().to_string(), value.to_string());
    }
    fields
}

impl AuthnDriver for DigestDriver {
    fn scheme_name(&self) -> &'static str {
        "Digest"
    }

    fn challenge(&self, realm: &str) -> Challenge {
        let nonce = self.mint_nonce();
        Challenge::Unauthenticated {
            www_authenticate: format!(
                "Digest realm=\"{realm}\", qop=\"auth\", nonce=\"{nonce}\", algorithm={}",
                self.hash.name().to_uppercase()
            ),
        }
    }

    fn check(
        &self,
        method: &str,
        uri: &str,
        payload: &str,
        authz: &dyn AuthzBackend,
    ) -> Option<Verified> {
        let fields = parse_fields(payload);
        let user = fields.get("username")?;
        let nonce = fields.get("nonce")?;
        let client_response = fields.get("response")?;
        let qop = fields.get("qop").map(String::as_str).unwrap_or("");
        let nc = fields.get("nc").map(String::as_str).unwrap_or("");
        let cnonce = fields.get("cnonce").map(String::as_str).unwrap_or("");
        let req_uri = fields.get("uri").map(String::as_str).unwrap_or(uri);

        if !self.nonce_is_fresh(nonce) {
            log::debug!("digest auth: stale or unknown nonce for user {user:?}");
            return None;
        }

        let secret = authz.passwd(user)?;
        let crate::authz::StoredSecret::Plain(password) = secret else {
            log::warn!("digest auth requires a plaintext-comparable secret; backend returned a pre-hashed one");
            return None;
        };

        let ha1 = self
            .hash
            .hex_digest(format!("{user}:{}:{password}", self.realm).as_bytes());
        let ha2 = self
            .hash
            .hex_digest(format!("{method}:{req_uri}").as_bytes());
        let expected = if qop.is_empty() {
            self.hash
                .hex_digest(format!("{ha1}:{nonce}:{ha2}").as_bytes())
        } else {
            self.hash
                .hex_digest(format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}").as_bytes())
        };

        if &expected == client_response {
            Some(Verified { user: user.clone() })
        } else {
            log::debug!("digest auth: response mismatch for user {user:?}");
            None
        }
    }
}
