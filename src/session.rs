//! The per-client identity record ([`AuthSession`]) and the per-connection state
//! ([`ClientCtx`]) that remembers a client has already authenticated (invariant I1).

use std::sync::{Arc, Mutex};

/// Maximum length the core will accept for a user name; mirrors the reference
/// implementation's typical 32-byte cap. Not enforced on backend-supplied data beyond a
/// truncation, since rejecting a valid but long account name outright would be a backend
/// policy decision, not a core one.
pub const USER_CAP: usize = 32;

/// Per-authenticated-client record, built lazily on first successful verification and carried
/// for the lifetime of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: String,
    pub group: Option<String>,
    pub home: Option<String>,
    /// The authn scheme name (`"Basic"`, `"Digest"`, ...) that produced this session.
    pub scheme: String,
    pub token: Option<String>,
}

impl AuthSession {
    pub fn new(user: impl Into<String>, scheme: impl Into<String>) -> Self {
        let mut user = user.into();
        if user.len() > USER_CAP {
            user.truncate(USER_CAP);
        }
        Self {
            user,
            group: None,
            home: None,
            scheme: scheme.into(),
            token: None,
        }
    }
}

/// Per-connection connector state. Held behind an `Arc<Mutex<_>>` and attached to the
/// connection via an axum extension so every request on the same keep-alive connection shares
/// it - the async analogue of the reference implementation's one-`ClientCtx`-per-client-handle
/// design, since a Tokio server has no per-thread affinity to piggyback on.
#[derive(Debug, Clone, Default)]
pub struct ClientCtx(Arc<Mutex<ClientState>>);

#[derive(Debug, Default)]
struct ClientState {
    info: Option<AuthSession>,
    challenge: Option<String>,
}

impl ClientCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invariant I1: once this returns `Some`, subsequent requests on the connection skip
    /// reverification.
    pub fn info(&self) -> Option<AuthSession> {
        self.0.lock().unwrap().info.clone()
    }

    pub fn set_info(&self, info: AuthSession) {
        self.0.lock().unwrap().info = Some(info);
    }

    pub fn clear_info(&self) {
        self.0.lock().unwrap().info = None;
    }

    pub fn cached_challenge(&self) -> Option<String> {
        self.0.lock().unwrap().challenge.clone()
    }

    pub fn set_cached_challenge(&self, challenge: String) {
        self.0.lock().unwrap().challenge = Some(challenge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_user_names_are_truncated_to_cap() {
        let long = "a".repeat(100);
        let session = AuthSession::new(long, "Basic");
        assert_eq!(session.user.len(), USER_CAP);
    }

    #[test]
    fn client_ctx_remembers_info_across_calls() {
        let ctx = ClientCtx::new();
        assert!(ctx.info().is_none());
        ctx.set_info(AuthSession::new("alice", "Basic"));
        assert_eq!(ctx.info().unwrap().user, "alice");
    }
}
