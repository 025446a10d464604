use std::collections::HashMap;
use std::sync::RwLock;

use crate::authz::{Account, AuthzBackend, StoredSecret};
use crate::error::Result;

/// An in-memory authz backend: a fixed table of users plus a mutable token table, the way a
/// test double or a tiny embedded deployment would configure it. Supports token `join`/`check`
/// so `TOKEN_E` works without a database.
#[derive(Default)]
pub struct SimpleBackend {
    users: RwLock<HashMap<String, UserRecord>>,
    tokens: RwLock<HashMap<String, String>>,
}

struct UserRecord {
    secret: StoredSecret,
    group: Option<String>,
    home: Option<String>,
}

impl SimpleBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: impl Into<String>, secret: StoredSecret) {
        self.users.write().unwrap().insert(
            user.into(),
            UserRecord {
                secret,
                group: None,
                home: None,
            },
        );
    }

    pub fn add_user_full(
        &self,
        user: impl Into<String>,
        secret: StoredSecret,
        group: Option<String>,
        home: Option<String>,
    ) {
        self.users.write().unwrap().insert(
            user.into(),
            UserRecord {
                secret,
                group,
                home,
            },
        );
    }
}

impl AuthzBackend for SimpleBackend {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn passwd(&self, user: &str) -> Option<StoredSecret> {
        self.users
            .read()
            .unwrap()
            .get(user)
            .map(|r| r.secret.clone())
    }

    fn account(&self, user: &str) -> Account {
        let users = self.users.read().unwrap();
        match users.get(user) {
            Some(r) => Account {
                group: r.group.clone(),
                home: r.home.clone(),
            },
            None => Account::default(),
        }
    }

    fn join(&self, user: &str, token: &str, _expire_secs: u64) -> Result<()> {
        self.tokens
            .write()
            .unwrap()
            .insert(token.to_string(), user.to_string());
        Ok(())
    }

    fn check(&self, token: &str) -> Option<String> {
        self.tokens.read().unwrap().get(token).cloned()
    }

    fn supports_join(&self) -> bool {
        true
    }

    fn supports_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_look_up_user() {
        let backend = SimpleBackend::new();
        backend.add_user("alice", StoredSecret::Plain("secret".into()));
        let secret = backend.passwd("alice").unwrap();
        assert!(secret.matches("secret"));
        assert!(!secret.matches("wrong"));
    }

    #[test]
    fn token_round_trips() {
        let backend = SimpleBackend::new();
        backend.join("alice", "T", 0).unwrap();
        assert_eq!(backend.check("T"), Some("alice".to_string()));
        assert_eq!(backend.check("nope"), None);
    }
}
