use crate::authz::{Account, AuthzBackend, StoredSecret};
use pwd::Passwd;

/// Looks accounts up in `/etc/passwd` (and, transparently, `/etc/shadow` where libc's
/// `getpwnam` is configured to fall through to it) via the `pwd` crate's safe wrapper around
/// `getpwnam(3)`.
///
/// Stateless: every call re-queries NSS, so changes to the system account database are picked
/// up immediately. Has no `join`/`check` support - `TOKEN_E` against this backend requires a
/// JWT authn driver instead (invariant I3).
pub struct UnixBackend;

impl UnixBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnixBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthzBackend for UnixBackend {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn passwd(&self, user: &str) -> Option<StoredSecret> {
        let entry = Passwd::from_name(user).ok()??;
        let crypt = entry.passwd?;
        if crypt.is_empty() || crypt == "x" || crypt == "*" || crypt == "!" {
            // No usable hash in `/etc/passwd` itself (shadowed, locked, or disabled account).
            log::warn!("unix backend: user {user:?} has no verifiable password hash");
            return None;
        }
        Some(StoredSecret::Crypt(crypt))
    }

    fn account(&self, user: &str) -> Account {
        match Passwd::from_name(user).ok().flatten() {
            Some(entry) => Account {
                group: gid_to_name(entry.gid),
                home: Some(entry.dir),
            },
            None => Account::default(),
        }
    }
}

fn gid_to_name(gid: u32) -> Option<String> {
    uzers::get_group_by_gid(gid).map(|g| g.name().to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_yields_none() {
        let backend = UnixBackend::new();
        assert!(backend.passwd("definitely-not-a-real-user-xyz").is_none());
    }
}
