use std::fs;
use std::path::PathBuf;

use crate::authz::{Account, AuthzBackend, StoredSecret};
use crate::error::Result;
use crate::hash::HashFn;

/// A flat-file authz backend, `user:home:group:algo:secret` per line (`algo` is one of
/// [`crate::hash::HashFn`]'s names, or `plain` for an unhashed secret - handy for local
/// testing, never for production). Reread on every lookup rather than cached, so editing the
/// file takes effect without restarting the server; the file is expected to be small (this
/// mirrors the reference implementation's plain re-`fopen` per check).
pub struct FileBackend {
    path: PathBuf,
}

struct Line {
    user: String,
    home: Option<String>,
    group: Option<String>,
    secret: StoredSecret,
}

impl FileBackend {
    pub fn load(path: &str) -> Result<Self> {
        let backend = FileBackend {
            path: PathBuf::from(path),
        };
        // Fail fast if the file isn't readable at construction time.
        backend.read_lines()?;
        Ok(backend)
    }

    fn read_lines(&self) -> Result<Vec<Line>> {
        let contents = fs::read_to_string(&self.path)?;
        let mut lines = Vec::new();
        for raw in contents.lines() {
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            let mut parts = raw.splitn(5, ':');
            let (Some(user), Some(home), Some(group), Some(algo), Some(secret)) = (
                parts.next(),
                parts.next(),
                parts.next(),
                parts.next(),
                parts.next(),
            ) else {
                log::warn!("ignoring malformed authz file line: {raw:?}");
                continue;
            };
            let secret = if algo.eq_ignore_ascii_case("plain") {
                StoredSecret::Plain(secret.to_string())
            } else {
                match HashFn::by_name(algo) {
                    Some(algo) => StoredSecret::Hashed {
                        algo,
                        hex: secret.to_string(),
                    },
                    None => {
                        log::warn!(
                            "unknown hash algorithm {algo:?} in authz file, skipping user {user:?}"
                        );
                        continue;
                    }
                }
            };
            lines.push(Line {
                user: user.to_string(),
                home: (!home.is_empty()).then(|| home.to_string()),
                group: (!group.is_empty()).then(|| group.to_string()),
                secret,
            });
        }
        Ok(lines)
    }
}

impl AuthzBackend for FileBackend {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn passwd(&self, user: &str) -> Option<StoredSecret> {
        self.read_lines()
            .ok()?
            .into_iter()
            .find(|l| l.user == user)
            .map(|l| l.secret)
    }

    fn account(&self, user: &str) -> Account {
        match self
            .read_lines()
            .ok()
            .and_then(|lines| lines.into_iter().find(|l| l.user == user))
        {
            Some(l) => Account {
                group: l.group,
                home: l.home,
            },
            None => Account::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_plain_and_hashed_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:/home/alice:staff:plain:secret").unwrap();
        writeln!(
            file,
            "bob:/home/bob:staff:md5:{}",
            HashFn::Md5.hex_digest(b"hunter2")
        )
        .unwrap();
        let backend = FileBackend::load(file.path().to_str().unwrap()).unwrap();

        assert!(backend.passwd("alice").unwrap().matches("secret"));
        assert!(backend.passwd("bob").unwrap().matches("hunter2"));
        assert_eq!(
            backend.account("alice").home.as_deref(),
            Some("/home/alice")
        );
        assert!(backend.passwd("nobody").is_none());
    }
}
