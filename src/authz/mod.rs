//! Authorization backends (C2): the store that maps user names to secrets, groups, home
//! directories, and optional session tokens.
//!
//! Capabilities are expressed as trait methods with default "unsupported" implementations
//! rather than nullable function pointers, with `supports_join`/`supports_check` probes doing
//! the job the reference implementation's null-vtable-entry check does for invariant I3.

mod file;
mod jwt;
mod simple;
mod sqlite;
mod unix;

pub use file::FileBackend;
pub use jwt::JwtBackend;
pub use simple::SimpleBackend;
pub use sqlite::SqliteBackend;
pub use unix::UnixBackend;

use crate::config::{AuthzType, Config};
use crate::error::{Result, ResultExt};

/// The secret stored against a user name: either a plaintext password (rare, `Simple`/`File`
/// testing backends) or a digest produced by one of the [`crate::hash`] functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSecret {
    Plain(String),
    Hashed {
        algo: crate::hash::HashFn,
        hex: String,
    },
    /// A `crypt(3)`-format hash as stored in `/etc/passwd`/`/etc/shadow` (`$1$`, `$5$`, `$6$`,
    /// bcrypt, traditional DES, ...), verified via `pwhash`'s format-sniffing `crypt(3)`
    /// work-alike.
    Crypt(String),
}

impl StoredSecret {
    /// Check a candidate password against this stored secret.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            StoredSecret::Plain(expected) => expected == candidate,
            StoredSecret::Hashed { algo, hex } => &algo.hex_digest(candidate.as_bytes()) == hex,
            StoredSecret::Crypt(hash) => pwhash::unix::verify(candidate, hash),
        }
    }
}

/// A backend account record, as much of it as the backend can supply.
#[derive(Debug, Clone, Default)]
pub struct Account {
    pub group: Option<String>,
    pub home: Option<String>,
}

/// The authorization backend contract (C2).
pub trait AuthzBackend: Send + Sync {
    /// Lets the connector special-case backends that need it (e.g. minting a JWT session token
    /// instead of an opaque one). Not part of the reference capability model; an adaptation to
    /// Rust's lack of nullable function pointers.
    fn as_any(&self) -> &dyn std::any::Any;

    /// The secret against which the authn driver matches submitted credentials.
    fn passwd(&self, user: &str) -> Option<StoredSecret>;

    /// Account metadata (group, home). Default: nothing known.
    fn account(&self, _user: &str) -> Account {
        Account::default()
    }

    /// Associate a token with a user for `expire_secs` seconds (`0` = no expiry).
    /// Backends that can't persist tokens return `Ok(())` is never called - checked via
    /// [`AuthzBackend::supports_join`] instead.
    fn join(&self, _user: &str, _token: &str, _expire_secs: u64) -> Result<()> {
        Ok(())
    }

    /// Token-channel lookup: given a token, return the user it belongs to.
    fn check(&self, _token: &str) -> Option<String> {
        None
    }

    fn supports_join(&self) -> bool {
        false
    }

    fn supports_check(&self) -> bool {
        false
    }
}

/// Build the configured authz backend, failing construction (invariant: `ConfigMissing`) if
/// its prerequisites aren't met.
pub fn build(config: &Config) -> Result<Box<dyn AuthzBackend>> {
    match config.authz_type {
        AuthzType::Simple => Ok(Box::new(SimpleBackend::new())),
        AuthzType::File => {
            let path = config.authz_source.as_deref().or_config_missing(
                "authz_source (credential file path) required for File backend",
            )?;
            Ok(Box::new(FileBackend::load(path)?))
        }
        AuthzType::Unix => Ok(Box::new(UnixBackend::new())),
        AuthzType::Sqlite => {
            let path = config
                .authz_source
                .as_deref()
                .or_config_missing("authz_source (sqlite path) required for Sqlite backend")?;
            Ok(Box::new(SqliteBackend::open(path)?))
        }
        AuthzType::Jwt => {
            let secret = config
                .authz_source
                .as_deref()
                .or_config_missing("authz_source (HMAC secret) required for Jwt backend")?;
            Ok(Box::new(JwtBackend::new(secret)))
        }
    }
}
