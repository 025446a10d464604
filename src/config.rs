use std::str::FromStr;

/// The configuration parameters for the authentication middleware.
///
/// See `SPEC_FULL.md` in the repository for the full rationale behind each field; the short
/// version is that `authn_type`/`authz_type` pick the pluggable scheme/backend pair, the flags
/// turn on token issuance and identity propagation, and `protect`/`unprotect`/`redirect`
/// control which URLs require authentication and what happens when they don't have it.
#[derive(Debug, Clone, clap::Parser)]
pub struct Config {
    /// Authentication scheme: `none`, `basic`, `digest`, `bearer`, or `oauth2`.
    #[clap(long, env, value_enum, default_value = "basic")]
    pub authn_type: AuthnType,

    /// Authorization backend: `simple`, `file`, `unix`, `sqlite`, or `jwt`.
    #[clap(long, env, value_enum, default_value = "simple")]
    pub authz_type: AuthzType,

    /// Issue an opaque (or JWT) session token on successful verification.
    #[clap(long, env)]
    pub token: bool,

    /// Propagate identity (and the session token, if `token` is set) via response headers.
    #[clap(long, env, default_value = "true")]
    pub header: bool,

    /// Propagate identity (and the session token, if `token` is set) via cookies.
    #[clap(long, env)]
    pub cookie: bool,

    /// Redirect authenticated users to their home directory if the request path isn't
    /// already under it.
    #[clap(long, env)]
    pub home: bool,

    /// Impersonate the authenticated OS user (`seteuid`/`setegid`) for the duration of the
    /// request. Requires `exclusive_server`.
    #[clap(long, env)]
    pub unix: bool,

    /// Declares that this process serves exactly one client at a time, which is the only
    /// configuration under which `unix` impersonation is safe. See `SPEC_FULL.md` §9.
    #[clap(long, env)]
    pub exclusive_server: bool,

    /// Name of the hash function used to verify stored secrets (`md5`, `sha1`, `sha224`,
    /// `sha256`, `sha512`). Falls back to `md5` if unset or unknown; `None` if `md5` isn't
    /// available either (some schemes, e.g. Basic against a backend storing plaintext, don't
    /// need one).
    #[clap(long, env)]
    pub algo: Option<String>,

    /// URL glob that must be authenticated.
    #[clap(long, env, default_value = "*")]
    pub protect: String,

    /// URL glob that overrides `protect`; wins when both match.
    #[clap(long, env, default_value = "")]
    pub unprotect: String,

    /// Login page URL. When set, failed requests get a `302` redirect there instead of a
    /// `401`, and the login URL itself is always admitted.
    #[clap(long, env)]
    pub redirect: Option<String>,

    /// Token lifetime in seconds. `0` means no expiry.
    #[clap(long, env, default_value = "0")]
    pub expire: u64,

    /// Opt-in: under `redirect`, verify credentials as if the request method were `HEAD`
    /// rather than the real one. See SPEC_FULL.md §9 - weakens per-resource credential
    /// binding, preserved only for compatibility.
    #[clap(long, env)]
    pub verify_any_method_under_redirect: bool,

    /// Treat a bare `WWW-Authenticate` request header as a client self-logout request.
    #[clap(long, env, default_value = "true")]
    pub allow_header_logout: bool,

    /// Realm advertised in the `WWW-Authenticate` challenge (Basic/Digest).
    #[clap(long, env, default_value = "auth")]
    pub realm: String,

    /// Backend-specific connection string (SQLite file path, `File` backend credential file
    /// path, JWT HMAC/RSA key material, ...). Interpreted by the selected `authz_type`.
    #[clap(long, env)]
    pub authz_source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthnType {
    None,
    Basic,
    Digest,
    Bearer,
    Oauth2,
}

impl FromStr for AuthnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "digest" => Ok(Self::Digest),
            "bearer" => Ok(Self::Bearer),
            "oauth2" => Ok(Self::Oauth2),
            other => Err(format!("unknown authn type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthzType {
    Simple,
    File,
    Unix,
    Sqlite,
    Jwt,
}

impl FromStr for AuthzType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "file" => Ok(Self::File),
            "unix" => Ok(Self::Unix),
            "sqlite" => Ok(Self::Sqlite),
            "jwt" => Ok(Self::Jwt),
            other => Err(format!("unknown authz type: {other}")),
        }
    }
}

impl Config {
    /// Whether a URI path requires authentication: matches `protect` and doesn't match
    /// `unprotect` (invariant I2 - `unprotect` wins).
    pub fn is_protected(&self, decoded_path: &str) -> bool {
        let protect = glob::Pattern::new(&self.protect).unwrap_or(glob::Pattern::new("*").unwrap());
        if !protect.matches(decoded_path) {
            return false;
        }
        if self.unprotect.is_empty() {
            return true;
        }
        match glob::Pattern::new(&self.unprotect) {
            Ok(unprotect) => !unprotect.matches(decoded_path),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            authn_type: AuthnType::Basic,
            authz_type: AuthzType::Simple,
            token: false,
            header: true,
            cookie: false,
            home: false,
            unix: false,
            exclusive_server: false,
            algo: None,
            protect: "*".to_string(),
            unprotect: String::new(),
            redirect: None,
            expire: 0,
            verify_any_method_under_redirect: false,
            allow_header_logout: true,
            realm: "auth".to_string(),
            authz_source: None,
        }
    }

    #[test]
    fn protect_defaults_to_everything() {
        let cfg = base_config();
        assert!(cfg.is_protected("/anything"));
    }

    #[test]
    fn unprotect_wins_over_protect() {
        let mut cfg = base_config();
        cfg.unprotect = "/public/*".to_string();
        assert!(!cfg.is_protected("/public/index.html"));
        assert!(cfg.is_protected("/private/index.html"));
    }
}
