//! Named one-way hash lookup.
//!
//! The core only ever needs to go from a configured algorithm *name* (`"md5"`, `"sha256"`, ...)
//! to something that can digest bytes; it never needs to enumerate or introspect the hash
//! beyond that. `Digest` objects differ in output size, so [`HashFn::digest`] returns an owned
//! `Vec<u8>` rather than a fixed-size array.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest as _, Sha224, Sha256, Sha512};

/// A named hash function the core can look up by string and invoke without knowing its
/// concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFn {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha512,
}

const ALL: &[HashFn] = &[
    HashFn::Md5,
    HashFn::Sha1,
    HashFn::Sha224,
    HashFn::Sha256,
    HashFn::Sha512,
];

impl HashFn {
    pub fn name(self) -> &'static str {
        match self {
            HashFn::Md5 => "md5",
            HashFn::Sha1 => "sha1",
            HashFn::Sha224 => "sha224",
            HashFn::Sha256 => "sha256",
            HashFn::Sha512 => "sha512",
        }
    }

    /// Look up a hash function by name. Case-insensitive.
    pub fn by_name(name: &str) -> Option<Self> {
        ALL.iter()
            .copied()
            .find(|h| h.name().eq_ignore_ascii_case(name))
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashFn::Md5 => Md5::digest(data).to_vec(),
            HashFn::Sha1 => Sha1::digest(data).to_vec(),
            HashFn::Sha224 => Sha224::digest(data).to_vec(),
            HashFn::Sha256 => Sha256::digest(data).to_vec(),
            HashFn::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn hex_digest(self, data: &[u8]) -> String {
        self.digest(data)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// Resolve the configured `algo` name to a [`HashFn`], applying the fallback chain described
/// in `SPEC_FULL.md` §4.1: unknown name warns and falls back to md5; `None` configured falls
/// back to md5 too; if md5 itself isn't wanted the caller can request `None` explicitly via
/// an empty string, which yields `None` and is not an error (Basic against a plaintext-secret
/// backend doesn't need a hash at all).
pub fn resolve(algo: Option<&str>) -> Option<HashFn> {
    match algo {
        None => Some(HashFn::Md5),
        Some("") => None,
        Some(name) => match HashFn::by_name(name) {
            Some(h) => Some(h),
            None => {
                log::warn!(
                    "unknown hash algorithm {:?}, available: {:?}, falling back to md5",
                    name,
                    ALL.iter().map(|h| h.name()).collect::<Vec<_>>()
                );
                Some(HashFn::Md5)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(HashFn::by_name("SHA256"), Some(HashFn::Sha256));
        assert_eq!(HashFn::by_name("sha256"), Some(HashFn::Sha256));
    }

    #[test]
    fn unknown_name_falls_back_to_md5() {
        assert_eq!(resolve(Some("bogus")), Some(HashFn::Md5));
    }

    #[test]
    fn absent_algo_defaults_to_md5() {
        assert_eq!(resolve(None), Some(HashFn::Md5));
    }

    #[test]
    fn empty_string_means_no_hash() {
        assert_eq!(resolve(Some("")), None);
    }

    #[test]
    fn md5_digest_matches_known_vector() {
        assert_eq!(
            HashFn::Md5.hex_digest(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }
}
