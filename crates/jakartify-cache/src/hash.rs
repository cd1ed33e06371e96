use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;

use crate::error::Result;

/// SHA-256 cache key stored as a lowercase hex string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash of `profile_identity` followed by `bytes`.
    pub fn compute(profile_identity: &str, bytes: &[u8]) -> Self {
        let mut hasher = keyed_hasher(profile_identity);
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Same as [`ContentHash::compute`], reading the content from `reader`.
    pub fn from_reader(profile_identity: &str, mut reader: impl Read) -> Result<Self> {
        let mut hasher = keyed_hasher(profile_identity);
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Accepts an existing 64 digit lowercase hex string.
    pub fn parse(hash: &str) -> Option<Self> {
        let valid = hash.len() == 64
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hash.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The shard directory name.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }
}

// A NUL separates the identity from the content so that no identity can be
// the prefix of another identity plus content.
fn keyed_hasher(profile_identity: &str) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(profile_identity.as_bytes());
    hasher.update([0_u8]);
    hasher
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_identity_is_part_of_the_key() {
        let a = ContentHash::compute("tomcat|javax|jakarta", b"PK");
        let b = ContentHash::compute("ee|javax|jakarta", b"PK");
        assert_ne!(a, b);
        assert_eq!(a, ContentHash::compute("tomcat|javax|jakarta", b"PK"));
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.shard(), &a.as_str()[..2]);
    }

    #[test]
    fn reader_and_slice_agree() {
        let data = vec![7_u8; 200_000];
        let from_slice = ContentHash::compute("p", &data);
        let from_reader = ContentHash::from_reader("p", data.as_slice()).unwrap();
        assert_eq!(from_slice, from_reader);
    }

    #[test]
    fn parse_rejects_non_hashes() {
        let hash = ContentHash::compute("p", b"x");
        assert_eq!(ContentHash::parse(hash.as_str()), Some(hash));
        assert_eq!(ContentHash::parse("cache-metadata"), None);
        assert_eq!(ContentHash::parse(&"A".repeat(64)), None);
    }
}
