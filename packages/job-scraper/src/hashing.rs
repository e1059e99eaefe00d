//! Link identity.
//!
//! A job posting is identified by the SHA-256 of its resolved URL. The
//! digest is stable across runs, so it doubles as the dedup key.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use url::Url;

/// SHA-256 digest of a resolved link.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkHash([u8; 32]);

impl LinkHash {
    /// Hash a resolved URL string.
    pub fn of(url: &str) -> Self {
        Self(Sha256::digest(url.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Rebuild from stored bytes; `None` unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkHash({})", &self.to_hex()[..12])
    }
}

impl Serialize for LinkHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for LinkHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes)
            .ok_or_else(|| serde::de::Error::custom("link hash must be 32 bytes"))
    }
}

/// A link found on a listing page, resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// The `href` exactly as it appeared on the page
    pub raw_href: String,

    /// Absolute URL the href resolves to
    pub resolved_url: Url,

    /// Hash of `resolved_url`
    pub content_hash: LinkHash,
}

impl CandidateLink {
    pub fn new(raw_href: impl Into<String>, resolved_url: Url) -> Self {
        let content_hash = LinkHash::of(resolved_url.as_str());
        Self {
            raw_href: raw_href.into(),
            resolved_url,
            content_hash,
        }
    }

    pub fn url(&self) -> &str {
        self.resolved_url.as_str()
    }
}

/// Resolve `href` against `base` and keep it only if it is an http(s) URL.
///
/// The fragment is dropped: `/jobs/1#apply` is the same posting as `/jobs/1`.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let mut resolved = base.join(href.trim()).ok()?;
    resolved.set_fragment(None);
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}
