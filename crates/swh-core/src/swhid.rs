//! # Persistent Identifiers (SWHIDs)
//!
//! A SWHID names exactly one immutable object in the archive:
//!
//! ```text
//! swh:1:rev:aafb16d69fd30ff58afdd69036a26047f3aebdc6
//! ^^^ ^ ^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//!  |  |  |   object id: 20-byte sha1_git digest, lowercase hex
//!  |  |  object kind code
//!  |  scheme version
//!  scheme
//! ```
//!
//! Only core identifiers are modelled. Qualified identifiers
//! (`;origin=…`, `;lines=…`) are rejected at parse time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SwhidError;

/// The only scheme version this client speaks.
pub const SWHID_SCHEME_VERSION: u8 = 1;

/// Length in bytes of the `sha1_git` digest carried by every SWHID.
pub const SWHID_DIGEST_LEN: usize = 20;

const SCHEME: &str = "swh";

/// The kind of archived object a SWHID points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A file's bytes.
    Content,
    /// A directory listing.
    Directory,
    /// A commit.
    Revision,
    /// A tag.
    Release,
    /// The full set of branches of an origin at visit time.
    Snapshot,
}

impl ObjectKind {
    /// Every kind, in declaration order.
    pub const ALL: [ObjectKind; 5] = [
        Self::Content,
        Self::Directory,
        Self::Revision,
        Self::Release,
        Self::Snapshot,
    ];

    /// Three-letter code used inside a SWHID (`cnt`, `dir`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Content => "cnt",
            Self::Directory => "dir",
            Self::Revision => "rev",
            Self::Release => "rel",
            Self::Snapshot => "snp",
        }
    }

    /// Long name used by the web API in `target_type` fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Directory => "directory",
            Self::Revision => "revision",
            Self::Release => "release",
            Self::Snapshot => "snapshot",
        }
    }

    /// Resolve a SWHID kind code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Resolve a web API `target_type` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A core persistent identifier: object kind plus `sha1_git` digest.
///
/// Equality, ordering, hashing and the canonical string form are derived
/// from the kind and digest alone. The type is `Copy`; pass it by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Swhid {
    kind: ObjectKind,
    id: [u8; SWHID_DIGEST_LEN],
}

impl Swhid {
    /// Build an identifier from a kind and raw digest bytes.
    pub fn new(kind: ObjectKind, id: [u8; SWHID_DIGEST_LEN]) -> Self {
        Self { kind, id }
    }

    /// Build an identifier from a kind and a hex digest, as found in the
    /// `id`/`target` fields of API payloads.
    ///
    /// # Errors
    ///
    /// Returns [`SwhidError::InvalidObjectId`] if `hex_id` is not exactly
    /// 40 hex digits.
    pub fn from_hex(kind: ObjectKind, hex_id: &str) -> Result<Self, SwhidError> {
        if hex_id.len() != SWHID_DIGEST_LEN * 2 {
            return Err(SwhidError::InvalidObjectId {
                id: hex_id.to_string(),
                reason: format!(
                    "expected {} hex digits, got {}",
                    SWHID_DIGEST_LEN * 2,
                    hex_id.len()
                ),
            });
        }
        let mut id = [0u8; SWHID_DIGEST_LEN];
        hex::decode_to_slice(hex_id, &mut id).map_err(|e| SwhidError::InvalidObjectId {
            id: hex_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { kind, id })
    }

    /// The object kind.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The raw digest bytes.
    pub fn object_id(&self) -> &[u8; SWHID_DIGEST_LEN] {
        &self.id
    }

    /// The digest as lowercase hex, the form used in API paths.
    pub fn object_id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// The scheme version; always [`SWHID_SCHEME_VERSION`].
    pub fn scheme_version(&self) -> u8 {
        SWHID_SCHEME_VERSION
    }
}

impl FromStr for Swhid {
    type Err = SwhidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SwhidError::Malformed {
            input: s.to_string(),
        };

        if s.contains(';') {
            return Err(malformed());
        }

        let mut parts = s.split(':');
        let (Some(scheme), Some(version), Some(code), Some(hex_id), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(malformed());
        };

        if scheme != SCHEME {
            return Err(malformed());
        }
        if version != SWHID_SCHEME_VERSION.to_string() {
            return Err(SwhidError::UnsupportedVersion(version.to_string()));
        }
        let kind = ObjectKind::from_code(code)
            .ok_or_else(|| SwhidError::UnknownKind(code.to_string()))?;

        Self::from_hex(kind, hex_id)
    }
}

impl fmt::Display for Swhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SCHEME}:{SWHID_SCHEME_VERSION}:{}:{}",
            self.kind.code(),
            self.object_id_hex()
        )
    }
}

impl fmt::Debug for Swhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Swhid").field(&self.to_string()).finish()
    }
}

impl Serialize for Swhid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Swhid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
