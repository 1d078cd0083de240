//! Typed archive objects, as produced by the [`typing`](crate::typing) engine.
//!
//! Every hash field is a [`Swhid`] and every date field an
//! [`ArchiveTimestamp`]. Fields the client does not interpret are kept in
//! `extra` so a typed object serializes back to everything the server sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use swh_core::{ArchiveTimestamp, ObjectKind, Swhid};

/// Untyped remainder of a JSON object.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// One typed object, whatever its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArchiveObject {
    Content(Content),
    Directory(Vec<DirectoryEntry>),
    Revision(Revision),
    Release(Release),
    Snapshot(SnapshotBranches),
}

impl ArchiveObject {
    /// The kind of object this value describes.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Content(_) => ObjectKind::Content,
            Self::Directory(_) => ObjectKind::Directory,
            Self::Revision(_) => ObjectKind::Revision,
            Self::Release(_) => ObjectKind::Release,
            Self::Snapshot(_) => ObjectKind::Snapshot,
        }
    }
}

/// Content metadata. No field of a content payload carries an identifier,
/// so it is decoded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Directory entry type code as sent by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    Rev,
}

impl EntryType {
    /// Resolve an entry type code (`file`, `dir`, `rev`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "file" => Some(Self::File),
            "dir" => Some(Self::Dir),
            "rev" => Some(Self::Rev),
            _ => None,
        }
    }

    /// Kind of the object an entry of this type points at. `rev` entries are
    /// submodules.
    pub fn target_kind(&self) -> ObjectKind {
        match self {
            Self::File => ObjectKind::Content,
            Self::Dir => ObjectKind::Directory,
            Self::Rev => ObjectKind::Revision,
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    /// The listed directory; identical across all entries of one listing.
    pub dir_id: Swhid,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub target: Swhid,
    pub name: String,
    pub length: Option<u64>,
    pub perms: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A person as rendered by the API in author/committer fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub fullname: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Parent reference of a revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionParent {
    pub id: Swhid,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A revision (commit).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    pub id: Swhid,
    pub directory: Swhid,
    pub date: Option<ArchiveTimestamp>,
    pub committer_date: Option<ArchiveTimestamp>,
    pub parents: Vec<RevisionParent>,
    pub author: Option<Person>,
    pub committer: Option<Person>,
    pub message: Option<String>,
    pub merge: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A release (tag).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Release {
    pub id: Swhid,
    pub name: String,
    pub date: Option<ArchiveTimestamp>,
    pub author: Option<Person>,
    pub message: Option<String>,
    pub target_type: ObjectKind,
    pub target: Swhid,
    pub synthetic: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Where a snapshot branch points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BranchTarget {
    /// Name of another branch in the same snapshot.
    Alias(String),
    /// An archived object.
    Object(Swhid),
}

impl BranchTarget {
    /// The target identifier, unless this is an alias.
    pub fn swhid(&self) -> Option<Swhid> {
        match self {
            Self::Object(swhid) => Some(*swhid),
            Self::Alias(_) => None,
        }
    }
}

/// One branch of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotBranch {
    pub target_type: String,
    pub target: BranchTarget,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SnapshotBranch {
    /// `true` if the branch points at another branch rather than an object.
    pub fn is_alias(&self) -> bool {
        matches!(self.target, BranchTarget::Alias(_))
    }
}

/// Branch name to branch, for one page or for a whole snapshot.
pub type SnapshotBranches = BTreeMap<String, SnapshotBranch>;

/// One visit of a software origin by the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginVisit {
    pub origin: String,
    pub visit: u64,
    pub date: ArchiveTimestamp,
    pub status: String,
    /// Snapshot taken during the visit, absent for failed or partial visits.
    pub snapshot: Option<Swhid>,
    #[serde(rename = "type")]
    pub visit_type: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}
