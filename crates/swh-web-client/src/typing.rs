//! # Typing Engine
//!
//! Converts raw JSON payloads into [`objects`](crate::objects) values:
//!
//! - hash strings become [`Swhid`]s, with the kind taken from the payload
//!   itself (`target_type`, directory entry `type`) or implied by the field;
//! - date strings become [`ArchiveTimestamp`]s with their offset kept;
//! - directory entry codes `file`/`dir`/`rev` resolve to object kinds.
//!
//! Every function here is pure: the same raw input always yields the same
//! typed output or the same error. Fields that are not interpreted are
//! moved untouched into the `extra` map of the typed value.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use swh_core::{parse_timestamp, ArchiveTimestamp, ObjectKind, Swhid};

use crate::error::TypingError;
use crate::objects::{
    ArchiveObject, BranchTarget, Content, DirectoryEntry, EntryType, Extra, OriginVisit, Person,
    Release, Revision, RevisionParent, SnapshotBranch, SnapshotBranches,
};

/// `target_type` of snapshot branches that point at other branches.
pub const ALIAS_TARGET_TYPE: &str = "alias";

/// Type a raw payload for the given object kind.
///
/// For [`ObjectKind::Snapshot`], `raw` is the `branches` mapping of one
/// snapshot page, not the whole response body.
pub fn retype(raw: Value, kind: ObjectKind) -> Result<ArchiveObject, TypingError> {
    Ok(match kind {
        ObjectKind::Content => ArchiveObject::Content(retype_content(raw)?),
        ObjectKind::Directory => ArchiveObject::Directory(retype_directory(raw)?),
        ObjectKind::Revision => ArchiveObject::Revision(retype_revision(raw)?),
        ObjectKind::Release => ArchiveObject::Release(retype_release(raw)?),
        ObjectKind::Snapshot => ArchiveObject::Snapshot(retype_snapshot_branches(raw)?),
    })
}

/// Content metadata carries no identifiers; it is only decoded.
pub fn retype_content(raw: Value) -> Result<Content, TypingError> {
    serde_json::from_value(raw)
        .map_err(|e| TypingError::malformed("content", e))
}

/// Type a directory listing.
///
/// The directory's own identifier is resolved once, from the first entry,
/// and shared by every entry.
pub fn retype_directory(raw: Value) -> Result<Vec<DirectoryEntry>, TypingError> {
    let Value::Array(raw_entries) = raw else {
        return Err(TypingError::malformed("directory", "expected an array of entries"));
    };

    let mut dir_id: Option<Swhid> = None;
    let mut entries = Vec::with_capacity(raw_entries.len());
    for (i, raw_entry) in raw_entries.into_iter().enumerate() {
        let field = format!("directory[{i}]");
        let mut map = into_object(raw_entry, &field)?;

        let shared_dir_id = match dir_id {
            Some(id) => {
                map.remove("dir_id");
                id
            }
            None => {
                let id = take_swhid(&mut map, &field, "dir_id", ObjectKind::Directory)?;
                dir_id = Some(id);
                id
            }
        };

        let code = take_string(&mut map, &field, "type")?;
        let entry_type = EntryType::from_code(&code)
            .ok_or(TypingError::InvalidDirectoryEntryType(code))?;
        let target = take_swhid(&mut map, &field, "target", entry_type.target_kind())?;

        entries.push(DirectoryEntry {
            dir_id: shared_dir_id,
            entry_type,
            target,
            name: take_string(&mut map, &field, "name")?,
            length: take_optional(&mut map, &field, "length")?,
            perms: take_optional(&mut map, &field, "perms")?,
            extra: map,
        });
    }
    Ok(entries)
}

/// Type a revision.
pub fn retype_revision(raw: Value) -> Result<Revision, TypingError> {
    let field = "revision";
    let mut map = into_object(raw, field)?;

    let parents = match map.remove("parents") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(raw_parents)) => raw_parents
            .into_iter()
            .enumerate()
            .map(|(i, raw_parent)| {
                let parent_field = format!("{field}.parents[{i}]");
                let mut parent = into_object(raw_parent, &parent_field)?;
                Ok(RevisionParent {
                    id: take_swhid(&mut parent, &parent_field, "id", ObjectKind::Revision)?,
                    extra: parent,
                })
            })
            .collect::<Result<_, TypingError>>()?,
        Some(_) => {
            return Err(TypingError::malformed(
                "revision.parents",
                "expected an array",
            ))
        }
    };

    Ok(Revision {
        id: take_swhid(&mut map, field, "id", ObjectKind::Revision)?,
        directory: take_swhid(&mut map, field, "directory", ObjectKind::Directory)?,
        date: take_date(&mut map, field, "date")?,
        committer_date: take_date(&mut map, field, "committer_date")?,
        parents,
        author: take_optional::<Person>(&mut map, field, "author")?,
        committer: take_optional::<Person>(&mut map, field, "committer")?,
        message: take_optional(&mut map, field, "message")?,
        merge: take_optional(&mut map, field, "merge")?.unwrap_or(false),
        extra: map,
    })
}

/// Type a release. The target's kind is given by its `target_type`.
pub fn retype_release(raw: Value) -> Result<Release, TypingError> {
    let field = "release";
    let mut map = into_object(raw, field)?;

    let target_type_name = take_string(&mut map, field, "target_type")?;
    let target_type = object_kind_named(&target_type_name)?;

    Ok(Release {
        id: take_swhid(&mut map, field, "id", ObjectKind::Release)?,
        name: take_string(&mut map, field, "name")?,
        date: take_date(&mut map, field, "date")?,
        author: take_optional::<Person>(&mut map, field, "author")?,
        message: take_optional(&mut map, field, "message")?,
        target_type,
        target: take_swhid(&mut map, field, "target", target_type)?,
        synthetic: take_optional(&mut map, field, "synthetic")?.unwrap_or(false),
        extra: map,
    })
}

/// Type the `branches` mapping of one snapshot page.
///
/// Alias branches keep their target as a branch name; every other branch
/// target becomes a [`Swhid`] of the kind named by its `target_type`.
pub fn retype_snapshot_branches(raw: Value) -> Result<SnapshotBranches, TypingError> {
    let raw_branches = into_object(raw, "snapshot.branches")?;

    let mut branches = BTreeMap::new();
    for (name, raw_branch) in raw_branches {
        let field = format!("snapshot.branches[{name:?}]");
        let mut map = into_object(raw_branch, &field)?;
        let target_type = take_string(&mut map, &field, "target_type")?;
        let target = if target_type == ALIAS_TARGET_TYPE {
            BranchTarget::Alias(take_string(&mut map, &field, "target")?)
        } else {
            let kind = object_kind_named(&target_type)?;
            BranchTarget::Object(take_swhid(&mut map, &field, "target", kind)?)
        };
        branches.insert(
            name,
            SnapshotBranch {
                target_type,
                target,
                extra: map,
            },
        );
    }
    Ok(branches)
}

/// Type one page of an origin visit listing.
pub fn retype_visits(raw: Value) -> Result<Vec<OriginVisit>, TypingError> {
    let Value::Array(raw_visits) = raw else {
        return Err(TypingError::malformed("visits", "expected an array of visits"));
    };

    raw_visits
        .into_iter()
        .enumerate()
        .map(|(i, raw_visit)| {
            let field = format!("visits[{i}]");
            let mut map = into_object(raw_visit, &field)?;
            let snapshot = match map.remove("snapshot") {
                None | Some(Value::Null) => None,
                Some(Value::String(hex_id)) => Some(
                    Swhid::from_hex(ObjectKind::Snapshot, &hex_id)
                        .map_err(|e| TypingError::malformed(format!("{field}.snapshot"), e))?,
                ),
                Some(_) => {
                    return Err(TypingError::malformed(
                        format!("{field}.snapshot"),
                        "expected a hex string or null",
                    ))
                }
            };
            let date = take_date(&mut map, &field, "date")?
                .ok_or_else(|| TypingError::malformed(format!("{field}.date"), "missing"))?;
            Ok(OriginVisit {
                origin: take_string(&mut map, &field, "origin")?,
                visit: take_required(&mut map, &field, "visit")?,
                date,
                status: take_string(&mut map, &field, "status")?,
                snapshot,
                visit_type: take_optional(&mut map, &field, "type")?,
                extra: map,
            })
        })
        .collect()
}

fn object_kind_named(name: &str) -> Result<ObjectKind, TypingError> {
    ObjectKind::from_name(name)
        .ok_or_else(|| TypingError::UnsupportedObjectKind(name.to_string()))
}

fn into_object(raw: Value, field: &str) -> Result<Extra, TypingError> {
    match raw {
        Value::Object(map) => Ok(map),
        other => Err(TypingError::malformed(
            field,
            format!("expected an object, got {}", json_type_name(&other)),
        )),
    }
}

fn take_required<T: DeserializeOwned>(
    map: &mut Extra,
    field: &str,
    key: &str,
) -> Result<T, TypingError> {
    let value = map
        .remove(key)
        .ok_or_else(|| TypingError::malformed(format!("{field}.{key}"), "missing"))?;
    serde_json::from_value(value)
        .map_err(|e| TypingError::malformed(format!("{field}.{key}"), e))
}

/// Missing and `null` both decode to `None`.
fn take_optional<T: DeserializeOwned>(
    map: &mut Extra,
    field: &str,
    key: &str,
) -> Result<Option<T>, TypingError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| TypingError::malformed(format!("{field}.{key}"), e)),
    }
}

fn take_string(map: &mut Extra, field: &str, key: &str) -> Result<String, TypingError> {
    take_required(map, field, key)
}

fn take_swhid(
    map: &mut Extra,
    field: &str,
    key: &str,
    kind: ObjectKind,
) -> Result<Swhid, TypingError> {
    let hex_id = take_string(map, field, key)?;
    Swhid::from_hex(kind, &hex_id)
        .map_err(|e| TypingError::malformed(format!("{field}.{key}"), e))
}

fn take_date(
    map: &mut Extra,
    field: &str,
    key: &str,
) -> Result<Option<ArchiveTimestamp>, TypingError> {
    take_optional::<String>(map, field, key)?
        .map(|raw| {
            parse_timestamp(&raw)
                .map_err(|e| TypingError::malformed(format!("{field}.{key}"), e))
        })
        .transpose()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DIR: &str = "977fc4b98c0e85816348cebd3b12026407c368b6";

    fn swhid(text: &str) -> Swhid {
        text.parse().unwrap()
    }

    fn release_payload() -> Value {
        json!({
            "id": "b9db10d00835e9a43e2eebef2db1d04d4ae82342",
            "name": "0.9.9",
            "author": {
                "fullname": "Paul Tagliamonte <tag@pault.ag>",
                "name": "Paul Tagliamonte",
                "email": "tag@pault.ag"
            },
            "date": "2013-07-06T19:34:11-04:00",
            "message": "0.9.9 release\n",
            "synthetic": false,
            "target_type": "revision",
            "target": "e005cb773c769436709ca6a1d625dc784dbc1636",
            "target_url": "/api/1/revision/e005cb773c769436709ca6a1d625dc784dbc1636/"
        })
    }

    fn revision_payload() -> Value {
        json!({
            "id": "aafb16d69fd30ff58afdd69036a26047f3aebdc6",
            "directory": "977fc4b98c0e85816348cebd3b12026407c368b6",
            "author": {"fullname": "Nicolas Dandrimont <nicolas.dandrimont@crans.org>", "name": "Nicolas Dandrimont", "email": "nicolas.dandrimont@crans.org"},
            "committer": {"fullname": "Nicolas Dandrimont <nicolas.dandrimont@crans.org>", "name": "Nicolas Dandrimont", "email": "nicolas.dandrimont@crans.org"},
            "date": "2014-08-18T18:18:25+02:00",
            "committer_date": "2014-08-18T18:18:25+02:00",
            "message": "Merge branch 'master' into pr/584\n",
            "merge": true,
            "parents": [
                {"id": "26307d261279861c2d9c9eca3bb38519f951bea4", "url": "/api/1/revision/26307d261279861c2d9c9eca3bb38519f951bea4/"},
                {"id": "37fc9e08d0c4b71807a4f1ecb06112e78d91c283", "url": "/api/1/revision/37fc9e08d0c4b71807a4f1ecb06112e78d91c283/"}
            ],
            "type": "git",
            "synthetic": false
        })
    }

    fn directory_entry(entry_type: &str, target: &str, name: &str) -> Value {
        json!({
            "dir_id": DIR,
            "type": entry_type,
            "target": target,
            "name": name,
            "perms": 33188,
            "length": 582,
            "checksums": {}
        })
    }

    #[test]
    fn content_is_passed_through() {
        let raw = json!({
            "length": 151810,
            "status": "visible",
            "checksums": {"sha1": "dc2830a9e72f23c1dfebef4413003221baa5fb62", "sha1_git": "fe95a46679d128ff167b7c55df5d02356c5a1ae1"},
            "data_url": "/api/1/content/sha1_git:fe95a46679d128ff167b7c55df5d02356c5a1ae1/raw/",
            "filetype_url": "/api/1/content/sha1_git:fe95a46679d128ff167b7c55df5d02356c5a1ae1/filetype/"
        });
        let content = retype_content(raw).unwrap();
        assert_eq!(content.length, Some(151810));
        assert_eq!(content.checksums["sha1"], "dc2830a9e72f23c1dfebef4413003221baa5fb62");
        assert!(content.extra.contains_key("filetype_url"));
    }

    #[test]
    fn release_target_kind_follows_target_type() {
        let release = retype_release(release_payload()).unwrap();
        assert_eq!(release.id, swhid("swh:1:rel:b9db10d00835e9a43e2eebef2db1d04d4ae82342"));
        assert_eq!(release.target_type, ObjectKind::Revision);
        assert_eq!(release.target, swhid("swh:1:rev:e005cb773c769436709ca6a1d625dc784dbc1636"));
        assert_eq!(
            release.date,
            Some(parse_timestamp("2013-07-06T19:34:11-04:00").unwrap())
        );
        assert_eq!(release.author.unwrap().name.as_deref(), Some("Paul Tagliamonte"));
        assert!(!release.synthetic);
        assert!(release.extra.contains_key("target_url"));
    }

    #[test]
    fn release_with_unknown_target_type_is_rejected() {
        let mut raw = release_payload();
        raw["target_type"] = json!("origin");
        assert_eq!(
            retype_release(raw).unwrap_err(),
            TypingError::UnsupportedObjectKind("origin".into())
        );
    }

    #[test]
    fn release_with_null_date_types_to_none() {
        let mut raw = release_payload();
        raw["date"] = Value::Null;
        assert_eq!(retype_release(raw).unwrap().date, None);
    }

    #[test]
    fn revision_identifiers_and_dates_are_typed() {
        let rev = retype_revision(revision_payload()).unwrap();
        assert_eq!(rev.id, swhid("swh:1:rev:aafb16d69fd30ff58afdd69036a26047f3aebdc6"));
        assert_eq!(rev.directory, swhid(&format!("swh:1:dir:{DIR}")));
        let ts = parse_timestamp("2014-08-18T18:18:25+02:00").unwrap();
        assert_eq!(rev.date, Some(ts));
        assert_eq!(rev.committer_date, Some(ts));
        assert!(rev.merge);
        assert_eq!(rev.parents.len(), 2);
        assert_eq!(
            rev.parents[1].id,
            swhid("swh:1:rev:37fc9e08d0c4b71807a4f1ecb06112e78d91c283")
        );
        assert!(rev.parents[0].extra.contains_key("url"));
        assert_eq!(rev.extra["type"], json!("git"));
    }

    #[test]
    fn revision_with_bad_date_is_malformed() {
        let mut raw = revision_payload();
        raw["date"] = json!("last tuesday");
        let err = retype_revision(raw).unwrap_err();
        assert!(
            matches!(&err, TypingError::MalformedPayload { field, .. } if field == "revision.date"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn revision_missing_directory_is_malformed() {
        let mut raw = revision_payload();
        raw.as_object_mut().unwrap().remove("directory");
        assert!(matches!(
            retype_revision(raw),
            Err(TypingError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn directory_entries_share_one_dir_id() {
        let raw = json!([
            directory_entry("file", "58471109208922c9ee8c4b06135725f03ed16814", ".bzrignore"),
            directory_entry("dir", "4b825dc642cb6eb9a060e54bf8d69288fbee4904", "docs"),
            directory_entry("rev", "aafb16d69fd30ff58afdd69036a26047f3aebdc6", "vendored"),
        ]);
        let entries = retype_directory(raw).unwrap();
        let expected = swhid(&format!("swh:1:dir:{DIR}"));
        assert!(entries.iter().all(|e| e.dir_id == expected));
        assert_eq!(entries[0].target.kind(), ObjectKind::Content);
        assert_eq!(entries[1].target.kind(), ObjectKind::Directory);
        assert_eq!(entries[2].target.kind(), ObjectKind::Revision);
        assert_eq!(entries[0].name, ".bzrignore");
        assert_eq!(entries[0].length, Some(582));
        assert_eq!(entries[0].perms, Some(33188));
    }

    #[test]
    fn directory_with_unknown_entry_type_is_rejected() {
        let raw = json!([directory_entry("symlink", DIR, "link")]);
        assert_eq!(
            retype_directory(raw).unwrap_err(),
            TypingError::InvalidDirectoryEntryType("symlink".into())
        );
    }

    #[test]
    fn empty_directory_types_to_empty_listing() {
        assert!(retype_directory(json!([])).unwrap().is_empty());
    }

    #[test]
    fn snapshot_alias_keeps_string_target() {
        let raw = json!({
            "HEAD": {"target": "refs/heads/master", "target_type": "alias", "target_url": "/api/1/revision/83c20a6a63a7ebc1a549d367bc07a61b926cecf3/"},
            "refs/heads/master": {"target": "83c20a6a63a7ebc1a549d367bc07a61b926cecf3", "target_type": "revision"},
            "refs/tags/v1": {"target": "b9db10d00835e9a43e2eebef2db1d04d4ae82342", "target_type": "release"}
        });
        let branches = retype_snapshot_branches(raw).unwrap();
        assert_eq!(
            branches["HEAD"].target,
            BranchTarget::Alias("refs/heads/master".into())
        );
        assert!(branches["HEAD"].is_alias());
        for name in ["refs/heads/master", "refs/tags/v1"] {
            let branch = &branches[name];
            let target = branch.target.swhid().unwrap();
            assert_eq!(target.kind().name(), branch.target_type);
        }
    }

    #[test]
    fn snapshot_branch_with_unknown_target_type_is_rejected() {
        let raw = json!({"refs/x": {"target": DIR, "target_type": "origin"}});
        assert_eq!(
            retype_snapshot_branches(raw).unwrap_err(),
            TypingError::UnsupportedObjectKind("origin".into())
        );
    }

    #[test]
    fn visits_snapshot_may_be_null() {
        let raw = json!([
            {"origin": "https://github.com/python/cpython", "visit": 2, "date": "2020-01-02T10:00:00+00:00", "status": "full", "snapshot": "6a3a2cf0b2b90ce7ae1cf0a221ed68035b686f5a", "type": "git"},
            {"origin": "https://github.com/python/cpython", "visit": 1, "date": "2020-01-01T10:00:00+00:00", "status": "failed", "snapshot": null, "type": "git"}
        ]);
        let visits = retype_visits(raw).unwrap();
        assert_eq!(
            visits[0].snapshot,
            Some(swhid("swh:1:snp:6a3a2cf0b2b90ce7ae1cf0a221ed68035b686f5a"))
        );
        assert_eq!(visits[1].snapshot, None);
        assert_eq!(visits[1].visit, 1);
        assert_eq!(visits[0].visit_type.as_deref(), Some("git"));
    }

    #[test]
    fn retype_dispatches_on_kind() {
        let obj = retype(release_payload(), ObjectKind::Release).unwrap();
        assert_eq!(obj.kind(), ObjectKind::Release);
        assert!(matches!(
            retype(release_payload(), ObjectKind::Directory),
            Err(TypingError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn retype_is_deterministic() {
        let a = retype(revision_payload(), ObjectKind::Revision).unwrap();
        let b = retype(revision_payload(), ObjectKind::Revision).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn typed_revision_serializes_identifiers_as_swhids() {
        let rev = retype_revision(revision_payload()).unwrap();
        let json = serde_json::to_value(&rev).unwrap();
        assert_eq!(
            json["id"],
            json!("swh:1:rev:aafb16d69fd30ff58afdd69036a26047f3aebdc6")
        );
        assert_eq!(json["type"], json!("git"));
    }
}
