//! # SWHID Grammar Properties
//!
//! Property tests over the `swh:1:<kind>:<hash>` grammar: every well-formed
//! identifier parses and renders back to itself, and inputs that break one
//! component of the grammar are rejected with the matching error variant.

use proptest::prelude::*;
use swh_core::{ObjectKind, Swhid, SwhidError, SWHID_DIGEST_LEN};

fn object_kind() -> impl Strategy<Value = ObjectKind> {
    prop::sample::select(ObjectKind::ALL.to_vec())
}

fn digest() -> impl Strategy<Value = [u8; SWHID_DIGEST_LEN]> {
    prop::array::uniform20(any::<u8>())
}

proptest! {
    /// Rendering then parsing yields the same handle.
    #[test]
    fn display_parse_identity(kind in object_kind(), id in digest()) {
        let swhid = Swhid::new(kind, id);
        let parsed: Swhid = swhid.to_string().parse().unwrap();
        prop_assert_eq!(parsed, swhid);
    }

    /// Canonical text is exactly 50 characters: `swh:1:` + code + `:` + 40 hex.
    #[test]
    fn canonical_form_has_fixed_length(kind in object_kind(), id in digest()) {
        let text = Swhid::new(kind, id).to_string();
        prop_assert_eq!(text.len(), 50);
        prop_assert!(text.starts_with("swh:1:"));
    }

    /// Any hex id of the wrong length is rejected as an invalid object id.
    #[test]
    fn wrong_length_digest_rejected(kind in object_kind(), len in 0usize..80) {
        prop_assume!(len != 40);
        let text = format!("swh:1:{}:{}", kind.code(), "a".repeat(len));
        let err = text.parse::<Swhid>().unwrap_err();
        let is_invalid_id = matches!(err, SwhidError::InvalidObjectId { .. });
        prop_assert!(is_invalid_id);
    }

    /// Three-letter codes outside the five known kinds are rejected.
    #[test]
    fn unknown_kind_code_rejected(code in "[a-z]{3}") {
        prop_assume!(ObjectKind::from_code(&code).is_none());
        let text = format!("swh:1:{code}:{}", "0".repeat(40));
        prop_assert_eq!(text.parse::<Swhid>().unwrap_err(), SwhidError::UnknownKind(code));
    }

    /// Parsing arbitrary text never panics.
    #[test]
    fn parse_never_panics(text in ".*") {
        let _ = text.parse::<Swhid>();
    }
}

#[test]
fn known_content_identifier_parses() {
    let swhid: Swhid = "swh:1:cnt:fe95a46679d128ff167b7c55df5d02356c5a1ae1"
        .parse()
        .unwrap();
    assert_eq!(swhid.kind(), ObjectKind::Content);
    assert_eq!(
        swhid.object_id_hex(),
        "fe95a46679d128ff167b7c55df5d02356c5a1ae1"
    );
}
