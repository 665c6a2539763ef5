//! Canonical identity for memory items.
//!
//! Two items a human would call "the same fact" collapse to one hash; any change to a
//! tracked field produces a different one. Fields are joined with a control-character
//! separator so `"a" + "b"` and `"ab" + ""` can never collide.

use crate::constants::{CANONICAL_SEPARATOR, HASH_BYTES, TAG_SEPARATOR};
use crate::types::{ImportItem, NewMemory};

/// Canonical identity string paired with its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub canonical: String,
    pub hash: String,
}

/// Lower-case, sort, and join tags for identity purposes.
#[must_use]
pub fn canonical_tags(tags: &[String]) -> String {
    let mut lowered: Vec<String> = tags.iter().map(|tag| tag.to_lowercase()).collect();
    lowered.sort();
    lowered.join(TAG_SEPARATOR)
}

fn join_parts(parts: &[&str]) -> String {
    let mut out = String::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            out.push(CANONICAL_SEPARATOR);
        }
        out.push_str(part);
    }
    out
}

/// Identity string for the interactive add path.
///
/// Order: content, kind, scope, project, repo, rel_path, tags (only when non-empty), pinned.
#[must_use]
pub fn canonical_string(item: &NewMemory) -> String {
    let tags = item
        .tags
        .as_deref()
        .filter(|tags| !tags.is_empty())
        .map(canonical_tags);
    let pinned = item.pinned.to_string();

    let mut parts: Vec<&str> = vec![
        item.content.as_str(),
        item.kind.as_deref().unwrap_or(""),
        item.scope.as_deref().unwrap_or(""),
        item.project.as_deref().unwrap_or(""),
        item.repo.as_deref().unwrap_or(""),
        item.rel_path.as_deref().unwrap_or(""),
    ];
    if let Some(tags) = tags.as_deref() {
        parts.push(tags);
    }
    parts.push(pinned.as_str());
    join_parts(&parts)
}

/// Identity string for imported items, keyed on provenance rather than taxonomy.
///
/// Order: trimmed content, external_source, external_id, project, tags.
#[must_use]
pub fn import_canonical_string(item: &ImportItem) -> String {
    let tags = item.tags.as_deref().map(canonical_tags).unwrap_or_default();
    join_parts(&[
        item.content.trim(),
        item.external_source.as_deref().unwrap_or(""),
        item.external_id.as_deref().unwrap_or(""),
        item.project.as_deref().unwrap_or(""),
        tags.as_str(),
    ])
}

/// Hex-encoded 128-bit BLAKE3 digest of the UTF-8 bytes of `canonical`.
#[must_use]
pub fn digest_hex(canonical: &str) -> String {
    let digest = blake3::hash(canonical.as_bytes());
    hex::encode(&digest.as_bytes()[..HASH_BYTES])
}

#[must_use]
pub fn canonicalize(item: &NewMemory) -> Canonical {
    let canonical = canonical_string(item);
    let hash = digest_hex(&canonical);
    Canonical { canonical, hash }
}

#[must_use]
pub fn canonicalize_import(item: &ImportItem) -> Canonical {
    let canonical = import_canonical_string(item);
    let hash = digest_hex(&canonical);
    Canonical { canonical, hash }
}

/// Resolve `(id, hash)` for an imported item, keeping whatever the adapter supplied.
#[must_use]
pub fn resolve_import_identity(item: &ImportItem) -> (String, String) {
    let hash = match item.hash.as_deref().filter(|hash| !hash.is_empty()) {
        Some(hash) => hash.to_string(),
        None => canonicalize_import(item).hash,
    };
    let id = item
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map_or_else(|| hash.clone(), str::to_string);
    (id, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_32_hex_chars() {
        let hash = canonicalize(&NewMemory::new("buy milk")).hash;
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tag_order_and_case_do_not_matter() {
        let a = canonicalize(&NewMemory::new("x").tags(["B", "a"]));
        let b = canonicalize(&NewMemory::new("x").tags(["a", "B"]));
        let c = canonicalize(&NewMemory::new("x").tags(["A", "b"]));
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash, c.hash);
    }

    #[test]
    fn different_tag_sets_differ() {
        let a = canonicalize(&NewMemory::new("x").tags(["a", "b"]));
        let b = canonicalize(&NewMemory::new("x").tags(["a", "c"]));
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn empty_tag_list_matches_absent_tags() {
        let empty = canonicalize(&NewMemory::new("x").tags(Vec::<String>::new()));
        let absent = canonicalize(&NewMemory::new("x"));
        assert_eq!(empty.hash, absent.hash);
    }

    #[test]
    fn field_boundaries_cannot_collide() {
        let a = canonicalize(&NewMemory::new("a").kind("b"));
        let b = canonicalize(&NewMemory::new("ab"));
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn every_tracked_field_changes_the_hash() {
        let base = canonicalize(&NewMemory::new("note")).hash;
        let variants = [
            NewMemory::new("note!"),
            NewMemory::new("note").kind("adr"),
            NewMemory::new("note").scope("repo"),
            NewMemory::new("note").project("p"),
            NewMemory::new("note").repo("r"),
            NewMemory::new("note").rel_path("src/lib.rs"),
            NewMemory::new("note").tags(["t"]),
            NewMemory::new("note").pinned(true),
        ];
        for variant in variants {
            assert_ne!(canonicalize(&variant).hash, base, "{variant:?}");
        }
    }

    #[test]
    fn ttl_is_not_part_of_identity() {
        let a = canonicalize(&NewMemory::new("note"));
        let b = canonicalize(&NewMemory::new("note").ttl_sec(60));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn empty_content_still_hashes() {
        let hash = canonicalize(&NewMemory::new("")).hash;
        assert_eq!(hash.len(), 32);
    }

    #[test]
    fn canonical_string_layout() {
        let item = NewMemory::new("c").kind("k").tags(["Z", "y"]).pinned(true);
        assert_eq!(
            canonical_string(&item),
            "c\u{1F}k\u{1F}\u{1F}\u{1F}\u{1F}\u{1F}y|z\u{1F}true"
        );
    }

    #[test]
    fn import_identity_is_keyed_on_provenance() {
        let mut a = ImportItem::new("  hello  ");
        a.external_source = Some("slack".into());
        a.external_id = Some("C1:1".into());
        a.kind = Some("message".into());

        let mut b = ImportItem::new("hello");
        b.external_source = Some("slack".into());
        b.external_id = Some("C1:1".into());
        b.kind = Some("note".into());

        assert_eq!(canonicalize_import(&a).hash, canonicalize_import(&b).hash);

        b.external_id = Some("C1:2".into());
        assert_ne!(canonicalize_import(&a).hash, canonicalize_import(&b).hash);
    }

    #[test]
    fn import_identity_keeps_supplied_id_and_hash() {
        let mut item = ImportItem::new("x");
        item.id = Some("custom".into());
        let (id, hash) = resolve_import_identity(&item);
        assert_eq!(id, "custom");
        assert_eq!(hash, canonicalize_import(&item).hash);

        item.hash = Some("feedface".into());
        item.id = None;
        assert_eq!(
            resolve_import_identity(&item),
            ("feedface".to_string(), "feedface".to_string())
        );
    }
}
