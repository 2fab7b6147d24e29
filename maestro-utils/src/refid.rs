//! Stable 8-hex `ref_id` derivation (spec §3, §4.8): document sources use the
//! first 8 hex characters of the doc id embedded in `source_id`; web sources
//! use the first 8 hex of `SHA1(url)`; internal sources use `source_id`
//! verbatim. Grounded on `report_generator.py::_map_note_id_to_doc_id`.

use sha1::{Digest, Sha1};

/// The three source kinds a `ref_id` can be derived from, mirroring
/// `maestro_core::model::SourceType` without taking a dependency on it (this
/// crate sits below `maestro-core` in the workspace graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Document,
    Web,
    Internal,
}

/// Derive the stable 8-hex ref id for a source, per spec §3's rule and the
/// original's `_map_note_id_to_doc_id`:
/// - document: first component of `source_id` split on `_` (the original's
///   `source_id_full.split('_')[0]`);
/// - web: first 8 hex chars of `SHA1(source_id)` where `source_id` is the URL;
/// - internal: `source_id` unchanged.
pub fn derive_ref_id(kind: SourceKind, source_id: &str) -> String {
    match kind {
        SourceKind::Document => source_id
            .split('_')
            .next()
            .unwrap_or(source_id)
            .to_string(),
        SourceKind::Web => sha1_hex8(source_id),
        SourceKind::Internal => source_id.to_string(),
    }
}

/// First 8 hex characters of `SHA1(input)`.
pub fn sha1_hex8(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ref_id_takes_first_underscore_component() {
        assert_eq!(
            derive_ref_id(SourceKind::Document, "a3b4c5d6_chunk_12"),
            "a3b4c5d6"
        );
    }

    #[test]
    fn document_ref_id_with_no_underscore_is_passthrough() {
        assert_eq!(derive_ref_id(SourceKind::Document, "a3b4c5d6"), "a3b4c5d6");
    }

    #[test]
    fn web_ref_id_is_sha1_prefix() {
        let id = derive_ref_id(SourceKind::Web, "https://example.com/article");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        // deterministic
        assert_eq!(
            id,
            derive_ref_id(SourceKind::Web, "https://example.com/article")
        );
    }

    #[test]
    fn internal_ref_id_is_passthrough() {
        assert_eq!(
            derive_ref_id(SourceKind::Internal, "synthesis-7"),
            "synthesis-7"
        );
    }

    #[test]
    fn different_urls_give_different_ref_ids() {
        let a = derive_ref_id(SourceKind::Web, "https://a.example.com");
        let b = derive_ref_id(SourceKind::Web, "https://b.example.com");
        assert_ne!(a, b);
    }
}
