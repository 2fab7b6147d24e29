//! Small, dependency-light helpers shared across Maestro crates: fuzzy title
//! similarity, stable ref-id derivation, bracket-scan JSON extraction from
//! untrusted LLM text, and greedy char-budget batching.

pub mod batch;
pub mod json_extract;
pub mod refid;
pub mod similarity;

pub use batch::{batch_by_char_budget, fits_in_single_call};
pub use json_extract::{extract_first_json, parse_first_json};
pub use refid::{derive_ref_id, sha1_hex8, SourceKind};
pub use similarity::{normalize_title, ratio, title_similarity};
