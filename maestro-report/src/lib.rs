//! Report Generator (H1, spec §4.8): generates the report title, then
//! assembles the final draft by walking the outline depth-first, numbering
//! sections hierarchically, and resolving citation placeholders into
//! numbered references with an appended `## References` section.
//!
//! Ported from `report_generator.py`'s `generate_report_title` and
//! `process_citations` / `_map_note_id_to_doc_id`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use maestro_core::error::Result;
use maestro_core::model::{Mission, Note, ReportSection, SourceType};
use maestro_core::traits::AgentInput;
use maestro_providers::{AgentRole, ModelDispatcher};
use maestro_utils::refid::{derive_ref_id, SourceKind};
use regex::Regex;

const MAX_CONTENT_SNIPPET: usize = 1500;

/// The final artifact: full markdown text plus bookkeeping a caller can
/// surface to the user (which placeholders didn't resolve).
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub text: String,
    pub reference_count: usize,
    pub unresolved_placeholders: Vec<String>,
}

pub struct ReportGenerator {
    dispatcher: Arc<ModelDispatcher>,
}

impl ReportGenerator {
    pub fn new(dispatcher: Arc<ModelDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Generates a 5-15 word title from the original request, active goals,
    /// recent thoughts, and the first/last section content snippets, then
    /// strips common "**Title:**"/"Title:"/"**Label:**" prefix artifacts a
    /// thinking model tends to leave in.
    pub async fn generate_title(&self, mission: &Mission) -> Result<String> {
        let Some(plan) = &mission.plan else {
            return Ok(String::new());
        };
        if plan.report_outline.is_empty() {
            return Ok(String::new());
        }

        let first_section = &plan.report_outline[0];
        let first_snippet = snippet(mission.report_content.get(&first_section.section_id));

        let last_top_level = &plan.report_outline[plan.report_outline.len() - 1];
        let last_leaf = last_leaf_in_dfs_order(last_top_level);
        let last_snippet = snippet(mission.report_content.get(&last_leaf.section_id));

        let goals_context = if mission.goals.is_empty() {
            "No active goals.\n".to_string()
        } else {
            mission.goals.iter().map(|g| format!("- {}\n", g.text)).collect()
        };
        let thoughts_context = if mission.thoughts.is_empty() {
            "No recent thoughts.\n".to_string()
        } else {
            mission
                .thoughts
                .recent()
                .map(|t| format!("- [{}] ({}): {}\n", t.timestamp.format("%Y-%m-%d %H:%M:%S"), t.agent_name, t.text))
                .collect()
        };

        let prompt = format!(
            "Generate a concise and compelling title for a research report based on the original \
             user query, active goals, recent thoughts, and the content of the first and last \
             sections.\n\nOriginal User Query:\n---\n{}\n---\n\nActive Goals:\n---\n{goals_context}---\n\n\
             Recent Thoughts:\n---\n{thoughts_context}---\n\nFirst Section Content (Snippet):\n---\n\
             {first_snippet}\n---\n\nLast Section Content (Snippet):\n---\n{last_snippet}\n---\n\n\
             Instructions:\n1. Infer the report's tone and scope from the query, goals, and thoughts.\n\
             2. Generate a title of 5-15 words that reflects the report's topic and findings.\n\
             3. Output ONLY the plain title text — no quotes, no markdown, no \"Title:\" prefix.",
            mission.user_request,
        );

        let input = AgentInput::from_prompt(prompt);
        let output = self.dispatcher.dispatch(AgentRole::Writing, input).await?;
        Ok(clean_title(&output.content))
    }

    /// Builds the numbered draft, resolves citation placeholders against the
    /// mission's notes, appends a references section, and prepends the
    /// title stashed in `mission.metadata["report_title"]` (if any).
    pub fn render(&self, mission: &Mission, title: Option<&str>) -> RenderedReport {
        let Some(plan) = &mission.plan else {
            return RenderedReport { text: String::new(), reference_count: 0, unresolved_placeholders: Vec::new() };
        };

        let mut draft = String::new();
        build_draft_recursive(&plan.report_outline, &mission.report_content, 1, "", &mut draft);

        let lookup = SourceLookup::build(&mission.notes);
        let used_ref_ids = collect_used_ref_ids(&draft, &lookup);

        if used_ref_ids.is_empty() {
            let mut text = String::new();
            if let Some(title) = title.filter(|t| !t.is_empty()) {
                text.push_str(&format!("# {title}\n\n"));
            }
            text.push_str(draft.trim());
            return RenderedReport { text, reference_count: 0, unresolved_placeholders: Vec::new() };
        }

        let mut ref_id_to_number: HashMap<String, usize> = HashMap::new();
        let mut references: Vec<String> = Vec::new();
        let mut sorted_ids: Vec<&String> = used_ref_ids.iter().collect();
        sorted_ids.sort();
        for ref_id in sorted_ids {
            let number = references.len() + 1;
            ref_id_to_number.insert(ref_id.clone(), number);
            let note = lookup.note_for_ref_id(ref_id);
            references.push(format_reference(number, ref_id, note));
        }

        let (body, unresolved) = replace_placeholders(&draft, &lookup, &ref_id_to_number);

        let mut text = String::new();
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            text.push_str(&format!("# {title}\n\n"));
        }
        text.push_str(body.trim());
        text.push_str("\n\n## References\n\n");
        text.push_str(&references.join("\n"));

        RenderedReport { text, reference_count: references.len(), unresolved_placeholders: unresolved }
    }
}

fn snippet(content: Option<&String>) -> String {
    let content = content.map(String::as_str).unwrap_or("[Content missing for section]");
    content.chars().take(MAX_CONTENT_SNIPPET).collect()
}

fn last_leaf_in_dfs_order(section: &ReportSection) -> &ReportSection {
    match section.subsections.last() {
        Some(child) => last_leaf_in_dfs_order(child),
        None => section,
    }
}

fn clean_title(raw: &str) -> String {
    static BOLD_TITLE: OnceLock<Regex> = OnceLock::new();
    static PLAIN_TITLE: OnceLock<Regex> = OnceLock::new();
    static BOLD_LABEL: OnceLock<Regex> = OnceLock::new();

    let bold_title = BOLD_TITLE.get_or_init(|| Regex::new(r"(?i)^\*\*Title:\*\*\s*").unwrap());
    let plain_title = PLAIN_TITLE.get_or_init(|| Regex::new(r"(?i)^Title:\s*").unwrap());
    let bold_label = BOLD_LABEL.get_or_init(|| Regex::new(r"^\*\*.*?\*\*:\s*").unwrap());

    let cleaned = raw.trim().trim_matches('"');
    let cleaned = bold_title.replace(cleaned, "");
    let cleaned = plain_title.replace(&cleaned, "");
    let cleaned = bold_label.replace(&cleaned, "");
    cleaned.trim().to_string()
}

fn build_draft_recursive(
    sections: &[ReportSection],
    content: &HashMap<String, String>,
    level: usize,
    prefix: &str,
    out: &mut String,
) {
    for (i, section) in sections.iter().enumerate() {
        let number = format!("{prefix}{}", i + 1);
        let heading_marker = "#".repeat(level);
        out.push_str(&format!("{heading_marker} {number}. {}\n\n", section.title));
        let body = content
            .get(&section.section_id)
            .cloned()
            .unwrap_or_else(|| format!("[Content missing for section {}]", section.section_id));
        out.push_str(&body);
        out.push_str("\n\n");
        if !section.subsections.is_empty() {
            build_draft_recursive(&section.subsections, content, level + 1, &format!("{number}."), out);
        }
    }
}

/// Maps every known ref id to the note that introduced it (first note wins,
/// matching the original's `if lookup_key not in doc_metadata_source`), and
/// every `note_<id>` to its ref id for the placeholder-replacement pass.
struct SourceLookup<'a> {
    notes_by_ref_id: HashMap<String, &'a Note>,
    ref_id_by_note_id: HashMap<&'a str, String>,
}

impl<'a> SourceLookup<'a> {
    fn build(notes: &'a [Note]) -> Self {
        let mut notes_by_ref_id = HashMap::new();
        let mut ref_id_by_note_id = HashMap::new();
        for note in notes {
            let ref_id = ref_id_for_note(note);
            notes_by_ref_id.entry(ref_id.clone()).or_insert(note);
            ref_id_by_note_id.insert(note.note_id.as_str(), ref_id);
        }
        Self { notes_by_ref_id, ref_id_by_note_id }
    }

    fn note_for_ref_id(&self, ref_id: &str) -> Option<&'a Note> {
        self.notes_by_ref_id.get(ref_id).copied()
    }

    /// Resolves a placeholder id (either a bare ref id or `note_<id>`) to
    /// its canonical ref id, returning `None` if unresolvable.
    fn resolve(&self, placeholder_id: &str) -> Option<String> {
        if placeholder_id.starts_with("note_") {
            self.ref_id_by_note_id.get(placeholder_id).cloned()
        } else if self.notes_by_ref_id.contains_key(placeholder_id) {
            Some(placeholder_id.to_string())
        } else {
            None
        }
    }
}

fn ref_id_for_note(note: &Note) -> String {
    let kind = match note.source_type {
        SourceType::Document => SourceKind::Document,
        SourceType::Web => SourceKind::Web,
        SourceType::Internal => SourceKind::Internal,
    };
    derive_ref_id(kind, &note.source_id)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[((?:[a-f0-9]{8}|note_[a-f0-9]{8})(?:\s*,\s*(?:[a-f0-9]{8}|note_[a-f0-9]{8}))*)\]").unwrap()
    })
}

fn id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-f0-9]{8}|note_[a-f0-9]{8}").unwrap())
}

fn collect_used_ref_ids(draft: &str, lookup: &SourceLookup<'_>) -> HashSet<String> {
    let mut used = HashSet::new();
    for capture in placeholder_regex().captures_iter(draft) {
        let inside = &capture[1];
        for id_match in id_regex().find_iter(inside) {
            if let Some(ref_id) = lookup.resolve(id_match.as_str()) {
                used.insert(ref_id);
            } else {
                tracing::warn!(placeholder = id_match.as_str(), "citation id did not resolve to a known source");
            }
        }
    }
    used
}

fn replace_placeholders(draft: &str, lookup: &SourceLookup<'_>, ref_id_to_number: &HashMap<String, usize>) -> (String, Vec<String>) {
    let mut unresolved = Vec::new();
    let replaced = placeholder_regex().replace_all(draft, |caps: &regex::Captures| {
        let inside = &caps[1];
        let mut numbers: Vec<usize> = Vec::new();
        for id_match in id_regex().find_iter(inside) {
            if let Some(ref_id) = lookup.resolve(id_match.as_str()) {
                if let Some(number) = ref_id_to_number.get(&ref_id) {
                    numbers.push(*number);
                }
            }
        }
        if numbers.is_empty() {
            unresolved.push(caps[0].to_string());
            caps[0].to_string()
        } else {
            numbers.sort_unstable();
            format!("[{}]", numbers.iter().map(usize::to_string).collect::<Vec<_>>().join(", "))
        }
    });
    (replaced.into_owned(), unresolved)
}

fn metadata_str<'a>(meta: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    meta.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty() && *s != "Unknown Title" && *s != "Unknown Authors" && *s != "Unknown Journal/Source" && *s != "N/A")
}

fn metadata_authors(meta: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    match meta.get(key) {
        Some(serde_json::Value::Array(items)) if !items.is_empty() => {
            let joined = items.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", ");
            if joined.is_empty() { None } else { Some(joined) }
        }
        Some(serde_json::Value::String(s)) if !s.is_empty() && s != "Unknown Authors" => Some(s.clone()),
        _ => None,
    }
}

/// APA-like reference line for one resolved citation, per spec §4.8: a
/// document source reads its metadata from the first entry of
/// `overlapping_chunks`; a web source reads top-level metadata plus an
/// access date; anything else falls back to a generic label.
fn format_reference(number: usize, ref_id: &str, note: Option<&Note>) -> String {
    let Some(note) = note else {
        return format!("{number}. Unknown Source ({ref_id})");
    };

    match note.source_type {
        SourceType::Document => {
            let chunk_meta = note
                .source_metadata
                .get("overlapping_chunks")
                .and_then(|v| v.as_array())
                .and_then(|arr| arr.first())
                .and_then(|v| v.as_object())
                .cloned();

            let Some(chunk_meta) = chunk_meta else {
                return format!("{number}. Unknown Document ({ref_id})");
            };
            let chunk_meta: HashMap<String, serde_json::Value> = chunk_meta.into_iter().collect();
            let title = metadata_str(&chunk_meta, "title");
            let year = chunk_meta.get("publication_year").and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string())));
            let authors = metadata_authors(&chunk_meta, "authors");
            let journal = metadata_str(&chunk_meta, "journal_or_source");

            let mut parts = vec![format!("{number}.")];
            if let Some(a) = &authors {
                parts.push(format!("{a}."));
            }
            if let Some(y) = &year {
                if y != "N/A" {
                    parts.push(format!("({y})."));
                }
            }
            if let Some(t) = title {
                parts.push(format!("{t}."));
            }
            if let Some(j) = journal {
                parts.push(format!("*{j}*."));
            }
            if parts.len() > 1 {
                parts.join(" ")
            } else {
                format!("{number}. Unknown Document ({ref_id})")
            }
        }
        SourceType::Web => {
            let meta = &note.source_metadata;
            let title = metadata_str(meta, "title");
            let url = meta.get("url").and_then(|v| v.as_str()).unwrap_or(ref_id);
            let year = meta.get("publication_year").and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string())));
            let authors = metadata_authors(meta, "authors");
            let source_name = metadata_str(meta, "journal_or_source");
            let access_date = meta
                .get("accessed_at")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.format("%B %d, %Y").to_string())
                .unwrap_or_else(|| "Unknown Date".to_string());

            let mut parts = vec![format!("{number}.")];
            if let Some(a) = &authors {
                parts.push(format!("{a}."));
            }
            if let Some(y) = &year {
                parts.push(format!("({y})."));
            }
            if let Some(t) = title {
                parts.push(format!("{t}."));
            }
            if let Some(s) = source_name {
                parts.push(format!("Retrieved from {s}."));
            }
            parts.push(format!("Available at: {url}"));
            parts.push(format!("(Accessed: {access_date})"));

            if parts.len() > 3 {
                parts.join(" ")
            } else {
                let title = title.unwrap_or("Web Page");
                format!("{number}. {title}. Available at: {url} (Accessed: {access_date})")
            }
        }
        SourceType::Internal => {
            let synthesized_from = note
                .source_metadata
                .get("synthesized_from_notes")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "[]".to_string());
            format!("{number}. Internal Synthesis ({ref_id}). Based on notes: {synthesized_from}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::model::{Plan, ReportSection, ResearchStrategy};
    use serde_json::json;

    fn mission_with_notes_and_outline() -> Mission {
        let mut mission = Mission::new("m1", "How does photosynthesis work?");
        let mut section = ReportSection::new("s1", "Overview");
        section.research_strategy = ResearchStrategy::ResearchBased;
        let mut sub = ReportSection::new("s1.1", "Details");
        sub.research_strategy = ResearchStrategy::ResearchBased;
        section.subsections = vec![sub];
        mission.plan = Some(Plan { mission_goal: "goal".into(), report_outline: vec![section] });
        mission.report_content.insert("s1".into(), "Intro text [a1b2c3d4].".into());
        mission
            .report_content
            .insert("s1.1".into(), "Detail text [note_1a2b3c4d, a1b2c3d4].".into());

        let mut doc_meta = HashMap::new();
        doc_meta.insert(
            "overlapping_chunks".to_string(),
            json!([{"title": "Photosynthesis Basics", "publication_year": "2020", "authors": ["A. Researcher"], "journal_or_source": "Plant Science"}]),
        );
        mission.notes.push(Note {
            note_id: "note_1a2b3c4d".into(),
            content: "...".into(),
            source_type: SourceType::Document,
            source_id: "a1b2c3d4_chunk_2".into(),
            source_metadata: doc_meta,
        });
        mission
    }

    #[test]
    fn note_id_and_doc_id_forms_resolve_to_the_same_reference() {
        let mission = mission_with_notes_and_outline();
        let gen = ReportGenerator { dispatcher: unreachable_dispatcher() };
        let rendered = gen.render(&mission, None);
        assert_eq!(rendered.reference_count, 1);
        assert!(rendered.text.contains("Intro text [1]."));
        assert!(rendered.text.contains("Detail text [1, 1]."));
        assert!(rendered.unresolved_placeholders.is_empty());
    }

    #[test]
    fn unknown_ids_are_left_intact_and_reported() {
        let mut mission = mission_with_notes_and_outline();
        mission.report_content.insert("s1".into(), "See [deadbeef].".into());
        let gen = ReportGenerator { dispatcher: unreachable_dispatcher() };
        let rendered = gen.render(&mission, None);
        assert!(rendered.text.contains("[deadbeef]"));
        assert_eq!(rendered.unresolved_placeholders, vec!["[deadbeef]".to_string()]);
    }

    #[test]
    fn numbering_follows_sorted_ref_id_order_not_first_appearance() {
        let mission = mission_with_notes_and_outline();
        let lookup = SourceLookup::build(&mission.notes);
        let used = collect_used_ref_ids(
            &"Intro text [a1b2c3d4]. Detail text [note_1a2b3c4d, a1b2c3d4].".to_string(),
            &lookup,
        );
        assert_eq!(used.len(), 1);
        assert!(used.contains("a1b2c3d4"));
    }

    #[test]
    fn clean_title_strips_bold_and_plain_prefixes() {
        assert_eq!(clean_title("**Title:** The Real Title"), "The Real Title");
        assert_eq!(clean_title("Title: Another One"), "Another One");
        assert_eq!(clean_title("\"Quoted Title\""), "Quoted Title");
        assert_eq!(clean_title("Plain Title With No Prefix"), "Plain Title With No Prefix");
    }

    #[test]
    fn no_citations_skips_references_section() {
        let mut mission = mission_with_notes_and_outline();
        mission.report_content.insert("s1".into(), "No citations here.".into());
        mission.report_content.insert("s1.1".into(), "Nor here.".into());
        let gen = ReportGenerator { dispatcher: unreachable_dispatcher() };
        let rendered = gen.render(&mission, Some("My Report"));
        assert!(!rendered.text.contains("## References"));
        assert!(rendered.text.starts_with("# My Report\n\n"));
    }

    #[test]
    fn heading_numbering_is_hierarchical() {
        let mission = mission_with_notes_and_outline();
        let gen = ReportGenerator { dispatcher: unreachable_dispatcher() };
        let rendered = gen.render(&mission, None);
        assert!(rendered.text.contains("# 1. Overview"));
        assert!(rendered.text.contains("## 1.1. Details"));
    }

    fn unreachable_dispatcher() -> Arc<ModelDispatcher> {
        use maestro_config::SettingsResolver;
        use maestro_providers::CostTracker;
        use std::time::Duration;
        Arc::new(ModelDispatcher::new(
            Arc::new(SettingsResolver::new()),
            Arc::new(CostTracker::new()),
            0,
            0,
            Duration::from_secs(0),
        ))
    }
}
