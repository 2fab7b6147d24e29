//! Writing Manager (M4, spec §4.7). Drives `writing_passes` rounds over the
//! outline: pass 1 writes every section in a fixed order (middle sections
//! depth-first, then the last section and its descendants, then the first
//! section and its descendants — identified by intro/conclusion keywords
//! with a positional fallback); later passes apply revision suggestions
//! concurrently, with an inter-pass reflection step in between. A final
//! post-processing sweep synthesizes top-level sections whose own content
//! is missing once every one of their subsections has valid content.
//!
//! Ported from `writing_manager.py`'s `run_writing_phase` /
//! `_write_section_content` / `_synthesize_top_level_sections`.

use std::collections::HashMap;
use std::sync::Arc;

use maestro_core::context::ExecutionContext;
use maestro_core::error::Result;
use maestro_core::model::{ChangeSuggestion, Note, ReportSection, ResearchStrategy, SectionId};
use maestro_core::traits::AgentInput;
use maestro_config::SettingsResolver;
use maestro_providers::{AgentRole, ModelDispatcher};
use maestro_utils::json_extract::extract_first_json;
use serde::Deserialize;

const INTRO_KEYWORDS: &[&str] = &["introduction", "intro", "overview", "background"];
const CONCLUSION_KEYWORDS: &[&str] = &["conclusion", "summary", "closing", "final"];
const ERROR_PLACEHOLDERS: &[&str] = &["[error]", "[placeholder]", "todo: write this section"];

pub struct WritingManager {
    dispatcher: Arc<ModelDispatcher>,
    resolver: Arc<SettingsResolver>,
    last_reflection_suggestions: parking_lot::Mutex<Vec<ChangeSuggestion>>,
}

/// What a writing pass needs about the mission to write or revise any
/// section: the outline, every note (only research-based sections use
/// them), goals/thoughts context, and (from pass 2 onward) the
/// already-written content and outstanding revision suggestions.
pub struct WritingContext<'a> {
    pub mission_id: &'a str,
    pub outline: &'a [ReportSection],
    pub notes: &'a [Note],
    pub goals_text: &'a str,
    pub thoughts_text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct WritingReflectionOutput {
    #[serde(default)]
    change_suggestions: Vec<ChangeSuggestion>,
}

impl WritingManager {
    pub fn new(dispatcher: Arc<ModelDispatcher>, resolver: Arc<SettingsResolver>) -> Self {
        Self {
            dispatcher,
            resolver,
            last_reflection_suggestions: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Run every configured writing pass, returning the written content for
    /// every section keyed by `section_id`.
    pub async fn run(&self, ctx: WritingContext<'_>, context: &ExecutionContext) -> Result<HashMap<SectionId, String>> {
        let writing_passes = self.resolver.get_int("writing_passes", Some(ctx.mission_id))?.max(1) as usize;
        let mut content: HashMap<SectionId, String> = HashMap::new();

        for pass in 0..writing_passes {
            context.check_cancelled()?;
            if pass == 0 {
                self.run_first_pass(&ctx, &mut content, context).await?;
            } else {
                self.run_revision_pass(&ctx, &mut content, context).await?;
            }

            if pass + 1 < writing_passes {
                context.check_cancelled()?;
                self.run_inter_pass_reflection(&ctx, &content, context).await?;
            }
        }

        self.synthesize_top_level_sections(&ctx, &mut content, context).await?;
        Ok(content)
    }

    /// Pass 1 ordering: middle sections first (depth-first), then the last
    /// top-level section and its descendants, then the first. Sections
    /// whose strategy is `synthesize_from_subsections` are skipped here —
    /// they're filled in by the post-processing sweep once their children
    /// have content.
    async fn run_first_pass(
        &self,
        ctx: &WritingContext<'_>,
        content: &mut HashMap<SectionId, String>,
        context: &ExecutionContext,
    ) -> Result<()> {
        let order = first_pass_order(ctx.outline);
        for section in order {
            context.check_cancelled()?;
            if section.research_strategy == ResearchStrategy::SynthesizeFromSubsections {
                continue;
            }
            let parent_title = find_parent_title(ctx.outline, &section.section_id);
            let written = self
                .write_section_content(ctx, section, content, parent_title.as_deref(), &[])
                .await;
            content.insert(section.section_id.clone(), written);
        }
        Ok(())
    }

    /// Passes 2+: group `change_suggestions` by section and revise every
    /// targeted section concurrently (the original's `asyncio.gather`;
    /// real fan-out is still bounded by the Model Dispatcher's own
    /// concurrency semaphore).
    async fn run_revision_pass(
        &self,
        ctx: &WritingContext<'_>,
        content: &mut HashMap<SectionId, String>,
        context: &ExecutionContext,
    ) -> Result<()> {
        let suggestions = self.last_reflection_suggestions.lock().clone();
        if suggestions.is_empty() {
            return Ok(());
        }
        let mut by_section: HashMap<SectionId, Vec<ChangeSuggestion>> = HashMap::new();
        for s in suggestions {
            by_section.entry(s.section_id.clone()).or_default().push(s);
        }

        let flat = flatten(ctx.outline);
        let targets: Vec<&ReportSection> = flat
            .into_iter()
            .filter(|s| by_section.contains_key(&s.section_id) && s.research_strategy != ResearchStrategy::SynthesizeFromSubsections)
            .collect();

        let revised = futures::future::join_all(targets.into_iter().map(|section| {
            let parent_title = find_parent_title(ctx.outline, &section.section_id);
            let revision_suggestions = by_section.get(&section.section_id).cloned().unwrap_or_default();
            let content_snapshot = content.clone();
            async move {
                let written = self
                    .write_section_content_owned(ctx, section, &content_snapshot, parent_title, revision_suggestions)
                    .await;
                (section.section_id.clone(), written)
            }
        }))
        .await;

        for (section_id, written) in revised {
            context.check_cancelled()?;
            content.insert(section_id, written);
        }
        Ok(())
    }

    async fn run_inter_pass_reflection(
        &self,
        ctx: &WritingContext<'_>,
        content: &HashMap<SectionId, String>,
        _context: &ExecutionContext,
    ) -> Result<()> {
        let draft = concatenated_draft(ctx.outline, content);
        let prompt = format!(
            "Review this report draft against its outline and goals. Suggest concrete revisions as a \
             JSON object with a \"change_suggestions\" array, each item having section_id, edit_kind, \
             rationale, and proposed_edit. Respond with an empty array if no revisions are needed.\n\n\
             Goals:\n{}\n\nThoughts:\n{}\n\nDraft:\n{draft}",
            ctx.goals_text, ctx.thoughts_text,
        );
        let input = AgentInput::from_prompt(prompt);
        let suggestions = match self.dispatcher.dispatch(AgentRole::Reflection, input).await {
            Ok(output) => extract_first_json(&output.content)
                .and_then(|raw| serde_json::from_str::<WritingReflectionOutput>(raw).ok())
                .map(|o| o.change_suggestions)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        *self.last_reflection_suggestions.lock() = suggestions;
        Ok(())
    }

    /// Post-processing (spec §4.7): a top-level section whose own content
    /// is missing/placeholder-like, and whose subsections *all* have valid
    /// content, gets a synthesized introduction/summary written from those
    /// subsections rather than being left blank.
    async fn synthesize_top_level_sections(
        &self,
        ctx: &WritingContext<'_>,
        content: &mut HashMap<SectionId, String>,
        context: &ExecutionContext,
    ) -> Result<()> {
        for section in ctx.outline {
            context.check_cancelled()?;
            if section.subsections.is_empty() {
                continue;
            }
            let own_content = content.get(&section.section_id).cloned().unwrap_or_default();
            if !is_missing_or_placeholder(&own_content) {
                continue;
            }
            let all_children_valid = section
                .subsections
                .iter()
                .all(|c| !is_missing_or_placeholder(content.get(&c.section_id).cloned().unwrap_or_default().as_str()));
            if !all_children_valid {
                continue;
            }

            let synthesized = self.synthesize_intro(ctx, section, content).await;
            content.insert(section.section_id.clone(), synthesized);
        }
        Ok(())
    }

    async fn synthesize_intro(
        &self,
        ctx: &WritingContext<'_>,
        section: &ReportSection,
        content: &HashMap<SectionId, String>,
    ) -> String {
        let children_text: String = section
            .subsections
            .iter()
            .map(|c| format!("## {}\n{}\n\n", c.title, content.get(&c.section_id).cloned().unwrap_or_default()))
            .collect();
        let prompt = format!(
            "Write a short synthesizing introduction for the section \"{}\" that ties together its \
             subsections below, without repeating their content verbatim.\n\nGoals:\n{}\n\n{children_text}",
            section.title, ctx.goals_text,
        );
        let input = AgentInput::from_prompt(prompt);
        match self.dispatcher.dispatch(AgentRole::Writing, input).await {
            Ok(output) => output.content,
            Err(_) => String::new(),
        }
    }

    async fn write_section_content(
        &self,
        ctx: &WritingContext<'_>,
        section: &ReportSection,
        content: &HashMap<SectionId, String>,
        parent_title: Option<&str>,
        revision_suggestions: &[ChangeSuggestion],
    ) -> String {
        self.write_section_content_owned(ctx, section, content, parent_title.map(str::to_string), revision_suggestions.to_vec())
            .await
    }

    /// Builds context for one section and dispatches a single writing call.
    /// Research-based sections get their associated notes; synthesis
    /// sections get the already-written content of other sections instead.
    async fn write_section_content_owned(
        &self,
        ctx: &WritingContext<'_>,
        section: &ReportSection,
        content: &HashMap<SectionId, String>,
        parent_title: Option<String>,
        revision_suggestions: Vec<ChangeSuggestion>,
    ) -> String {
        let notes_text = if section.research_strategy == ResearchStrategy::ResearchBased {
            ctx.notes
                .iter()
                .filter(|n| section.associated_note_ids.contains(&n.note_id))
                .map(|n| format!("- {}\n", n.content))
                .collect::<String>()
        } else {
            String::new()
        };

        let revision_text = if revision_suggestions.is_empty() {
            String::new()
        } else {
            format!(
                "\n\nIncorporate these revisions:\n{}",
                revision_suggestions
                    .iter()
                    .map(|s| format!("- ({}) {}: {}\n", s.edit_kind, s.rationale, s.proposed_edit))
                    .collect::<String>()
            )
        };

        let previous_content = content.get(&section.section_id).cloned().unwrap_or_default();
        let parent_line = parent_title.map(|t| format!("Parent section: {t}\n")).unwrap_or_default();

        let prompt = format!(
            "Write the content for report section \"{}\" ({}).\n{parent_line}Description: {}\n\n\
             Goals:\n{}\n\nNotes:\n{notes_text}\n\nPrevious draft (if any):\n{previous_content}{revision_text}",
            section.title, section.section_id, section.description, ctx.goals_text,
        );
        let input = AgentInput::from_prompt(prompt);
        match self.dispatcher.dispatch(AgentRole::Writing, input).await {
            Ok(output) => output.content,
            Err(_) => previous_content,
        }
    }
}

fn is_missing_or_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    ERROR_PLACEHOLDERS.iter().any(|p| lower.contains(p))
}

/// Depth-first, skipping the sentinel "first"/"last" top-level sections
/// (they're scheduled separately by `first_pass_order`).
fn collect_depth_first<'a>(sections: &'a [ReportSection], out: &mut Vec<&'a ReportSection>) {
    for section in sections {
        out.push(section);
        collect_depth_first(&section.subsections, out);
    }
}

/// Identifies the first/last top-level sections by intro/conclusion
/// keyword in the title, falling back to position (index 0 / last index)
/// when no keyword matches — matching `writing_manager.py`'s heuristic.
fn first_pass_order(outline: &[ReportSection]) -> Vec<&ReportSection> {
    if outline.is_empty() {
        return Vec::new();
    }

    let first_index = outline
        .iter()
        .position(|s| INTRO_KEYWORDS.iter().any(|k| s.title.to_lowercase().contains(k)))
        .unwrap_or(0);
    let last_index = outline
        .iter()
        .rposition(|s| CONCLUSION_KEYWORDS.iter().any(|k| s.title.to_lowercase().contains(k)))
        .unwrap_or(outline.len() - 1);

    let mut middle = Vec::new();
    for (i, section) in outline.iter().enumerate() {
        if i != first_index && i != last_index {
            collect_depth_first(std::slice::from_ref(section), &mut middle);
        }
    }

    let mut last_group = Vec::new();
    if last_index != first_index || outline.len() == 1 {
        collect_depth_first(std::slice::from_ref(&outline[last_index]), &mut last_group);
    }

    let mut first_group = Vec::new();
    collect_depth_first(std::slice::from_ref(&outline[first_index]), &mut first_group);

    let mut order = middle;
    order.extend(last_group);
    if first_index != last_index {
        order.extend(first_group);
    }
    order
}

fn flatten(outline: &[ReportSection]) -> Vec<&ReportSection> {
    let mut out = Vec::new();
    collect_depth_first(outline, &mut out);
    out
}

fn find_parent_title(outline: &[ReportSection], target_id: &SectionId) -> Option<String> {
    fn walk<'a>(sections: &'a [ReportSection], target_id: &str) -> Option<&'a str> {
        for section in sections {
            if section.subsections.iter().any(|c| &c.section_id == target_id) {
                return Some(&section.title);
            }
            if let Some(found) = walk(&section.subsections, target_id) {
                return Some(found);
            }
        }
        None
    }
    walk(outline, target_id).map(str::to_string)
}

fn concatenated_draft(outline: &[ReportSection], content: &HashMap<SectionId, String>) -> String {
    flatten(outline)
        .iter()
        .map(|s| format!("## {}\n{}\n\n", s.title, content.get(&s.section_id).cloned().unwrap_or_default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::model::SourceType;

    fn section(id: &str, title: &str) -> ReportSection {
        ReportSection::new(id, title)
    }

    #[test]
    fn first_pass_order_schedules_middle_then_last_then_first() {
        let outline = vec![section("intro", "Introduction"), section("body", "Main Analysis"), section("concl", "Conclusion")];
        let order = first_pass_order(&outline);
        let ids: Vec<&str> = order.iter().map(|s| s.section_id.as_str()).collect();
        assert_eq!(ids, vec!["body", "concl", "intro"]);
    }

    #[test]
    fn first_pass_order_falls_back_to_position_without_keywords() {
        let outline = vec![section("a", "Alpha"), section("b", "Beta"), section("c", "Gamma")];
        let order = first_pass_order(&outline);
        let ids: Vec<&str> = order.iter().map(|s| s.section_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn single_section_outline_is_its_own_first_and_last() {
        let outline = vec![section("only", "Only Section")];
        let order = first_pass_order(&outline);
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].section_id, "only");
    }

    #[test]
    fn find_parent_title_locates_nested_ancestor() {
        let mut parent = section("p", "Parent");
        parent.subsections = vec![section("c", "Child")];
        let outline = vec![parent];
        assert_eq!(find_parent_title(&outline, &"c".to_string()), Some("Parent".to_string()));
        assert_eq!(find_parent_title(&outline, &"p".to_string()), None);
    }

    #[test]
    fn missing_or_placeholder_detection() {
        assert!(is_missing_or_placeholder(""));
        assert!(is_missing_or_placeholder("   "));
        assert!(is_missing_or_placeholder("[PLACEHOLDER]"));
        assert!(!is_missing_or_placeholder("Real written content about the topic."));
    }

    #[test]
    fn note_fixture_compiles_with_internal_source_type() {
        let n = Note {
            note_id: "n1".into(),
            content: "c".into(),
            source_type: SourceType::Internal,
            source_id: "n1".into(),
            source_metadata: Default::default(),
        };
        assert_eq!(n.note_id, "n1");
    }
}
