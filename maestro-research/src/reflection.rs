//! Reflection Manager (M2, spec §4.5). After initial exploration (and again
//! between structured-research rounds) an outline is re-examined against
//! what's actually been found: the Reflection agent proposes structural
//! changes, new subsections, and a home for notes that never got assigned
//! to a section, and this module applies whichever of those the agent
//! actually proposes.
//!
//! Ported algorithm-for-algorithm from `reflection_manager_batched.py`'s
//! three-phase `process_suggestions_and_update_plan_batched`: phase 3a
//! (structural modifications, single call if the formatted context fits
//! `max_planning_context_chars` else greedily batched), phase 3b
//! (subsection additions batched per parent), phase 3c (redistribution of
//! unassigned notes, batched by char budget, single attempt).

use std::collections::HashMap;
use std::sync::Arc;

use maestro_core::context::ExecutionContext;
use maestro_core::error::Result;
use maestro_core::model::{Note, NoteId, ReportSection, SectionId};
use maestro_core::traits::AgentInput;
use maestro_config::SettingsResolver;
use maestro_providers::{AgentRole, ModelDispatcher};
use maestro_utils::batch::batch_by_char_budget;
use maestro_utils::json_extract::extract_first_json;
use serde::Deserialize;
use serde_json::json;

/// Keywords the original flags as signs the model answered with a request
/// for the outline rather than a proposed change to it — a malformed
/// response, not a "no changes needed" one (reflection_manager_batched.py's
/// `is_error_outline`).
const ERROR_OUTLINE_KEYWORDS: &[&str] = &[
    "request_outline",
    "placeholder",
    "outline_request",
    "please provide",
    "corrected outline",
    "full outline",
    "provide the outline",
    "missing outline",
    "outline needed",
];

fn is_error_outline(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_OUTLINE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// A single structural change to the outline, as proposed by the reflection
/// agent. `Rename`/`Remove`/`UpdateDescription` reference an existing
/// section by id; `Add` introduces a new one under `parent_section_id`
/// (`None` means top-level).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StructuralModification {
    Add {
        parent_section_id: Option<SectionId>,
        title: String,
        #[serde(default)]
        description: String,
    },
    Remove {
        section_id: SectionId,
    },
    Rename {
        section_id: SectionId,
        title: String,
    },
    UpdateDescription {
        section_id: SectionId,
        description: String,
    },
}

/// A proposed new subsection under an existing parent (phase 3b).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestedSubsection {
    pub parent_section_id: SectionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub struct ReflectionInput {
    pub mission_id: String,
    pub outline: Vec<ReportSection>,
    pub notes: Vec<Note>,
    pub unassigned_note_ids: Vec<NoteId>,
    pub goals: Vec<String>,
}

pub struct ReflectionManager {
    dispatcher: Arc<ModelDispatcher>,
    resolver: Arc<SettingsResolver>,
}

const STRUCTURAL_CONTEXT_RESERVATION: usize = 5000;
const SUBSECTION_CONTEXT_BUFFER: usize = 1000;
const MAX_APPLY_RETRIES: u32 = 3;

impl ReflectionManager {
    pub fn new(dispatcher: Arc<ModelDispatcher>, resolver: Arc<SettingsResolver>) -> Self {
        Self { dispatcher, resolver }
    }

    /// Run all three phases in order, each operating on the outline left by
    /// the previous one. A phase that proposes nothing (including one whose
    /// retries are exhausted) leaves the outline unchanged rather than
    /// failing the whole reflection pass.
    pub async fn reflect(&self, input: ReflectionInput, context: &ExecutionContext) -> Result<Vec<ReportSection>> {
        context.check_cancelled()?;
        let max_chars = self.resolver.get_int("max_planning_context_chars", Some(&input.mission_id))?.max(1) as usize;

        let after_structural = self
            .run_structural_phase(input.outline, &input.notes, &input.goals, &input.mission_id, max_chars, context)
            .await?;

        context.check_cancelled()?;
        let after_subsections = self
            .run_subsection_phase(after_structural, &input.notes, &input.goals, &input.mission_id, max_chars, context)
            .await?;

        context.check_cancelled()?;
        let after_redistribution = self
            .run_redistribution_phase(
                after_subsections,
                &input.notes,
                &input.unassigned_note_ids,
                &input.mission_id,
                max_chars,
                context,
            )
            .await?;

        Ok(after_redistribution)
    }

    // --- Phase 3a: structural modifications ---

    async fn run_structural_phase(
        &self,
        outline: Vec<ReportSection>,
        notes: &[Note],
        goals: &[String],
        mission_id: &str,
        max_chars: usize,
        context: &ExecutionContext,
    ) -> Result<Vec<ReportSection>> {
        let formatted = format_structural_context(&outline, notes, goals);
        if formatted.len() <= max_chars {
            let modifications = self
                .apply_with_retries(&outline, formatted, mission_id, AgentRole::Reflection, goals, context)
                .await;
            return Ok(apply_structural_modifications(outline, modifications));
        }

        // Over budget: batch sections into groups that each fit, proposing
        // and applying modifications one batch at a time.
        let sections_flat = flatten_top_level(&outline);
        let batches = batch_by_char_budget(&sections_flat, max_chars, STRUCTURAL_CONTEXT_RESERVATION, |s| {
            format_section_for_context(s).len()
        });

        let mut working = outline;
        for batch in batches {
            context.check_cancelled()?;
            let batch_context = batch.iter().map(|s| format_section_for_context(s)).collect::<Vec<_>>().join("\n");
            let modifications = self
                .apply_with_retries(&working, batch_context, mission_id, AgentRole::Reflection, goals, context)
                .await;
            working = apply_structural_modifications(working, modifications);
        }
        Ok(working)
    }

    /// Up to `MAX_APPLY_RETRIES` attempts: propose modifications, reject an
    /// error-outline response or one that collapses sections without
    /// sufficient cause, otherwise accept. Exhausting retries yields no
    /// modifications (fall back to the previous outline, matching the
    /// original's `_apply_structural_modifications`).
    async fn apply_with_retries(
        &self,
        outline: &[ReportSection],
        formatted_context: String,
        mission_id: &str,
        role: AgentRole,
        goals: &[String],
        context: &ExecutionContext,
    ) -> Vec<StructuralModification> {
        let mut retry_prefix = String::new();

        for attempt in 0..MAX_APPLY_RETRIES {
            context.check_cancelled().ok();
            let prompt = format!(
                "{retry_prefix}Given the current report outline and research notes below, propose \
                 structural modifications (add/remove/rename sections, update descriptions) as a JSON \
                 array of objects with an \"action\" field. Respond with [] if no changes are needed.\n\n{formatted_context}"
            );
            let input = AgentInput::from_prompt(prompt);
            let Ok(output) = self.dispatcher.dispatch(role, input).await else {
                continue;
            };

            if is_error_outline(&output.content) {
                retry_prefix = "Your previous response looked like a request for the outline rather than \
                                 a proposed change. Propose the structural modifications directly.\n\n"
                    .to_string();
                continue;
            }

            let Some(modifications) =
                extract_first_json(&output.content).and_then(|raw| serde_json::from_str::<Vec<StructuralModification>>(raw).ok())
            else {
                retry_prefix = "Your previous response wasn't valid JSON. Respond with a JSON array only.\n\n".to_string();
                continue;
            };

            let candidate = apply_structural_modifications(outline.to_vec(), modifications.clone());

            if !self.validate_single_section_intent(mission_id, outline, &candidate, goals, context).await {
                tracing::warn!(mission_id, attempt, "rejected dramatic section collapse");
                retry_prefix = "That response would collapse nearly the entire outline into a single \
                                 section, which is very unlikely to be intended. Reconsider.\n\n"
                    .to_string();
                continue;
            }

            return modifications;
        }

        tracing::warn!(mission_id, "structural modification retries exhausted, keeping previous outline");
        Vec::new()
    }

    /// Fast-model yes/no check on whether a proposed outline revision that
    /// collapses the whole outline down to a single section is actually
    /// intentional, rather than the planning agent misreading the prompt as
    /// a request to produce one summary section (spec §4.5 "Retries";
    /// ported from `reflection_manager_batched.py::validate_single_section_intent`).
    /// A dispatch failure is treated conservatively as "not valid", matching
    /// the original's `except` branch.
    async fn validate_single_section_intent(
        &self,
        mission_id: &str,
        previous_outline: &[ReportSection],
        new_outline: &[ReportSection],
        goals: &[String],
        context: &ExecutionContext,
    ) -> bool {
        if new_outline.len() != 1 {
            return true;
        }
        if is_error_outline(&new_outline[0].title) || is_error_outline(&new_outline[0].description) {
            return false;
        }
        context.check_cancelled().ok();

        let previous_titles: Vec<&str> = previous_outline.iter().take(5).map(|s| s.title.as_str()).collect();
        let ellipsis = if previous_outline.len() > 5 { "..." } else { "" };
        let mission_goal = if goals.is_empty() { "(no stated goal)".to_string() } else { goals.join("\n") };
        let prompt = format!(
            "You are validating whether an outline revision is appropriate.\n\n\
             Mission Goal: {mission_goal}\n\n\
             Previous outline had {} sections:\n{}{ellipsis}\n\n\
             New outline has only 1 section:\n\
             Title: {}\nDescription: {}\n\n\
             Is this dramatic reduction from {} sections to 1 section appropriate for the mission goal?\n\n\
             Respond with ONLY one word:\n\
             - YES if the single section is appropriate for the mission\n\
             - NO if this appears to be an error or placeholder\n",
            previous_outline.len(),
            previous_titles.join(", "),
            new_outline[0].title,
            truncate(&new_outline[0].description, 200),
            previous_outline.len(),
        );
        let input = AgentInput::from_prompt(prompt);
        match self.dispatcher.dispatch(AgentRole::Research, input).await {
            Ok(output) => {
                let is_valid = output.content.trim().to_uppercase().contains("YES");
                if !is_valid {
                    tracing::warn!(mission_id, "single section outline deemed invalid by fast-model validation");
                }
                is_valid
            }
            Err(_) => {
                tracing::warn!(mission_id, "single-section validation dispatch failed, assuming invalid");
                false
            }
        }
    }

    // --- Phase 3b: subsection additions ---

    async fn run_subsection_phase(
        &self,
        outline: Vec<ReportSection>,
        notes: &[Note],
        goals: &[String],
        mission_id: &str,
        max_chars: usize,
        context: &ExecutionContext,
    ) -> Result<Vec<ReportSection>> {
        let max_suggestions_per_batch = self.resolver.get_int("max_suggestions_per_batch", Some(mission_id))?;
        let parents = flatten_top_level(&outline);
        if parents.is_empty() {
            return Ok(outline);
        }

        let parent_batches: Vec<Vec<ReportSection>> = if max_suggestions_per_batch < 0 {
            vec![parents.clone()]
        } else {
            parents.chunks(max_suggestions_per_batch.max(1) as usize).map(<[ReportSection]>::to_vec).collect()
        };

        let mut working = outline;
        for parent_batch in parent_batches {
            context.check_cancelled()?;
            let formatted = format_subsection_context(&parent_batch, notes, goals);
            let note_subdivided = if formatted.len() <= max_chars {
                vec![formatted]
            } else {
                batch_by_char_budget(notes, max_chars, SUBSECTION_CONTEXT_BUFFER, note_size_estimate)
                    .into_iter()
                    .map(|note_group| format_subsection_context(&parent_batch, &note_group, goals))
                    .collect()
            };

            for chunk_context in note_subdivided {
                let working_before = working.clone();
                let suggestions = self.propose_subsections(chunk_context, mission_id, context).await;
                if suggestions.is_empty() {
                    continue;
                }
                let candidate = apply_subsection_suggestions(working.clone(), suggestions);
                if self.validate_single_section_intent(mission_id, &working_before, &candidate, goals, context).await {
                    working = candidate;
                } else {
                    tracing::warn!(mission_id, "subsection batch produced an implausible section count, skipping");
                }
            }
        }
        Ok(working)
    }

    async fn propose_subsections(
        &self,
        formatted_context: String,
        mission_id: &str,
        context: &ExecutionContext,
    ) -> Vec<SuggestedSubsection> {
        for attempt in 0..MAX_APPLY_RETRIES {
            context.check_cancelled().ok();
            let prompt = format!(
                "Given these report sections and unassigned research notes, propose any new subsections \
                 as a JSON array of objects with parent_section_id, title, and description. \
                 Respond with [] if none are needed.\n\n{formatted_context}"
            );
            let input = AgentInput::from_prompt(prompt);
            let Ok(output) = self.dispatcher.dispatch(AgentRole::Reflection, input).await else {
                continue;
            };
            if is_error_outline(&output.content) {
                continue;
            }
            if let Some(suggestions) =
                extract_first_json(&output.content).and_then(|raw| serde_json::from_str::<Vec<SuggestedSubsection>>(raw).ok())
            {
                return suggestions;
            }
            tracing::debug!(mission_id, attempt, "subsection proposal wasn't parseable JSON, retrying");
        }
        Vec::new()
    }

    // --- Phase 3c: note redistribution ---

    async fn run_redistribution_phase(
        &self,
        mut outline: Vec<ReportSection>,
        notes: &[Note],
        unassigned_note_ids: &[NoteId],
        mission_id: &str,
        max_chars: usize,
        context: &ExecutionContext,
    ) -> Result<Vec<ReportSection>> {
        if unassigned_note_ids.is_empty() {
            return Ok(outline);
        }
        let unassigned: Vec<&Note> = notes.iter().filter(|n| unassigned_note_ids.contains(&n.note_id)).collect();
        let unassigned_owned: Vec<Note> = unassigned.into_iter().cloned().collect();

        let batches = batch_by_char_budget(&unassigned_owned, max_chars, SUBSECTION_CONTEXT_BUFFER, note_size_estimate);
        for batch in batches {
            context.check_cancelled()?;
            let formatted = format_redistribution_context(&outline, &batch);
            // Single attempt, no retry — matches the original's
            // `_apply_note_redistribution`.
            let prompt = format!(
                "Assign each of these notes to the most relevant existing section by section_id. \
                 Respond with a JSON object mapping note_id -> section_id. Omit notes that fit no \
                 existing section.\n\n{formatted}"
            );
            let input = AgentInput::from_prompt(prompt);
            let Ok(output) = self.dispatcher.dispatch(AgentRole::Reflection, input).await else {
                continue;
            };
            let Some(assignments) = extract_first_json(&output.content)
                .and_then(|raw| serde_json::from_str::<HashMap<NoteId, SectionId>>(raw).ok())
            else {
                tracing::debug!(mission_id, "note redistribution response wasn't parseable JSON, skipping batch");
                continue;
            };
            apply_note_assignments(&mut outline, &assignments);
        }
        Ok(outline)
    }
}

fn flatten_top_level(outline: &[ReportSection]) -> Vec<ReportSection> {
    outline.to_vec()
}

fn format_section_for_context(section: &ReportSection) -> String {
    format!("- [{}] {}: {}\n", section.section_id, section.title, section.description)
}

fn format_structural_context(outline: &[ReportSection], notes: &[Note], goals: &[String]) -> String {
    let outline_text: String = outline.iter().map(format_section_for_context).collect();
    let notes_text: String = notes.iter().take(200).map(|n| format!("- {}\n", truncate(&n.content, 300))).collect();
    let goals_text = goals.join("\n");
    format!("Goals:\n{goals_text}\n\nOutline:\n{outline_text}\nNotes:\n{notes_text}")
}

fn format_subsection_context(parents: &[ReportSection], notes: &[Note], goals: &[String]) -> String {
    let parents_text: String = parents.iter().map(format_section_for_context).collect();
    let notes_text: String = notes.iter().map(|n| format!("- ({}) {}\n", n.note_id, truncate(&n.content, 300))).collect();
    let goals_text = goals.join("\n");
    format!("Goals:\n{goals_text}\n\nParent sections:\n{parents_text}\nUnassigned notes:\n{notes_text}")
}

fn format_redistribution_context(outline: &[ReportSection], notes: &[Note]) -> String {
    let sections_text: String = flatten_recursive(outline).iter().map(|s| format_section_for_context(s)).collect();
    let notes_text: String = notes.iter().map(|n| format!("- ({}) {}\n", n.note_id, truncate(&n.content, 300))).collect();
    format!("Sections:\n{sections_text}\nNotes to place:\n{notes_text}")
}

fn flatten_recursive(outline: &[ReportSection]) -> Vec<&ReportSection> {
    let mut out = Vec::new();
    fn walk<'a>(sections: &'a [ReportSection], out: &mut Vec<&'a ReportSection>) {
        for s in sections {
            out.push(s);
            walk(&s.subsections, out);
        }
    }
    walk(outline, &mut out);
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// `_batch_notes_by_char_limit`'s per-note size estimate: id length plus up
/// to 200 chars of content plus a fixed 100-char formatting overhead.
fn note_size_estimate(note: &Note) -> usize {
    note.note_id.len() + note.content.chars().count().min(200) + 100
}

fn find_section_mut<'a>(outline: &'a mut [ReportSection], id: &str) -> Option<&'a mut ReportSection> {
    for section in outline {
        if section.section_id == id {
            return Some(section);
        }
        if let Some(found) = find_section_mut(&mut section.subsections, id) {
            return Some(found);
        }
    }
    None
}

fn apply_structural_modifications(outline: Vec<ReportSection>, modifications: Vec<StructuralModification>) -> Vec<ReportSection> {
    let mut outline = outline;
    for modification in modifications {
        match modification {
            StructuralModification::Add { parent_section_id, title, description } => {
                let mut new_section = ReportSection::new(
                    format!("section_{}", uuid::Uuid::new_v4().simple()),
                    title,
                );
                new_section.description = description;
                match parent_section_id {
                    Some(parent_id) => {
                        if let Some(parent) = find_section_mut(&mut outline, &parent_id) {
                            parent.subsections.push(new_section);
                        } else {
                            outline.push(new_section);
                        }
                    }
                    None => outline.push(new_section),
                }
            }
            StructuralModification::Remove { section_id } => {
                remove_section(&mut outline, &section_id);
            }
            StructuralModification::Rename { section_id, title } => {
                if let Some(section) = find_section_mut(&mut outline, &section_id) {
                    section.title = title;
                }
            }
            StructuralModification::UpdateDescription { section_id, description } => {
                if let Some(section) = find_section_mut(&mut outline, &section_id) {
                    section.description = description;
                }
            }
        }
    }
    outline
}

fn remove_section(outline: &mut Vec<ReportSection>, id: &str) {
    outline.retain(|s| s.section_id != id);
    for section in outline.iter_mut() {
        remove_section(&mut section.subsections, id);
    }
}

fn apply_subsection_suggestions(outline: Vec<ReportSection>, suggestions: Vec<SuggestedSubsection>) -> Vec<ReportSection> {
    let mut outline = outline;
    for suggestion in suggestions {
        if let Some(parent) = find_section_mut(&mut outline, &suggestion.parent_section_id) {
            let mut new_section =
                ReportSection::new(format!("section_{}", uuid::Uuid::new_v4().simple()), suggestion.title);
            new_section.description = suggestion.description;
            parent.subsections.push(new_section);
        }
    }
    outline
}

fn apply_note_assignments(outline: &mut [ReportSection], assignments: &HashMap<NoteId, SectionId>) {
    let mut by_section: HashMap<SectionId, Vec<NoteId>> = HashMap::new();
    for (note_id, section_id) in assignments {
        by_section.entry(section_id.clone()).or_default().push(note_id.clone());
    }
    for (section_id, note_ids) in by_section {
        if let Some(section) = find_section_mut(outline, &section_id) {
            section.associated_note_ids.extend(note_ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::model::SourceType;

    fn section(id: &str, title: &str) -> ReportSection {
        ReportSection::new(id, title)
    }

    fn note(id: &str, content: &str) -> Note {
        Note {
            note_id: id.into(),
            content: content.into(),
            source_type: SourceType::Internal,
            source_id: id.into(),
            source_metadata: Default::default(),
        }
    }

    #[test]
    fn error_outline_keywords_are_detected_case_insensitively() {
        assert!(is_error_outline("Please provide the Outline so I can revise it."));
        assert!(is_error_outline("MISSING OUTLINE in your request"));
        assert!(!is_error_outline("Here are three structural modifications."));
    }

    fn dispatcher_without_routes() -> Arc<ModelDispatcher> {
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

    fn manager_without_routes() -> ReflectionManager {
        use maestro_config::SettingsResolver;
        ReflectionManager::new(dispatcher_without_routes(), Arc::new(SettingsResolver::new()))
    }

    #[tokio::test]
    async fn single_section_collapse_is_not_rejected_when_outline_still_has_multiple_sections() {
        // `new_outline.len() != 1` short-circuits to valid without a dispatch call.
        let manager = manager_without_routes();
        let ctx = ExecutionContext::for_mission("m1");
        let previous = vec![section("a", "A")];
        let new_multi = vec![section("a", "A"), section("b", "B")];
        assert!(manager.validate_single_section_intent("m1", &previous, &new_multi, &[], &ctx).await);
    }

    #[tokio::test]
    async fn single_section_collapse_with_error_keyword_is_rejected_without_dispatch() {
        let manager = manager_without_routes();
        let ctx = ExecutionContext::for_mission("m1");
        let previous = (0..6).map(|i| section(&format!("s{i}"), &format!("Section {i}"))).collect::<Vec<_>>();
        let mut collapsed = section("only", "Please provide the outline");
        collapsed.description = "placeholder".into();
        let new_single = vec![collapsed];
        assert!(!manager.validate_single_section_intent("m1", &previous, &new_single, &[], &ctx).await);
    }

    #[tokio::test]
    async fn single_section_collapse_falls_back_to_invalid_when_dispatch_fails() {
        // No model route registered for any class, so the fast-model dispatch
        // call errors and the conservative "assume invalid" branch runs.
        let manager = manager_without_routes();
        let ctx = ExecutionContext::for_mission("m1");
        let previous = (0..6).map(|i| section(&format!("s{i}"), &format!("Section {i}"))).collect::<Vec<_>>();
        let new_single = vec![section("only", "A Genuine Single-Section Summary")];
        assert!(!manager.validate_single_section_intent("m1", &previous, &new_single, &[], &ctx).await);
    }

    #[test]
    fn apply_add_modification_inserts_under_named_parent() {
        let outline = vec![section("a", "A")];
        let modifications = vec![StructuralModification::Add {
            parent_section_id: Some("a".into()),
            title: "New Child".into(),
            description: "desc".into(),
        }];
        let result = apply_structural_modifications(outline, modifications);
        assert_eq!(result[0].subsections.len(), 1);
        assert_eq!(result[0].subsections[0].title, "New Child");
    }

    #[test]
    fn apply_remove_modification_drops_section_at_any_depth() {
        let mut a = section("a", "A");
        a.subsections = vec![section("b", "B")];
        let modifications = vec![StructuralModification::Remove { section_id: "b".into() }];
        let result = apply_structural_modifications(vec![a], modifications);
        assert!(result[0].subsections.is_empty());
    }

    #[test]
    fn apply_rename_modification_updates_title() {
        let outline = vec![section("a", "Old Title")];
        let modifications = vec![StructuralModification::Rename { section_id: "a".into(), title: "New Title".into() }];
        let result = apply_structural_modifications(outline, modifications);
        assert_eq!(result[0].title, "New Title");
    }

    #[test]
    fn note_redistribution_assigns_into_matching_section() {
        let mut outline = vec![section("a", "A")];
        let mut assignments = HashMap::new();
        assignments.insert("n1".to_string(), "a".to_string());
        apply_note_assignments(&mut outline, &assignments);
        assert!(outline[0].associated_note_ids.contains("n1"));
    }

    #[test]
    fn note_size_estimate_caps_content_contribution_at_200_chars() {
        let short = note("n1", "short");
        let long = note("n2", &"x".repeat(1000));
        assert_eq!(note_size_estimate(&short), "n1".len() + 5 + 100);
        assert_eq!(note_size_estimate(&long), "n2".len() + 200 + 100);
    }

    #[test]
    fn subsection_suggestion_only_applies_to_existing_parent() {
        let outline = vec![section("a", "A")];
        let suggestions = vec![SuggestedSubsection {
            parent_section_id: "missing".into(),
            title: "Orphan".into(),
            description: String::new(),
        }];
        let result = apply_subsection_suggestions(outline, suggestions);
        assert!(result[0].subsections.is_empty());
    }
}
