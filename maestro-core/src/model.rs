//! The mission data model (spec §3). These are plain data; the invariants
//! called out in their doc comments are enforced by the owning components
//! (the Outline Validator for I1-I5, the Mission Context Store for I6/I7),
//! not by the types themselves — a `ReportSection` tree is just a tree until
//! something validates it.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

pub type NoteId = String;
pub type SectionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Planning,
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub user_request: String,
    pub status: MissionStatus,
    pub plan: Option<Plan>,
    pub notes: Vec<Note>,
    /// section_id -> written content
    pub report_content: std::collections::HashMap<SectionId, String>,
    pub stats: Stats,
    pub scratchpad: String,
    pub goals: Vec<Goal>,
    pub thoughts: ThoughtPad,
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
    pub execution_log: Vec<LogEntry>,
}

impl Mission {
    pub fn new(id: impl Into<String>, user_request: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_request: user_request.into(),
            status: MissionStatus::Pending,
            plan: None,
            notes: Vec::new(),
            report_content: std::collections::HashMap::new(),
            stats: Stats::default(),
            scratchpad: String::new(),
            goals: Vec::new(),
            thoughts: ThoughtPad::new(20),
            metadata: std::collections::HashMap::new(),
            execution_log: Vec::new(),
        }
    }

    /// Every `associated_note_id` in the plan's outline must reference a note
    /// that exists on the mission (I6).
    pub fn orphaned_note_ids(&self) -> Vec<NoteId> {
        let Some(plan) = &self.plan else {
            return Vec::new();
        };
        let known: HashSet<&str> = self.notes.iter().map(|n| n.note_id.as_str()).collect();
        let mut missing = Vec::new();
        for section in plan.report_outline.iter() {
            collect_missing(section, &known, &mut missing);
        }
        missing
    }

    /// Notes not associated with any section — the input to Reflection
    /// Manager Phase 3c redistribution.
    pub fn unassigned_note_ids(&self) -> Vec<NoteId> {
        let Some(plan) = &self.plan else {
            return self.notes.iter().map(|n| n.note_id.clone()).collect();
        };
        let mut assigned = HashSet::new();
        for section in plan.report_outline.iter() {
            collect_assigned(section, &mut assigned);
        }
        self.notes
            .iter()
            .filter(|n| !assigned.contains(&n.note_id))
            .map(|n| n.note_id.clone())
            .collect()
    }
}

fn collect_missing(section: &ReportSection, known: &HashSet<&str>, out: &mut Vec<NoteId>) {
    for id in &section.associated_note_ids {
        if !known.contains(id.as_str()) {
            out.push(id.clone());
        }
    }
    for sub in &section.subsections {
        collect_missing(sub, known, out);
    }
}

fn collect_assigned(section: &ReportSection, out: &mut HashSet<NoteId>) {
    out.extend(section.associated_note_ids.iter().cloned());
    for sub in &section.subsections {
        collect_assigned(sub, out);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub mission_goal: String,
    pub report_outline: Vec<ReportSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStrategy {
    ResearchBased,
    ContentBased,
    SynthesizeFromSubsections,
    SynthesizeFromOtherSections,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub section_id: SectionId,
    pub title: String,
    pub description: String,
    pub research_strategy: ResearchStrategy,
    pub subsections: Vec<ReportSection>,
    pub associated_note_ids: HashSet<NoteId>,
}

impl ReportSection {
    pub fn new(section_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            title: title.into(),
            description: String::new(),
            research_strategy: ResearchStrategy::ResearchBased,
            subsections: Vec::new(),
            associated_note_ids: HashSet::new(),
        }
    }

    pub fn is_empty_section(&self) -> bool {
        self.description.trim().is_empty() && self.subsections.is_empty()
    }

    /// Depth of the deepest leaf under (and including) this section, 1 for a
    /// childless section.
    pub fn depth(&self) -> usize {
        1 + self
            .subsections
            .iter()
            .map(ReportSection::depth)
            .max()
            .unwrap_or(0)
    }

    pub fn has_research_based(&self) -> bool {
        self.research_strategy == ResearchStrategy::ResearchBased
            || self.subsections.iter().any(ReportSection::has_research_based)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Document,
    Web,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_id: NoteId,
    pub content: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub source_metadata: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub total_cost: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub native_tokens: u64,
    pub web_searches: u64,
    pub document_searches: u64,
}

impl Stats {
    /// Fold a single dispatch's usage details into the running totals.
    /// Called once per Model Dispatcher response (§4.14).
    pub fn add_usage(&mut self, cost: f64, prompt_tokens: u64, completion_tokens: u64, native_tokens: u64) {
        self.total_cost += cost;
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.native_tokens += native_tokens;
    }

    pub fn record_web_search(&mut self) {
        self.web_searches += 1;
    }

    pub fn record_document_search(&mut self) {
        self.document_searches += 1;
    }

    pub fn clear(&mut self) {
        *self = Stats::default();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub text: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub agent_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub text: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub agent_name: String,
}

/// Bounded ring buffer of the mission's most recent thoughts — the "thought
/// pad" agents inspect for working context, capped at
/// `thought_pad_context_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtPad {
    capacity: usize,
    entries: VecDeque<Thought>,
}

impl ThoughtPad {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, thought: Thought) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(thought);
    }

    pub fn recent(&self) -> impl Iterator<Item = &Thought> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Failure,
    Warning,
    Running,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub agent_name: String,
    pub action: String,
    pub status: LogStatus,
    pub input_summary: String,
    pub output_summary: String,
    pub error_message: Option<String>,
    pub model_details: Option<String>,
    pub cost: Option<f64>,
    pub tokens: Option<u64>,
}

/// A source produced by the retrieval pipelines (distinct from `Note`: a
/// `Source` is the citable unit handed to the Report Generator, keyed by its
/// stable `ref_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub source_type: SourceType,
    pub ref_id: String,
    pub title: String,
    pub url: Option<String>,
    pub doc_id: Option<String>,
    pub page: Option<u32>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSuggestion {
    pub section_id: SectionId,
    pub edit_kind: String,
    pub rationale: String,
    pub proposed_edit: String,
}

// --- Writing assistant mode ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingSession {
    pub id: String,
    pub chat_id: String,
    pub document_group_id: Option<String>,
    pub use_web_search: bool,
    pub current_draft_id: Option<String>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub title: String,
    pub content: String,
    pub version: u32,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Document,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub draft_id: String,
    pub ref_id: String,
    pub kind: ReferenceKind,
    pub citation_text: String,
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_monotonically_increase_and_clear_zeros() {
        let mut stats = Stats::default();
        stats.add_usage(0.01, 10, 5, 15);
        stats.record_web_search();
        stats.record_document_search();
        assert!(stats.total_cost > 0.0);
        assert_eq!(stats.web_searches, 1);
        stats.clear();
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn thought_pad_is_bounded() {
        let mut pad = ThoughtPad::new(2);
        for i in 0..5 {
            pad.push(Thought {
                text: format!("t{i}"),
                timestamp: chrono::Utc::now(),
                agent_name: "writer".into(),
            });
        }
        assert_eq!(pad.len(), 2);
        let texts: Vec<_> = pad.recent().map(|t| t.text.clone()).collect();
        assert_eq!(texts, vec!["t3", "t4"]);
    }

    #[test]
    fn unassigned_note_ids_excludes_assigned() {
        let mut mission = Mission::new("m1", "research x");
        mission.notes.push(Note {
            note_id: "n1".into(),
            content: "c".into(),
            source_type: SourceType::Internal,
            source_id: "n1".into(),
            source_metadata: Default::default(),
        });
        mission.notes.push(Note {
            note_id: "n2".into(),
            content: "c".into(),
            source_type: SourceType::Internal,
            source_id: "n2".into(),
            source_metadata: Default::default(),
        });
        let mut section = ReportSection::new("s1", "Intro");
        section.associated_note_ids.insert("n1".into());
        mission.plan = Some(Plan {
            mission_goal: "goal".into(),
            report_outline: vec![section],
        });
        assert_eq!(mission.unassigned_note_ids(), vec!["n2".to_string()]);
    }

    #[test]
    fn empty_outline_has_no_research_based() {
        let section = ReportSection::new("s1", "Empty");
        assert!(!section.has_research_based());
        assert!(section.is_empty_section());
    }
}
