//! Mission Controller (H2, spec §4.9): the top-level phase sequencer. Drives
//! one mission through `pending -> planning -> initial_exploration ->
//! structured_research -> [replanning] -> note_assignment -> writing ->
//! finalization -> completed`, invoking `maestro-research`'s M1-M4 and
//! `maestro-report`'s H1 at the appropriate phase, checking the mission's
//! pause/stop signal at every boundary, and reporting through the Event Bus.
//!
//! No orchestrator source from the original implementation survived
//! retrieval (only `reflection_manager_batched.py`, `report_generator.py`,
//! and `writing_manager.py` did); this phase sequencing is built directly
//! from spec §4.9's phase graph and §5's suspension-point/cancellation
//! rules, using the same collaborator-injection shape the rest of this
//! workspace follows.

use std::sync::Arc;

use maestro_config::SettingsResolver;
use maestro_core::context::ExecutionContext;
use maestro_core::error::{MaestroError, Result};
use maestro_core::model::{
    Goal, LogEntry, LogStatus, Mission, MissionStatus, Plan, ReportSection, ResearchStrategy,
};
use maestro_core::traits::AgentInput;
use maestro_events::{EventBus, EventKind};
use maestro_providers::{AgentRole, ModelDispatcher};
use maestro_report::ReportGenerator;
use maestro_research::{
    IterativeSearchPipeline, OutlineValidator, ReflectionInput, ReflectionManager, SearchMode, WritingManager,
};
use maestro_utils::json_extract::extract_first_json;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::phase::{MissionPhase, MissionPhaseMachine};
use crate::tasks::TaskManager;

/// Cooperative control signal a caller (a pause/stop API endpoint) flips;
/// the run loop observes it at the top of every phase iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

/// Everything one mission's run needs: the mutable mission record, its
/// phase machine, its cancellation-bearing execution context, and the
/// control signal pause/stop flip through.
pub struct MissionRun {
    pub mission: RwLock<Mission>,
    pub phase: MissionPhaseMachine,
    pub context: ExecutionContext,
    control: Mutex<ControlSignal>,
    resume_phase: Mutex<Option<MissionPhase>>,
}

impl MissionRun {
    pub fn new(mission: Mission) -> Self {
        let context = ExecutionContext::for_mission(mission.id.clone());
        let phase = MissionPhaseMachine::new(mission.id.clone());
        Self {
            mission: RwLock::new(mission),
            phase,
            context,
            control: Mutex::new(ControlSignal::Run),
            resume_phase: Mutex::new(None),
        }
    }

    /// Request a pause; takes effect at the next phase boundary, leaving
    /// in-flight results already produced (spec §5).
    pub fn pause(&self) {
        *self.control.lock() = ControlSignal::Pause;
    }

    /// Request a stop; takes effect at the next phase boundary and also
    /// cancels every in-flight suspension point immediately via the shared
    /// `ExecutionContext` cancellation token (spec §5).
    pub fn stop(&self) {
        *self.control.lock() = ControlSignal::Stop;
        self.context.cancel();
    }

    /// Clears a prior pause request so `run()` resumes forward progress.
    pub fn resume(&self) {
        *self.control.lock() = ControlSignal::Run;
    }

    fn signal(&self) -> ControlSignal {
        *self.control.lock()
    }
}

pub struct MissionController {
    dispatcher: Arc<ModelDispatcher>,
    resolver: Arc<SettingsResolver>,
    events: Arc<EventBus>,
    tasks: Arc<TaskManager>,
    search_pipeline: Arc<IterativeSearchPipeline>,
    reflection: Arc<ReflectionManager>,
    validator: Arc<OutlineValidator>,
    writing: Arc<WritingManager>,
    report: Arc<ReportGenerator>,
}

#[derive(Debug, Deserialize)]
struct PlanSectionDraft {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    research_strategy: Option<String>,
    #[serde(default)]
    subsections: Vec<PlanSectionDraft>,
}

#[derive(Debug, Deserialize)]
struct PlanDraft {
    mission_goal: String,
    report_outline: Vec<PlanSectionDraft>,
}

impl MissionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<ModelDispatcher>,
        resolver: Arc<SettingsResolver>,
        events: Arc<EventBus>,
        tasks: Arc<TaskManager>,
        search_pipeline: Arc<IterativeSearchPipeline>,
        reflection: Arc<ReflectionManager>,
        validator: Arc<OutlineValidator>,
        writing: Arc<WritingManager>,
        report: Arc<ReportGenerator>,
    ) -> Self {
        Self { dispatcher, resolver, events, tasks, search_pipeline, reflection, validator, writing, report }
    }

    /// Drives `run` forward one phase at a time until it reaches a terminal
    /// phase (`completed`/`failed`/`stopped`) or is paused. Safe to call
    /// again after a pause — it resumes into the phase that was
    /// interrupted.
    pub async fn run(&self, run: &MissionRun) -> Result<()> {
        loop {
            let current = run.phase.current().await;
            if current.is_terminal() {
                return Ok(());
            }
            if current == MissionPhase::Paused {
                let Some(resume_to) = run.resume_phase.lock().take() else {
                    return Ok(());
                };
                run.phase.transition_to(resume_to, Some("resumed".to_string())).await?;
                continue;
            }
            if self.observe_control_signal(run, current).await? {
                return Ok(());
            }

            let step_result = self.run_phase(run, current).await;
            if let Err(err) = step_result {
                self.fail(run, current, &err).await;
                return Err(err);
            }
        }
    }

    async fn observe_control_signal(&self, run: &MissionRun, current: MissionPhase) -> Result<bool> {
        match run.signal() {
            ControlSignal::Run => Ok(false),
            ControlSignal::Pause => {
                *run.resume_phase.lock() = Some(current);
                run.phase.transition_to(MissionPhase::Paused, Some("paused".to_string())).await?;
                self.set_status(run, MissionStatus::Paused).await;
                self.emit_status(run, current).await;
                Ok(true)
            }
            ControlSignal::Stop => {
                self.tasks.cancel_all().await;
                run.phase.transition_to(MissionPhase::Stopped, Some("stopped".to_string())).await?;
                self.set_status(run, MissionStatus::Stopped).await;
                self.emit_status(run, current).await;
                Ok(true)
            }
        }
    }

    async fn run_phase(&self, run: &MissionRun, current: MissionPhase) -> Result<()> {
        run.context.check_cancelled()?;
        match current {
            MissionPhase::Pending => {
                self.set_status(run, MissionStatus::Planning).await;
                run.phase.transition_to(MissionPhase::Planning, None).await
            }
            MissionPhase::Planning => {
                self.do_planning(run).await?;
                self.set_status(run, MissionStatus::Running).await;
                run.phase.transition_to(MissionPhase::InitialExploration, None).await
            }
            MissionPhase::InitialExploration => {
                self.do_initial_exploration(run).await?;
                run.phase.transition_to(MissionPhase::StructuredResearch, None).await
            }
            MissionPhase::StructuredResearch => {
                self.do_structured_research(run).await?;
                let mission_id = run.mission.read().await.id.clone();
                let skip_replan = self.resolver.get_bool("skip_final_replanning", Some(&mission_id))?;
                let next = if skip_replan { MissionPhase::NoteAssignment } else { MissionPhase::Replanning };
                run.phase.transition_to(next, None).await
            }
            MissionPhase::Replanning => {
                self.do_replanning(run).await?;
                run.phase.transition_to(MissionPhase::NoteAssignment, None).await
            }
            MissionPhase::NoteAssignment => {
                self.do_note_assignment(run).await?;
                run.phase.transition_to(MissionPhase::Writing, None).await
            }
            MissionPhase::Writing => {
                self.do_writing(run).await?;
                run.phase.transition_to(MissionPhase::Finalization, None).await
            }
            MissionPhase::Finalization => {
                self.do_finalization(run).await?;
                self.set_status(run, MissionStatus::Completed).await;
                run.phase.transition_to(MissionPhase::Completed, None).await
            }
            MissionPhase::Completed | MissionPhase::Failed | MissionPhase::Stopped | MissionPhase::Paused => Ok(()),
        }?;
        self.emit_status(run, run.phase.current().await).await;
        Ok(())
    }

    async fn fail(&self, run: &MissionRun, from: MissionPhase, err: &MaestroError) {
        let _ = run.phase.transition_to(MissionPhase::Failed, Some(err.to_string())).await;
        self.set_status(run, MissionStatus::Failed).await;
        {
            let mut mission = run.mission.write().await;
            mission.execution_log.push(LogEntry {
                timestamp: chrono::Utc::now(),
                agent_name: "MissionController".to_string(),
                action: format!("phase {from:?}"),
                status: LogStatus::Failure,
                input_summary: String::new(),
                output_summary: String::new(),
                error_message: Some(err.to_string()),
                model_details: None,
                cost: None,
                tokens: None,
            });
        }
        self.emit_status(run, MissionPhase::Failed).await;
    }

    async fn set_status(&self, run: &MissionRun, status: MissionStatus) {
        run.mission.write().await.status = status;
    }

    async fn emit_status(&self, run: &MissionRun, phase: MissionPhase) {
        let mission_id = run.mission.read().await.id.clone();
        self.events.send_to_mission(&mission_id, EventKind::StatusUpdate, serde_json::json!({ "phase": format!("{phase:?}") }));
    }

    /// Generates the initial outline via the planning role, parsing its
    /// JSON response into a draft tree and assigning stable section ids,
    /// then runs it through the Outline Validator before it's stored.
    async fn do_planning(&self, run: &MissionRun) -> Result<()> {
        let (mission_id, user_request) = {
            let mission = run.mission.read().await;
            (mission.id.clone(), mission.user_request.clone())
        };
        let max_depth = self.resolver.get_int("max_total_depth", Some(&mission_id))?.max(1) as usize;

        let prompt = format!(
            "Produce a research report outline for the request below as JSON: \
             {{\"mission_goal\": string, \"report_outline\": [{{\"title\", \"description\", \
             \"research_strategy\": \"research_based\"|\"content_based\"|\"synthesize_from_subsections\"|\
             \"synthesize_from_other_sections\", \"subsections\": [...]}}]}}. \
             At least one section must use \"research_based\". Nest subsections up to depth {max_depth}.\n\n\
             Request:\n{user_request}"
        );
        let input = AgentInput::from_prompt(prompt);
        let output = self.dispatcher.dispatch(AgentRole::Planning, input).await?;
        let draft: PlanDraft = extract_first_json(&output.content)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .ok_or_else(|| MaestroError::internal("planning response did not contain a parseable outline"))?;

        let mut counter = 0usize;
        let outline: Vec<ReportSection> = draft.report_outline.into_iter().map(|d| draft_to_section(d, &mut counter)).collect();
        let (corrected, _report) = self.validator.validate_and_correct(&outline, true);

        let mut mission = run.mission.write().await;
        mission.plan = Some(Plan { mission_goal: draft.mission_goal, report_outline: corrected });
        Ok(())
    }

    /// First research pass: one search per `research_based` section found
    /// within `initial_research_max_depth`, capped at
    /// `initial_research_max_questions` sections total.
    async fn do_initial_exploration(&self, run: &MissionRun) -> Result<()> {
        let mission_id = run.mission.read().await.id.clone();
        let max_depth = self.resolver.get_int("initial_research_max_depth", Some(&mission_id))?.max(0) as usize;
        let max_questions = self.resolver.get_int("initial_research_max_questions", Some(&mission_id))?.max(0) as usize;

        let outline = run.mission.read().await.plan.clone().map(|p| p.report_outline).unwrap_or_default();
        let targets = research_based_sections_within_depth(&outline, max_depth, max_questions);
        self.research_sections(run, &targets, &mission_id).await
    }

    /// Structured research rounds: re-research every `research_based`
    /// section, then reflect on the outline and validate the result,
    /// repeated `structured_research_rounds` times.
    async fn do_structured_research(&self, run: &MissionRun) -> Result<()> {
        let mission_id = run.mission.read().await.id.clone();
        let rounds = self.resolver.get_int("structured_research_rounds", Some(&mission_id))?.max(0) as usize;

        for _ in 0..rounds {
            run.context.check_cancelled()?;
            let outline = run.mission.read().await.plan.clone().map(|p| p.report_outline).unwrap_or_default();
            let targets = research_based_sections_within_depth(&outline, usize::MAX, usize::MAX);
            self.research_sections(run, &targets, &mission_id).await?;
            self.run_reflection_and_validate(run, &mission_id).await?;
        }
        Ok(())
    }

    async fn do_replanning(&self, run: &MissionRun) -> Result<()> {
        let mission_id = run.mission.read().await.id.clone();
        self.run_reflection_and_validate(run, &mission_id).await
    }

    /// Redistributes any notes the research/reflection passes left
    /// unassigned; a no-op if every note already belongs to a section.
    async fn do_note_assignment(&self, run: &MissionRun) -> Result<()> {
        let mission_id = run.mission.read().await.id.clone();
        let unassigned = run.mission.read().await.unassigned_note_ids();
        if unassigned.is_empty() {
            return Ok(());
        }
        self.run_reflection_and_validate(run, &mission_id).await
    }

    async fn run_reflection_and_validate(&self, run: &MissionRun, mission_id: &str) -> Result<()> {
        run.context.check_cancelled()?;
        let (outline, notes, unassigned, goals) = {
            let mission = run.mission.read().await;
            let outline = mission.plan.as_ref().map(|p| p.report_outline.clone()).unwrap_or_default();
            let unassigned = mission.unassigned_note_ids();
            let goals = mission.goals.iter().map(|g| g.text.clone()).collect();
            (outline, mission.notes.clone(), unassigned, goals)
        };

        let revised = self
            .reflection
            .reflect(
                ReflectionInput { mission_id: mission_id.to_string(), outline, notes, unassigned_note_ids: unassigned, goals },
                &run.context,
            )
            .await?;
        let (corrected, _report) = self.validator.validate_and_correct(&revised, true);

        let mut mission = run.mission.write().await;
        if let Some(plan) = mission.plan.as_mut() {
            plan.report_outline = corrected;
        }
        Ok(())
    }

    /// Runs the search pipeline for every section in `targets`, both over
    /// the document collection and the web, attaching resulting notes to
    /// the section that asked for them.
    async fn research_sections(&self, run: &MissionRun, targets: &[ReportSection], mission_id: &str) -> Result<()> {
        let recent_messages: Vec<String> = Vec::new();
        for section in targets {
            run.context.check_cancelled()?;
            let question = if section.description.trim().is_empty() {
                section.title.clone()
            } else {
                format!("{}: {}", section.title, section.description)
            };

            for mode in [SearchMode::Document, SearchMode::Web] {
                let outcome = self.search_pipeline.run(mode, &question, &recent_messages, mission_id, &run.context).await?;
                if outcome.notes.is_empty() {
                    continue;
                }
                let mut mission = run.mission.write().await;
                let note_ids: Vec<String> = outcome.notes.iter().map(|n| n.note_id.clone()).collect();
                mission.notes.extend(outcome.notes);
                if let Some(plan) = mission.plan.as_mut() {
                    if let Some(target) = find_section_mut(&mut plan.report_outline, &section.section_id) {
                        target.associated_note_ids.extend(note_ids);
                    }
                }
            }
        }
        Ok(())
    }

    async fn do_writing(&self, run: &MissionRun) -> Result<()> {
        let (mission_id, outline, notes, goals_text, thoughts_text) = {
            let mission = run.mission.read().await;
            let outline = mission.plan.as_ref().map(|p| p.report_outline.clone()).unwrap_or_default();
            let goals_text = format_goals(&mission.goals);
            let thoughts_text = format_thoughts(&mission);
            (mission.id.clone(), outline, mission.notes.clone(), goals_text, thoughts_text)
        };

        let ctx = maestro_research::writing_manager::WritingContext {
            mission_id: &mission_id,
            outline: &outline,
            notes: &notes,
            goals_text: &goals_text,
            thoughts_text: &thoughts_text,
        };
        let written = self.writing.run(ctx, &run.context).await?;

        let mut mission = run.mission.write().await;
        mission.report_content = written;
        Ok(())
    }

    async fn do_finalization(&self, run: &MissionRun) -> Result<()> {
        let title = {
            let mission = run.mission.read().await;
            self.report.generate_title(&mission).await?
        };
        {
            let mut mission = run.mission.write().await;
            mission.metadata.insert("report_title".to_string(), serde_json::Value::String(title.clone()));
        }
        let rendered = {
            let mission = run.mission.read().await;
            self.report.render(&mission, Some(&title))
        };
        for placeholder in &rendered.unresolved_placeholders {
            tracing::warn!(placeholder = %placeholder, "citation placeholder left unresolved in final report");
        }
        let mut mission = run.mission.write().await;
        mission
            .metadata
            .insert("final_report".to_string(), serde_json::Value::String(rendered.text));
        Ok(())
    }
}

fn draft_to_section(draft: PlanSectionDraft, counter: &mut usize) -> ReportSection {
    *counter += 1;
    let section_id = format!("s{counter}");
    let mut section = ReportSection::new(section_id, draft.title);
    section.description = draft.description;
    section.research_strategy = match draft.research_strategy.as_deref() {
        Some("content_based") => ResearchStrategy::ContentBased,
        Some("synthesize_from_subsections") => ResearchStrategy::SynthesizeFromSubsections,
        Some("synthesize_from_other_sections") => ResearchStrategy::SynthesizeFromOtherSections,
        _ => ResearchStrategy::ResearchBased,
    };
    section.subsections = draft.subsections.into_iter().map(|d| draft_to_section(d, counter)).collect();
    section
}

fn research_based_sections_within_depth(outline: &[ReportSection], max_depth: usize, limit: usize) -> Vec<ReportSection> {
    let mut out = Vec::new();
    collect_research_based(outline, 0, max_depth, &mut out);
    out.truncate(limit);
    out
}

fn collect_research_based(sections: &[ReportSection], depth: usize, max_depth: usize, out: &mut Vec<ReportSection>) {
    if depth > max_depth {
        return;
    }
    for section in sections {
        if section.research_strategy == ResearchStrategy::ResearchBased {
            out.push(section.clone());
        }
        collect_research_based(&section.subsections, depth + 1, max_depth, out);
    }
}

fn find_section_mut<'a>(sections: &'a mut [ReportSection], target_id: &str) -> Option<&'a mut ReportSection> {
    for section in sections {
        if section.section_id == target_id {
            return Some(section);
        }
        if let Some(found) = find_section_mut(&mut section.subsections, target_id) {
            return Some(found);
        }
    }
    None
}

fn format_goals(goals: &[Goal]) -> String {
    if goals.is_empty() {
        return "No active goals.\n".to_string();
    }
    goals.iter().map(|g| format!("- {}\n", g.text)).collect()
}

fn format_thoughts(mission: &Mission) -> String {
    if mission.thoughts.is_empty() {
        return "No recent thoughts.\n".to_string();
    }
    mission.thoughts.recent().map(|t| format!("- ({}): {}\n", t.agent_name, t.text)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, title: &str, strategy: ResearchStrategy) -> ReportSection {
        let mut s = ReportSection::new(id, title);
        s.research_strategy = strategy;
        s
    }

    #[test]
    fn collects_research_based_sections_up_to_depth() {
        let mut root = section("s1", "Root", ResearchStrategy::ContentBased);
        let child = section("s1.1", "Child", ResearchStrategy::ResearchBased);
        root.subsections = vec![child];
        let outline = vec![root];

        let at_depth_zero = research_based_sections_within_depth(&outline, 0, 10);
        assert!(at_depth_zero.is_empty());

        let at_depth_one = research_based_sections_within_depth(&outline, 1, 10);
        assert_eq!(at_depth_one.len(), 1);
        assert_eq!(at_depth_one[0].section_id, "s1.1");
    }

    #[test]
    fn truncates_to_the_question_limit() {
        let outline = vec![
            section("a", "A", ResearchStrategy::ResearchBased),
            section("b", "B", ResearchStrategy::ResearchBased),
            section("c", "C", ResearchStrategy::ResearchBased),
        ];
        let limited = research_based_sections_within_depth(&outline, 0, 2);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn find_section_mut_locates_nested_section() {
        let mut root = section("s1", "Root", ResearchStrategy::ContentBased);
        root.subsections = vec![section("s1.1", "Child", ResearchStrategy::ResearchBased)];
        let mut outline = vec![root];
        let found = find_section_mut(&mut outline, "s1.1").unwrap();
        found.associated_note_ids.insert("n1".to_string());
        assert!(outline[0].subsections[0].associated_note_ids.contains("n1"));
    }

    #[test]
    fn draft_to_section_assigns_sequential_ids_and_maps_strategy() {
        let draft = PlanSectionDraft {
            title: "Intro".into(),
            description: String::new(),
            research_strategy: Some("synthesize_from_subsections".into()),
            subsections: vec![PlanSectionDraft { title: "Sub".into(), description: "d".into(), research_strategy: None, subsections: vec![] }],
        };
        let mut counter = 0;
        let section = draft_to_section(draft, &mut counter);
        assert_eq!(section.section_id, "s1");
        assert_eq!(section.research_strategy, ResearchStrategy::SynthesizeFromSubsections);
        assert_eq!(section.subsections[0].section_id, "s2");
        assert_eq!(section.subsections[0].research_strategy, ResearchStrategy::ResearchBased);
    }
}
