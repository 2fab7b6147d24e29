//! `run-research`: wires the full dependency graph (Settings Resolver,
//! Model Dispatcher, Tool Registry, Event Bus, the M1-M4/H1 collaborators)
//! into a `MissionController`, then drives one mission per question to
//! completion, writing a rendered report under `--output-dir` for each.
//!
//! `--input-file` holds one question per line (grounded on
//! `main_cli.py::run_research`'s `[line.strip() for line in f if
//! line.strip()]`), not a single combined document — multiple lines run as
//! multiple independent missions against the same dependency graph.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use maestro_controller::{MissionController, MissionRun, TaskManager};
use maestro_core::model::{Mission, MissionStatus};
use maestro_events::EventBus;
use maestro_report::ReportGenerator;
use maestro_research::{IterativeSearchPipeline, OutlineValidator, ReflectionManager, WritingManager};

use crate::cli::{Commands, OutputFormat};
use crate::runtime::{build_dispatcher, build_pool, build_resolver, build_tool_registry};

pub async fn run(command: Commands, config_path: Option<&Path>) -> Result<bool> {
    let Commands::RunResearch {
        question,
        input_file,
        output_dir,
        db_url,
        use_local_rag,
        use_web_search,
        output_formats,
        writing_passes,
    } = command
    else {
        unreachable!("commands::mod only dispatches RunResearch here");
    };

    let questions = read_questions(question, input_file.as_deref())?;

    let resolver = build_resolver(config_path)?;
    let dispatcher = build_dispatcher(resolver.clone())?;
    let events = Arc::new(EventBus::new());

    let pool = match (&db_url, use_local_rag) {
        (Some(url), true) => Some(build_pool(url)?),
        _ => None,
    };
    let tools = build_tool_registry(dispatcher.clone(), &resolver, events.clone(), pool, use_web_search)?;

    let max_depth = resolver.get_int("max_total_depth", None)?.max(1) as usize;
    let search_pipeline = Arc::new(IterativeSearchPipeline::new(dispatcher.clone(), resolver.clone(), tools));
    let reflection = Arc::new(ReflectionManager::new(dispatcher.clone(), resolver.clone()));
    let validator = Arc::new(OutlineValidator::new(max_depth));
    let writing = Arc::new(WritingManager::new(dispatcher.clone(), resolver.clone()));
    let report = Arc::new(ReportGenerator::new(dispatcher.clone()));

    std::fs::create_dir_all(&output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let mut all_succeeded = true;
    for user_request in questions {
        let tasks = Arc::new(TaskManager::new());
        let mission_id = format!("mission-{}", uuid::Uuid::new_v4());
        if let Some(passes) = writing_passes {
            resolver.set_mission_settings(mission_id.clone(), serde_json::json!({ "writing_passes": passes }));
        }

        let controller = MissionController::new(
            dispatcher.clone(),
            resolver.clone(),
            events.clone(),
            tasks,
            search_pipeline.clone(),
            reflection.clone(),
            validator.clone(),
            writing.clone(),
            report.clone(),
        );

        let mission = Mission::new(mission_id.clone(), user_request);
        let run = MissionRun::new(mission);
        controller.run(&run).await?;

        let final_mission = run.mission.read().await;
        let succeeded = matches!(final_mission.status, MissionStatus::Completed);
        all_succeeded &= succeeded;

        let report_text = final_mission.metadata.get("final_report").and_then(|v| v.as_str()).unwrap_or_default();
        let title = final_mission.metadata.get("report_title").and_then(|v| v.as_str()).unwrap_or("report");
        write_report(&output_dir, title, report_text, &output_formats)?;

        if !succeeded {
            eprintln!("mission {mission_id} ended as {:?}", final_mission.status);
        }
    }

    Ok(all_succeeded)
}

fn read_questions(question: Option<String>, input_file: Option<&Path>) -> Result<Vec<String>> {
    match (question, input_file) {
        (Some(q), _) => Ok(vec![q]),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let questions: Vec<String> = text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
            if questions.is_empty() {
                anyhow::bail!("input file '{}' is empty or contains no valid questions", path.display());
            }
            Ok(questions)
        }
        (None, None) => anyhow::bail!("run-research requires --question or --input-file"),
    }
}

/// PDF/DOCX rendering is a front-end concern out of scope per spec §1; the
/// `all`/`pdf`/`docx` variants write the same markdown text under the
/// requested extension rather than fabricating a rendering dependency.
fn write_report(output_dir: &Path, title: &str, text: &str, formats: &[OutputFormat]) -> Result<()> {
    let slug = slugify(title);
    let mut expanded: Vec<OutputFormat> = Vec::new();
    for format in formats {
        match format {
            OutputFormat::All => {
                expanded.extend([OutputFormat::Markdown, OutputFormat::Pdf, OutputFormat::Docx]);
            }
            other => expanded.push(*other),
        }
    }
    expanded.sort_by_key(format_rank);
    expanded.dedup_by_key(|f| format_rank(f));

    for format in expanded {
        let extension = match format {
            OutputFormat::Markdown => "md",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::All => unreachable!("expanded above"),
        };
        let path: PathBuf = output_dir.join(format!("{slug}.{extension}"));
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn format_rank(format: &OutputFormat) -> u8 {
    match format {
        OutputFormat::Markdown => 0,
        OutputFormat::Pdf => 1,
        OutputFormat::Docx => 2,
        OutputFormat::All => 3,
    }
}

fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let collapsed = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if collapsed.is_empty() {
        "report".to_string()
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_question_is_one_item() {
        let questions = read_questions(Some("what is rust".to_string()), None).unwrap();
        assert_eq!(questions, vec!["what is rust".to_string()]);
    }

    #[test]
    fn neither_question_nor_file_is_an_error() {
        assert!(read_questions(None, None).is_err());
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Rust: A Systems Language!"), "rust-a-systems-language");
        assert_eq!(slugify(""), "report");
    }

    #[test]
    fn format_all_expands_to_every_variant() {
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), "Title", "body", &[OutputFormat::All]).unwrap();
        assert!(dir.path().join("title.md").exists());
        assert!(dir.path().join("title.pdf").exists());
        assert!(dir.path().join("title.docx").exists());
    }
}
