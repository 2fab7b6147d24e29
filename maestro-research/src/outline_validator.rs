//! Outline Validator (M3, spec §4.6). Ported algorithm-for-algorithm from
//! `outline_validator.py`'s `OutlineValidator`: six passes run in a fixed
//! order over a working copy of the outline — depth, duplicates, empty
//! sections, unique ids, strategy correction, references-section removal —
//! each pass recording issues (always) and corrections (only when
//! `auto_correct` is set).

use std::collections::HashSet;

use maestro_core::model::{ReportSection, ResearchStrategy};
use maestro_utils::similarity::title_similarity;

const INTRO_KEYWORDS: &[&str] = &[
    "introduction", "intro", "overview", "background", "preface", "prologue", "proclamation",
    "announcement", "declaration", "opening", "beginning", "commencement", "foreword", "preamble",
    "kickoff",
];

const CONCLUSION_KEYWORDS: &[&str] = &[
    "conclusion", "summary", "discussion", "future", "implications", "final", "closing",
    "epilogue", "farewell", "reflection", "wrap-up", "ending", "afterword", "retrospective",
    "outlook",
];

const REFERENCES_TERMS: &[&str] = &["references", "bibliography", "citations", "works cited"];

/// A single validation finding (spec §4.6, always recorded regardless of
/// `auto_correct`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    DepthExceeded { section_id: String, depth: usize },
    SubsectionsExceedDepth { section_id: String, subsection_count: usize },
    Duplicate { title: String, count: usize },
    EmptySection { section_id: String },
    DuplicateId { section_id: String },
    IncorrectStrategy { section_id: String, from: ResearchStrategy, to: ResearchStrategy },
    ReferencesSection { title: String },
}

/// A correction applied to the outline (only populated when `auto_correct`
/// is true).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    RemovedDeepSection { section_id: String },
    FlattenedSubsections { section_id: String, merged_count: usize },
    MergedDuplicates { primary_section: String, merged_count: usize },
    RemovedEmptySection { section_id: String },
    RenamedDuplicateId { old_id: String, new_id: String },
    StrategyCorrected { section_id: String, to: ResearchStrategy },
    ForcedResearchBased { section_id: String },
    RemovedReferences { title: String },
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub corrections: Vec<Correction>,
    pub max_depth_setting: usize,
    pub actual_max_depth: usize,
    pub total_sections: usize,
    pub duplicate_sections_found: usize,
    pub has_research_based: bool,
}

/// Validates and corrects a report outline's structure against
/// `max_depth` (spec §4.6; the invariant is mission-configurable via
/// `max_total_depth`, resolved by the caller).
pub struct OutlineValidator {
    max_depth: usize,
}

impl OutlineValidator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Run all six passes over `outline`, returning the corrected (or, if
    /// `auto_correct` is false, untouched-but-reported) outline alongside a
    /// report of everything found and fixed.
    pub fn validate_and_correct(
        &self,
        outline: &[ReportSection],
        auto_correct: bool,
    ) -> (Vec<ReportSection>, ValidationReport) {
        let mut issues = Vec::new();
        let mut corrections = Vec::new();

        let mut working = outline.to_vec();
        working = self.check_depth(working, auto_correct, 0, &mut issues, &mut corrections);
        working = self.check_duplicates(working, auto_correct, &mut issues, &mut corrections);
        working = check_empty_sections(working, auto_correct, &mut issues, &mut corrections);
        ensure_unique_ids(&mut working, auto_correct, &mut issues, &mut corrections);
        working = self.validate_and_correct_strategies(working, auto_correct, true, &mut issues, &mut corrections);
        working = remove_references_sections(working, auto_correct, &mut issues, &mut corrections);

        let duplicate_sections_found = issues
            .iter()
            .filter(|i| matches!(i, ValidationIssue::Duplicate { .. }))
            .count();
        let report = ValidationReport {
            valid: issues.is_empty(),
            actual_max_depth: calculate_max_depth(&working, 0),
            total_sections: count_sections(&working),
            has_research_based: has_research_based_section(&working),
            duplicate_sections_found,
            issues,
            corrections,
            max_depth_setting: self.max_depth,
        };
        (working, report)
    }

    /// Pass 1: sections at `current_depth >= max_depth` are dropped; a
    /// section whose subsections would exceed the limit has them flattened
    /// into its own description instead of being recursed into.
    fn check_depth(
        &self,
        outline: Vec<ReportSection>,
        auto_correct: bool,
        current_depth: usize,
        issues: &mut Vec<ValidationIssue>,
        corrections: &mut Vec<Correction>,
    ) -> Vec<ReportSection> {
        let mut kept = Vec::new();
        for mut section in outline {
            if current_depth >= self.max_depth {
                issues.push(ValidationIssue::DepthExceeded { section_id: section.section_id.clone(), depth: current_depth });
                if auto_correct {
                    corrections.push(Correction::RemovedDeepSection { section_id: section.section_id.clone() });
                    continue;
                }
            } else if !section.subsections.is_empty() {
                if current_depth + 1 < self.max_depth {
                    section.subsections = self.check_depth(section.subsections, auto_correct, current_depth + 1, issues, corrections);
                } else {
                    issues.push(ValidationIssue::SubsectionsExceedDepth {
                        section_id: section.section_id.clone(),
                        subsection_count: section.subsections.len(),
                    });
                    if auto_correct {
                        let merged_count = section.subsections.len();
                        let mut subtopics = String::new();
                        for sub in &section.subsections {
                            subtopics.push_str(&format!("- {}: {}\n", sub.title, sub.description));
                        }
                        if !subtopics.is_empty() {
                            section.description.push_str("\n\nKey subtopics to cover:\n");
                            section.description.push_str(subtopics.trim_end());
                        }
                        section.subsections.clear();
                        corrections.push(Correction::FlattenedSubsections { section_id: section.section_id.clone(), merged_count });
                    }
                }
            }
            kept.push(section);
        }
        kept
    }

    /// Pass 5: correct each section's `research_strategy` against the
    /// precedence chain spec §4.6 rule 5 draws, then ensure at least one
    /// section in the whole outline is `research_based`.
    fn validate_and_correct_strategies(
        &self,
        mut outline: Vec<ReportSection>,
        auto_correct: bool,
        is_top_level: bool,
        issues: &mut Vec<ValidationIssue>,
        corrections: &mut Vec<Correction>,
    ) -> Vec<ReportSection> {
        if outline.is_empty() {
            return outline;
        }

        let len = outline.len();
        let mut has_research_based = false;

        for (i, section) in outline.iter_mut().enumerate() {
            let title_lower = section.title.to_lowercase();
            let is_first = i == 0;
            let is_last = i == len - 1;
            let current = section.research_strategy;
            let has_subsections = !section.subsections.is_empty();

            let expected = if !is_top_level && current == ResearchStrategy::ContentBased {
                if has_subsections {
                    ResearchStrategy::SynthesizeFromSubsections
                } else {
                    has_research_based = true;
                    ResearchStrategy::ResearchBased
                }
            } else if is_top_level && current == ResearchStrategy::ContentBased && (is_first || is_last) {
                ResearchStrategy::ContentBased
            } else if has_subsections {
                ResearchStrategy::SynthesizeFromSubsections
            } else if is_first && current == ResearchStrategy::ResearchBased {
                if INTRO_KEYWORDS.iter().any(|k| title_lower.contains(k))
                    || section.section_id.to_lowercase().contains("intro")
                {
                    ResearchStrategy::ContentBased
                } else {
                    has_research_based = true;
                    ResearchStrategy::ResearchBased
                }
            } else if is_last && current == ResearchStrategy::ResearchBased {
                if CONCLUSION_KEYWORDS.iter().any(|k| title_lower.contains(k))
                    || ["conclusion", "summary", "final"].iter().any(|k| section.section_id.to_lowercase().contains(k))
                {
                    ResearchStrategy::ContentBased
                } else {
                    has_research_based = true;
                    ResearchStrategy::ResearchBased
                }
            } else if INTRO_KEYWORDS.iter().any(|k| title_lower.contains(k)) {
                ResearchStrategy::ContentBased
            } else if CONCLUSION_KEYWORDS.iter().any(|k| title_lower.contains(k)) {
                ResearchStrategy::ContentBased
            } else {
                has_research_based = true;
                ResearchStrategy::ResearchBased
            };

            if current != expected {
                issues.push(ValidationIssue::IncorrectStrategy { section_id: section.section_id.clone(), from: current, to: expected });
                if auto_correct {
                    section.research_strategy = expected;
                    corrections.push(Correction::StrategyCorrected { section_id: section.section_id.clone(), to: expected });
                }
            }

            if section.research_strategy == ResearchStrategy::ResearchBased {
                has_research_based = true;
            }

            if !section.subsections.is_empty() {
                let subs = std::mem::take(&mut section.subsections);
                section.subsections = self.validate_and_correct_strategies(subs, auto_correct, false, issues, corrections);
                if has_research_based_section(&section.subsections) {
                    has_research_based = true;
                }
            }
        }

        if !has_research_based && auto_correct {
            for section in outline.iter_mut() {
                let title_lower = section.title.to_lowercase();
                if section.subsections.is_empty()
                    && section.research_strategy != ResearchStrategy::ContentBased
                    && !["introduction", "conclusion", "summary", "discussion"].iter().any(|k| title_lower.contains(k))
                {
                    section.research_strategy = ResearchStrategy::ResearchBased;
                    corrections.push(Correction::ForcedResearchBased { section_id: section.section_id.clone() });
                    break;
                }
            }
        }

        outline
    }

    /// Pass 2: group sections whose normalized-title similarity exceeds
    /// 0.85 and merge everything but the first occurrence into it (spec
    /// §4.6 rule 2 / S4).
    fn check_duplicates(
        &self,
        mut outline: Vec<ReportSection>,
        auto_correct: bool,
        issues: &mut Vec<ValidationIssue>,
        corrections: &mut Vec<Correction>,
    ) -> Vec<ReportSection> {
        let mut flat_titles = Vec::new();
        collect_titles(&outline, &mut flat_titles);

        let mut processed = HashSet::new();
        let mut to_remove: HashSet<String> = HashSet::new();

        for i in 0..flat_titles.len() {
            if processed.contains(&i) {
                continue;
            }
            let mut group = vec![i];
            for j in (i + 1)..flat_titles.len() {
                if processed.contains(&j) {
                    continue;
                }
                if title_similarity(&flat_titles[i].1, &flat_titles[j].1) > 0.85 {
                    group.push(j);
                    processed.insert(j);
                }
            }
            if group.len() > 1 {
                processed.insert(i);
                let primary_id = flat_titles[group[0]].0.clone();
                let mut merged_descriptions = vec![find_section(&outline, &primary_id).map(|s| s.description.clone()).unwrap_or_default()];
                let mut merged_notes: HashSet<String> = find_section(&outline, &primary_id)
                    .map(|s| s.associated_note_ids.iter().cloned().collect())
                    .unwrap_or_default();

                issues.push(ValidationIssue::Duplicate { title: flat_titles[i].1.clone(), count: group.len() });

                for &idx in &group[1..] {
                    let dup_id = flat_titles[idx].0.clone();
                    if let Some(dup) = find_section(&outline, &dup_id) {
                        if !dup.description.is_empty() && !merged_descriptions.contains(&dup.description) {
                            merged_descriptions.push(dup.description.clone());
                        }
                        merged_notes.extend(dup.associated_note_ids.iter().cloned());
                    }
                    if auto_correct {
                        to_remove.insert(dup_id);
                    }
                }

                if auto_correct {
                    if let Some(primary) = find_section_mut(&mut outline, &primary_id) {
                        if merged_descriptions.len() > 1 {
                            primary.description = merged_descriptions.join("\n\n");
                        }
                        primary.associated_note_ids = merged_notes;
                    }
                    corrections.push(Correction::MergedDuplicates { primary_section: primary_id, merged_count: group.len() - 1 });
                }
            }
        }

        if auto_correct && !to_remove.is_empty() {
            remove_sections_by_id(outline, &to_remove)
        } else {
            outline
        }
    }
}

fn collect_titles(outline: &[ReportSection], out: &mut Vec<(String, String)>) {
    for section in outline {
        out.push((section.section_id.clone(), section.title.clone()));
        collect_titles(&section.subsections, out);
    }
}

fn find_section<'a>(outline: &'a [ReportSection], id: &str) -> Option<&'a ReportSection> {
    for section in outline {
        if section.section_id == id {
            return Some(section);
        }
        if let Some(found) = find_section(&section.subsections, id) {
            return Some(found);
        }
    }
    None
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

fn remove_sections_by_id(outline: Vec<ReportSection>, ids: &HashSet<String>) -> Vec<ReportSection> {
    outline
        .into_iter()
        .filter_map(|mut section| {
            if ids.contains(&section.section_id) {
                None
            } else {
                section.subsections = remove_sections_by_id(section.subsections, ids);
                Some(section)
            }
        })
        .collect()
}

/// Pass 3: a section is empty if its title is blank, or its description is
/// blank and it has no subsections; empty sections are dropped without
/// recursing into them.
fn check_empty_sections(
    outline: Vec<ReportSection>,
    auto_correct: bool,
    issues: &mut Vec<ValidationIssue>,
    corrections: &mut Vec<Correction>,
) -> Vec<ReportSection> {
    let mut kept = Vec::new();
    for mut section in outline {
        let is_empty = section.title.trim().is_empty()
            || (section.description.trim().is_empty() && section.subsections.is_empty());

        if is_empty {
            issues.push(ValidationIssue::EmptySection { section_id: section.section_id.clone() });
            if auto_correct {
                corrections.push(Correction::RemovedEmptySection { section_id: section.section_id.clone() });
                continue;
            }
        }
        if !section.subsections.is_empty() {
            section.subsections = check_empty_sections(section.subsections, auto_correct, issues, corrections);
        }
        kept.push(section);
    }
    kept
}

/// Pass 4: walk the outline depth-first, renaming any section id already
/// seen to `{base_id}_v{n}`.
fn ensure_unique_ids(
    outline: &mut [ReportSection],
    auto_correct: bool,
    issues: &mut Vec<ValidationIssue>,
    corrections: &mut Vec<Correction>,
) {
    let mut seen = HashSet::new();
    let mut counters: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    fn walk(
        sections: &mut [ReportSection],
        seen: &mut HashSet<String>,
        counters: &mut std::collections::HashMap<String, u32>,
        auto_correct: bool,
        issues: &mut Vec<ValidationIssue>,
        corrections: &mut Vec<Correction>,
    ) {
        for section in sections.iter_mut() {
            if seen.contains(&section.section_id) {
                issues.push(ValidationIssue::DuplicateId { section_id: section.section_id.clone() });
                if auto_correct {
                    let base_id = section.section_id.clone();
                    let counter = counters.entry(base_id.clone()).or_insert(0);
                    *counter += 1;
                    let new_id = format!("{base_id}_v{counter}");
                    corrections.push(Correction::RenamedDuplicateId { old_id: base_id, new_id: new_id.clone() });
                    section.section_id = new_id;
                }
            }
            seen.insert(section.section_id.clone());
            walk(&mut section.subsections, seen, counters, auto_correct, issues, corrections);
        }
    }
    walk(outline, &mut seen, &mut counters, auto_correct, issues, corrections);
}

/// Pass 6: drop References/Bibliography/Citations/Works Cited sections
/// (they're auto-generated by the Report Generator). The dry-run path only
/// inspects top-level sections; the auto-correct path recurses into every
/// depth. This asymmetry exists in the ported original and is preserved
/// deliberately rather than "fixed".
fn remove_references_sections(
    outline: Vec<ReportSection>,
    auto_correct: bool,
    issues: &mut Vec<ValidationIssue>,
    corrections: &mut Vec<Correction>,
) -> Vec<ReportSection> {
    if !auto_correct {
        for section in &outline {
            let title_lower = section.title.to_lowercase();
            if REFERENCES_TERMS.iter().any(|t| title_lower.contains(t)) {
                issues.push(ValidationIssue::ReferencesSection { title: section.title.clone() });
            }
        }
        return outline;
    }

    outline
        .into_iter()
        .filter_map(|mut section| {
            let title_lower = section.title.to_lowercase();
            if REFERENCES_TERMS.iter().any(|t| title_lower.contains(t)) {
                corrections.push(Correction::RemovedReferences { title: section.title.clone() });
                None
            } else {
                section.subsections = remove_references_sections(section.subsections, auto_correct, issues, corrections);
                Some(section)
            }
        })
        .collect()
}

fn calculate_max_depth(outline: &[ReportSection], current_depth: usize) -> usize {
    let mut max_depth = current_depth;
    for section in outline {
        if !section.subsections.is_empty() {
            max_depth = max_depth.max(calculate_max_depth(&section.subsections, current_depth + 1));
        }
    }
    max_depth
}

fn count_sections(outline: &[ReportSection]) -> usize {
    outline.len() + outline.iter().map(|s| count_sections(&s.subsections)).sum::<usize>()
}

fn has_research_based_section(outline: &[ReportSection]) -> bool {
    outline.iter().any(|s| {
        s.research_strategy == ResearchStrategy::ResearchBased || has_research_based_section(&s.subsections)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, title: &str) -> ReportSection {
        let mut s = ReportSection::new(id, title);
        s.description = format!("{title} description");
        s
    }

    #[test]
    fn depth_flattening_s3() {
        // A -> B -> C -> D, max_depth = 2: recursion stops one level before
        // the limit and flattens rather than drops.
        let mut c = section("c", "C");
        c.subsections = vec![section("d", "D")];
        let mut b = section("b", "B");
        b.subsections = vec![c];
        let mut a = section("a", "A");
        a.subsections = vec![b];

        let validator = OutlineValidator::new(2);
        let (corrected, report) = validator.validate_and_correct(&[a], true);

        assert_eq!(corrected.len(), 1);
        let a = &corrected[0];
        assert_eq!(a.subsections.len(), 1);
        let b = &a.subsections[0];
        assert!(b.subsections.is_empty(), "B's subsections should have been flattened away");
        assert!(b.description.contains("Key subtopics to cover"));
        assert!(b.description.contains("C"));
        assert!(report.corrections.iter().any(|c| matches!(c, Correction::FlattenedSubsections { .. })));
    }

    #[test]
    fn duplicate_titles_merge_s4() {
        let mut a = section("a", "History of Renewable Energy");
        a.research_strategy = ResearchStrategy::ResearchBased;
        let mut b = section("b", "history-of-renewable energy");
        b.research_strategy = ResearchStrategy::ResearchBased;
        b.associated_note_ids.insert("n1".into());

        let validator = OutlineValidator::new(2);
        let (corrected, report) = validator.validate_and_correct(&[a, b], true);

        assert_eq!(corrected.len(), 1);
        assert!(corrected[0].description.contains("description"));
        assert!(corrected[0].associated_note_ids.contains("n1"));
        assert_eq!(report.duplicate_sections_found, 1);
    }

    #[test]
    fn empty_sections_are_dropped() {
        let mut empty = section("e", "Empty");
        empty.description.clear();
        let real = section("r", "Real Section");

        let validator = OutlineValidator::new(2);
        let (corrected, _) = validator.validate_and_correct(&[empty, real], true);
        assert_eq!(corrected.len(), 1);
        assert_eq!(corrected[0].section_id, "r");
    }

    #[test]
    fn duplicate_ids_get_suffixed() {
        let mut outline = vec![section("x", "First"), section("x", "Second")];
        outline[1].research_strategy = ResearchStrategy::ResearchBased;

        let validator = OutlineValidator::new(2);
        let (corrected, report) = validator.validate_and_correct(&outline, true);
        assert_eq!(corrected[1].section_id, "x_v1");
        assert!(report.issues.iter().any(|i| matches!(i, ValidationIssue::DuplicateId { .. })));
    }

    #[test]
    fn first_and_last_keyword_sections_become_content_based() {
        let intro = section("intro", "Introduction");
        let middle = section("mid", "Main Analysis");
        let conclusion = section("concl", "Conclusion");

        let validator = OutlineValidator::new(2);
        let (corrected, _) = validator.validate_and_correct(&[intro, middle, conclusion], true);

        assert_eq!(corrected[0].research_strategy, ResearchStrategy::ContentBased);
        assert_eq!(corrected[1].research_strategy, ResearchStrategy::ResearchBased);
        assert_eq!(corrected[2].research_strategy, ResearchStrategy::ContentBased);
    }

    #[test]
    fn sections_with_subsections_synthesize() {
        let mut parent = section("p", "Main Topic");
        parent.subsections = vec![section("c1", "Child One")];

        let validator = OutlineValidator::new(3);
        let (corrected, _) = validator.validate_and_correct(&[parent], true);
        assert_eq!(corrected[0].research_strategy, ResearchStrategy::SynthesizeFromSubsections);
    }

    #[test]
    fn at_least_one_research_based_is_forced() {
        let mut a = section("a", "Introduction");
        a.research_strategy = ResearchStrategy::ContentBased;
        let mut b = section("b", "Conclusion");
        b.research_strategy = ResearchStrategy::ContentBased;

        let validator = OutlineValidator::new(2);
        let (corrected, report) = validator.validate_and_correct(&[a, b], true);
        assert!(corrected.iter().any(|s| s.research_strategy == ResearchStrategy::ResearchBased));
        assert!(report.corrections.iter().any(|c| matches!(c, Correction::ForcedResearchBased { .. })));
    }

    #[test]
    fn references_section_removed_on_auto_correct_at_any_depth() {
        let mut parent = section("p", "Body");
        parent.subsections = vec![section("refs", "References")];
        let validator = OutlineValidator::new(3);
        let (corrected, _) = validator.validate_and_correct(&[parent], true);
        assert!(corrected[0].subsections.is_empty());
    }

    #[test]
    fn references_section_dry_run_only_inspects_top_level() {
        let mut parent = section("p", "Body");
        parent.subsections = vec![section("refs", "References")];
        let validator = OutlineValidator::new(3);
        let (corrected, report) = validator.validate_and_correct(&[parent], false);
        // dry run never mutates...
        assert_eq!(corrected[0].subsections.len(), 1);
        // ...and only top-level titles are checked, so the nested References
        // section produces no issue.
        assert!(!report.issues.iter().any(|i| matches!(i, ValidationIssue::ReferencesSection { .. })));
    }
}
