//! Module Grouper: stage 2. Partitions the skill list into named modules and
//! reports how well the partition covers the input.
//!
//! The model is asked to place every skill in exactly one module, but nothing
//! forces it to. `check_coverage` compares input and output as multisets
//! (trimmed, case-insensitive) and the caller decides what a mismatch means.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::course::errors::{PipelineError, Stage};
use crate::course::models::{Module, SkillItem};
use crate::course::prompts::{
    GROUPING_INSTRUCTION, GROUPING_OUTPUT_DESC, GROUPING_OUTPUT_NAME, GROUPING_OUTPUT_SHAPE,
    GROUPING_SKILLS_DESC,
};
use crate::llm_client::{CompletionBackend, StructuredCall, StructuredOutput};

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleGroupingResult {
    pub modules: Vec<Module>,
}

impl StructuredOutput for ModuleGroupingResult {
    fn validate(&self) -> Result<(), String> {
        for module in &self.modules {
            if module.skills.iter().any(|s| s.trim().is_empty()) {
                return Err(format!("module '{}' has a blank skill", module.name));
            }
        }
        Ok(())
    }
}

/// What the pipeline does when grouping does not account for every skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoveragePolicy {
    /// Log the mismatch and continue with the modules as grouped.
    #[default]
    Warn,
    /// Fail the pipeline with `PipelineError::CoverageMismatch`.
    Reject,
}

/// Differences between the input skill list and the grouped modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Input skills that no module contains (one entry per missing occurrence).
    pub missing: Vec<SkillItem>,
    /// Skills placed more often than they appear in the input.
    pub duplicated: Vec<SkillItem>,
    /// Module skills that are not in the input at all.
    pub unexpected: Vec<SkillItem>,
    pub empty_module_names: usize,
    pub duplicate_module_names: Vec<String>,
}

impl CoverageReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.duplicated.is_empty()
            && self.unexpected.is_empty()
            && self.empty_module_names == 0
            && self.duplicate_module_names.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("all skills covered exactly once");
        }
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing {:?}", self.missing));
        }
        if !self.duplicated.is_empty() {
            parts.push(format!("duplicated {:?}", self.duplicated));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected {:?}", self.unexpected));
        }
        if self.empty_module_names > 0 {
            parts.push(format!("{} unnamed module(s)", self.empty_module_names));
        }
        if !self.duplicate_module_names.is_empty() {
            parts.push(format!(
                "duplicate module names {:?}",
                self.duplicate_module_names
            ));
        }
        f.write_str(&parts.join("; "))
    }
}

/// Modules as grouped, plus how they cover the input.
#[derive(Debug, Clone)]
pub struct Grouping {
    pub modules: Vec<Module>,
    pub coverage: CoverageReport,
}

/// Groups `skills` into modules with one structured call.
///
/// An empty skill list yields no modules and makes no call.
pub async fn group_into_modules(
    llm: &dyn CompletionBackend,
    skills: &[SkillItem],
) -> Result<Grouping, PipelineError> {
    if skills.is_empty() {
        return Ok(Grouping {
            modules: Vec::new(),
            coverage: CoverageReport::default(),
        });
    }

    let result: ModuleGroupingResult = StructuredCall::new(
        GROUPING_INSTRUCTION,
        GROUPING_OUTPUT_NAME,
        GROUPING_OUTPUT_DESC,
        GROUPING_OUTPUT_SHAPE,
    )
    .input("knowledge_skills_list", GROUPING_SKILLS_DESC, skills.to_vec())
    .invoke(llm)
    .await
    .map_err(PipelineError::llm(Stage::ModuleGrouping))?;

    let coverage = check_coverage(skills, &result.modules);
    Ok(Grouping {
        modules: result.modules,
        coverage,
    })
}

fn normalize(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// Compares the input skills against the grouped modules.
pub fn check_coverage(skills: &[SkillItem], modules: &[Module]) -> CoverageReport {
    // normalized skill -> (first spelling seen, expected count, placed count)
    let mut counts: BTreeMap<String, (&str, usize, usize)> = BTreeMap::new();
    for skill in skills {
        counts.entry(normalize(skill)).or_insert((skill.as_str(), 0, 0)).1 += 1;
    }

    let mut report = CoverageReport::default();
    for skill in modules.iter().flat_map(|m| m.skills.iter()) {
        match counts.get_mut(&normalize(skill)) {
            Some(entry) => entry.2 += 1,
            None => report.unexpected.push(skill.clone()),
        }
    }

    for (spelling, expected, placed) in counts.values() {
        if placed < expected {
            report
                .missing
                .extend(std::iter::repeat(spelling.to_string()).take(expected - placed));
        } else if placed > expected {
            report
                .duplicated
                .extend(std::iter::repeat(spelling.to_string()).take(placed - expected));
        }
    }

    let mut seen_names = HashSet::new();
    for module in modules {
        let name = module.name.trim();
        if name.is_empty() {
            report.empty_module_names += 1;
        } else if !seen_names.insert(name.to_lowercase())
            && !report
                .duplicate_module_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name))
        {
            report.duplicate_module_names.push(name.to_string());
        }
    }

    report
}
