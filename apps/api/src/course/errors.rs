use std::fmt;

use thiserror::Error;

use crate::course::models::{SkillFailure, SkillItem};
use crate::course::module_grouper::CoverageReport;
use crate::llm_client::LlmError;

/// Which single-call stage a structured call belonged to. Content calls fail
/// per skill and are reported through `SkillFailure` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GapAnalysis,
    ModuleGrouping,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::GapAnalysis => "Knowledge gap analysis",
            Stage::ModuleGrouping => "Module grouping",
        };
        f.write_str(name)
    }
}

/// Everything the generation pipeline can fail with. Nothing is recovered
/// inside the pipeline; all of these reach the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{stage} failed: {source}")]
    Llm {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("Module grouping does not cover the skill list: {0}")]
    CoverageMismatch(CoverageReport),

    /// One or more skill calls failed under the fail-fast policy.
    #[error(
        "Content generation failed in module '{module_name}': {}",
        describe_failures(.failed)
    )]
    PartialBatchFailure {
        module_name: String,
        failed: Vec<SkillFailure>,
        succeeded: Vec<SkillItem>,
        /// Aborted before they finished.
        cancelled: Vec<SkillItem>,
    },
}

impl PipelineError {
    pub fn llm(stage: Stage) -> impl FnOnce(LlmError) -> PipelineError {
        move |source| PipelineError::Llm { stage, source }
    }
}

fn describe_failures(failed: &[SkillFailure]) -> String {
    failed
        .iter()
        .map(|f| format!("'{}' ({})", f.skill, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}
