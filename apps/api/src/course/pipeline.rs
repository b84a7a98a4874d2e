//! Course generation pipeline: gap analysis → module grouping → content.
//!
//! Stages run strictly one after another. This is the caller-facing layer:
//! it owns stage-level logging and applies the coverage policy; the stages
//! themselves only return values or errors.

use std::sync::Arc;

use tracing::{info, warn};

use crate::course::content_generator::{LlmContentGenerator, SkillContentGenerator};
use crate::course::errors::PipelineError;
use crate::course::gap_analyzer::analyze_knowledge_gap;
use crate::course::models::{CourseContentResult, CoursePrompt, Module, SkillItem};
use crate::course::module_grouper::{group_into_modules, CoverageReport, CoveragePolicy};
use crate::course::orchestrator::{CourseContentOrchestrator, OrchestratorSettings};
use crate::llm_client::CompletionBackend;

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub orchestrator: OrchestratorSettings,
    pub coverage_policy: CoveragePolicy,
}

/// Everything the three stages produced for one course.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub skills: Vec<SkillItem>,
    pub modules: Vec<Module>,
    pub coverage: CoverageReport,
    pub content: CourseContentResult,
}

#[derive(Clone)]
pub struct CoursePipeline {
    llm: Arc<dyn CompletionBackend>,
    generator: Arc<dyn SkillContentGenerator>,
    settings: PipelineSettings,
}

impl CoursePipeline {
    pub fn new(llm: Arc<dyn CompletionBackend>, settings: PipelineSettings) -> Self {
        let generator = Arc::new(LlmContentGenerator::new(Arc::clone(&llm)));
        Self {
            llm,
            generator,
            settings,
        }
    }

    /// Replaces the stage-3 generator.
    #[cfg(test)]
    pub fn with_generator(mut self, generator: Arc<dyn SkillContentGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub async fn run(&self, prompt: &CoursePrompt) -> Result<PipelineOutput, PipelineError> {
        info!("Starting course generation for: {}", prompt.title);

        info!("Step 1: Analyzing knowledge gap");
        let skills =
            analyze_knowledge_gap(self.llm.as_ref(), &prompt.starting_point, &prompt.finish_line)
                .await?;
        info!("Found {} skills", skills.len());

        info!("Step 2: Grouping skills into modules");
        let grouping = group_into_modules(self.llm.as_ref(), &skills).await?;
        info!("Created {} modules", grouping.modules.len());

        // No modules for a non-empty skill list leaves nothing to generate.
        if grouping.modules.is_empty() && !skills.is_empty() {
            return Err(PipelineError::CoverageMismatch(grouping.coverage));
        }
        if !grouping.coverage.is_clean() {
            match self.settings.coverage_policy {
                CoveragePolicy::Warn => {
                    warn!("Module grouping does not cover the skill list: {}", grouping.coverage)
                }
                CoveragePolicy::Reject => {
                    return Err(PipelineError::CoverageMismatch(grouping.coverage))
                }
            }
        }

        info!("Step 3: Generating content for modules");
        let orchestrator = CourseContentOrchestrator::new(
            Arc::clone(&self.generator),
            self.settings.orchestrator.clone(),
        );
        let content = orchestrator.generate(&grouping.modules).await?;

        for failure in content.failed_skills() {
            warn!("No content for skill '{}': {}", failure.skill, failure.error);
        }
        info!(
            "Generated {} content blocks across {} modules",
            content.total_blocks(),
            content.modules.len()
        );

        Ok(PipelineOutput {
            skills,
            modules: grouping.modules,
            coverage: grouping.coverage,
            content,
        })
    }
}
