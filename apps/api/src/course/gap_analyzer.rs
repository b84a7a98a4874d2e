//! Gap Analyzer: stage 1. Lists the skills between where a learner starts and
//! where the course should leave them.

use serde::Deserialize;

use crate::course::errors::{PipelineError, Stage};
use crate::course::models::SkillItem;
use crate::course::prompts::{
    GAP_FINISH_LINE_DESC, GAP_INSTRUCTION, GAP_OUTPUT_DESC, GAP_OUTPUT_NAME, GAP_OUTPUT_SHAPE,
    GAP_STARTING_POINT_DESC,
};
use crate::llm_client::{CompletionBackend, StructuredCall, StructuredOutput};

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeGapResult {
    pub knowledge_skills_list: Vec<SkillItem>,
}

impl StructuredOutput for KnowledgeGapResult {
    fn validate(&self) -> Result<(), String> {
        match self
            .knowledge_skills_list
            .iter()
            .position(|s| s.trim().is_empty())
        {
            Some(i) => Err(format!("skill {i} is blank")),
            None => Ok(()),
        }
    }
}

/// Runs one structured call and returns the skill list in the model's order.
///
/// An empty list is a valid answer (no gap found), not an error.
pub async fn analyze_knowledge_gap(
    llm: &dyn CompletionBackend,
    starting_point: &str,
    finish_line: &str,
) -> Result<Vec<SkillItem>, PipelineError> {
    if starting_point.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "starting point description cannot be empty".to_string(),
        ));
    }
    if finish_line.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "finish line description cannot be empty".to_string(),
        ));
    }

    let result: KnowledgeGapResult =
        StructuredCall::new(GAP_INSTRUCTION, GAP_OUTPUT_NAME, GAP_OUTPUT_DESC, GAP_OUTPUT_SHAPE)
            .input("starting_point_description", GAP_STARTING_POINT_DESC, starting_point)
            .input("finish_line_description", GAP_FINISH_LINE_DESC, finish_line)
            .invoke(llm)
            .await
            .map_err(PipelineError::llm(Stage::GapAnalysis))?;

    Ok(result.knowledge_skills_list)
}
