//! Content Generator: stage 3 for a single skill.
//!
//! `SkillContentGenerator` is the seam the orchestrator fans out over.
//! `LlmContentGenerator` is the production implementation; tests swap in stubs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::course::models::{BlockDraft, ContentBlock};
use crate::course::prompts::{
    CONTENT_INSTRUCTION, CONTENT_MODULE_DESC, CONTENT_OUTPUT_DESC, CONTENT_OUTPUT_NAME,
    CONTENT_OUTPUT_SHAPE, CONTENT_SKILL_DESC,
};
use crate::llm_client::{CompletionBackend, LlmError, StructuredCall};

/// Produces content blocks for one skill of one module.
///
/// Zero blocks is a valid result. A failure must be returned as `Err`, never
/// folded into an empty list.
#[async_trait]
pub trait SkillContentGenerator: Send + Sync {
    async fn generate(&self, module_name: &str, skill: &str) -> Result<Vec<ContentBlock>, LlmError>;
}

/// One structured call per skill against the configured LLM backend.
#[derive(Clone)]
pub struct LlmContentGenerator {
    llm: Arc<dyn CompletionBackend>,
}

impl LlmContentGenerator {
    pub fn new(llm: Arc<dyn CompletionBackend>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SkillContentGenerator for LlmContentGenerator {
    async fn generate(&self, module_name: &str, skill: &str) -> Result<Vec<ContentBlock>, LlmError> {
        let drafts: Vec<BlockDraft> = StructuredCall::new(
            CONTENT_INSTRUCTION,
            CONTENT_OUTPUT_NAME,
            CONTENT_OUTPUT_DESC,
            CONTENT_OUTPUT_SHAPE,
        )
        .input("module_name", CONTENT_MODULE_DESC, module_name)
        .input("skill_item", CONTENT_SKILL_DESC, skill)
        .invoke(self.llm.as_ref())
        .await?;

        Ok(drafts.into_iter().map(BlockDraft::into_block).collect())
    }
}
