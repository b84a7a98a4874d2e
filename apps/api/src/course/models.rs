//! Value types that flow between the three generation stages.
//!
//! Each value is produced by one stage and handed by value to the next; none
//! is shared or mutated across stages afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm_client::{LlmError, StructuredOutput};

/// One unit of knowledge or skill. Free text, no enforced structure.
pub type SkillItem = String;

/// The course description a generation request starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePrompt {
    pub title: String,
    pub topics: String,
    pub description: String,
    pub starting_point: String,
    pub finish_line: String,
}

/// A named group of skills produced by the module grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "module_name", alias = "name")]
    pub name: String,
    pub skills: Vec<SkillItem>,
}

// ────────────────────────────────────────────────────────────────────────────
// Content blocks
// ────────────────────────────────────────────────────────────────────────────

/// Variant-specific payload of a content block, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockKind {
    Text {
        body: String,
    },
    Question {
        question_text: String,
        options: Vec<String>,
        correct_answer: String,
        /// Unset until a learner answers.
        #[serde(default)]
        user_answer: Option<String>,
    },
}

/// A generated content block with its metadata.
///
/// `id` and `module_id` are placeholders here; the HTTP layer reassigns them
/// positionally when it serializes a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: u32,
    pub title: String,
    pub is_complete: bool,
    pub module_id: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The skill this block was generated for. Stamped by the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_skill: Option<SkillItem>,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl ContentBlock {
    fn stamped(title: String, kind: BlockKind) -> Self {
        let now = Utc::now();
        Self {
            id: 1,
            title,
            is_complete: false,
            module_id: 1,
            created_at: now,
            updated_at: now,
            source_skill: None,
            kind,
        }
    }

    pub fn text(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::stamped(title.into(), BlockKind::Text { body: body.into() })
    }

    pub fn question(
        title: impl Into<String>,
        question_text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self::stamped(
            title.into(),
            BlockKind::Question {
                question_text: question_text.into(),
                options,
                correct_answer: correct_answer.into(),
                user_answer: None,
            },
        )
    }

    /// `"Text"` or `"Question"`, matching the serialized tag.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            BlockKind::Text { .. } => "Text",
            BlockKind::Question { .. } => "Question",
        }
    }
}

/// A content block exactly as the model emits it, before metadata is stamped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum BlockDraft {
    Text {
        title: String,
        body: String,
    },
    Question {
        title: String,
        #[serde(alias = "questionText")]
        question_text: String,
        options: Vec<String>,
        #[serde(alias = "correctAnswer")]
        correct_answer: String,
    },
}

impl BlockDraft {
    pub fn into_block(self) -> ContentBlock {
        match self {
            BlockDraft::Text { title, body } => ContentBlock::text(title, body),
            BlockDraft::Question {
                title,
                question_text,
                options,
                correct_answer,
            } => ContentBlock::question(title, question_text, options, correct_answer),
        }
    }
}

impl StructuredOutput for BlockDraft {
    fn validate(&self) -> Result<(), String> {
        match self {
            BlockDraft::Text { title, .. } => require_title(title),
            BlockDraft::Question {
                title,
                question_text,
                options,
                correct_answer,
            } => {
                require_title(title)?;
                if question_text.trim().is_empty() {
                    return Err(format!("question '{title}' has no question text"));
                }
                if options.len() < 2 {
                    return Err(format!(
                        "question '{title}' has {} option(s), needs at least 2",
                        options.len()
                    ));
                }
                if !options.iter().any(|o| o == correct_answer) {
                    return Err(format!(
                        "question '{title}': correct answer '{correct_answer}' is not one of the options"
                    ));
                }
                Ok(())
            }
        }
    }
}

fn require_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("block has an empty title".to_string());
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator output
// ────────────────────────────────────────────────────────────────────────────

/// A skill whose content call failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillFailure {
    pub skill: SkillItem,
    pub error: LlmError,
}

/// Every content block generated for one module.
///
/// `content_blocks` is in completion order. Under the partial-success policy
/// `failed_skills` lists the skills that produced nothing, in skill order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleContentBundle {
    pub module_name: String,
    pub content_blocks: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_skills: Vec<SkillFailure>,
}

/// Top-level output of content generation, one bundle per module in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseContentResult {
    pub modules: Vec<ModuleContentBundle>,
}

impl CourseContentResult {
    pub fn total_blocks(&self) -> usize {
        self.modules.iter().map(|m| m.content_blocks.len()).sum()
    }

    pub fn failed_skills(&self) -> impl Iterator<Item = &SkillFailure> {
        self.modules.iter().flat_map(|m| m.failed_skills.iter())
    }
}
