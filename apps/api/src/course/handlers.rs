use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::course::models::{BlockKind, ContentBlock, CoursePrompt, Module, ModuleContentBundle};
use crate::course::module_grouper::CoverageReport;
use crate::course::pipeline::PipelineOutput;
use crate::errors::AppError;
use crate::state::AppState;

/// Skills listed in a module description before it is cut off with "...".
const DESCRIPTION_SKILL_LIMIT: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCourseRequest {
    pub course_title: String,
    pub course_topics: String,
    pub course_description: String,
    pub starting_point_description: String,
    pub finish_line_description: String,
}

impl From<GenerateCourseRequest> for CoursePrompt {
    fn from(req: GenerateCourseRequest) -> Self {
        CoursePrompt {
            title: req.course_title,
            topics: req.course_topics,
            description: req.course_description,
            starting_point: req.starting_point_description,
            finish_line: req.finish_line_description,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockResponse {
    pub id: u32,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub block_type: &'static str,
    pub module_id: u32,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FailedSkillResponse {
    pub skill: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResponse {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub content_blocks: Vec<ContentBlockResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_skills: Vec<FailedSkillResponse>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedCourseResponse {
    pub course_title: String,
    pub course_description: String,
    pub modules: Vec<ModuleResponse>,
}

#[derive(Debug, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub content_count: usize,
    pub content_types: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CourseSummaryResponse {
    pub skills_identified: Vec<String>,
    pub modules_created: usize,
    pub total_content_blocks: usize,
    pub modules: Vec<ModuleSummary>,
    pub coverage: CoverageReport,
}

/// POST /generate-course
pub async fn handle_generate_course(
    State(state): State<AppState>,
    Json(req): Json<GenerateCourseRequest>,
) -> Result<Json<GeneratedCourseResponse>, AppError> {
    info!("Course generation request received for: {}", req.course_title);

    let course_title = req.course_title.clone();
    let course_description = req.course_description.clone();
    let output = run_generation(&state, req.into()).await?;

    let modules = output
        .content
        .modules
        .iter()
        .zip(&output.modules)
        .enumerate()
        .map(|(i, (bundle, module))| module_response(position(i), bundle, module))
        .collect();

    info!("Course generation completed for: {course_title}");
    Ok(Json(GeneratedCourseResponse {
        course_title,
        course_description,
        modules,
    }))
}

/// POST /generate-course-simple
/// Raw counts for debugging a generation without the frontend shape.
pub async fn handle_generate_course_simple(
    State(state): State<AppState>,
    Json(req): Json<GenerateCourseRequest>,
) -> Result<Json<CourseSummaryResponse>, AppError> {
    info!("Simple course generation request for: {}", req.course_title);

    let output = run_generation(&state, req.into()).await?;
    let modules = output
        .content
        .modules
        .iter()
        .map(|bundle| ModuleSummary {
            name: bundle.module_name.clone(),
            content_count: bundle.content_blocks.len(),
            content_types: bundle.content_blocks.iter().map(ContentBlock::type_name).collect(),
        })
        .collect();

    Ok(Json(CourseSummaryResponse {
        total_content_blocks: output.content.total_blocks(),
        modules_created: output.content.modules.len(),
        skills_identified: output.skills,
        modules,
        coverage: output.coverage,
    }))
}

/// Validates the prompt, waits for a generation slot, then runs the pipeline
/// inside a span tagged with a fresh run id.
async fn run_generation(state: &AppState, prompt: CoursePrompt) -> Result<PipelineOutput, AppError> {
    if prompt.starting_point.trim().is_empty() {
        return Err(AppError::Validation(
            "starting_point_description must not be empty".to_string(),
        ));
    }
    if prompt.finish_line.trim().is_empty() {
        return Err(AppError::Validation(
            "finish_line_description must not be empty".to_string(),
        ));
    }

    let _slot = state
        .generation_slots
        .acquire()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let run_id = Uuid::new_v4();
    let output = state
        .pipeline
        .run(&prompt)
        .instrument(info_span!("generate_course", %run_id))
        .await?;
    Ok(output)
}

fn position(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn module_response(id: u32, bundle: &ModuleContentBundle, module: &Module) -> ModuleResponse {
    ModuleResponse {
        id,
        name: bundle.module_name.clone(),
        description: describe_module(&module.skills),
        content_blocks: bundle
            .content_blocks
            .iter()
            .enumerate()
            .map(|(j, block)| block_response(position(j), id, block))
            .collect(),
        failed_skills: bundle
            .failed_skills
            .iter()
            .map(|f| FailedSkillResponse {
                skill: f.skill.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    }
}

fn block_response(id: u32, module_id: u32, block: &ContentBlock) -> ContentBlockResponse {
    let (body, options, correct_answer, question_text) = match &block.kind {
        BlockKind::Text { body } => (body.clone(), None, None, None),
        BlockKind::Question {
            question_text,
            options,
            correct_answer,
            ..
        } => (
            question_text.clone(),
            Some(options.clone()),
            Some(correct_answer.clone()),
            Some(question_text.clone()),
        ),
    };

    ContentBlockResponse {
        id,
        title: block.title.clone(),
        body,
        block_type: block.type_name(),
        module_id,
        is_complete: block.is_complete,
        options,
        correct_answer,
        question_text,
    }
}

fn describe_module(skills: &[String]) -> String {
    let shown: Vec<&str> = skills
        .iter()
        .take(DESCRIPTION_SKILL_LIMIT)
        .map(String::as_str)
        .collect();
    let more = if skills.len() > DESCRIPTION_SKILL_LIMIT {
        "..."
    } else {
        ""
    };
    format!("Module covering: {}{more}", shown.join(", "))
}
