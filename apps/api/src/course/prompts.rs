// Instructions and output shapes for the three course generation stages.
// Shared JSON/reasoning fragments live in llm_client::prompts.

// ── Stage 1: knowledge gap ──────────────────────────────────────────────────

pub const GAP_INSTRUCTION: &str = "Analyze the starting point and finish line to identify \
    the knowledge and skills needed to bridge the gap. Each item must be one concrete \
    knowledge area or skill the student needs to learn, phrased as a short noun phrase. \
    Do not repeat items. Order them from foundational to advanced.";

pub const GAP_STARTING_POINT_DESC: &str = "Description of the student's initial knowledge and skills";
pub const GAP_FINISH_LINE_DESC: &str = "Description of the knowledge and skills the student should acquire";

pub const GAP_OUTPUT_NAME: &str = "analysis";
pub const GAP_OUTPUT_DESC: &str = "Structured analysis of knowledge and skills needed to bridge \
    the gap. A list where each item is a specific knowledge area or skill.";
pub const GAP_OUTPUT_SHAPE: &str = r#"{
  "knowledge_skills_list": ["HTML document structure", "CSS selectors and the box model"]
}"#;

// ── Stage 2: module grouping ────────────────────────────────────────────────

pub const GROUPING_INSTRUCTION: &str = "Group the list of knowledge and skills into coherent \
    modules for the course. Every skill in the input list must appear in exactly one module, \
    copied verbatim. Do not invent, merge, rename or drop skills. \
    Module names must be unique and non-empty.";

pub const GROUPING_SKILLS_DESC: &str = "List of knowledge and skills needed to bridge the gap";

pub const GROUPING_OUTPUT_NAME: &str = "grouping";
pub const GROUPING_OUTPUT_DESC: &str = "Structured grouping of knowledge and skills into modules";
pub const GROUPING_OUTPUT_SHAPE: &str = r#"{
  "modules": [
    {"module_name": "Web Foundations", "skills": ["HTML document structure"]}
  ]
}"#;

// ── Stage 3: content per skill ──────────────────────────────────────────────

pub const CONTENT_INSTRUCTION: &str = "Generate educational content for a specific skill \
    within a module. Output multiple content blocks mixing explanatory text and \
    multiple-choice quiz questions. Every question needs at least two options and its \
    correct_answer must be copied exactly from one of the options.";

pub const CONTENT_MODULE_DESC: &str = "Name of the module this content belongs to";
pub const CONTENT_SKILL_DESC: &str = "Specific knowledge/skill item to create content for";

pub const CONTENT_OUTPUT_NAME: &str = "content_blocks";
pub const CONTENT_OUTPUT_DESC: &str = "Generated content blocks, including both explanatory \
    text and quiz questions. Each block has a \"type\" of \"Text\" or \"Question\".";
pub const CONTENT_OUTPUT_SHAPE: &str = r#"[
  {"type": "Text", "title": "What is HTML?", "body": "HTML describes the structure of a page..."},
  {
    "type": "Question",
    "title": "Check your understanding",
    "question_text": "Which tag wraps the visible page content?",
    "options": ["<head>", "<body>", "<meta>"],
    "correct_answer": "<body>"
  }
]"#;
