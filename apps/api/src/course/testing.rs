//! Deterministic stand-ins for the LLM in orchestrator, pipeline and route tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::course::content_generator::SkillContentGenerator;
use crate::course::models::{ContentBlock, CoursePrompt};
use crate::course::prompts::{GAP_INSTRUCTION, GROUPING_INSTRUCTION};
use crate::llm_client::testing::ScriptedBackend;
use crate::llm_client::LlmError;

const SLOW: Duration = Duration::from_secs(3600);

/// Returns one text block titled `"<skill>: overview"` per skill unless told
/// to fail, stall, panic or return nothing for specific skills.
#[derive(Default)]
pub struct StubGenerator {
    delay: Duration,
    failing: Vec<String>,
    slow: Vec<String>,
    empty: Vec<String>,
    panicking: Option<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

fn owned(skills: &[&str]) -> Vec<String> {
    skills.iter().map(|s| s.to_string()).collect()
}

impl StubGenerator {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(skills: &[&str]) -> Self {
        Self {
            failing: owned(skills),
            ..Self::default()
        }
    }

    pub fn slow(skills: &[&str]) -> Self {
        Self::default().with_slow(skills)
    }

    pub fn with_slow(mut self, skills: &[&str]) -> Self {
        self.slow = owned(skills);
        self
    }

    pub fn empty_for(skills: &[&str]) -> Self {
        Self {
            empty: owned(skills),
            ..Self::default()
        }
    }

    pub fn panicking(skill: &str) -> Self {
        Self {
            panicking: Some(skill.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end and returned blocks.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SkillContentGenerator for StubGenerator {
    async fn generate(&self, _module_name: &str, skill: &str) -> Result<Vec<ContentBlock>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.failing.iter().any(|s| s == skill) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(LlmError::ServiceUnavailable(format!("stub failure for {skill}")));
        }
        if self.panicking.as_deref() == Some(skill) {
            panic!("stub panic for {skill}");
        }

        let delay = if self.slow.iter().any(|s| s == skill) {
            SLOW
        } else {
            self.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.empty.iter().any(|s| s == skill) {
            return Ok(Vec::new());
        }
        Ok(vec![ContentBlock::text(
            format!("{skill}: overview"),
            format!("An introduction to {skill}."),
        )])
    }
}

const GAP_REPLY: &str = r#"{
  "reasoning": "A beginner needs markup, styling, scripting and a way to publish.",
  "analysis": {"knowledge_skills_list": ["HTML basics", "CSS basics", "JS basics", "Hosting"]}
}"#;

const GROUPING_REPLY: &str = r#"{
  "reasoning": "Three authoring skills, one deployment skill.",
  "grouping": {"modules": [
    {"module_name": "Web Foundations", "skills": ["HTML basics", "CSS basics", "JS basics"]},
    {"module_name": "Going Live", "skills": ["Hosting"]}
  ]}
}"#;

const LESSON_REPLY: &str = r#"{
  "reasoning": "Explain first, then check understanding.",
  "content_blocks": [
    {"type": "Text", "title": "Lesson", "body": "Read this carefully."},
    {"type": "Question", "title": "Check", "question_text": "Ready?",
     "options": ["Yes", "No"], "correct_answer": "Yes"}
  ]
}"#;

/// Answers the gap, grouping and content prompts for a four-skill web course.
/// Every content call returns one text block and one question.
pub fn course_backend() -> ScriptedBackend {
    ScriptedBackend::new(|prompt| {
        let reply = if prompt.starts_with(GAP_INSTRUCTION) {
            GAP_REPLY
        } else if prompt.starts_with(GROUPING_INSTRUCTION) {
            GROUPING_REPLY
        } else {
            LESSON_REPLY
        };
        Ok(reply.to_string())
    })
}

pub fn sample_prompt() -> CoursePrompt {
    CoursePrompt {
        title: "Web Development for Beginners".to_string(),
        topics: "HTML structure, CSS styling, basic JavaScript, web hosting basics".to_string(),
        description: "An introduction to web development for complete beginners.".to_string(),
        starting_point: "No prior programming experience required.".to_string(),
        finish_line: "Can build and deploy a simple website with HTML, CSS and JavaScript."
            .to_string(),
    }
}
