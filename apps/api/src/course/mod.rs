// Course generation engine.
// Three LLM stages: knowledge gap → module grouping → per-skill content (fanned out).
// All LLM calls go through llm_client; no direct Anthropic calls here.

pub mod content_generator;
pub mod errors;
pub mod gap_analyzer;
pub mod handlers;
pub mod models;
pub mod module_grouper;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
#[cfg(test)]
pub mod testing;
