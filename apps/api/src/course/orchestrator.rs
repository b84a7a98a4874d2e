//! Course Content Orchestrator: fans stage 3 out over every skill of a module.
//!
//! Per module:
//! - one task per skill in a `JoinSet` owned by this call, gated by a
//!   `Semaphore` sized to `concurrency`
//! - every call wrapped in `tokio::time::timeout`
//! - results drained in completion order by this function alone
//!
//! The join set never outlives `generate_module`; dropping it on any exit
//! path aborts whatever is still in flight. Modules are processed one after
//! another and emitted in input order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::course::content_generator::SkillContentGenerator;
use crate::course::errors::PipelineError;
use crate::course::models::{
    ContentBlock, CourseContentResult, Module, ModuleContentBundle, SkillFailure, SkillItem,
};
use crate::llm_client::LlmError;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// How a module reacts to a failed skill call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// First failure (in completion order) aborts the module's remaining calls
    /// and fails the whole run with `PipelineError::PartialBatchFailure`.
    FailFast,
    /// Wait for every call; the bundle keeps the blocks that succeeded and
    /// lists the failed skills in skill order.
    #[default]
    PartialSuccess,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Maximum skill calls in flight per module. Values below 1 are treated as 1.
    pub concurrency: usize,
    pub call_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            failure_policy: FailurePolicy::default(),
        }
    }
}

pub struct CourseContentOrchestrator {
    generator: Arc<dyn SkillContentGenerator>,
    settings: OrchestratorSettings,
}

impl CourseContentOrchestrator {
    pub fn new(generator: Arc<dyn SkillContentGenerator>, settings: OrchestratorSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Generates one bundle per module, in the order given.
    pub async fn generate(&self, modules: &[Module]) -> Result<CourseContentResult, PipelineError> {
        let mut bundles = Vec::with_capacity(modules.len());
        for module in modules {
            bundles.push(self.generate_module(module).await?);
        }
        Ok(CourseContentResult { modules: bundles })
    }

    pub async fn generate_module(&self, module: &Module) -> Result<ModuleContentBundle, PipelineError> {
        let skills = &module.skills;
        let pool = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut positions = HashMap::with_capacity(skills.len());

        for (position, skill) in skills.iter().enumerate() {
            let generator = Arc::clone(&self.generator);
            let pool = Arc::clone(&pool);
            let module_name = module.name.clone();
            let skill = skill.clone();
            let call_timeout = self.settings.call_timeout;

            let handle = tasks.spawn(async move {
                run_skill(generator.as_ref(), &pool, &module_name, &skill, call_timeout).await
            });
            positions.insert(handle.id(), position);
        }

        debug!(
            module = %module.name,
            skills = skills.len(),
            concurrency = self.settings.concurrency,
            "Dispatched skill content calls"
        );

        let mut content_blocks = Vec::new();
        let mut settled = vec![false; skills.len()];
        let mut succeeded = vec![false; skills.len()];
        let mut failed: Vec<(usize, SkillFailure)> = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(join_error) => (
                    join_error.id(),
                    Err(LlmError::ServiceUnavailable(format!(
                        "content task did not complete: {join_error}"
                    ))),
                ),
            };
            let Some(&position) = positions.get(&id) else {
                continue;
            };
            settled[position] = true;

            match outcome {
                Ok(blocks) => {
                    succeeded[position] = true;
                    content_blocks.extend(tag_with_skill(blocks, &skills[position]));
                }
                Err(error) => {
                    let failure = SkillFailure {
                        skill: skills[position].clone(),
                        error,
                    };
                    if self.settings.failure_policy == FailurePolicy::FailFast {
                        // `tasks` is dropped on return, aborting the unsettled calls.
                        return Err(PipelineError::PartialBatchFailure {
                            module_name: module.name.clone(),
                            failed: vec![failure],
                            succeeded: pick(skills, &succeeded, true),
                            cancelled: pick(skills, &settled, false),
                        });
                    }
                    failed.push((position, failure));
                }
            }
        }

        failed.sort_by_key(|(position, _)| *position);

        Ok(ModuleContentBundle {
            module_name: module.name.clone(),
            content_blocks,
            failed_skills: failed.into_iter().map(|(_, failure)| failure).collect(),
        })
    }
}

async fn run_skill(
    generator: &dyn SkillContentGenerator,
    pool: &Semaphore,
    module_name: &str,
    skill: &str,
    call_timeout: Duration,
) -> Result<Vec<ContentBlock>, LlmError> {
    let _permit = pool
        .acquire()
        .await
        .map_err(|_| LlmError::ServiceUnavailable("worker pool closed".to_string()))?;

    match tokio::time::timeout(call_timeout, generator.generate(module_name, skill)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::ServiceUnavailable(format!(
            "no reply within {:.1}s",
            call_timeout.as_secs_f64()
        ))),
    }
}

fn tag_with_skill(blocks: Vec<ContentBlock>, skill: &SkillItem) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .map(|mut block| {
            block.source_skill = Some(skill.clone());
            block
        })
        .collect()
}

/// Skills whose flag equals `wanted`, in skill order.
fn pick(skills: &[SkillItem], flags: &[bool], wanted: bool) -> Vec<SkillItem> {
    skills
        .iter()
        .zip(flags)
        .filter(|(_, flag)| **flag == wanted)
        .map(|(skill, _)| skill.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::testing::StubGenerator;

    fn web_module() -> Module {
        Module {
            name: "Web Foundations".to_string(),
            skills: vec![
                "HTML basics".to_string(),
                "CSS basics".to_string(),
                "JS basics".to_string(),
            ],
        }
    }

    fn orchestrator(
        generator: &Arc<StubGenerator>,
        failure_policy: FailurePolicy,
    ) -> CourseContentOrchestrator {
        CourseContentOrchestrator::new(
            generator.clone(),
            OrchestratorSettings {
                failure_policy,
                ..OrchestratorSettings::default()
            },
        )
    }

    fn sorted_titles(bundle: &ModuleContentBundle) -> Vec<String> {
        let mut titles: Vec<String> = bundle.content_blocks.iter().map(|b| b.title.clone()).collect();
        titles.sort();
        titles
    }

    #[tokio::test]
    async fn test_one_block_per_skill_bundled_under_module_name() {
        let generator = Arc::new(StubGenerator::default());
        let result = orchestrator(&generator, FailurePolicy::PartialSuccess)
            .generate(&[web_module()])
            .await
            .unwrap();

        assert_eq!(result.modules.len(), 1);
        let bundle = &result.modules[0];
        assert_eq!(bundle.module_name, "Web Foundations");
        assert_eq!(bundle.content_blocks.len(), 3);
        assert!(bundle.failed_skills.is_empty());
        // Completion order is unspecified; compare as a multiset.
        assert_eq!(
            sorted_titles(bundle),
            vec!["CSS basics: overview", "HTML basics: overview", "JS basics: overview"]
        );
        for block in &bundle.content_blocks {
            let skill = block.source_skill.as_deref().unwrap();
            assert_eq!(block.title, format!("{skill}: overview"));
        }
    }

    #[tokio::test]
    async fn test_issues_exactly_one_call_per_skill() {
        let generator = Arc::new(StubGenerator::default());
        let module = Module {
            name: "Big".to_string(),
            skills: (0..12).map(|i| format!("skill {i}")).collect(),
        };
        orchestrator(&generator, FailurePolicy::FailFast)
            .generate(&[module])
            .await
            .unwrap();
        assert_eq!(generator.calls(), 12);
    }

    #[tokio::test]
    async fn test_fail_fast_surfaces_the_failed_skill_and_no_bundle() {
        let generator = Arc::new(StubGenerator::failing(&["CSS basics"]));
        let err = orchestrator(&generator, FailurePolicy::FailFast)
            .generate(&[web_module()])
            .await
            .unwrap_err();

        match err {
            PipelineError::PartialBatchFailure {
                module_name,
                failed,
                succeeded,
                cancelled,
            } => {
                assert_eq!(module_name, "Web Foundations");
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].skill, "CSS basics");
                assert!(matches!(failed[0].error, LlmError::ServiceUnavailable(_)));

                let mut accounted: Vec<String> = succeeded.into_iter().chain(cancelled).collect();
                accounted.push(failed[0].skill.clone());
                accounted.sort();
                assert_eq!(accounted, vec!["CSS basics", "HTML basics", "JS basics"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_success_keeps_other_blocks_and_records_failure() {
        let generator = Arc::new(StubGenerator::failing(&["CSS basics"]));
        let result = orchestrator(&generator, FailurePolicy::PartialSuccess)
            .generate(&[web_module()])
            .await
            .unwrap();

        let bundle = &result.modules[0];
        assert_eq!(
            sorted_titles(bundle),
            vec!["HTML basics: overview", "JS basics: overview"]
        );
        assert_eq!(bundle.failed_skills.len(), 1);
        assert_eq!(bundle.failed_skills[0].skill, "CSS basics");
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_partial_success_lists_failures_in_skill_order() {
        let generator = Arc::new(StubGenerator::failing(&["JS basics", "HTML basics"]));
        let result = orchestrator(&generator, FailurePolicy::PartialSuccess)
            .generate(&[web_module()])
            .await
            .unwrap();
        let failed: Vec<&str> = result.modules[0]
            .failed_skills
            .iter()
            .map(|f| f.skill.as_str())
            .collect();
        assert_eq!(failed, vec!["HTML basics", "JS basics"]);
        assert_eq!(result.total_blocks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_calls_bounded_by_pool_size() {
        let generator = Arc::new(StubGenerator::with_delay(Duration::from_millis(50)));
        let module = Module {
            name: "Big".to_string(),
            skills: (0..8).map(|i| format!("skill {i}")).collect(),
        };
        let orchestrator = CourseContentOrchestrator::new(
            generator.clone(),
            OrchestratorSettings {
                concurrency: 2,
                ..OrchestratorSettings::default()
            },
        );

        let result = orchestrator.generate(&[module]).await.unwrap();
        assert_eq!(result.total_blocks(), 8);
        assert_eq!(generator.max_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_as_service_unavailable() {
        let generator = Arc::new(StubGenerator::slow(&["JS basics"]));
        let orchestrator = CourseContentOrchestrator::new(
            generator.clone(),
            OrchestratorSettings {
                call_timeout: Duration::from_secs(5),
                ..OrchestratorSettings::default()
            },
        );

        let result = orchestrator.generate(&[web_module()]).await.unwrap();
        let bundle = &result.modules[0];
        assert_eq!(bundle.content_blocks.len(), 2);
        assert_eq!(bundle.failed_skills[0].skill, "JS basics");
        assert_eq!(
            bundle.failed_skills[0].error,
            LlmError::ServiceUnavailable("no reply within 5.0s".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_aborts_in_flight_siblings() {
        let generator = Arc::new(StubGenerator::failing(&["HTML basics"]).with_slow(&[
            "CSS basics",
            "JS basics",
        ]));
        let err = orchestrator(&generator, FailurePolicy::FailFast)
            .generate(&[web_module()])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PartialBatchFailure { .. }));

        // Long past the slow calls' finish time: aborted tasks never complete.
        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        assert_eq!(generator.completed(), 0);
    }

    #[tokio::test]
    async fn test_panicking_call_is_reported_as_that_skills_failure() {
        let generator = Arc::new(StubGenerator::panicking("CSS basics"));
        let result = orchestrator(&generator, FailurePolicy::PartialSuccess)
            .generate(&[web_module()])
            .await
            .unwrap();
        let bundle = &result.modules[0];
        assert_eq!(bundle.content_blocks.len(), 2);
        assert_eq!(bundle.failed_skills.len(), 1);
        assert_eq!(bundle.failed_skills[0].skill, "CSS basics");
    }

    #[tokio::test]
    async fn test_modules_emitted_in_input_order_and_empty_module_kept() {
        let generator = Arc::new(StubGenerator::default());
        let modules = vec![
            Module {
                name: "Second".to_string(),
                skills: vec!["b".to_string()],
            },
            Module {
                name: "Empty".to_string(),
                skills: vec![],
            },
            Module {
                name: "First".to_string(),
                skills: vec!["a".to_string(), "c".to_string()],
            },
        ];
        let result = orchestrator(&generator, FailurePolicy::FailFast)
            .generate(&modules)
            .await
            .unwrap();

        let names: Vec<&str> = result.modules.iter().map(|m| m.module_name.as_str()).collect();
        assert_eq!(names, vec!["Second", "Empty", "First"]);
        assert!(result.modules[1].content_blocks.is_empty());
        assert_eq!(result.modules[2].content_blocks.len(), 2);
    }

    #[tokio::test]
    async fn test_skill_with_zero_blocks_is_not_a_failure() {
        let generator = Arc::new(StubGenerator::empty_for(&["JS basics"]));
        let result = orchestrator(&generator, FailurePolicy::FailFast)
            .generate(&[web_module()])
            .await
            .unwrap();
        assert_eq!(result.modules[0].content_blocks.len(), 2);
        assert!(result.modules[0].failed_skills.is_empty());
    }
}
