use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::course::pipeline::CoursePipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: CoursePipeline,
    pub config: Config,
    /// Caps how many course generations run at once (`MAX_CONCURRENT_GENERATIONS`).
    pub generation_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(pipeline: CoursePipeline, config: Config) -> Self {
        let slots = config.max_concurrent_generations.max(1);
        Self {
            pipeline,
            config,
            generation_slots: Arc::new(Semaphore::new(slots)),
        }
    }
}
