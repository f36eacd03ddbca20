use std::sync::Arc;
use crate::{config::AppConfig, llm::LlmManager};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm_manager: LlmManager,
}

impl AppState {
    pub fn new(config: AppConfig, llm_manager: LlmManager) -> Self {
        Self {
            config: Arc::new(config),
            llm_manager,
        }
    }
}
