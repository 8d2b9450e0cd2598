use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::LearnStore;

pub struct AppState {
    pub store: Arc<dyn LearnStore>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn LearnStore>, config: AppConfig) -> Self {
        Self { store, config }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &"Arc<dyn LearnStore>")
            .field("config", &self.config)
            .finish()
    }
}
