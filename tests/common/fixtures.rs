//! Test fixtures for integration tests.

use std::sync::Arc;

use rerank::{EngineConfig, HardwareProfile, MockScorer, RerankerEngine};

pub const QUERY: &str = "how does tokio schedule blocking work";

pub fn documents(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("passage {i} about async runtimes and thread pools"))
        .collect()
}

/// Config with compilation and warm-up off so call logs only show request traffic.
pub fn quiet_config() -> EngineConfig {
    EngineConfig::default()
        .with_compile_model(false)
        .with_warm_up(false)
}

pub async fn build_engine(config: EngineConfig, mock: &MockScorer) -> RerankerEngine {
    RerankerEngine::with_profile(config, HardwareProfile::conservative(), Arc::new(mock.clone()))
        .await
        .expect("engine should build")
}
