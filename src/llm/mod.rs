//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

/// 按配置创建 LLM 客户端；provider 为 mock 或未设置 OPENAI_API_KEY 时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_key = std::env::var("OPENAI_API_KEY").is_ok();

    if provider != "mock" && has_key {
        tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
        Arc::new(
            OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            )
            .with_timeout_secs(cfg.llm.timeouts.request),
        )
    } else {
        tracing::warn!("No API key set or provider is mock, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}
