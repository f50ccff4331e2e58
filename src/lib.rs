//! Step Agent - 分层动作调度的网页智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与恢复引擎
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话消息与动作历史
//! - **observability**: tracing 初始化
//! - **step**: 动作解析、策略路由、调用栈、StepAgent 调度引擎、动作翻译

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod step;

pub use step::{BrowserStepAgent, StepAgent};
