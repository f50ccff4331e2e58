//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 AgentError 决定 RetryWithPrompt（把纠错提示喂给当前子智能体）还是 Abort。
//! 所有错误都是「局部可恢复」的：单条畸形模型输出不应拖垮整个 benchmark 批跑。

use thiserror::Error;

/// 调度引擎与动作翻译过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// URL 无法映射到任何已知站点，根策略为空；不能播种根 Frame
    #[error("No site policy matches url: {url}")]
    RoutingFailure { url: String },

    /// 策略表中找不到该高层动作对应的模板
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    /// 模型输出既不是终止动作，也不是低层/高层动作
    #[error("Unparseable model action: {0}")]
    UnclassifiedAction(String),

    /// 低层动作不匹配任何已知浏览器命令
    #[error("No actionable command in: {0}")]
    TranslationMiss(String),

    /// 方括号参数提取失败，或模型输出缺少 REASON/ACTION 结构
    #[error("Malformed action: {0}")]
    MalformedAction(String),

    /// 单次 predict_action 内的压栈/出栈次数超过上限
    #[error("Dispatch limit exceeded after {0} transitions")]
    DispatchLimitExceeded(usize),

    #[error("Call stack is empty")]
    EmptyStack,

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Io(e.to_string())
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将提示注入当前子智能体的上下文，让 LLM 重新预测
    RetryWithPrompt(String),
    /// 终止当前 episode
    Abort,
}
