//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供 BrowserStepAgent 决定是带提示重试还是终止 episode。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作（重试提示 / 终止）
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::UnclassifiedAction(raw) => RecoveryAction::RetryWithPrompt(format!(
                "The previous action `{raw}` is not a valid action. \
                Answer with one of the available actions, e.g. `click [id]`, \
                a sub-task such as `search_agent [query]`, or `stop [answer]`."
            )),
            AgentError::MalformedAction(detail) => RecoveryAction::RetryWithPrompt(format!(
                "The previous output could not be parsed ({detail}). \
                Reply exactly in the format:\nREASON:\n<reasoning>\nACTION:\n<action>"
            )),
            AgentError::TranslationMiss(raw) => RecoveryAction::RetryWithPrompt(format!(
                "The action `{raw}` cannot be executed in the browser. \
                Use click, type, scroll, goto, hover, go_back or note."
            )),
            AgentError::LlmError(_) => RecoveryAction::RetryWithPrompt(String::new()),
            AgentError::RoutingFailure { .. }
            | AgentError::UnknownPolicy(_)
            | AgentError::DispatchLimitExceeded(_)
            | AgentError::EmptyStack
            | AgentError::ConfigError(_)
            | AgentError::Io(_) => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_unclassified_action() {
        let engine = RecoveryEngine::new();
        let err = AgentError::UnclassifiedAction("dance [3]".to_string());
        match engine.handle(&err) {
            RecoveryAction::RetryWithPrompt(msg) => {
                assert!(msg.contains("dance [3]"));
            }
            _ => panic!("Expected RetryWithPrompt"),
        }
    }

    #[test]
    fn test_recovery_malformed_action() {
        let engine = RecoveryEngine::new();
        let err = AgentError::MalformedAction("missing ACTION".to_string());
        match engine.handle(&err) {
            RecoveryAction::RetryWithPrompt(msg) => {
                assert!(msg.contains("ACTION:"));
            }
            _ => panic!("Expected RetryWithPrompt"),
        }
    }

    #[test]
    fn test_recovery_translation_miss() {
        let engine = RecoveryEngine::new();
        let err = AgentError::TranslationMiss("press [Enter]".to_string());
        assert!(matches!(engine.handle(&err), RecoveryAction::RetryWithPrompt(_)));
    }

    #[test]
    fn test_recovery_routing_failure_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::RoutingFailure {
            url: "http://10.0.0.1:1234/".to_string(),
        };
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_dispatch_limit_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::DispatchLimitExceeded(64);
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_llm_error_retries_without_hint() {
        let engine = RecoveryEngine::new();
        let err = AgentError::LlmError("rate limited".to_string());
        assert_eq!(
            engine.handle(&err),
            RecoveryAction::RetryWithPrompt(String::new())
        );
    }
}
