//! 调用栈：Frame 与 CallStack
//!
//! 每个 Frame 绑定一个子智能体与它正在追求的目标；栈顶是当前活跃目标，下面的 Frame 都挂起等待栈顶的终止结果。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::step::policy::PolicyTemplate;

/// 子智能体的一次预测
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    pub action: String,
    pub reason: String,
}

impl AgentOutput {
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// 子智能体：每个 Frame 一个，负责针对自身目标给出下一步动作
#[async_trait]
pub trait SubAgent: Send {
    async fn predict_action(
        &mut self,
        objective: &str,
        observation: &str,
        url: Option<&str>,
    ) -> Result<AgentOutput, AgentError>;

    /// 注入子目标结果或「已提交一步」的确认（空字符串），供下一次预测参考
    fn receive_response(&mut self, response: &str);
}

/// 按策略模板创建子智能体
pub trait SubAgentFactory: Send + Sync {
    fn create(&self, action_name: &str, template: Arc<PolicyTemplate>) -> Box<dyn SubAgent>;
}

/// 一条活动记录
pub struct Frame {
    pub agent: Box<dyn SubAgent>,
    pub action_name: String,
    pub objective: String,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("action_name", &self.action_name)
            .field("objective", &self.objective)
            .finish_non_exhaustive()
    }
}

/// LIFO 调用栈，只在尾部压入与弹出
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn peek(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// 自底向上的目标链
    pub fn objectives(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.objective.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullAgent;

    #[async_trait]
    impl SubAgent for NullAgent {
        async fn predict_action(
            &mut self,
            _objective: &str,
            _observation: &str,
            _url: Option<&str>,
        ) -> Result<AgentOutput, AgentError> {
            Ok(AgentOutput::new("stop [N/A]", ""))
        }

        fn receive_response(&mut self, _response: &str) {}
    }

    fn frame(objective: &str) -> Frame {
        Frame {
            agent: Box::new(NullAgent),
            action_name: "root".to_string(),
            objective: objective.to_string(),
        }
    }

    #[test]
    fn test_lifo_order() {
        let mut stack = CallStack::new();
        stack.push(frame("root"));
        stack.push(frame("child"));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.peek().unwrap().objective, "child");
        assert_eq!(stack.objectives(), vec!["root", "child"]);
        assert_eq!(stack.pop().unwrap().objective, "child");
        assert_eq!(stack.pop().unwrap().objective, "root");
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }
}
