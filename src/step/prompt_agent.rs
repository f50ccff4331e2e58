//! PromptAgent：由 LLM 驱动的子智能体
//!
//! 持有一个策略模板与自己的动作历史；每次预测把模板渲染成消息列表交给 LLM，
//! 再从 `REASON: ... ACTION: ...` 格式的回复中取出动作。

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, StepHistory};
use crate::step::frame::{AgentOutput, SubAgent, SubAgentFactory};
use crate::step::policy::PolicyTemplate;

/// 超过 max_actions 后自动给出的终止动作
const MAX_ACTIONS_STOP: &str = "stop [N/A]";

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

/// 提示渲染方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// system 指令 + few-shot 对话 + 当前输入
    #[default]
    Chat,
    /// 全部拼成一条 user 消息
    Completion,
}

/// 从模型回复中解析 REASON / ACTION
pub fn parse_model_output(raw: &str) -> Result<AgentOutput, AgentError> {
    let idx = raw
        .rfind("ACTION:")
        .ok_or_else(|| AgentError::MalformedAction(format!("missing ACTION: in `{}`", raw.trim())))?;

    let action = raw[idx + "ACTION:".len()..]
        .lines()
        .map(|l| l.trim().trim_matches('`').trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if action.is_empty() {
        return Err(AgentError::MalformedAction(format!(
            "empty ACTION in `{}`",
            raw.trim()
        )));
    }

    let head = &raw[..idx];
    let reason = head
        .find("REASON:")
        .map(|i| &head[i + "REASON:".len()..])
        .unwrap_or(head)
        .trim();

    Ok(AgentOutput::new(action, reason))
}

pub struct PromptAgent {
    name: String,
    template: Arc<PolicyTemplate>,
    llm: Arc<dyn LlmClient>,
    mode: PromptMode,
    max_actions: usize,
    history: StepHistory,
}

impl PromptAgent {
    pub fn new(
        name: impl Into<String>,
        template: Arc<PolicyTemplate>,
        llm: Arc<dyn LlmClient>,
        mode: PromptMode,
        max_actions: usize,
    ) -> Self {
        Self {
            name: name.into(),
            template,
            llm,
            mode,
            max_actions,
            history: StepHistory::new(),
        }
    }

    pub fn history(&self) -> &StepHistory {
        &self.history
    }

    /// 按模板渲染消息列表
    pub fn render(&self, objective: &str, observation: &str, url: Option<&str>) -> Vec<Message> {
        let previous_actions = self.history.to_prompt_section();
        let re = PLACEHOLDER_RE
            .get_or_init(|| Regex::new(r"\{(objective|url|observation|previous_actions)\}").unwrap());
        // 单遍替换：已填入的观察文本中的 `{...}` 保持原样
        let input = re
            .replace_all(&self.template.input, |caps: &Captures| match &caps[1] {
                "objective" => objective.to_string(),
                "url" => url.unwrap_or_default().to_string(),
                "observation" => observation.to_string(),
                _ => previous_actions.clone(),
            })
            .into_owned();

        match self.mode {
            PromptMode::Chat => {
                let mut messages = vec![Message::system(self.template.instruction.clone())];
                for ex in &self.template.examples {
                    messages.push(Message::user(ex.input.clone()));
                    messages.push(Message::assistant(ex.response.clone()));
                }
                messages.push(Message::user(input));
                messages
            }
            PromptMode::Completion => {
                let mut prompt = self.template.instruction.clone();
                for ex in &self.template.examples {
                    prompt.push_str(&format!("\n\n{}\n{}", ex.input, ex.response));
                }
                prompt.push_str(&format!("\n\n{}", input));
                vec![Message::user(prompt)]
            }
        }
    }
}

#[async_trait]
impl SubAgent for PromptAgent {
    async fn predict_action(
        &mut self,
        objective: &str,
        observation: &str,
        url: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        if self.max_actions > 0 && self.history.action_count() >= self.max_actions {
            tracing::warn!(
                "[{}] reached max actions ({}), stopping",
                self.name,
                self.max_actions
            );
            let output = AgentOutput::new(MAX_ACTIONS_STOP, "Maximum number of actions reached.");
            self.history
                .update_history(output.action.clone(), Some(output.reason.clone()));
            return Ok(output);
        }

        let messages = self.render(objective, observation, url);
        let raw = self
            .llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)?;
        let output = parse_model_output(&raw)?;
        tracing::debug!("[{}] {} ({})", self.name, output.action, output.reason);

        self.history
            .update_history(output.action.clone(), Some(output.reason.clone()));
        Ok(output)
    }

    fn receive_response(&mut self, response: &str) {
        self.history.record_response(response);
    }
}

/// 为每个新 Frame 创建独立历史的 PromptAgent
pub struct PromptAgentFactory {
    llm: Arc<dyn LlmClient>,
    mode: PromptMode,
    max_actions: usize,
}

impl PromptAgentFactory {
    pub fn new(llm: Arc<dyn LlmClient>, mode: PromptMode, max_actions: usize) -> Self {
        Self {
            llm,
            mode,
            max_actions,
        }
    }
}

impl SubAgentFactory for PromptAgentFactory {
    fn create(&self, action_name: &str, template: Arc<PolicyTemplate>) -> Box<dyn SubAgent> {
        Box::new(PromptAgent::new(
            action_name,
            template,
            Arc::clone(&self.llm),
            self.mode,
            self.max_actions,
        ))
    }
}
