//! BrowserStepAgent：面向浏览器执行层的适配器
//!
//! 每一步接收一份页面观察，驱动 StepAgent 得到低层动作，翻译成驱动命令返回；
//! 根目标终止时返回最终答案。可恢复错误（畸形输出、无法识别、无法翻译、LLM 失败）
//! 经 RecoveryEngine 生成提示后重试，超过 max_retries 则把错误交给调用方。

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::llm::LlmClient;
use crate::step::action::ParsedAction;
use crate::step::engine::StepAgent;
use crate::step::translate::DriverCommand;

/// 浏览器层提供的一次观察
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pruned_html: String,
    #[serde(default)]
    pub axtree_txt: String,
}

/// 单步结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    Command { command: DriverCommand, reason: String },
    Finished { answer: String, reason: String },
}

pub struct BrowserStepAgent {
    engine: StepAgent,
    recovery: RecoveryEngine,
    use_dom: bool,
    max_retries: usize,
}

impl BrowserStepAgent {
    pub fn new(engine: StepAgent, use_dom: bool, max_retries: usize) -> Self {
        Self {
            engine,
            recovery: RecoveryEngine::new(),
            use_dom,
            max_retries,
        }
    }

    pub fn from_config(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> Result<Self, AgentError> {
        let engine = StepAgent::from_config(&cfg.agent, llm, Some(PathBuf::from(&cfg.app.log_dir)))?;
        Ok(Self::new(engine, cfg.agent.use_dom, cfg.agent.max_retries))
    }

    pub fn engine(&self) -> &StepAgent {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut StepAgent {
        &mut self.engine
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// 根据配置选择 DOM 或无障碍树作为观察文本
    pub fn observation_text<'a>(&self, obs: &'a Observation) -> &'a str {
        if self.use_dom {
            &obs.pruned_html
        } else {
            &obs.axtree_txt
        }
    }

    pub async fn get_action(&mut self, obs: &Observation) -> Result<AgentStep, AgentError> {
        let mut retries = 0;
        loop {
            let err = match self.step_once(obs).await {
                Ok(step) => return Ok(step),
                Err(e) => e,
            };

            match self.recovery.handle(&err) {
                RecoveryAction::RetryWithPrompt(hint) if retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!("Step failed ({}), retry {}/{}", err, retries, self.max_retries);
                    if !hint.is_empty() && self.engine.feed_active(&hint).is_err() {
                        return Err(err);
                    }
                }
                _ => {
                    tracing::error!("Step failed: {}", err);
                    return Err(err);
                }
            }
        }
    }

    async fn step_once(&mut self, obs: &Observation) -> Result<AgentStep, AgentError> {
        let observation = self.observation_text(obs);
        let url = Some(obs.url.as_str()).filter(|u| !u.is_empty());

        let prediction = self.engine.predict_action(&obs.goal, observation, url).await?;

        if prediction.finished {
            let answer = match &prediction.parsed {
                ParsedAction::Terminal { payload } => payload.clone().unwrap_or_default(),
                _ => String::new(),
            };
            return Ok(AgentStep::Finished {
                answer,
                reason: prediction.reason,
            });
        }

        let command = self.engine.translate_parsed(&prediction.parsed)?;
        tracing::info!("{} -> {}", prediction.action, command);
        Ok(AgentStep::Command {
            command,
            reason: prediction.reason,
        })
    }
}
