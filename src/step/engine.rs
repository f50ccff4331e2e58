//! StepAgent：分层动作调度引擎
//!
//! 把模型输出的「高层动作」当作对子智能体的调用：压入子 Frame、运行到终止、把结果回传给调用方 Frame。
//! 一次 predict_action 持续循环，直到浮出一个低层动作（返回给调用方执行）或栈被清空（episode 结束）。
//!
//! 状态转移由纯函数 [`transition`] 决定：
//!
//! ```text
//! EMPTY --seed--> ACTIVE(d)
//! ACTIVE(d) --低层--> 返回调用方, 仍为 ACTIVE(d)
//! ACTIVE(d) --高层--> ACTIVE(d+1)，同一次调用内继续预测
//! ACTIVE(d) --stop--> ACTIVE(d-1) 并把结果交给父 Frame；d-1 == 0 时为 EMPTY，episode 结束
//! ACTIVE(d) --无法识别--> UnclassifiedAction 错误，栈不变
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AgentSection;
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::StepHistory;
use crate::step::action::ParsedAction;
use crate::step::events::{StepLogger, StepRecord, StepStatus};
use crate::step::frame::{AgentOutput, CallStack, Frame, SubAgentFactory};
use crate::step::loader::load_registry;
use crate::step::policy::{PolicyMap, PolicySelector, ResolvedPolicy};
use crate::step::prompt_agent::PromptAgentFactory;
use crate::step::translate::{to_driver_command, DriverCommand};
use crate::step::vocabulary::ActionVocabulary;

/// 单次 predict_action 内的默认状态转移上限
const DEFAULT_MAX_TRANSITIONS: usize = 64;

/// 引擎对外可见的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Empty,
    Active { depth: usize },
}

/// 对一条已解析动作的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    ReturnLowLevel,
    PushChild { name: String },
    PopFrame { payload: String },
    Reject,
}

/// 纯转移函数：不触碰任何 I/O，可单独测试
pub fn transition(parsed: &ParsedAction) -> Transition {
    match parsed {
        ParsedAction::Terminal { payload } => Transition::PopFrame {
            payload: payload.clone().unwrap_or_default(),
        },
        ParsedAction::HighLevel { name, .. } => Transition::PushChild { name: name.clone() },
        ParsedAction::Unrecognized(_) => Transition::Reject,
        _ => Transition::ReturnLowLevel,
    }
}

/// predict_action 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub action: String,
    pub reason: String,
    pub parsed: ParsedAction,
    /// 根 Frame 已终止、栈已清空
    pub finished: bool,
}

/// 最近一次 predict_action 的输入，note 日志沿用它
#[derive(Debug, Clone, Default)]
struct StepContext {
    objective: String,
    url: Option<String>,
    observation: String,
}

/// 分层调度引擎；一个 episode 一个实例
pub struct StepAgent {
    selector: PolicySelector,
    vocabulary: ActionVocabulary,
    factory: Arc<dyn SubAgentFactory>,
    policy: Option<ResolvedPolicy>,
    prev_url: Option<String>,
    /// URL 离开已知站点后沿用上一次的策略表；栈清空后必须重新路由
    detached: bool,
    stack: CallStack,
    history: StepHistory,
    max_transitions: usize,
    episode_id: String,
    logger: Option<StepLogger>,
    log_dir: Option<PathBuf>,
    last_step: Option<StepContext>,
}

impl StepAgent {
    pub fn new(
        selector: PolicySelector,
        vocabulary: ActionVocabulary,
        factory: Arc<dyn SubAgentFactory>,
    ) -> Self {
        Self {
            selector,
            vocabulary,
            factory,
            policy: None,
            prev_url: None,
            detached: false,
            stack: CallStack::new(),
            history: StepHistory::new(),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
            episode_id: uuid::Uuid::new_v4().to_string(),
            logger: None,
            log_dir: None,
            last_step: None,
        }
    }

    /// 按 [agent] 配置组装：内置策略 + 覆盖目录、低层词表、PromptAgent 工厂
    pub fn from_config(
        cfg: &AgentSection,
        llm: Arc<dyn LlmClient>,
        log_dir: Option<PathBuf>,
    ) -> Result<Self, AgentError> {
        let registry = load_registry(cfg.benchmark, cfg.policies_dir.as_deref())?;
        let selector = PolicySelector::with_registry(cfg.benchmark, registry);
        let vocabulary = ActionVocabulary::new(cfg.effective_low_level_actions());
        let factory = Arc::new(PromptAgentFactory::new(llm, cfg.prompt_mode, cfg.max_actions));

        let mut agent = Self::new(selector, vocabulary, factory).with_max_transitions(cfg.max_transitions);
        if cfg.logging {
            agent = agent.with_log_dir(log_dir.unwrap_or_else(|| PathBuf::from("logs")))?;
        }
        Ok(agent)
    }

    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.max_transitions = max_transitions.max(1);
        self
    }

    /// 只在内存中保留步骤记录
    pub fn with_step_log(mut self) -> Self {
        self.logger = Some(StepLogger::in_memory());
        self
    }

    /// 步骤记录写入 `<dir>/<episode_id>.jsonl`
    pub fn with_log_dir(mut self, dir: PathBuf) -> Result<Self, AgentError> {
        self.logger = Some(StepLogger::to_dir(&dir, &self.episode_id)?);
        self.log_dir = Some(dir);
        Ok(self)
    }

    pub fn state(&self) -> DispatchState {
        match self.stack.depth() {
            0 => DispatchState::Empty,
            depth => DispatchState::Active { depth },
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn objectives(&self) -> Vec<&str> {
        self.stack.objectives()
    }

    /// 当前站点的根动作；URL 离开已知站点后为 None
    pub fn root_action(&self) -> Option<&str> {
        if self.detached {
            return None;
        }
        self.policy.as_ref().map(|p| p.root_action.as_str())
    }

    pub fn policies(&self) -> Option<&PolicyMap> {
        self.policy.as_ref().map(|p| &p.policies)
    }

    pub fn vocabulary(&self) -> &ActionVocabulary {
        &self.vocabulary
    }

    pub fn history(&self) -> &StepHistory {
        &self.history
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn step_log(&self) -> Option<&StepLogger> {
        self.logger.as_ref()
    }

    pub fn update_history(&mut self, action: impl Into<String>, reason: Option<String>) {
        self.history.update_history(action, reason);
    }

    /// 解析并翻译一条低层动作；note 的文本写入跨调用历史
    pub fn translate(&mut self, action: &str) -> Result<DriverCommand, AgentError> {
        let parsed = ParsedAction::parse_low_level(action);
        self.translate_parsed(&parsed)
    }

    /// 翻译 predict_action 返回的已解析动作
    pub fn translate_parsed(&mut self, parsed: &ParsedAction) -> Result<DriverCommand, AgentError> {
        let command = to_driver_command(parsed)?;
        if let ParsedAction::Note { text } = parsed {
            self.record_note(text);
        }
        Ok(command)
    }

    fn record_note(&mut self, text: &str) {
        self.history.update_history(text, None);
        let ctx = self.last_step.clone().unwrap_or_default();
        let output = AgentOutput::new(format!("note [{text}]"), "");
        self.log_step(&ctx.objective, ctx.url.as_deref(), &ctx.observation, &output, StepStatus::Note);
    }

    /// 把提示交给当前活跃 Frame（用于可恢复错误后的重试）
    pub fn feed_active(&mut self, text: &str) -> Result<(), AgentError> {
        let frame = self.stack.peek_mut().ok_or(AgentError::EmptyStack)?;
        frame.agent.receive_response(text);
        Ok(())
    }

    /// 新 episode：清空栈、URL 记忆、策略缓存与历史
    pub fn reset(&mut self) {
        self.stack.clear();
        self.prev_url = None;
        self.detached = false;
        self.policy = None;
        self.last_step = None;
        self.history.clear();
        self.episode_id = uuid::Uuid::new_v4().to_string();
        if let Some(dir) = self.log_dir.clone() {
            match StepLogger::to_dir(&dir, &self.episode_id) {
                Ok(logger) => self.logger = Some(logger),
                Err(e) => {
                    tracing::warn!("Failed to open step log in {}: {}", dir.display(), e);
                    self.logger = None;
                }
            }
        } else if let Some(logger) = self.logger.as_mut() {
            logger.clear();
        }
    }

    /// 主入口：运行调度循环直到浮出低层动作或栈清空
    pub async fn predict_action(
        &mut self,
        objective: &str,
        observation: &str,
        url: Option<&str>,
    ) -> Result<Prediction, AgentError> {
        self.last_step = Some(StepContext {
            objective: objective.to_string(),
            url: url.map(str::to_string),
            observation: observation.to_string(),
        });
        self.ensure_policy(url)?;
        if self.stack.is_empty() {
            self.seed_root(objective)?;
        }

        let mut transitions = 0;
        loop {
            if transitions >= self.max_transitions {
                tracing::warn!(
                    "Dispatch limit reached ({}), stack: {:?}",
                    self.max_transitions,
                    self.stack.objectives()
                );
                return Err(AgentError::DispatchLimitExceeded(self.max_transitions));
            }
            transitions += 1;

            let frame = self.stack.peek_mut().ok_or(AgentError::EmptyStack)?;
            let output = frame
                .agent
                .predict_action(&frame.objective, observation, url)
                .await?;
            let frame_objective = frame.objective.clone();

            let parsed = {
                let policy = self.current_policy()?;
                self.vocabulary.parse(&output.action, &policy.policies)
            };

            match transition(&parsed) {
                Transition::ReturnLowLevel => {
                    if let Some(frame) = self.stack.peek_mut() {
                        frame.agent.receive_response("");
                    }
                    let depth = self.stack.depth();
                    tracing::debug!("Low-level action at depth {}: {}", depth, output.action);
                    self.log_step(&frame_objective, url, observation, &output, StepStatus::LowLevel { depth });
                    return Ok(Prediction {
                        action: output.action,
                        reason: output.reason,
                        parsed,
                        finished: false,
                    });
                }
                Transition::PushChild { name } => {
                    let template = self
                        .current_policy()?
                        .policies
                        .get(&name)
                        .ok_or_else(|| AgentError::UnknownPolicy(name.clone()))?;
                    let agent = self.factory.create(&name, template);
                    self.stack.push(Frame {
                        agent,
                        action_name: name,
                        objective: output.action.clone(),
                    });
                    let depth = self.stack.depth();
                    tracing::debug!("Push [{}] {}", depth, output.action);
                    self.log_step(&frame_objective, url, observation, &output, StepStatus::Push { depth });
                }
                Transition::PopFrame { payload } => {
                    self.stack.pop();
                    if let Some(parent) = self.stack.peek_mut() {
                        parent.agent.receive_response(&payload);
                    }
                    let depth = self.stack.depth();
                    tracing::debug!("Pop -> [{}] result: {}", depth, payload);
                    self.log_step(&frame_objective, url, observation, &output, StepStatus::Pop { depth });
                    if depth == 0 {
                        tracing::info!("Root goal finished: {}", output.action);
                        return Ok(Prediction {
                            action: output.action,
                            reason: output.reason,
                            parsed,
                            finished: true,
                        });
                    }
                }
                Transition::Reject => {
                    tracing::warn!("Unclassified action from [{}]: {}", frame_objective, output.action);
                    return Err(AgentError::UnclassifiedAction(output.action));
                }
            }
        }
    }

    fn current_policy(&self) -> Result<&ResolvedPolicy, AgentError> {
        self.policy.as_ref().ok_or_else(|| AgentError::RoutingFailure {
            url: self.prev_url.clone().unwrap_or_default(),
        })
    }

    /// 没有缓存策略或 URL 变化时重新选择；栈为空且策略沿用自旧站点时也重新选择
    ///
    /// 栈非空时路由失败不是错误：活跃 Frame 继续使用上一次的策略表，只是不再有根动作。
    /// RoutingFailure 只在需要播种根 Frame 时返回。
    fn ensure_policy(&mut self, url: Option<&str>) -> Result<(), AgentError> {
        let must_seed = self.stack.is_empty();
        if self.policy.is_some() && self.prev_url.as_deref() == url && !(must_seed && self.detached) {
            return Ok(());
        }
        self.prev_url = url.map(str::to_string);
        match self.selector.select(url) {
            Ok(resolved) => {
                if self.root_action() != Some(resolved.root_action.as_str()) {
                    tracing::info!(
                        "Policy selected for {}: root={} ({} policies)",
                        self.selector.benchmark().as_str(),
                        resolved.root_action,
                        resolved.policies.len()
                    );
                }
                self.policy = Some(resolved);
                self.detached = false;
                Ok(())
            }
            Err(e) if !must_seed && self.policy.is_some() => {
                tracing::warn!("{}; keeping current policies for depth {}", e, self.stack.depth());
                self.detached = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Policy selection failed: {}", e);
                self.policy = None;
                self.detached = false;
                Err(e)
            }
        }
    }

    fn seed_root(&mut self, objective: &str) -> Result<(), AgentError> {
        let policy = self.current_policy()?;
        let template = policy.root_template()?;
        let name = policy.root_action.clone();
        let agent = self.factory.create(&name, template);
        tracing::info!("Seeding root frame [{}]: {}", name, objective);
        self.stack.push(Frame {
            agent,
            action_name: name,
            objective: objective.to_string(),
        });
        Ok(())
    }

    fn log_step(
        &mut self,
        objective: &str,
        url: Option<&str>,
        observation: &str,
        output: &AgentOutput,
        status: StepStatus,
    ) {
        let Some(logger) = self.logger.as_mut() else {
            return;
        };
        logger.log(StepRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            episode_id: self.episode_id.clone(),
            objective: objective.to_string(),
            url: url.map(str::to_string),
            observation: observation.to_string(),
            action: output.action.clone(),
            reason: output.reason.clone(),
            status,
        });
    }
}
