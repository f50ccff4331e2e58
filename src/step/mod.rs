//! 分层动作调度
//!
//! - **action**: 模型动作字符串 → ParsedAction
//! - **vocabulary**: 终止 / 低层 / 高层分类
//! - **policy**: benchmark 与站点路由、策略注册表
//! - **frame**: 子智能体接口与调用栈
//! - **engine**: StepAgent 调度状态机
//! - **prompt_agent**: LLM 驱动的子智能体
//! - **translate**: 低层动作 → 浏览器驱动命令
//! - **browser**: 面向浏览器执行层的单步适配器

pub mod action;
pub mod browser;
pub mod engine;
pub mod events;
pub mod frame;
pub mod loader;
pub mod policy;
pub mod prompt_agent;
pub mod prompts;
pub mod translate;
pub mod vocabulary;

pub use action::{ActionClass, ParsedAction, ScrollDirection};
pub use browser::{AgentStep, BrowserStepAgent, Observation};
pub use engine::{transition, DispatchState, Prediction, StepAgent, Transition};
pub use events::{StepLogger, StepRecord, StepStatus};
pub use frame::{AgentOutput, CallStack, Frame, SubAgent, SubAgentFactory};
pub use loader::load_registry;
pub use policy::{
    Benchmark, PolicyEntry, PolicyMap, PolicyRegistry, PolicySelector, PolicyTemplate, ResolvedPolicy,
};
pub use prompt_agent::{PromptAgent, PromptAgentFactory, PromptMode};
pub use translate::{to_driver_command, DriverCommand};
pub use vocabulary::ActionVocabulary;
