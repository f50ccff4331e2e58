//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `STEP__*` 覆盖（双下划线表示嵌套，如 `STEP__AGENT__BENCHMARK=webarena`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::step::{Benchmark, PromptMode};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
}

/// [app] 段：应用名、步骤日志目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// StepRecord JSONL 写入目录（agent.logging = true 时生效）
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [agent] 段：benchmark、低层动作词表、子智能体步数上限与调度保护
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default)]
    pub benchmark: Benchmark,
    /// 为空时使用 benchmark 的默认词表
    #[serde(default)]
    pub low_level_actions: Vec<String>,
    /// 单个子智能体最多产生的动作数，超出后自动 stop
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
    #[serde(default)]
    pub prompt_mode: PromptMode,
    /// true 用裁剪后的 HTML，false 用无障碍树文本
    #[serde(default)]
    pub use_dom: bool,
    /// 是否写 StepRecord 日志
    #[serde(default)]
    pub logging: bool,
    /// 单次 predict_action 内允许的最大状态转移次数
    #[serde(default = "default_max_transitions")]
    pub max_transitions: usize,
    /// 可恢复错误的最大重试次数（每步）
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// 策略模板覆盖目录：<dir>/<benchmark>/*.toml
    pub policies_dir: Option<PathBuf>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            benchmark: Benchmark::default(),
            low_level_actions: Vec::new(),
            max_actions: default_max_actions(),
            prompt_mode: PromptMode::default(),
            use_dom: false,
            logging: false,
            max_transitions: default_max_transitions(),
            max_retries: default_max_retries(),
            policies_dir: None,
        }
    }
}

impl AgentSection {
    /// 实际生效的低层动作词表
    pub fn effective_low_level_actions(&self) -> Vec<String> {
        if self.low_level_actions.is_empty() {
            self.benchmark
                .default_low_level_actions()
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.low_level_actions.clone()
        }
    }
}

fn default_max_actions() -> usize {
    10
}

fn default_max_transitions() -> usize {
    64
}

fn default_max_retries() -> usize {
    2
}

/// 从 config 目录加载配置，环境变量 STEP__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 STEP__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(env_source());

    let c = builder.build()?;
    c.try_deserialize()
}

/// 环境变量源：`STEP__AGENT__LOW_LEVEL_ACTIONS=click,type,stop` 按逗号解析为列表
fn env_source() -> config::Environment {
    config::Environment::with_prefix("STEP")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("agent.low_level_actions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.benchmark, Benchmark::MiniWob);
        assert_eq!(cfg.agent.max_actions, 10);
        assert_eq!(
            cfg.agent.effective_low_level_actions(),
            vec!["click", "type", "stop"]
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[agent]\nbenchmark = \"webarena\"\nmax_retries = 5\nlow_level_actions = [\"click\", \"stop\"]"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.agent.benchmark, Benchmark::WebArena);
        assert_eq!(cfg.agent.max_retries, 5);
        assert_eq!(cfg.agent.effective_low_level_actions(), vec!["click", "stop"]);
        assert_eq!(cfg.agent.max_transitions, 64);
    }

    #[test]
    fn test_env_low_level_actions_list() {
        let mut vars = config::Map::new();
        vars.insert(
            "STEP__AGENT__LOW_LEVEL_ACTIONS".to_string(),
            "click,type,stop".to_string(),
        );
        vars.insert("STEP__AGENT__MAX_ACTIONS".to_string(), "5".to_string());

        let cfg: AppConfig = config::Config::builder()
            .add_source(env_source().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(
            cfg.agent.effective_low_level_actions(),
            vec!["click", "type", "stop"]
        );
        assert_eq!(cfg.agent.max_actions, 5);
    }
}
