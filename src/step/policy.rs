//! 策略选择：按 benchmark 与当前 URL 决定根动作与策略表
//!
//! 策略表（PolicyMap）是「高层动作名 → 提示模板」的映射，其键集合就是当前站点的高层动作词表。
//! WebArena 的多个站点按端口区分：从 URL 解析端口，查端口→站点表得到根动作名，再装载该站点的模板。
//! 端口未知时返回 RoutingFailure，调用方不得据此播种根 Frame。

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::core::AgentError;
use crate::step::prompts;

static HOST_PORT_RE: OnceLock<Regex> = OnceLock::new();

/// MiniWoB 的根动作
pub const MINIWOB_ROOT: &str = "miniwob_agent";

/// WebArena 端口 → 站点根动作
pub const WEBARENA_SITES: [(u16, &str); 5] = [
    (8023, "github_agent"),
    (9999, "reddit_agent"),
    (7770, "shopping_agent"),
    (7780, "shopping_admin_agent"),
    (3000, "maps_agent"),
];

/// 支持的 benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    #[default]
    MiniWob,
    WebArena,
}

impl Benchmark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Benchmark::MiniWob => "miniwob",
            Benchmark::WebArena => "webarena",
        }
    }

    pub fn default_low_level_actions(&self) -> &'static [&'static str] {
        match self {
            Benchmark::MiniWob => &["click", "type", "stop"],
            Benchmark::WebArena => &[
                "click", "type", "scroll", "stop", "goto", "hover", "note", "go_back",
            ],
        }
    }
}

impl std::str::FromStr for Benchmark {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "miniwob" => Ok(Benchmark::MiniWob),
            "webarena" => Ok(Benchmark::WebArena),
            other => Err(AgentError::ConfigError(format!("unknown benchmark: {other}"))),
        }
    }
}

/// few-shot 示例：一次输入与期望回复
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FewShotExample {
    pub input: String,
    pub response: String,
}

/// 提示模板；引擎只关心它是否存在，渲染由 PromptAgent 负责
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyTemplate {
    pub instruction: String,
    /// 输入格式，占位符：{objective} {url} {observation} {previous_actions}
    #[serde(default = "default_input_format")]
    pub input: String,
    #[serde(default)]
    pub examples: Vec<FewShotExample>,
}

pub fn default_input_format() -> String {
    "OBJECTIVE:\n{objective}\nURL:\n{url}\nOBSERVATION:\n{observation}\nPREVIOUS ACTIONS:\n{previous_actions}".to_string()
}

impl PolicyTemplate {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            input: default_input_format(),
            examples: Vec::new(),
        }
    }

    pub fn with_example(mut self, input: impl Into<String>, response: impl Into<String>) -> Self {
        self.examples.push(FewShotExample {
            input: input.into(),
            response: response.into(),
        });
        self
    }
}

/// 注册表中的一条策略；site 为 None 表示所有站点共享
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    pub name: String,
    pub site: Option<String>,
    pub template: PolicyTemplate,
}

impl PolicyEntry {
    pub fn shared(name: impl Into<String>, template: PolicyTemplate) -> Self {
        Self {
            name: name.into(),
            site: None,
            template,
        }
    }

    pub fn for_site(name: impl Into<String>, site: impl Into<String>, template: PolicyTemplate) -> Self {
        Self {
            name: name.into(),
            site: Some(site.into()),
            template,
        }
    }

    fn applies_to(&self, site: &str) -> bool {
        self.site.as_deref().map_or(true, |s| s == site)
    }
}

/// 高层动作名 → 模板
#[derive(Debug, Clone, Default)]
pub struct PolicyMap {
    templates: HashMap<String, Arc<PolicyTemplate>>,
}

impl PolicyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, PolicyTemplate)>,
        S: Into<String>,
    {
        Self {
            templates: entries
                .into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<PolicyTemplate>> {
        self.templates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// 显式声明的策略注册表（代替对模板模块做反射）
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    entries: Vec<PolicyEntry>,
}

impl PolicyRegistry {
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    /// 内置模板
    pub fn builtin(benchmark: Benchmark) -> Self {
        match benchmark {
            Benchmark::MiniWob => Self::new(prompts::miniwob::policies()),
            Benchmark::WebArena => Self::new(prompts::webarena::policies()),
        }
    }

    /// 覆盖同名同站点条目，其余追加
    pub fn merge(&mut self, overrides: Vec<PolicyEntry>) {
        for entry in overrides {
            match self
                .entries
                .iter_mut()
                .find(|e| e.name == entry.name && e.site == entry.site)
            {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// 构建某站点可见的策略表；site 为 None 时取全部
    pub fn policy_map(&self, site: Option<&str>) -> PolicyMap {
        PolicyMap::from_entries(
            self.entries
                .iter()
                .filter(|e| site.map_or(true, |s| e.applies_to(s)))
                .map(|e| (e.name.clone(), e.template.clone())),
        )
    }
}

/// 选出的根动作与策略表
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub root_action: String,
    pub policies: PolicyMap,
}

impl ResolvedPolicy {
    pub fn root_template(&self) -> Result<Arc<PolicyTemplate>, AgentError> {
        self.policies
            .get(&self.root_action)
            .ok_or_else(|| AgentError::UnknownPolicy(self.root_action.clone()))
    }
}

/// 从 `scheme://host:port/...` 中取端口
pub fn parse_port(url: &str) -> Option<u16> {
    let re = HOST_PORT_RE.get_or_init(|| Regex::new(r"^https?://[^/:\s]+:(\d+)(?:[/?#].*)?$").unwrap());
    re.captures(url.trim()).and_then(|c| c[1].parse().ok())
}

/// 端口 → WebArena 站点根动作
pub fn webarena_site(port: u16) -> Option<&'static str> {
    WEBARENA_SITES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, site)| *site)
}

/// 策略选择器：benchmark 固定，按 URL 决定站点
#[derive(Debug, Clone)]
pub struct PolicySelector {
    benchmark: Benchmark,
    registry: PolicyRegistry,
}

impl PolicySelector {
    pub fn new(benchmark: Benchmark) -> Self {
        Self {
            benchmark,
            registry: PolicyRegistry::builtin(benchmark),
        }
    }

    pub fn with_registry(benchmark: Benchmark, registry: PolicyRegistry) -> Self {
        Self { benchmark, registry }
    }

    pub fn benchmark(&self) -> Benchmark {
        self.benchmark
    }

    pub fn select(&self, url: Option<&str>) -> Result<ResolvedPolicy, AgentError> {
        match self.benchmark {
            Benchmark::MiniWob => Ok(ResolvedPolicy {
                root_action: MINIWOB_ROOT.to_string(),
                policies: self.registry.policy_map(None),
            }),
            Benchmark::WebArena => {
                let routing_failure = || AgentError::RoutingFailure {
                    url: url.unwrap_or_default().to_string(),
                };
                let site = url
                    .and_then(parse_port)
                    .and_then(webarena_site)
                    .ok_or_else(routing_failure)?;
                let policies = self.registry.policy_map(Some(site));
                if !policies.contains(site) {
                    return Err(AgentError::UnknownPolicy(site.to_string()));
                }
                Ok(ResolvedPolicy {
                    root_action: site.to_string(),
                    policies,
                })
            }
        }
    }
}
