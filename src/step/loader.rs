//! 策略模板覆盖加载器
//!
//! 从 `<policies_dir>/<benchmark>/*.toml` 读取策略定义，合并进内置注册表（同名同站点覆盖，其余追加）。
//!
//! ```toml
//! [[policy]]
//! name = "search_order"
//! site = "shopping_agent"   # 可选，缺省为所有站点共享
//! instruction = "..."
//!
//! [[policy.examples]]
//! input = "..."
//! response = "REASON:\n...\nACTION:\n..."
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::core::AgentError;
use crate::step::policy::{
    default_input_format, Benchmark, FewShotExample, PolicyEntry, PolicyRegistry, PolicyTemplate,
};

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policy: Vec<PolicyDef>,
}

#[derive(Debug, Deserialize)]
struct PolicyDef {
    name: String,
    site: Option<String>,
    instruction: String,
    #[serde(default = "default_input_format")]
    input: String,
    #[serde(default)]
    examples: Vec<FewShotExample>,
}

impl From<PolicyDef> for PolicyEntry {
    fn from(def: PolicyDef) -> Self {
        PolicyEntry {
            name: def.name,
            site: def.site,
            template: PolicyTemplate {
                instruction: def.instruction,
                input: def.input,
                examples: def.examples,
            },
        }
    }
}

/// 解析单个策略文件内容
pub fn parse_policy_file(content: &str) -> Result<Vec<PolicyEntry>, AgentError> {
    let file: PolicyFile =
        toml::from_str(content).map_err(|e| AgentError::ConfigError(e.to_string()))?;
    Ok(file.policy.into_iter().map(PolicyEntry::from).collect())
}

/// 读取某 benchmark 的覆盖目录；目录不存在时返回空列表
pub fn load_policy_dir(root: &Path, benchmark: Benchmark) -> Result<Vec<PolicyEntry>, AgentError> {
    let dir = root.join(benchmark.as_str());
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut entries = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        let parsed = parse_policy_file(&content)
            .map_err(|e| AgentError::ConfigError(format!("{}: {}", path.display(), e)))?;
        entries.extend(parsed);
    }

    tracing::info!(
        "Loaded {} policy overrides from {}",
        entries.len(),
        dir.display()
    );
    Ok(entries)
}

/// 内置注册表 + 可选覆盖目录
pub fn load_registry(benchmark: Benchmark, policies_dir: Option<&Path>) -> Result<PolicyRegistry, AgentError> {
    let mut registry = PolicyRegistry::builtin(benchmark);
    if let Some(dir) = policies_dir {
        registry.merge(load_policy_dir(dir, benchmark)?);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_file() {
        let content = r#"
[[policy]]
name = "search_order"
site = "shopping_agent"
instruction = "find the order"

[[policy.examples]]
input = "OBJECTIVE: x"
response = "REASON:\nr\nACTION:\nstop [x]"
"#;
        let entries = parse_policy_file(content).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].site.as_deref(), Some("shopping_agent"));
        assert_eq!(entries[0].template.examples.len(), 1);
        assert!(entries[0].template.input.contains("{observation}"));
    }

    #[test]
    fn test_parse_policy_file_invalid() {
        assert!(matches!(
            parse_policy_file("[[policy]]\nname = 3"),
            Err(AgentError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_registry_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let bench_dir = dir.path().join("miniwob");
        std::fs::create_dir_all(&bench_dir).unwrap();
        std::fs::write(
            bench_dir.join("custom.toml"),
            "[[policy]]\nname = \"miniwob_agent\"\ninstruction = \"custom root\"\n",
        )
        .unwrap();
        std::fs::write(bench_dir.join("notes.txt"), "ignored").unwrap();

        let registry = load_registry(Benchmark::MiniWob, Some(dir.path())).unwrap();
        let map = registry.policy_map(None);
        assert_eq!(map.get("miniwob_agent").unwrap().instruction, "custom root");
        assert!(map.contains("fill_text"));
    }

    #[test]
    fn test_benchmark_path_that_is_not_a_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("webarena"), "not a directory").unwrap();
        assert!(matches!(
            load_policy_dir(dir.path(), Benchmark::WebArena),
            Err(AgentError::Io(_))
        ));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_policy_dir(dir.path(), Benchmark::WebArena).unwrap().is_empty());
    }
}
