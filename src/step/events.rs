//! 步骤日志：压栈 / 出栈 / note / 返回低层动作时的结构化记录
//!
//! 纯观测用途，不影响控制流。开启后逐条追加为 JSON Lines，便于离线查看一个 episode 的调度过程。

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// 高层动作：压入子 Frame
    Push { depth: usize },
    /// 终止动作：弹出 Frame，depth 为弹出后的深度
    Pop { depth: usize },
    /// note 写入历史
    Note,
    /// 低层动作返回给调用方
    LowLevel { depth: usize },
}

/// 单条步骤记录
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub timestamp: String,
    pub episode_id: String,
    pub objective: String,
    pub url: Option<String>,
    pub observation: String,
    pub action: String,
    pub reason: String,
    pub status: StepStatus,
}

/// 步骤日志：内存保留全部记录，配置了文件时同时追加 JSONL
#[derive(Debug, Default)]
pub struct StepLogger {
    records: Vec<StepRecord>,
    file: Option<PathBuf>,
}

impl StepLogger {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// 写入 `<dir>/<episode_id>.jsonl`
    pub fn to_dir(dir: &Path, episode_id: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            records: Vec::new(),
            file: Some(dir.join(format!("{episode_id}.jsonl"))),
        })
    }

    pub fn log(&mut self, record: StepRecord) {
        if let Some(path) = &self.file {
            if let Err(e) = append_line(path, &record) {
                tracing::warn!("Failed to write step record to {}: {}", path.display(), e);
            }
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn append_line(path: &Path, record: &StepRecord) -> std::io::Result<()> {
    let line = serde_json::to_string(record)?;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(f, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(action: &str, status: StepStatus) -> StepRecord {
        StepRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            episode_id: "ep-1".to_string(),
            objective: "buy a hat".to_string(),
            url: Some("http://127.0.0.1:7770/".to_string()),
            observation: "<html/>".to_string(),
            action: action.to_string(),
            reason: "because".to_string(),
            status,
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(record("search_agent [hats]", StepStatus::Push { depth: 2 })).unwrap();
        assert_eq!(json["status"]["push"]["depth"], 2);
        let json = serde_json::to_value(record("note [x]", StepStatus::Note)).unwrap();
        assert_eq!(json["status"], "note");
    }

    #[test]
    fn test_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = StepLogger::to_dir(dir.path(), "ep-1").unwrap();
        logger.log(record("click [1]", StepStatus::LowLevel { depth: 1 }));
        logger.log(record("stop [ok]", StepStatus::Pop { depth: 0 }));

        let content = std::fs::read_to_string(logger.path().unwrap()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["action"], "click [1]");
        assert_eq!(logger.records().len(), 2);
    }
}
