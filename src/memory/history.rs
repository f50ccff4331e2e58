//! 跨调用动作历史
//!
//! 记录已提交的动作与理由（note 动作的文本也写在这里）。既用于 StepAgent 的跨调用记忆，
//! 也用于每个 PromptAgent 的「previous actions」提示片段。

/// 单条历史：动作、理由、子目标/执行结果回传
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    pub action: String,
    pub reason: Option<String>,
    pub response: Option<String>,
}

/// 动作历史；max_entries 为 0 表示不限，超出时丢弃最旧的记录
#[derive(Clone, Debug, Default)]
pub struct StepHistory {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl StepHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    pub fn update_history(&mut self, action: impl Into<String>, reason: Option<String>) {
        self.entries.push(HistoryEntry {
            action: action.into(),
            reason,
            response: None,
        });
        self.prune();
    }

    /// 把回传结果挂到最近一条动作上；尚无动作时单独记一条
    pub fn record_response(&mut self, response: impl Into<String>) {
        let response = response.into();
        match self.entries.last_mut() {
            Some(last) if last.response.is_none() => last.response = Some(response),
            _ => {
                self.entries.push(HistoryEntry {
                    action: String::new(),
                    reason: None,
                    response: Some(response),
                });
                self.prune();
            }
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn actions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.action.as_str()).collect()
    }

    /// 已产生的动作数（不含仅有回传结果的条目）
    pub fn action_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.action.is_empty()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 构建 Prompt 片段：每条一行 action，若有结果则附 response
    pub fn to_prompt_section(&self) -> String {
        if self.entries.is_empty() {
            return "None".to_string();
        }
        let mut s = String::new();
        for e in &self.entries {
            if !e.action.is_empty() {
                s.push_str(&format!("{}\n", e.action));
            }
            if let Some(resp) = e.response.as_deref().filter(|r| !r.is_empty()) {
                s.push_str(&format!("  -> {}\n", resp));
            }
        }
        s.trim_end().to_string()
    }

    fn prune(&mut self) {
        if self.max_entries > 0 && self.entries.len() > self.max_entries {
            let drop = self.entries.len() - self.max_entries;
            self.entries.drain(..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_attaches_to_last_action() {
        let mut h = StepHistory::new();
        h.update_history("search_agent [hats]", Some("need hats".to_string()));
        h.record_response("found");
        assert_eq!(h.len(), 1);
        assert_eq!(h.entries()[0].response.as_deref(), Some("found"));
        assert_eq!(h.to_prompt_section(), "search_agent [hats]\n  -> found");
    }

    #[test]
    fn test_response_without_action_is_kept() {
        let mut h = StepHistory::new();
        h.record_response("");
        assert_eq!(h.len(), 1);
        assert_eq!(h.action_count(), 0);
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let mut h = StepHistory::with_capacity_limit(2);
        h.update_history("click [1]", None);
        h.update_history("click [2]", None);
        h.update_history("click [3]", None);
        assert_eq!(h.actions(), vec!["click [2]", "click [3]"]);
    }
}
