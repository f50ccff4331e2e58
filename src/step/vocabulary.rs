//! 动作词表与分类
//!
//! 三类动作：终止（stop）、低层（benchmark 固定词表，可直接执行）、高层（当前策略表中的子目标名）。
//! 分类顺序固定为 终止 → 低层 → 高层，全部不匹配即为无法识别。

use std::collections::HashSet;

use crate::step::action::{bracket_payload, leading_token, parse_command, ParsedAction, STOP};
use crate::step::policy::PolicyMap;

#[derive(Debug, Clone, Default)]
pub struct ActionVocabulary {
    low_level: HashSet<String>,
}

impl ActionVocabulary {
    pub fn new<I, S>(low_level: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            low_level: low_level.into_iter().map(Into::into).collect(),
        }
    }

    pub fn low_level_actions(&self) -> &HashSet<String> {
        &self.low_level
    }

    pub fn is_terminal(&self, action: &str) -> bool {
        leading_token(action) == Some(STOP)
    }

    pub fn is_low_level(&self, action: &str) -> bool {
        leading_token(action).is_some_and(|t| self.low_level.contains(t))
    }

    pub fn is_high_level(&self, action: &str, policies: &PolicyMap) -> bool {
        leading_token(action).is_some_and(|t| policies.contains(t))
    }

    /// 分类并解析：终止优先，其次低层，再次高层
    pub fn parse(&self, action: &str, policies: &PolicyMap) -> ParsedAction {
        if self.is_terminal(action) {
            return ParsedAction::Terminal {
                payload: bracket_payload(action),
            };
        }
        match leading_token(action) {
            Some(token) if self.low_level.contains(token) => parse_command(token, action),
            Some(token) if policies.contains(token) => ParsedAction::HighLevel {
                name: token.to_string(),
                args: bracket_payload(action),
            },
            _ => ParsedAction::Unrecognized(action.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentError;
    use crate::step::policy::PolicyTemplate;
    use crate::step::ActionClass;

    fn policies() -> PolicyMap {
        PolicyMap::from_entries([
            ("shop_agent", PolicyTemplate::new("shop")),
            ("search_agent", PolicyTemplate::new("search")),
        ])
    }

    #[test]
    fn test_terminal_takes_precedence_over_low_level() {
        let vocab = ActionVocabulary::new(["click", "type", "stop"]);
        let parsed = vocab.parse("stop [done]", &policies());
        assert_eq!(
            parsed,
            ParsedAction::Terminal { payload: Some("done".to_string()) }
        );
    }

    #[test]
    fn test_low_level_before_high_level() {
        let vocab = ActionVocabulary::new(["click", "search_agent"]);
        assert_eq!(vocab.parse("search_agent [x]", &policies()).class(), ActionClass::LowLevel);
    }

    #[test]
    fn test_high_level_with_args() {
        let vocab = ActionVocabulary::new(["click", "type", "stop"]);
        assert_eq!(
            vocab.parse("search_agent [find hats]", &policies()),
            ParsedAction::HighLevel {
                name: "search_agent".to_string(),
                args: Some("find hats".to_string()),
            }
        );
        assert!(vocab.is_high_level("search_agent [find hats]", &policies()));
        assert!(!vocab.is_low_level("search_agent [find hats]"));
    }

    #[test]
    fn test_unrecognized() {
        let vocab = ActionVocabulary::new(["click", "type", "stop"]);
        assert_eq!(
            vocab.parse("dance [3]", &policies()),
            ParsedAction::Unrecognized("dance [3]".to_string())
        );
        assert_eq!(
            vocab.parse("", &policies()),
            ParsedAction::Unrecognized(String::new())
        );
    }

    #[test]
    fn test_low_level_outside_command_set_is_translation_miss() {
        let vocab = ActionVocabulary::new(["press"]);
        assert!(matches!(
            vocab.parse("press [Enter]", &policies()),
            ParsedAction::InvalidLowLevel { error: AgentError::TranslationMiss(_), .. }
        ));
    }

    #[test]
    fn test_stop_inside_text_is_not_terminal() {
        let vocab = ActionVocabulary::new(["click", "type", "stop"]);
        assert!(!vocab.is_terminal("type [3] [stop sign]"));
        assert!(vocab.is_low_level("type [3] [stop sign]"));
    }
}
