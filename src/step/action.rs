//! 模型动作字符串解析
//!
//! 在任何分支之前把模型输出（如 `click [12]`、`type [12] [hello] [1]`、`search_agent [hats]`、`stop [OK]`）
//! 解析成封闭枚举 ParsedAction。调度引擎据此分类（终止 / 低层 / 高层 / 无法识别），
//! 翻译器据此生成浏览器命令，两者共用同一个解析结果。

use std::sync::OnceLock;

use regex::Regex;

use crate::core::AgentError;

/// 终止动作关键字
pub const STOP: &str = "stop";

/// 可翻译的低层命令关键字，按匹配优先级排列
pub const COMMAND_KEYWORDS: [&str; 7] = ["click", "type", "scroll", "goto", "hover", "go_back", "note"];

static CLICK_RE: OnceLock<Regex> = OnceLock::new();
static TYPE_RE: OnceLock<Regex> = OnceLock::new();
static SCROLL_RE: OnceLock<Regex> = OnceLock::new();
static GOTO_RE: OnceLock<Regex> = OnceLock::new();
static HOVER_RE: OnceLock<Regex> = OnceLock::new();
static NOTE_RE: OnceLock<Regex> = OnceLock::new();
static BRACKET_RE: OnceLock<Regex> = OnceLock::new();

/// 滚动方向
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// 动作的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    Terminal,
    LowLevel,
    HighLevel,
    Unrecognized,
}

/// 解析后的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAction {
    Click {
        id: String,
    },
    Type {
        id: String,
        text: String,
        /// `[0|1]` 回车标志；只解析不执行
        press_enter: Option<bool>,
    },
    Scroll {
        direction: ScrollDirection,
    },
    Goto {
        url: String,
    },
    Hover {
        id: String,
    },
    GoBack,
    Note {
        text: String,
    },
    /// 关键字在低层词表内，但参数提取失败或不是已知浏览器命令
    InvalidLowLevel {
        raw: String,
        error: AgentError,
    },
    HighLevel {
        name: String,
        args: Option<String>,
    },
    Terminal {
        payload: Option<String>,
    },
    Unrecognized(String),
}

impl ParsedAction {
    pub fn class(&self) -> ActionClass {
        match self {
            ParsedAction::Terminal { .. } => ActionClass::Terminal,
            ParsedAction::HighLevel { .. } => ActionClass::HighLevel,
            ParsedAction::Unrecognized(_) => ActionClass::Unrecognized,
            _ => ActionClass::LowLevel,
        }
    }

    /// 不依赖词表、只按浏览器命令关键字解析一条低层动作
    ///
    /// 首个 token 是已知关键字时按它解析；否则按 click → type → scroll → goto → hover → go_back → note
    /// 的优先级找第一个出现的子串。都不匹配时返回 InvalidLowLevel(TranslationMiss)。
    pub fn parse_low_level(raw: &str) -> ParsedAction {
        let keyword = leading_token(raw)
            .filter(|t| COMMAND_KEYWORDS.contains(t))
            .or_else(|| COMMAND_KEYWORDS.iter().copied().find(|k| raw.contains(k)));
        match keyword {
            Some(k) => parse_command(k, raw),
            None => ParsedAction::InvalidLowLevel {
                raw: raw.to_string(),
                error: AgentError::TranslationMiss(raw.to_string()),
            },
        }
    }
}

/// 首个空白分隔 token，截断到第一个 `[`（`click[12]` 视为 `click`）
pub fn leading_token(raw: &str) -> Option<&str> {
    raw.split_whitespace()
        .next()
        .and_then(|t| t.split('[').next())
        .filter(|t| !t.is_empty())
}

/// 第一对方括号内的文本
pub fn bracket_payload(raw: &str) -> Option<String> {
    let re = BRACKET_RE.get_or_init(|| Regex::new(r"(?s)\[(.*?)\]").unwrap());
    re.captures(raw).map(|c| c[1].to_string())
}

/// 按关键字提取参数；关键字不是已知浏览器命令时返回 TranslationMiss
pub(crate) fn parse_command(keyword: &str, raw: &str) -> ParsedAction {
    let malformed = |what: &str| ParsedAction::InvalidLowLevel {
        raw: raw.to_string(),
        error: AgentError::MalformedAction(format!("{what}: {raw}")),
    };

    match keyword {
        "click" => {
            let re = CLICK_RE.get_or_init(|| Regex::new(r"(?s)click\s*\[(\w+)\]").unwrap());
            match re.captures(raw) {
                Some(c) => ParsedAction::Click { id: c[1].to_string() },
                None => malformed("click expects `click [id]`"),
            }
        }
        "type" => {
            let re = TYPE_RE.get_or_init(|| {
                Regex::new(r"(?s)type\s*\[(\w+)\]\s*\[(.*?)\](\s*\[(0|1)\])?").unwrap()
            });
            match re.captures(raw) {
                Some(c) => ParsedAction::Type {
                    id: c[1].to_string(),
                    text: c[2].to_string(),
                    press_enter: c.get(4).map(|m| m.as_str() == "1"),
                },
                None => malformed("type expects `type [id] [text] [0|1]`"),
            }
        }
        "scroll" => {
            let re = SCROLL_RE.get_or_init(|| Regex::new(r"(?s)scroll\s*\[(.*?)\]").unwrap());
            let Some(c) = re.captures(raw) else {
                return malformed("scroll expects `scroll [up|down]`");
            };
            let dir = c[1].trim();
            let dir = dir.strip_prefix("direction=").unwrap_or(dir);
            match dir {
                "up" => ParsedAction::Scroll { direction: ScrollDirection::Up },
                "down" => ParsedAction::Scroll { direction: ScrollDirection::Down },
                _ => ParsedAction::InvalidLowLevel {
                    raw: raw.to_string(),
                    error: AgentError::TranslationMiss(raw.to_string()),
                },
            }
        }
        "goto" => {
            let re = GOTO_RE.get_or_init(|| Regex::new(r"(?s)goto\s*\[(.*?)\]").unwrap());
            match re.captures(raw) {
                Some(c) => ParsedAction::Goto { url: c[1].to_string() },
                None => malformed("goto expects `goto [url]`"),
            }
        }
        "hover" => {
            let re = HOVER_RE.get_or_init(|| Regex::new(r"(?s)hover\s*\[(\w+)\]").unwrap());
            match re.captures(raw) {
                Some(c) => ParsedAction::Hover { id: c[1].to_string() },
                None => malformed("hover expects `hover [id]`"),
            }
        }
        "go_back" => ParsedAction::GoBack,
        "note" => {
            let re = NOTE_RE.get_or_init(|| Regex::new(r"(?s)note\s*\[(.*?)\]").unwrap());
            match re.captures(raw) {
                Some(c) => ParsedAction::Note { text: c[1].to_string() },
                None => malformed("note expects `note [text]`"),
            }
        }
        _ => ParsedAction::InvalidLowLevel {
            raw: raw.to_string(),
            error: AgentError::TranslationMiss(raw.to_string()),
        },
    }
}
