//! 动作翻译：低层动作字符串 → 浏览器驱动命令
//!
//! `click [12]` → `click("12")`，`type [12] [hello] [1]` → `fill('12', 'hello')`，
//! `scroll [up]` → `scroll('-5')`，`goto [url]` → `goto('url')`，`hover [id]` → `hover('id')`，
//! `go_back` → `go_back()`。`note [text]` 不操作页面，返回 `noop()`；文本由 StepAgent::translate 写入跨调用历史。

use std::fmt;

use crate::core::AgentError;
use crate::step::action::{ParsedAction, ScrollDirection};

/// 每次滚动的像素步长（向上为负）
const SCROLL_STEP: i32 = 5;

/// 浏览器驱动可执行的规范命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    Click { id: String },
    /// 回车标志目前只保留、不生成额外按键命令
    Fill { id: String, text: String, press_enter: Option<bool> },
    Scroll { delta: i32 },
    Goto { url: String },
    Hover { id: String },
    GoBack,
    Noop,
}

impl fmt::Display for DriverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverCommand::Click { id } => write!(f, "click(\"{}\")", id),
            DriverCommand::Fill { id, text, .. } => write!(f, "fill('{}', '{}')", id, quote(text)),
            DriverCommand::Scroll { delta } => write!(f, "scroll('{}')", delta),
            DriverCommand::Goto { url } => write!(f, "goto('{}')", quote(url)),
            DriverCommand::Hover { id } => write!(f, "hover('{}')", id),
            DriverCommand::GoBack => write!(f, "go_back()"),
            DriverCommand::Noop => write!(f, "noop()"),
        }
    }
}

fn quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// 把已解析动作翻译为驱动命令；不产生副作用，note 一律给出 Noop
pub fn to_driver_command(parsed: &ParsedAction) -> Result<DriverCommand, AgentError> {
    match parsed {
        ParsedAction::Click { id } => Ok(DriverCommand::Click { id: id.clone() }),
        ParsedAction::Type { id, text, press_enter } => Ok(DriverCommand::Fill {
            id: id.clone(),
            text: text.clone(),
            press_enter: *press_enter,
        }),
        ParsedAction::Scroll { direction } => Ok(DriverCommand::Scroll {
            delta: match direction {
                ScrollDirection::Up => -SCROLL_STEP,
                ScrollDirection::Down => SCROLL_STEP,
            },
        }),
        ParsedAction::Goto { url } => Ok(DriverCommand::Goto { url: url.clone() }),
        ParsedAction::Hover { id } => Ok(DriverCommand::Hover { id: id.clone() }),
        ParsedAction::GoBack => Ok(DriverCommand::GoBack),
        ParsedAction::Note { .. } => Ok(DriverCommand::Noop),
        ParsedAction::InvalidLowLevel { error, .. } => Err(error.clone()),
        ParsedAction::HighLevel { name, args } => Err(AgentError::TranslationMiss(match args {
            Some(a) => format!("{name} [{a}]"),
            None => name.clone(),
        })),
        ParsedAction::Terminal { payload } => Err(AgentError::TranslationMiss(format!(
            "stop [{}]",
            payload.as_deref().unwrap_or_default()
        ))),
        ParsedAction::Unrecognized(raw) => Err(AgentError::TranslationMiss(raw.clone())),
    }
}
