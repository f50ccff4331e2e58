//! 内置策略模板
//!
//! 每个 benchmark 一个模块，显式返回 (动作名, 站点, 模板) 列表。

pub mod miniwob;
pub mod webarena;

/// 所有模板共用的回复格式约定，PromptAgent 按此解析
pub const RESPONSE_FORMAT: &str = "Reply in exactly this format:\nREASON:\n<why this action moves toward the objective>\nACTION:\n<one action>";

/// 拼接指令正文、可用动作说明与回复格式
pub(crate) fn instruction(body: &str, actions: &str) -> String {
    format!("{body}\n\nAvailable actions:\n{actions}\n\n{RESPONSE_FORMAT}")
}
