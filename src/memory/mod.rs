//! 记忆层：LLM 对话消息、动作历史

pub mod conversation;
pub mod history;

pub use conversation::{Message, Role};
pub use history::{HistoryEntry, StepHistory};
