//! Mock LLM 客户端（用于测试与离线回放，无需 API）
//!
//! 按顺序吐出预置回复；回复耗尽后返回 `stop [N/A]`，让当前子目标自然结束。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

const EXHAUSTED_REPLY: &str = "REASON:\nNo scripted reply left.\nACTION:\nstop [N/A]";

/// Mock 客户端：顺序返回脚本回复，并记录每次收到的消息
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的请求（每次 complete 的完整消息列表）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(messages.to_vec());
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front();
        Ok(next.unwrap_or_else(|| EXHAUSTED_REPLY.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_stop() {
        let llm = MockLlmClient::with_replies(["a", "b"]);
        let msgs = vec![Message::user("hi")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "a");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "b");
        assert!(llm.complete(&msgs).await.unwrap().contains("stop [N/A]"));
        assert_eq!(llm.requests().len(), 3);
    }
}
