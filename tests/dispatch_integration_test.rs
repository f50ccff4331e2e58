//! 调度引擎集成测试：脚本化子智能体走完整的压栈 / 出栈流程，Mock LLM 走完整的浏览器单步流程

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use step_agent::config::AgentSection;
    use step_agent::core::AgentError;
    use step_agent::llm::MockLlmClient;
    use step_agent::step::*;

    /// 按动作名排队的输出；记录每个子智能体看到的目标与收到的回传
    #[derive(Clone, Default)]
    struct Script {
        outputs: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
        objectives: Arc<Mutex<Vec<(String, String)>>>,
        received: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Script {
        fn queue(&self, name: &str, actions: &[&str]) {
            self.outputs
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default()
                .extend(actions.iter().map(|a| a.to_string()));
        }
    }

    struct ScriptedAgent {
        name: String,
        script: Script,
    }

    #[async_trait]
    impl SubAgent for ScriptedAgent {
        async fn predict_action(
            &mut self,
            objective: &str,
            _observation: &str,
            _url: Option<&str>,
        ) -> Result<AgentOutput, AgentError> {
            self.script
                .objectives
                .lock()
                .unwrap()
                .push((self.name.clone(), objective.to_string()));
            let next = self
                .script
                .outputs
                .lock()
                .unwrap()
                .get_mut(&self.name)
                .and_then(|q| q.pop_front());
            next.map(|a| AgentOutput::new(a, "scripted"))
                .ok_or_else(|| AgentError::LlmError(format!("{} has no more actions", self.name)))
        }

        fn receive_response(&mut self, response: &str) {
            self.script
                .received
                .lock()
                .unwrap()
                .push((self.name.clone(), response.to_string()));
        }
    }

    impl SubAgentFactory for Script {
        fn create(&self, action_name: &str, _template: Arc<PolicyTemplate>) -> Box<dyn SubAgent> {
            Box::new(ScriptedAgent {
                name: action_name.to_string(),
                script: self.clone(),
            })
        }
    }

    const SHOP_URL: &str = "http://127.0.0.1:7770/";

    fn shop_engine(script: &Script) -> StepAgent {
        let registry = PolicyRegistry::new(vec![
            PolicyEntry::for_site("shopping_agent", "shopping_agent", PolicyTemplate::new("shop")),
            PolicyEntry::shared("search_agent", PolicyTemplate::new("search")),
        ]);
        StepAgent::new(
            PolicySelector::with_registry(Benchmark::WebArena, registry),
            ActionVocabulary::new(["click", "type", "stop"]),
            Arc::new(script.clone()),
        )
    }

    #[tokio::test]
    async fn test_buy_a_hat_scenario() {
        let script = Script::default();
        script.queue("shopping_agent", &["search_agent [find hats]", "type [5] [red hat] [1]"]);
        script.queue("search_agent", &["click [101]", "stop [found]"]);
        let mut agent = shop_engine(&script);

        // 第一次调用：根 Frame 压入子 Frame，子 Frame 的低层动作原样返回
        let p = agent
            .predict_action("buy a hat", "<html/>", Some(SHOP_URL))
            .await
            .unwrap();
        assert_eq!(p.action, "click [101]");
        assert!(!p.finished);
        assert_eq!(agent.depth(), 2);
        assert_eq!(agent.objectives(), vec!["buy a hat", "search_agent [find hats]"]);
        assert_eq!(agent.root_action(), Some("shopping_agent"));

        // 第二次调用：子 Frame 终止，父 Frame 收到 "found" 后在同一次调用内继续预测
        let p = agent
            .predict_action("buy a hat", "<html/>", Some(SHOP_URL))
            .await
            .unwrap();
        assert_eq!(p.action, "type [5] [red hat] [1]");
        assert_eq!(agent.depth(), 1);

        let received = script.received.lock().unwrap().clone();
        let found: Vec<_> = received
            .iter()
            .filter(|(n, r)| n == "shopping_agent" && r == "found")
            .collect();
        assert_eq!(found.len(), 1);

        let objectives = script.objectives.lock().unwrap().clone();
        assert_eq!(
            objectives,
            vec![
                ("shopping_agent".to_string(), "buy a hat".to_string()),
                ("search_agent".to_string(), "search_agent [find hats]".to_string()),
                ("search_agent".to_string(), "search_agent [find hats]".to_string()),
                ("shopping_agent".to_string(), "buy a hat".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_same_port_routes_identically() {
        let selector = PolicySelector::new(Benchmark::WebArena);
        let a = selector.select(Some("http://127.0.0.1:9999/")).unwrap();
        let b = selector.select(Some("http://10.1.2.3:9999/f/books")).unwrap();
        assert_eq!(a.root_action, b.root_action);
        assert_eq!(a.policies.names(), b.policies.names());

        assert!(matches!(
            selector.select(Some("http://127.0.0.1:1/")),
            Err(AgentError::RoutingFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_browser_episode_with_mock_llm() {
        let llm = Arc::new(MockLlmClient::with_replies([
            "REASON:\nSearch first.\nACTION:\nsearch_product [red hat]",
            "REASON:\nUse the search box.\nACTION:\ntype [5] [red hat] [1]",
            "REASON:\nItem 12 matches.\nACTION:\nstop [item 12 is a red hat]",
            "REASON:\nOpen it.\nACTION:\nclick [12]",
            "REASON:\nDone.\nACTION:\nstop [bought]",
        ]));
        let cfg = AgentSection {
            benchmark: Benchmark::WebArena,
            ..AgentSection::default()
        };
        let engine = StepAgent::from_config(&cfg, llm.clone(), None).unwrap();
        let mut agent = BrowserStepAgent::new(engine, true, cfg.max_retries);

        let obs = Observation {
            goal: "buy a red hat".to_string(),
            url: SHOP_URL.to_string(),
            pruned_html: "<input id=5/>".to_string(),
            axtree_txt: String::new(),
        };

        let step = agent.get_action(&obs).await.unwrap();
        match step {
            AgentStep::Command { command, .. } => assert_eq!(command.to_string(), "fill('5', 'red hat')"),
            other => panic!("unexpected step: {other:?}"),
        }

        let step = agent.get_action(&obs).await.unwrap();
        match step {
            AgentStep::Command { command, reason } => {
                assert_eq!(command.to_string(), "click(\"12\")");
                assert_eq!(reason, "Open it.");
            }
            other => panic!("unexpected step: {other:?}"),
        }

        let step = agent.get_action(&obs).await.unwrap();
        assert_eq!(
            step,
            AgentStep::Finished {
                answer: "bought".to_string(),
                reason: "Done.".to_string(),
            }
        );
        assert_eq!(agent.engine().state(), DispatchState::Empty);

        // 根 Frame 第二次预测时能看到子目标结果
        let requests = llm.requests();
        assert_eq!(requests.len(), 5);
        let root_input = &requests[3].last().unwrap().content;
        assert!(root_input.contains("search_product [red hat]\n  -> item 12 is a red hat"));
        assert!(root_input.contains("<input id=5/>"));
    }

    #[tokio::test]
    async fn test_step_log_written_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::with_replies([
            "REASON:\nr\nACTION:\nfill_text [name field]",
            "REASON:\nr\nACTION:\nstop [typed]",
            "REASON:\nr\nACTION:\nclick [3]",
        ]));
        let cfg = AgentSection {
            logging: true,
            ..AgentSection::default()
        };
        let mut agent = StepAgent::from_config(&cfg, llm, Some(dir.path().to_path_buf())).unwrap();

        let p = agent.predict_action("fill the form", "<form/>", None).await.unwrap();
        assert_eq!(p.action, "click [3]");

        let path = dir.path().join(format!("{}.jsonl", agent.episode_id()));
        let content = std::fs::read_to_string(path).unwrap();
        let statuses: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["status"].clone())
            .collect();
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0]["push"]["depth"], 2);
        assert_eq!(statuses[1]["pop"]["depth"], 1);
        assert_eq!(statuses[2]["low_level"]["depth"], 1);
    }
}
