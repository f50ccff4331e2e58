//! Step Agent - 离线回放
//!
//! 用法：`step-agent <episode.json> [config.toml]`
//!
//! episode 文件为 `{"goal": "...", "observations": [{"url": "...", "axtree_txt": "...", "pruned_html": "..."}]}`，
//! 逐条观察驱动 BrowserStepAgent，打印每步的驱动命令；根目标终止时打印答案并退出。

use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;
use step_agent::config::load_config;
use step_agent::llm::create_llm_from_config;
use step_agent::step::{AgentStep, BrowserStepAgent, Observation};

#[derive(Debug, Deserialize)]
struct Episode {
    goal: String,
    #[serde(default)]
    observations: Vec<Observation>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    step_agent::observability::init();

    let mut args = std::env::args().skip(1);
    let episode_path = args
        .next()
        .map(PathBuf::from)
        .context("Usage: step-agent <episode.json> [config.toml]")?;
    let config_path = args.next().map(PathBuf::from);

    let cfg = load_config(config_path).context("Failed to load config")?;
    let content = std::fs::read_to_string(&episode_path)
        .with_context(|| format!("Failed to read {}", episode_path.display()))?;
    let episode: Episode = serde_json::from_str(&content)
        .with_context(|| format!("Invalid episode file {}", episode_path.display()))?;

    let llm = create_llm_from_config(&cfg);
    let mut agent = BrowserStepAgent::from_config(&cfg, llm.clone()).context("Failed to build agent")?;
    tracing::info!(
        "Replaying {} observations (episode {})",
        episode.observations.len(),
        agent.engine().episode_id()
    );

    let outcome = replay(&mut agent, episode).await;

    let (prompt, completion, total) = llm.token_usage();
    tracing::info!(
        "Token usage: prompt={} completion={} total={}",
        prompt,
        completion,
        total
    );
    outcome
}

async fn replay(agent: &mut BrowserStepAgent, episode: Episode) -> anyhow::Result<()> {
    for (i, mut obs) in episode.observations.into_iter().enumerate() {
        obs.goal = episode.goal.clone();
        match agent
            .get_action(&obs)
            .await
            .with_context(|| format!("Step {} failed", i + 1))?
        {
            AgentStep::Command { command, reason } => {
                println!("[{}] {}", i + 1, command);
                tracing::debug!("reason: {}", reason);
            }
            AgentStep::Finished { answer, reason } => {
                println!("[{}] finished: {}", i + 1, answer);
                tracing::debug!("reason: {}", reason);
                return Ok(());
            }
        }
    }

    println!("Episode ended without a final answer");
    Ok(())
}
