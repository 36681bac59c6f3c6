//! Autonomous trading agent for the Butler barter game.
//!
//! Polls the game server for inventory, goal, mailbox, and roster state,
//! asks an LLM to pick one of four trade actions, validates the pick, and
//! executes it. Runs until killed. All configuration comes from `TRUEQUE_*`
//! environment variables, see [`config::AgentConfig::from_env`].

mod actions;
mod butler;
mod config;
mod error;
mod llm;
mod parse;
mod prompt;
mod runner;
#[cfg(test)]
mod testutil;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::butler::ButlerClient;
use crate::config::AgentConfig;
use crate::llm::LlmBackend;
use crate::prompt::PromptEngine;
use crate::runner::AgentLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AgentConfig::from_env()?;
    info!(
        butler = config.butler_url,
        player = config.player_name,
        model = config.backend.model,
        "starting trueque agent"
    );

    let client = ButlerClient::new(&config)?;
    if config.register_alias {
        match client.register_alias(&config.player_name).await {
            Ok(true) => info!(alias = config.player_name, "alias registered"),
            Ok(false) => warn!(alias = config.player_name, "alias registration not confirmed"),
            Err(e) => warn!(error = %e, "alias registration failed; continuing"),
        }
    }

    let backend = LlmBackend::new(&config.backend)?;
    info!(backend = backend.name(), "decision backend ready");

    let mut agent = AgentLoop::new(
        client,
        backend,
        PromptEngine::new()?,
        StdRng::from_os_rng(),
        config.player_name,
        // Transport timeout plus headroom; the loop-side bound is the backstop.
        config.backend.timeout.saturating_add(std::time::Duration::from_secs(2)),
        config.iteration_delay,
        config.broadcast_cooldown,
        config.broadcast_min_interval,
    );
    agent.run().await;
    Ok(())
}
