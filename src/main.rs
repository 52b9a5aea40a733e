//! tool-loop - command line entry point
//!
//! Runs one of the demo agents against the configured Responses endpoint.
//! The prompt is taken from the command line arguments.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tool_loop::{agent::LoopState, config::Config, llm::ResponsesClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_loop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let client = ResponsesClient::from_config(&config)?;
    info!(
        "Loaded configuration: demo={} model={} endpoint={}",
        config.demo,
        client.model(),
        config.base_url
    );

    let prompt = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            config.demo.default_prompt().to_string()
        } else {
            args.join(" ")
        }
    };

    let policy = config.policy().on_round(|report| {
        for result in &report.results {
            info!(
                round = report.round,
                agent = %report.agent,
                call_id = %result.call_id,
                success = result.is_success(),
                "Tool result"
            );
        }
        if report.state == LoopState::Done {
            info!(round = report.round, agent = %report.agent, "Model produced a final answer");
        }
    });

    let agent = config
        .demo
        .build(Arc::new(client), config.instructions.as_deref())?
        .with_policy(policy);

    // Cancel the conversation on Ctrl-C
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling conversation");
                cancel.cancel();
            }
        });
    }

    match agent.run_with_cancel(&prompt, cancel).await {
        Ok(answer) => {
            info!(
                rounds = answer.rounds,
                agent = %answer.agent,
                total_tokens = answer.usage.total_tokens(),
                "Conversation complete"
            );
            println!("{}", answer.content);
            Ok(())
        }
        Err(report) => {
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
            Err(report.into())
        }
    }
}
