//! `polyfact agent` — answer a question with the ReAct agent.

use std::sync::Arc;

use polyfact_agent::{AgentOptions, ProgressStep, ReactAgent};
use tracing::info;

use super::{CommandResult, load_config, signed_in_client};

pub async fn run(question: &str, max_loops: Option<u32>) -> CommandResult {
    let config = load_config()?;
    let client = signed_in_client(&config).await?;

    let mut options = AgentOptions::from(&config.agent);
    if let Some(max_loops) = max_loops {
        options.max_loops = max_loops.max(1);
    }
    let agent = ReactAgent::new(Arc::new(client), options);

    // Ctrl+C asks the agent to answer with what it has.
    let handle = agent.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            handle.stop();
        }
    });

    let answer = agent
        .start(question, |step, text| match step {
            ProgressStep::Process => {
                for line in text.lines() {
                    eprintln!("  {line}");
                }
            }
            ProgressStep::Observation => {
                eprintln!("  Observation: {}", text.trim());
                eprintln!();
            }
            ProgressStep::Finish => eprintln!(),
        })
        .await?;

    println!("{answer}");
    Ok(())
}
