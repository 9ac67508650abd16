//! `polyfact status` — show configuration and sign-in state.

use polyfact_config::ClientConfig;
use polyfact_core::{FileSessionStore, REFRESH_TOKEN_KEY, SessionStore};

use super::{CommandResult, load_config};

pub async fn run() -> CommandResult {
    let config = load_config()?;
    let store = FileSessionStore::new(config.session_path());
    let has_session = store.get(REFRESH_TOKEN_KEY).await?.is_some();

    println!("Polyfact Status");
    println!("===============");
    println!("  Config dir:   {}", ClientConfig::config_dir().display());
    println!("  Endpoint:     {}", config.endpoint());
    println!(
        "  Project:      {}",
        config.project_id.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Identity:     {}",
        if config.identity.is_configured() { "configured" } else { "not configured" }
    );
    println!("  Agent model:  {} ({})", config.agent.model, config.agent.provider);
    println!("  Max loops:    {}", config.agent.max_loops);
    println!(
        "  Token:        {}",
        if config.has_token() { "set" } else { "not set" }
    );
    println!(
        "  Session:      {}",
        if has_session { "stored" } else { "none" }
    );

    let config_path = ClientConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file. Run `polyfact init` first");
    }

    Ok(())
}
