//! Subcommand implementations and the setup they share.

pub mod agent;
pub mod chat;
pub mod generate;
pub mod history;
pub mod init;
pub mod login;
pub mod status;

use polyfact_client::{AuthClient, PolyfactClient};
use polyfact_config::ClientConfig;
use tracing::debug;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<ClientConfig, Box<dyn std::error::Error>> {
    Ok(ClientConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// A client ready to call the service.
///
/// A configured token is used as is. Otherwise the stored session is
/// restored through the identity provider.
pub async fn signed_in_client(
    config: &ClientConfig,
) -> Result<PolyfactClient, Box<dyn std::error::Error>> {
    let client = PolyfactClient::from_config(config)?;
    if client.credentials().is_authenticated() {
        return Ok(client);
    }

    if config.project_id.is_some() {
        let auth = AuthClient::from_config(client.clone(), config)?;
        if auth.init(None).await? {
            debug!("Restored stored session");
            return Ok(client);
        }
    }

    eprintln!();
    eprintln!("  ERROR: Not signed in!");
    eprintln!();
    eprintln!("  Either set an access token:");
    eprintln!("    export POLYFACT_TOKEN=...");
    eprintln!();
    eprintln!("  Or sign in to your project:");
    eprintln!("    export POLYFACT_PROJECT_ID=...");
    eprintln!("    polyfact login");
    eprintln!();
    Err("Not signed in. See above for setup instructions.".into())
}
