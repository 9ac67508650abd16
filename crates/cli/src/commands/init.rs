//! `polyfact init` — write a default config file.

use polyfact_config::ClientConfig;

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config_dir = ClientConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run `polyfact init`.");
        return Ok(());
    }

    std::fs::write(&config_path, ClientConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set `token`, or `project_id` and the [identity] section");
    println!("  2. Run: polyfact login   (when using a project)");
    println!("  3. Run: polyfact chat");
    Ok(())
}
