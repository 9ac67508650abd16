//! Polyfact CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a default config file
//! - `login`    — Sign in (browser OAuth or Firebase token)
//! - `logout`   — Forget the stored session
//! - `status`   — Show configuration and sign-in state
//! - `generate` — Run a single generation
//! - `chat`     — Interactive chat with streamed replies
//! - `history`  — Print the messages of a chat
//! - `agent`    — Answer a question with the ReAct agent

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(
    name = "polyfact",
    about = "Polyfact — AI generation from the command line",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LoginMethod {
    Github,
    Google,
    Firebase,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Sign in to the project configured in `project_id`
    Login {
        #[arg(value_enum, default_value_t = LoginMethod::Github)]
        method: LoginMethod,

        /// Firebase ID token (required with `firebase`)
        #[arg(long, env = "POLYFACT_FIREBASE_TOKEN")]
        token: Option<String>,

        /// Where the identity provider sends the browser back to
        #[arg(long, default_value = "http://localhost:3000")]
        redirect_to: String,

        /// Callback URL from a browser sign-in, instead of pasting it
        #[arg(long)]
        callback: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show configuration and sign-in state
    Status,

    /// Run a single generation
    Generate {
        /// The task to send
        task: String,

        /// Print the reply as it is generated
        #[arg(short, long)]
        stream: bool,

        /// Provider override (openai, cohere, llama)
        #[arg(long)]
        provider: Option<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Let the model search the web
        #[arg(long)]
        web: bool,

        /// Memory to use as context
        #[arg(long)]
        memory_id: Option<String>,
    },

    /// Chat interactively
    Chat {
        /// Continue an existing chat instead of creating one
        #[arg(long)]
        chat_id: Option<String>,

        /// Record the conversation into a memory used as context
        #[arg(long)]
        auto_memory: bool,

        /// System prompt for a new chat
        #[arg(long, conflicts_with = "system_prompt_id")]
        system_prompt: Option<String>,

        /// Stored system prompt for a new chat
        #[arg(long)]
        system_prompt_id: Option<Uuid>,

        /// Files to load into the chat's memory before the first message
        #[arg(short, long = "load")]
        load: Vec<std::path::PathBuf>,
    },

    /// Print the messages of a chat
    History {
        chat_id: String,
    },

    /// Answer a question with the ReAct agent
    Agent {
        question: String,

        /// Maximum number of searches before answering
        #[arg(long)]
        max_loops: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Login {
            method,
            token,
            redirect_to,
            callback,
        } => commands::login::run(method, token, &redirect_to, callback).await?,
        Commands::Logout => commands::login::logout().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Generate {
            task,
            stream,
            provider,
            model,
            web,
            memory_id,
        } => {
            let args = commands::generate::GenerateArgs {
                stream,
                provider,
                model,
                web,
                memory_id,
            };
            commands::generate::run(&task, args).await?
        }
        Commands::Chat {
            chat_id,
            auto_memory,
            system_prompt,
            system_prompt_id,
            load,
        } => {
            let args = commands::chat::ChatArgs {
                chat_id,
                auto_memory,
                system_prompt,
                system_prompt_id,
                load,
            };
            commands::chat::run(args).await?
        }
        Commands::History { chat_id } => commands::history::run(&chat_id).await?,
        Commands::Agent {
            question,
            max_loops,
        } => commands::agent::run(&question, max_loops).await?,
    }

    Ok(())
}
