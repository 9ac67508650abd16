//! `polyfact chat` — interactive chat with streamed replies.

use std::io::Write;
use std::path::PathBuf;

use polyfact_client::{Chat, ChatOptions, DataSource, LoadProgress};
use polyfact_core::GenerationOptions;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use super::{CommandResult, load_config, signed_in_client};

pub struct ChatArgs {
    pub chat_id: Option<String>,
    pub auto_memory: bool,
    pub system_prompt: Option<String>,
    pub system_prompt_id: Option<Uuid>,
    pub load: Vec<PathBuf>,
}

impl ChatArgs {
    fn options(&self) -> ChatOptions {
        let mut options = ChatOptions::default().with_auto_memory(self.auto_memory);
        if let Some(prompt) = &self.system_prompt {
            options = options.with_system_prompt(prompt.clone());
        }
        if let Some(id) = self.system_prompt_id {
            options = options.with_system_prompt_id(id);
        }
        options
    }
}

pub async fn run(args: ChatArgs) -> CommandResult {
    let config = load_config()?;
    let client = signed_in_client(&config).await?;

    let options = args.options();
    let mut chat = match &args.chat_id {
        Some(id) => Chat::resume(&client, id.clone(), options).await?,
        None => Chat::new(&client, options).await?,
    };

    if !args.load.is_empty() {
        let sources: Vec<DataSource> = args.load.iter().cloned().map(DataSource::File).collect();
        let mut failed = false;
        chat.data_loader(&sources, |step| {
            eprintln!("  [{step}]");
            failed |= step == LoadProgress::LoadError;
        })
        .await;
        if failed {
            return Err("Could not load the given files into memory".into());
        }
    }

    println!();
    println!("  Polyfact Chat");
    println!();
    println!("  Chat:         {}", chat.id());
    println!(
        "  Auto memory:  {}",
        chat.auto_memory().map(|m| m.id()).unwrap_or("off")
    );
    if let Some(memory_id) = chat.memory_id() {
        println!("  Loaded data:  {memory_id}");
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        print!("  You > ");
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        let mut stream = match chat
            .send_message_stream(message, GenerationOptions::default())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("  [Error] {e}");
                continue;
            }
        };

        print!("  AI  > ");
        while let Some(chunk) = stream.next_chunk().await {
            match chunk {
                Ok(text) => {
                    write!(stdout, "{}", text.replace('\n', "\n        "))?;
                    stdout.flush()?;
                }
                Err(e) => {
                    eprintln!();
                    eprintln!("  [Error] {e}");
                    break;
                }
            }
        }
        println!();
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
