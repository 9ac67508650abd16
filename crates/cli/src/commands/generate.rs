//! `polyfact generate` — run a single generation.

use std::io::Write;

use polyfact_core::{GenerationOptions, Provider};

use super::{CommandResult, load_config, signed_in_client};

pub struct GenerateArgs {
    pub stream: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub web: bool,
    pub memory_id: Option<String>,
}

impl GenerateArgs {
    fn options(&self) -> Result<GenerationOptions, polyfact_core::Error> {
        let mut options = GenerationOptions::default().with_web(self.web);
        if let Some(provider) = &self.provider {
            options = options.with_provider(provider.parse::<Provider>()?);
        }
        if let Some(model) = &self.model {
            options = options.with_model(model.clone());
        }
        if let Some(memory_id) = &self.memory_id {
            options = options.with_memory_id(memory_id.clone());
        }
        Ok(options)
    }
}

pub async fn run(task: &str, args: GenerateArgs) -> CommandResult {
    let config = load_config()?;
    let options = args.options()?;
    let client = signed_in_client(&config).await?;

    if args.stream {
        let mut stream = client.generate_stream(task, &options).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next_chunk().await {
            write!(stdout, "{}", chunk?)?;
            stdout.flush()?;
        }
        println!();
    } else {
        let result = client.generate(task, &options).await?;
        println!("{}", result.result);
        tracing::debug!(
            input_tokens = result.token_usage.input,
            output_tokens = result.token_usage.output,
            "Generation complete"
        );
    }

    Ok(())
}
