//! ReAct pattern: Thought → Action → Observation loop.
//!
//! Each iteration asks the model to continue the transcript up to (but not
//! including) the next observation. The last segment of its turn must be an
//! `Action`:
//! - `Finish[[answer]]` ends the loop with `answer`.
//! - `Search[[query]]` runs a web-enabled generation for `query`; its text
//!   is appended as the observation and the loop continues.
//!
//! The loop also ends, with the current action's argument, once
//! `max_loops` searches have been made or the agent has been stopped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use polyfact_config::AgentConfig;
use polyfact_core::{AgentError, GenerationOptions, Generator, Provider, Result};
use tracing::{debug, info, warn};

use crate::parser::{Action, ActionKind, LineKind, last_segment, parse_action, parse_line};
use crate::prompt::{format_progress, initial_transcript};

/// Stop sequence that hands control back before the model invents an
/// observation.
pub const OBSERVATION_STOP: &str = "==> Observation -->";

/// Default number of searches before the agent answers with what it has.
pub const DEFAULT_MAX_LOOPS: u32 = 4;

/// Progress events reported while the agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    /// A model turn, formatted one segment per line.
    Process,
    /// The result of a search.
    Observation,
    /// The final answer.
    Finish,
}

impl ProgressStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Observation => "observation",
            Self::Finish => "finish",
        }
    }
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation settings for the agent's model calls.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    /// Extra stop sequences for searches. Reasoning turns always stop at
    /// [`OBSERVATION_STOP`].
    pub stop: Vec<String>,
    pub temperature: Option<f32>,
    pub infos: bool,
    pub max_loops: u32,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            provider: Some(Provider::OpenAi),
            model: Some("gpt-3.5-turbo".into()),
            stop: Vec::new(),
            temperature: None,
            infos: false,
            max_loops: DEFAULT_MAX_LOOPS,
        }
    }
}

impl From<&AgentConfig> for AgentOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            provider: Some(config.provider),
            model: Some(config.model.clone()),
            temperature: config.temperature,
            max_loops: config.max_loops,
            ..Self::default()
        }
    }
}

impl AgentOptions {
    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            provider: self.provider,
            model: self.model.clone(),
            stop: self.stop.clone(),
            temperature: self.temperature,
            infos: self.infos,
            ..GenerationOptions::default()
        }
    }
}

/// The stop side of a [`ReactAgent`], clonable into other tasks.
///
/// [`ReactAgent::start`] and [`ReactAgent::stop`] stay on the agent; the
/// handle only stops and observes a run.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    running: Arc<AtomicBool>,
}

impl AgentHandle {
    /// Ask the agent to answer with its current action after the turn in
    /// progress.
    pub fn stop(&self) {
        info!("Stopping agent");
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The result of a ReAct run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactResult {
    pub answer: String,
    /// Full transcript sent on the last model call, plus its reply.
    pub transcript: String,
    /// Number of searches made.
    pub searches: u32,
}

pub struct ReactAgent {
    generator: Arc<dyn Generator>,
    options: AgentOptions,
    running: Arc<AtomicBool>,
}

impl ReactAgent {
    pub fn new(generator: Arc<dyn Generator>, options: AgentOptions) -> Self {
        Self {
            generator,
            options,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// A handle that can stop this agent while `start` is awaited.
    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            running: self.running.clone(),
        }
    }

    pub fn stop(&self) {
        self.handle().stop();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Answer `question`, reporting each step to `progress`.
    pub async fn start(
        &self,
        question: &str,
        progress: impl FnMut(ProgressStep, &str),
    ) -> Result<String> {
        Ok(self.run(question, progress).await?.answer)
    }

    /// Like [`ReactAgent::start`], also returning the transcript.
    pub async fn run(
        &self,
        question: &str,
        mut progress: impl FnMut(ProgressStep, &str),
    ) -> Result<ReactResult> {
        self.running.store(true, Ordering::SeqCst);
        info!(max_loops = self.options.max_loops, "ReAct loop starting");

        let outcome = self.iterate(question, &mut progress).await;
        self.running.store(false, Ordering::SeqCst);

        if let Err(e) = &outcome {
            warn!("ReAct loop failed: {e}");
        }
        outcome
    }

    async fn iterate(
        &self,
        question: &str,
        progress: &mut impl FnMut(ProgressStep, &str),
    ) -> Result<ReactResult> {
        let mut transcript = initial_transcript(question);
        let mut searches = 0u32;

        loop {
            debug!(iteration = searches, "ReAct iteration");

            let options = self
                .options
                .generation_options()
                .with_stop(vec![OBSERVATION_STOP.to_string()]);
            let turn = self.generator.generate(&transcript, &options).await?.result;

            progress(ProgressStep::Process, &format_progress(&turn));
            transcript.push('\n');
            transcript.push_str(&turn);

            let action = next_action(&turn)?;

            let stopped = !self.is_running();
            if action.kind == ActionKind::Finish
                || searches == self.options.max_loops
                || stopped
            {
                info!(
                    searches,
                    finished = action.kind == ActionKind::Finish,
                    stopped,
                    "ReAct loop completed"
                );
                progress(ProgressStep::Finish, &action.arg);
                return Ok(ReactResult {
                    answer: action.arg,
                    transcript,
                    searches,
                });
            }

            let observation = self.search(&action.arg).await?;
            progress(ProgressStep::Observation, &observation);

            transcript.push_str("\nObservation --> ");
            transcript.push_str(&observation);
            searches += 1;
        }
    }

    async fn search(&self, query: &str) -> Result<String> {
        info!(query, "Agent searching");
        let options = self.options.generation_options().with_web(true);
        Ok(self.generator.generate(query, &options).await?.result)
    }
}

/// The action that ends a model turn.
fn next_action(turn: &str) -> std::result::Result<Action, AgentError> {
    let line = parse_line(last_segment(turn))?;
    if line.kind != LineKind::Action {
        return Err(AgentError::ExpectedAction);
    }
    parse_action(&line.arg)
}

impl fmt::Debug for ReactAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactAgent")
            .field("options", &self.options)
            .field("running", &self.is_running())
            .finish()
    }
}
