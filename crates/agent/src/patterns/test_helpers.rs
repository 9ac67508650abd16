//! Shared test helpers for pattern tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use polyfact_core::{GenerationOptions, GenerationResult, Generator, Result};

/// A generator that replays scripted replies, one per call, and records
/// every request it receives.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, GenerationOptions)>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(task, options)` pair received so far.
    pub fn calls(&self) -> Vec<(String, GenerationOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, task: &str, options: &GenerationOptions) -> Result<GenerationResult> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((task.to_string(), options.clone()));
            calls.len()
        };

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedGenerator: no reply scripted for call #{call}"));

        reply.map(|result| GenerationResult {
            result,
            ..GenerationResult::default()
        })
    }
}
