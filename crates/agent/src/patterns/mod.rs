//! Agent patterns: structured reasoning strategies over generations.

pub mod react;

pub use react::{AgentHandle, AgentOptions, ProgressStep, ReactAgent, ReactResult};

#[cfg(test)]
pub(crate) mod test_helpers;
