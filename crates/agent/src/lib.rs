//! The Polyfact ReAct agent.
//!
//! The agent answers a question by alternating model turns with searches:
//!
//! 1. **Prompt** with few-shot examples and the question
//! 2. **Generate** a `Thought --> … ==> Action --> …` turn
//! 3. **If `Search[[query]]`**: run a web-enabled generation, append the
//!    observation, loop back to step 2
//! 4. **If `Finish[[answer]]`**: return the answer
//!
//! The loop is bounded by `max_loops` and can be stopped from another task
//! through an [`AgentHandle`].

pub mod parser;
pub mod patterns;
pub mod prompt;

pub use parser::{Action, ActionKind, Line, LineKind, parse_action, parse_line};
pub use patterns::{AgentHandle, AgentOptions, ProgressStep, ReactAgent, ReactResult};
