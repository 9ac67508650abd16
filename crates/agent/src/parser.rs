//! Parser for the agent's line-based transcript language.
//!
//! A model turn looks like
//! `Thought --> I should look it up ==> Action --> Search[[Rust]]`:
//! segments are separated by `==>`, each segment is `Kind --> argument`,
//! and an action argument is `Search[[query]]` or `Finish[[answer]]`.

use std::fmt;

use polyfact_core::AgentError;

/// Separates segments of a model turn.
pub const SEGMENT_SEPARATOR: &str = "==>";

/// Separates a segment's kind from its argument.
pub const FIELD_SEPARATOR: &str = "-->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Question,
    Thought,
    Action,
    Observation,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "Question",
            Self::Thought => "Thought",
            Self::Action => "Action",
            Self::Observation => "Observation",
        }
    }

    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Question" => Some(Self::Question),
            "Thought" => Some(Self::Thought),
            "Action" => Some(Self::Action),
            "Observation" => Some(Self::Observation),
            _ => None,
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    pub arg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Search,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub arg: String,
}

/// Split `text` on `separator`, dropping the spaces that surround each
/// separator. Spaces at the very start and end are kept.
pub fn split_spaced<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let parts: Vec<&str> = text.split(separator).collect();
    let last = parts.len() - 1;
    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let part = if i > 0 { part.trim_start_matches(' ') } else { part };
            if i < last { part.trim_end_matches(' ') } else { part }
        })
        .collect()
}

/// The last `==>` segment of a model turn.
pub fn last_segment(turn: &str) -> &str {
    split_spaced(turn, SEGMENT_SEPARATOR)
        .pop()
        .unwrap_or(turn)
}

/// Parse one `Kind --> argument` segment.
pub fn parse_line(line: &str) -> Result<Line, AgentError> {
    let parts = split_spaced(line, FIELD_SEPARATOR);
    let kind = parts[0].trim();
    let arg = parts.get(1).copied().unwrap_or_default();

    let kind = LineKind::parse(kind).ok_or_else(|| AgentError::UnknownLineType {
        kind: kind.to_string(),
        arg: arg.to_string(),
    })?;

    Ok(Line {
        kind,
        arg: arg.to_string(),
    })
}

/// Parse an action argument such as `Search[[query]]`.
pub fn parse_action(action: &str) -> Result<Action, AgentError> {
    let (kind, rest) = match action.split_once("[[") {
        Some((kind, rest)) => (kind, rest),
        None => (action, ""),
    };

    let kind = match kind.trim() {
        "Search" => ActionKind::Search,
        "Finish" => ActionKind::Finish,
        other => return Err(AgentError::UnknownActionType(other.to_string())),
    };

    let arg = rest.split("]]").next().unwrap_or_default();
    Ok(Action {
        kind,
        arg: arg.to_string(),
    })
}
