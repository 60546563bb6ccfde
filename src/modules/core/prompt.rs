//! Decision points
//!
//! Several operations need the caller to settle a choice halfway through:
//! whether rows omit their id, one or many entries, whether to really wipe a
//! collection, which export format to write. A [`Prompter`] answers those
//! questions. The CLI answers from stdin; programs queue answers up front.

use std::collections::VecDeque;
use std::str::FromStr;

use tracing::warn;

use crate::error::{ConnectorError, Result};

/// Answers the questions an operation asks while it runs.
///
/// Returning `None` means no answer is available (for example end of input)
/// and is treated like an unrecognized answer.
pub trait Prompter: Send {
    fn ask(&mut self, question: &str) -> Option<String>;
}

impl<F> Prompter for F
where
    F: FnMut(&str) -> Option<String> + Send,
{
    fn ask(&mut self, question: &str) -> Option<String> {
        self(question)
    }
}

/// Prompter that replays a fixed list of answers in order
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Queue one more answer
    pub fn push(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }

    /// Questions asked so far, oldest first
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> Option<String> {
        self.asked.push(question.to_string());
        self.answers.pop_front()
    }
}

/// Ask a yes/no question; only the listed answers count as yes
pub fn confirm(prompter: &mut dyn Prompter, question: &str, accepted: &[&str]) -> bool {
    prompter
        .ask(question)
        .map(|answer| {
            let answer = answer.trim().to_lowercase();
            accepted.iter().any(|a| *a == answer)
        })
        .unwrap_or(false)
}

/// Ask once and parse the answer; anything unparseable is an invalid selection
pub fn choose<T>(prompter: &mut dyn Prompter, question: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let answer = prompter.ask(question).unwrap_or_default();
    answer
        .parse::<T>()
        .map_err(ConnectorError::InvalidModeSelection)
}

/// Ask up to `attempts` times until `parse` accepts an answer
pub fn choose_with_retries<T>(
    prompter: &mut dyn Prompter,
    question: &str,
    attempts: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    for attempt in 1..=attempts {
        let answer = prompter.ask(question).unwrap_or_default();
        if let Some(choice) = parse(&answer) {
            return Ok(choice);
        }
        warn!(attempt, attempts, "Incorrect option '{}'", answer.trim());
    }
    Err(ConnectorError::InvalidModeSelection(format!(
        "no valid answer after {} attempts",
        attempts
    )))
}
