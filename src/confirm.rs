//! Confirmation gate for destructive and expensive commands.
//!
//! A gated command proceeds when `--confirm` was passed. Otherwise the operator
//! is asked interactively: destructive actions need a "YES" to the backup
//! question and another to the action itself, acknowledgements need one "YES".
//! Without a terminal there is nobody to ask, so the command aborts.

use dialoguer::{Input, Password};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Two prompts: database backup, then the action.
    Destructive,
    /// One prompt about the action's cost.
    Acknowledge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmGate {
    pub kind: Confirmation,
    /// `--confirm` was given.
    pub confirmed: bool,
    /// Human description, e.g. "archive 2 teams".
    pub action: String,
}

impl ConfirmGate {
    pub fn destructive(confirmed: bool, action: impl Into<String>) -> Self {
        Self {
            kind: Confirmation::Destructive,
            confirmed,
            action: action.into(),
        }
    }

    pub fn acknowledge(confirmed: bool, action: impl Into<String>) -> Self {
        Self {
            kind: Confirmation::Acknowledge,
            confirmed,
            action: action.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    #[error("aborted: this is not an interactive shell, rerun with --confirm to {0}")]
    NotInteractive(String),
    #[error("aborted: you must type YES to {0}")]
    Declined(String),
    #[error("aborted: reading confirmation: {0}")]
    Prompt(String),
}

/// Source of interactive answers.
pub trait Prompter {
    fn is_interactive(&self) -> bool;
    fn ask(&self, question: &str) -> Result<String, ConfirmError>;
    /// Like [`ask`](Self::ask) without echoing the answer.
    fn ask_secret(&self, question: &str) -> Result<String, ConfirmError>;
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        console::user_attended() && console::Term::stdout().is_term()
    }

    fn ask(&self, question: &str) -> Result<String, ConfirmError> {
        Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| ConfirmError::Prompt(e.to_string()))
    }

    fn ask_secret(&self, question: &str) -> Result<String, ConfirmError> {
        Password::new()
            .with_prompt(question)
            .interact()
            .map_err(|e| ConfirmError::Prompt(e.to_string()))
    }
}

fn expect_yes(
    prompter: &dyn Prompter,
    question: &str,
    action: &str,
) -> Result<(), ConfirmError> {
    let answer = prompter.ask(question)?;
    if answer.trim() == "YES" {
        Ok(())
    } else {
        Err(ConfirmError::Declined(action.to_string()))
    }
}

pub fn confirm(gate: &ConfirmGate, prompter: &dyn Prompter) -> Result<(), ConfirmError> {
    if gate.confirmed {
        return Ok(());
    }
    if !prompter.is_interactive() {
        return Err(ConfirmError::NotInteractive(gate.action.clone()));
    }
    match gate.kind {
        Confirmation::Destructive => {
            expect_yes(
                prompter,
                "Have you performed a database backup? (YES/NO)",
                &gate.action,
            )?;
            expect_yes(
                prompter,
                &format!("Are you sure you want to {}? (YES/NO)", gate.action),
                &gate.action,
            )
        }
        Confirmation::Acknowledge => expect_yes(
            prompter,
            &format!(
                "This may put heavy load on the server. Are you sure you want to {}? (YES/NO)",
                gate.action
            ),
            &gate.action,
        ),
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned answers and records the questions asked.
    pub struct ScriptedPrompter {
        pub interactive: bool,
        pub answers: RefCell<VecDeque<String>>,
        pub asked: RefCell<Vec<String>>,
    }

    impl ScriptedPrompter {
        pub fn new(interactive: bool, answers: &[&str]) -> Self {
            Self {
                interactive,
                answers: RefCell::new(answers.iter().map(|s| s.to_string()).collect()),
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn ask(&self, question: &str) -> Result<String, ConfirmError> {
            self.asked.borrow_mut().push(question.to_string());
            self.answers
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ConfirmError::Prompt("no more answers".into()))
        }

        fn ask_secret(&self, question: &str) -> Result<String, ConfirmError> {
            self.ask(question)
        }
    }
}
