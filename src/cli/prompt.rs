//! Interactive decisions taken during a sync run.
//!
//! The orchestrator never reads the terminal itself; every question goes
//! through [`UserDecision`]. [`TerminalDecision`] asks a human with
//! `dialoguer`, [`ScriptedDecision`] replays canned answers.

use crate::errors::Result;
use crate::stack::BranchStatus;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use std::collections::VecDeque;
use tracing::{info, warn};

/// How to handle branches that differ from the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSyncChoice {
    /// Check out and pull every out-of-sync branch
    SyncAll,
    /// Ask before syncing each branch
    OneByOne,
    /// Carry on with the local branches as they are
    Continue,
    /// Stop the run
    Abort,
}

/// How to push the merged branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushChoice {
    PushAll,
    OneByOne,
    Skip,
}

/// A question the orchestrator asked, as recorded by [`ScriptedDecision`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    RemoteSync(Vec<String>),
    SyncBranch(String),
    Push(Vec<String>),
    PushBranch(String),
}

/// Source of answers for the orchestrator's questions.
///
/// Implementations fall back to the safest answer (abort, skip, no) when
/// input is unavailable or invalid.
pub trait UserDecision {
    fn remote_sync(&mut self, out_of_sync: &[BranchStatus]) -> Result<RemoteSyncChoice>;
    fn confirm_branch_sync(&mut self, status: &BranchStatus) -> Result<bool>;
    fn push(&mut self, branches: &[String]) -> Result<PushChoice>;
    fn confirm_push(&mut self, branch: &str) -> Result<bool>;
}

/// Asks on the terminal
pub struct TerminalDecision {
    theme: ColorfulTheme,
}

impl TerminalDecision {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn attended(&self, question: &str) -> bool {
        let attended = console::user_attended();
        if !attended {
            warn!("No terminal attached, taking the safe answer for: {}", question);
        }
        attended
    }

    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Option<usize> {
        match Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()
        {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Could not read answer: {}", e);
                None
            }
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        match Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact_opt()
        {
            Ok(answer) => answer.unwrap_or(false),
            Err(e) => {
                warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

impl Default for TerminalDecision {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDecision for TerminalDecision {
    fn remote_sync(&mut self, out_of_sync: &[BranchStatus]) -> Result<RemoteSyncChoice> {
        let prompt = format!(
            "{} branch(es) differ from the remote. What now?",
            out_of_sync.len()
        );
        if !self.attended(&prompt) {
            return Ok(RemoteSyncChoice::Abort);
        }

        let items = [
            "Sync all branches",
            "Sync branches one at a time",
            "Continue without syncing",
            "Abort",
        ];
        let choice = match self.select(&prompt, &items, 0) {
            Some(0) => RemoteSyncChoice::SyncAll,
            Some(1) => RemoteSyncChoice::OneByOne,
            Some(2) => RemoteSyncChoice::Continue,
            _ => RemoteSyncChoice::Abort,
        };
        Ok(choice)
    }

    fn confirm_branch_sync(&mut self, status: &BranchStatus) -> Result<bool> {
        let prompt = format!("Sync '{}' ({})?", status.branch, status.describe());
        if !self.attended(&prompt) {
            return Ok(false);
        }
        Ok(self.confirm(&prompt))
    }

    fn push(&mut self, branches: &[String]) -> Result<PushChoice> {
        let prompt = format!("Push {} merged branch(es) to the remote?", branches.len());
        if !self.attended(&prompt) {
            return Ok(PushChoice::Skip);
        }

        let items = ["Push all", "Push one at a time", "Skip pushing"];
        let choice = match self.select(&prompt, &items, 2) {
            Some(0) => PushChoice::PushAll,
            Some(1) => PushChoice::OneByOne,
            _ => PushChoice::Skip,
        };
        Ok(choice)
    }

    fn confirm_push(&mut self, branch: &str) -> Result<bool> {
        let prompt = format!("Push '{branch}'?");
        if !self.attended(&prompt) {
            return Ok(false);
        }
        Ok(self.confirm(&prompt))
    }
}

/// Replays prepared answers and records every question asked.
///
/// When an answer queue runs dry the safe answer is used.
#[derive(Debug, Default)]
pub struct ScriptedDecision {
    remote_sync: VecDeque<RemoteSyncChoice>,
    push: VecDeque<PushChoice>,
    confirmations: VecDeque<bool>,
    asked: Vec<Question>,
}

impl ScriptedDecision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_sync(mut self, choice: RemoteSyncChoice) -> Self {
        self.remote_sync.push_back(choice);
        self
    }

    pub fn with_push(mut self, choice: PushChoice) -> Self {
        self.push.push_back(choice);
        self
    }

    /// Answers for per-branch confirmations, shared between sync and push
    pub fn with_confirmations(mut self, answers: &[bool]) -> Self {
        self.confirmations.extend(answers.iter().copied());
        self
    }

    /// Every question asked so far, in order
    pub fn asked(&self) -> &[Question] {
        &self.asked
    }
}

impl UserDecision for ScriptedDecision {
    fn remote_sync(&mut self, out_of_sync: &[BranchStatus]) -> Result<RemoteSyncChoice> {
        self.asked.push(Question::RemoteSync(
            out_of_sync.iter().map(|s| s.branch.clone()).collect(),
        ));
        let choice = self.remote_sync.pop_front().unwrap_or(RemoteSyncChoice::Abort);
        info!("Scripted remote sync choice: {:?}", choice);
        Ok(choice)
    }

    fn confirm_branch_sync(&mut self, status: &BranchStatus) -> Result<bool> {
        self.asked.push(Question::SyncBranch(status.branch.clone()));
        Ok(self.confirmations.pop_front().unwrap_or(false))
    }

    fn push(&mut self, branches: &[String]) -> Result<PushChoice> {
        self.asked.push(Question::Push(branches.to_vec()));
        Ok(self.push.pop_front().unwrap_or(PushChoice::Skip))
    }

    fn confirm_push(&mut self, branch: &str) -> Result<bool> {
        self.asked.push(Question::PushBranch(branch.to_string()));
        Ok(self.confirmations.pop_front().unwrap_or(false))
    }
}
