//! Trial merges on disposable branches.
//!
//! Each probe creates a throwaway branch at the target's tip, merges the
//! source into it without committing, records whether unmerged paths
//! appeared, and then tears everything down again: the trial merge is
//! aborted, the previously checked out branch is restored and the throwaway
//! branch is deleted. Teardown lives in [`ProbeBranch`]'s `Drop` so it runs
//! on every exit path.

use crate::errors::Result;
use crate::git::{ConflictedPath, GitRepository, MergeMode, MergeOutcome};
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Namespace for disposable branches
pub const PROBE_BRANCH_PREFIX: &str = "stack-sync/probe";

static PROBE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// What a trial merge predicted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The merge would apply cleanly
    Clean,
    /// The merge would stop on these paths
    Conflicts(Vec<ConflictedPath>),
    /// The probe itself could not be carried out
    Failed(String),
}

/// Prediction for merging `source` into `target`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictProbeResult {
    pub source: String,
    pub target: String,
    pub outcome: ProbeOutcome,
}

impl ConflictProbeResult {
    pub fn has_conflicts(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Conflicts(_))
    }

    pub fn conflicted_paths(&self) -> &[ConflictedPath] {
        match &self.outcome {
            ProbeOutcome::Conflicts(paths) => paths,
            _ => &[],
        }
    }

    /// Diagnostic message describing the outcome
    pub fn message(&self) -> String {
        match &self.outcome {
            ProbeOutcome::Clean => format!("{} merges cleanly into {}", self.source, self.target),
            ProbeOutcome::Conflicts(paths) => format!(
                "{} conflicts with {} in {} file(s): {}",
                self.source,
                self.target,
                paths.len(),
                paths
                    .iter()
                    .map(|p| format!("{} ({})", p.path, p.kind.label()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ProbeOutcome::Failed(reason) => format!(
                "could not check {} → {}: {}",
                self.source, self.target, reason
            ),
        }
    }
}

/// A disposable branch checked out for the duration of one probe.
///
/// Dropping it aborts any trial merge, switches back to the branch that was
/// checked out before, and deletes the disposable branch.
pub struct ProbeBranch<'a> {
    repo: &'a GitRepository,
    name: String,
    restore_to: String,
    released: bool,
}

impl<'a> ProbeBranch<'a> {
    /// Create a disposable branch at `start_point` and check it out
    pub fn create(repo: &'a GitRepository, start_point: &str) -> Result<Self> {
        let restore_to = repo.get_current_branch()?;
        let name = unique_probe_name(repo, start_point);

        repo.checkout_new_branch(&name, start_point)?;
        debug!("Created disposable branch {}", name);

        Ok(Self {
            repo,
            name,
            restore_to,
            released: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tear down now and report problems encountered while doing so
    pub fn release(mut self) -> Vec<String> {
        self.teardown()
    }

    fn teardown(&mut self) -> Vec<String> {
        if self.released {
            return Vec::new();
        }
        self.released = true;

        let mut problems = Vec::new();

        if self.repo.merge_in_progress() {
            if let Err(e) = self.repo.abort_merge() {
                problems.push(format!("merge --abort failed: {e}"));
            }
        }

        // An aborted --no-commit merge can leave stray changes behind on the
        // disposable branch; they must not follow us to the real branch.
        if self.repo.merge_in_progress() || matches!(self.repo.has_conflicts(), Ok(true)) {
            if let Err(e) = self.repo.reset_hard() {
                problems.push(format!("reset of {} failed: {e}", self.name));
            }
        }

        if let Err(e) = self.repo.checkout_branch(&self.restore_to) {
            problems.push(format!("could not switch back to {}: {e}", self.restore_to));
        }

        if let Err(e) = self.repo.delete_branch(&self.name, true) {
            problems.push(format!("could not delete {}: {e}", self.name));
        }

        for problem in &problems {
            warn!("Probe cleanup: {}", problem);
        }

        problems
    }
}

impl Drop for ProbeBranch<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn unique_probe_name(repo: &GitRepository, start_point: &str) -> String {
    let sanitized: String = start_point
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '-',
        })
        .collect();
    let sanitized = sanitized.trim_matches('.');

    loop {
        let n = PROBE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let candidate = format!(
            "{PROBE_BRANCH_PREFIX}/{sanitized}-{}-{}-{n}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis()
        );
        if !repo.branch_exists(&candidate) {
            return candidate;
        }
    }
}

/// Runs trial merges for pairs of branches
pub struct ConflictProber<'a> {
    repo: &'a GitRepository,
}

impl<'a> ConflictProber<'a> {
    pub fn new(repo: &'a GitRepository) -> Self {
        Self { repo }
    }

    /// Predict whether merging `source` into `target` would conflict.
    ///
    /// Leaves no disposable branch or in-progress merge behind, whatever
    /// the outcome.
    pub fn probe(&self, source: &str, target: &str) -> ConflictProbeResult {
        let result = |outcome| ConflictProbeResult {
            source: source.to_string(),
            target: target.to_string(),
            outcome,
        };

        let branch = match ProbeBranch::create(self.repo, target) {
            Ok(branch) => branch,
            Err(e) => return result(ProbeOutcome::Failed(e.to_string())),
        };
        debug!("Probing {} → {} on {}", source, target, branch.name());

        let outcome = match self.repo.merge(source, MergeMode::Trial) {
            Ok(MergeOutcome::Clean) => ProbeOutcome::Clean,
            Ok(MergeOutcome::Conflicted(paths)) => ProbeOutcome::Conflicts(paths),
            Ok(MergeOutcome::Failed(reason)) => ProbeOutcome::Failed(reason),
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        };

        let problems = branch.release();
        if !problems.is_empty() && outcome == ProbeOutcome::Clean {
            return result(ProbeOutcome::Failed(problems.join("; ")));
        }

        result(outcome)
    }

    /// Probe every adjacent pair of the stack, independently and in order
    pub fn probe_stack(&self, stack: &Stack) -> Vec<ConflictProbeResult> {
        stack
            .pairs()
            .map(|(source, target)| self.probe(source, target))
            .collect()
    }

    /// Disposable branches left behind by an earlier, interrupted run
    pub fn leftover_branches(&self) -> Result<Vec<String>> {
        self.repo.list_branches(PROBE_BRANCH_PREFIX)
    }
}
