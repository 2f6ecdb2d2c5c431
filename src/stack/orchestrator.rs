//! End-to-end stack sync.
//!
//! The run is a small state machine:
//!
//! ```text
//! Init → PreflightCheck → RemoteSyncCheck → ConflictPrecheck
//!      → RealMergeLoop → PushPhase → Restore → Done
//! ```
//!
//! Any phase may stop the run; it then passes through `Restore` (unless
//! nothing was changed yet) and ends in `Aborted`. Conflicts are terminal:
//! the user resolves them by hand and runs the whole sync again.

use crate::cli::output::Output;
use crate::cli::prompt::{PushChoice, RemoteSyncChoice, UserDecision};
use crate::config::Settings;
use crate::errors::Result;
use crate::git::{
    ConflictedPath, GitRepository, MergeMode, MergeOutcome, StashPopOutcome, DEFAULT_REMOTE,
};
use crate::stack::probe::{ConflictProbeResult, ConflictProber, ProbeOutcome};
use crate::stack::status::{all_in_sync, is_local_only, BranchStatus, StatusReporter, SyncState};
use crate::stack::Stack;
use crate::utils::spinner::Spinner;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Knobs for a single run, resolved from configuration and flags
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Remote every branch is compared against and pushed to
    pub remote: String,
    /// Probe every pair for conflicts before merging
    pub conflict_check: bool,
    /// Push all merged branches without asking
    pub auto_push: bool,
    /// Treat fetch and remote-sync failures as fatal
    pub strict: bool,
    /// Paths (relative to the repository root) that never count as local changes
    pub excluded_paths: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            conflict_check: true,
            auto_push: false,
            strict: false,
            excluded_paths: Vec::new(),
        }
    }
}

impl RunOptions {
    /// Combine configuration settings with the `--skip-conflict-check` flag
    pub fn from_settings(settings: &Settings, skip_conflict_check: bool) -> Self {
        Self {
            conflict_check: settings.pre_conflict_check.enabled && !skip_conflict_check,
            auto_push: settings.auto_push.enabled,
            strict: settings.strict_mode.enabled,
            ..Self::default()
        }
    }

    pub fn with_excluded_paths(mut self, paths: Vec<String>) -> Self {
        self.excluded_paths = paths;
        self
    }
}

/// States of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Init,
    PreflightCheck,
    RemoteSyncCheck,
    ConflictPrecheck,
    RealMergeLoop,
    PushPhase,
    Restore,
    Done,
    Aborted,
}

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    NotARepository(String),
    MergeAlreadyInProgress,
    StashFailed(String),
    FetchFailed(String),
    RemoteSyncFailed { branch: String, message: String },
    Cancelled,
    MissingBranches(Vec<String>),
    PredictedConflicts(Vec<ConflictProbeResult>),
    MergeConflict {
        source: String,
        target: String,
        paths: Vec<ConflictedPath>,
    },
    MergeFailed {
        source: String,
        target: String,
        message: String,
    },
    Git(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NotARepository(msg) => write!(f, "not a git repository: {msg}"),
            AbortReason::MergeAlreadyInProgress => write!(f, "a merge is already in progress"),
            AbortReason::StashFailed(msg) => write!(f, "could not stash local changes: {msg}"),
            AbortReason::FetchFailed(msg) => write!(f, "fetch failed: {msg}"),
            AbortReason::RemoteSyncFailed { branch, message } => {
                write!(f, "could not sync '{branch}' with the remote: {message}")
            }
            AbortReason::Cancelled => write!(f, "cancelled by user"),
            AbortReason::MissingBranches(branches) => {
                write!(f, "branches not found locally: {}", branches.join(", "))
            }
            AbortReason::PredictedConflicts(results) => write!(
                f,
                "conflicts predicted for {}",
                results
                    .iter()
                    .map(|r| format!("{} → {}", r.source, r.target))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            AbortReason::MergeConflict { source, target, paths } => write!(
                f,
                "merging {source} into {target} conflicted in {} file(s)",
                paths.len()
            ),
            AbortReason::MergeFailed { source, target, message } => {
                write!(f, "merging {source} into {target} failed: {message}")
            }
            AbortReason::Git(msg) => write!(f, "{msg}"),
        }
    }
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    Aborted(AbortReason),
}

/// Everything a run did, for the caller to report on
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Phases in the order they were entered
    pub phases: Vec<SyncPhase>,
    pub statuses: Vec<BranchStatus>,
    pub probes: Vec<ConflictProbeResult>,
    /// `(source, target)` pairs merged for real
    pub merged: Vec<(String, String)>,
    pub pushed: Vec<String>,
    pub stashed: bool,
    pub stash_restored: bool,
    /// Downgraded failures
    pub warnings: Vec<String>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            outcome: SyncOutcome::Completed,
            phases: Vec::new(),
            statuses: Vec::new(),
            probes: Vec::new(),
            merged: Vec::new(),
            pushed: Vec::new(),
            stashed: false,
            stash_restored: false,
            warnings: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SyncOutcome::Completed
    }

    pub fn visited(&self, phase: SyncPhase) -> bool {
        self.phases.contains(&phase)
    }

    /// Process exit code: 0 on success, 1 on any aborted run
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.outcome {
            SyncOutcome::Aborted(reason) => Some(reason),
            SyncOutcome::Completed => None,
        }
    }
}

/// Run-scoped state, discarded when the run ends
#[derive(Debug, Default)]
struct SyncSession {
    original_branch: Option<String>,
    stash_applied: bool,
    /// Position of the pair being merged, 0-based
    current_index: usize,
    remote_available: bool,
}

/// Drives one sync of a stack
pub struct SyncOrchestrator<'a> {
    repo_path: PathBuf,
    stack: Stack,
    options: RunOptions,
    decisions: &'a mut dyn UserDecision,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new<P: Into<PathBuf>>(
        repo_path: P,
        stack: Stack,
        options: RunOptions,
        decisions: &'a mut dyn UserDecision,
    ) -> Self {
        Self {
            repo_path: repo_path.into(),
            stack,
            options,
            decisions,
        }
    }

    /// Run the sync to completion. Never panics on git failures; every
    /// failure ends up in the returned report.
    pub fn run(self) -> SyncReport {
        let mut report = SyncReport::new();
        report.phases.push(SyncPhase::Init);

        let repo = match GitRepository::open(&self.repo_path) {
            Ok(repo) => repo,
            Err(e) => {
                Output::error(format!("{} is not inside a git repository", self.repo_path.display()));
                report.phases.push(SyncPhase::Aborted);
                report.outcome = SyncOutcome::Aborted(AbortReason::NotARepository(e.to_string()));
                return report;
            }
        };

        info!("Syncing stack {}", self.stack);
        let run = SyncRun {
            repo,
            stack: self.stack,
            options: self.options,
            decisions: self.decisions,
            session: SyncSession::default(),
            report,
            failure: None,
        };
        run.drive()
    }
}

struct SyncRun<'a> {
    repo: GitRepository,
    stack: Stack,
    options: RunOptions,
    decisions: &'a mut dyn UserDecision,
    session: SyncSession,
    report: SyncReport,
    failure: Option<AbortReason>,
}

impl SyncRun<'_> {
    fn drive(mut self) -> SyncReport {
        let mut phase = SyncPhase::PreflightCheck;

        loop {
            self.report.phases.push(phase);
            debug!("Entering {:?}", phase);

            phase = match phase {
                SyncPhase::PreflightCheck => self.step(Self::preflight_check),
                SyncPhase::RemoteSyncCheck => self.step(Self::remote_sync_check),
                SyncPhase::ConflictPrecheck => self.step(Self::conflict_precheck),
                SyncPhase::RealMergeLoop => self.step(Self::real_merge_loop),
                SyncPhase::PushPhase => self.step(Self::push_phase),
                SyncPhase::Restore => self.restore(),
                SyncPhase::Init | SyncPhase::Done | SyncPhase::Aborted => break,
            };
        }

        if let Some(reason) = self.failure.take() {
            self.report.outcome = SyncOutcome::Aborted(reason);
        } else {
            Output::success(format!("Stack synced: {}", self.stack));
        }
        self.report
    }

    fn step(&mut self, f: fn(&mut Self) -> Result<SyncPhase>) -> SyncPhase {
        match f(self) {
            Ok(next) => next,
            Err(e) => {
                Output::error(&e);
                self.fail(AbortReason::Git(e.to_string()))
            }
        }
    }

    /// Record why the run stops; the working state is restored next
    fn fail(&mut self, reason: AbortReason) -> SyncPhase {
        warn!("Stopping sync: {}", reason);
        self.failure = Some(reason);
        SyncPhase::Restore
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        Output::warning(&message);
        self.report.warnings.push(message);
    }

    fn remote(&self) -> &str {
        &self.options.remote
    }

    fn preflight_check(&mut self) -> Result<SyncPhase> {
        self.session.original_branch = Some(self.repo.get_current_branch()?);

        if self.repo.merge_in_progress() {
            Output::error("A merge is already in progress in this repository");
            Output::tip("Finish it with 'git commit', or abort it, then run the sync again:");
            Output::command_example("git merge --abort");
            self.failure = Some(AbortReason::MergeAlreadyInProgress);
            return Ok(SyncPhase::Aborted);
        }

        let prober = ConflictProber::new(&self.repo);
        match prober.leftover_branches() {
            Ok(leftovers) if !leftovers.is_empty() => {
                self.warn(format!(
                    "Found {} disposable branch(es) from an interrupted run",
                    leftovers.len()
                ));
                for branch in &leftovers {
                    Output::command_example(format!("git branch -D {branch}"));
                }
            }
            Ok(_) => {}
            Err(e) => debug!("Could not list disposable branches: {}", e),
        }

        if !self.repo.is_dirty_excluding(&self.options.excluded_paths)? {
            debug!("Working tree clean");
            return Ok(SyncPhase::RemoteSyncCheck);
        }

        let message = format!(
            "stack-sync auto-stash {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        match self.repo.stash_push(&message, &self.options.excluded_paths) {
            Ok(()) => {
                self.session.stash_applied = true;
                self.report.stashed = true;
                Output::info("Stashed uncommitted changes; they will be restored at the end");
                Ok(SyncPhase::RemoteSyncCheck)
            }
            Err(e) => {
                Output::error(format!("Could not stash uncommitted changes: {e}"));
                Output::tip("Commit or stash your changes yourself, then run the sync again");
                self.failure = Some(AbortReason::StashFailed(e.to_string()));
                Ok(SyncPhase::Aborted)
            }
        }
    }

    fn remote_sync_check(&mut self) -> Result<SyncPhase> {
        let remote = self.remote().to_string();
        let remote_configured = self.repo.has_remote(&remote);
        self.session.remote_available = remote_configured;

        if remote_configured {
            let spinner = Spinner::new(format!("Fetching from {remote}..."));
            let fetched = self.repo.fetch(&remote);
            spinner.stop();

            if let Err(e) = fetched {
                if self.options.strict {
                    Output::error(format!("Fetch from {remote} failed: {e}"));
                    return Ok(self.fail(AbortReason::FetchFailed(e.to_string())));
                }
                self.warn(format!("Fetch from {remote} failed: {e}"));
                self.session.remote_available = false;
            }
        }

        let statuses = StatusReporter::new(&self.repo, &remote).report(&self.stack);
        print_statuses(&statuses);
        self.report.statuses = statuses.clone();

        if !self.session.remote_available {
            if remote_configured {
                Output::info(format!("{remote} is unreachable; syncing locally only, nothing will be pushed"));
            } else {
                Output::info(format!("No '{remote}' remote configured; syncing locally only"));
            }
            return Ok(self.ensure_branches_present());
        }

        if all_in_sync(&statuses) {
            Output::success("All branches in sync with the remote");
            return Ok(self.ensure_branches_present());
        }

        let needing: Vec<BranchStatus> = statuses.into_iter().filter(|s| s.needs_sync()).collect();
        if needing.is_empty() {
            return Ok(self.ensure_branches_present());
        }

        let choice = self.decisions.remote_sync(&needing)?;
        info!("Remote sync decision: {:?}", choice);

        match choice {
            RemoteSyncChoice::SyncAll => {
                for status in &needing {
                    if let Some(phase) = self.sync_branch(status) {
                        return Ok(phase);
                    }
                }
            }
            RemoteSyncChoice::OneByOne => {
                for status in &needing {
                    let confirmed = self.decisions.confirm_branch_sync(status)?;
                    info!("Sync '{}': {}", status.branch, if confirmed { "yes" } else { "no" });
                    if !confirmed {
                        Output::sub_item(format!("Skipped {}", status.branch));
                        continue;
                    }
                    if let Some(phase) = self.sync_branch(status) {
                        return Ok(phase);
                    }
                }
            }
            RemoteSyncChoice::Continue => {
                Output::info("Continuing without syncing remote changes");
            }
            RemoteSyncChoice::Abort => {
                Output::info("Sync cancelled");
                return Ok(self.fail(AbortReason::Cancelled));
            }
        }

        self.report.statuses = StatusReporter::new(&self.repo, &remote).report(&self.stack);
        Ok(self.ensure_branches_present())
    }

    /// Bring one branch up to date with the remote. Returns the next phase
    /// when the failure stops the run.
    fn sync_branch(&mut self, status: &BranchStatus) -> Option<SyncPhase> {
        let remote = self.remote().to_string();
        let branch = status.branch.as_str();

        let result = if !status.exists_locally && status.exists_remotely {
            self.repo.checkout_from_remote(&remote, branch)
        } else {
            self.repo
                .checkout_branch(branch)
                .and_then(|_| self.repo.pull_fast_forward(&remote, branch))
        };

        match result {
            Ok(()) => {
                Output::success(format!("Synced {branch} with {remote}/{branch}"));
                None
            }
            Err(e) if self.options.strict => {
                Output::error(format!("Could not sync {branch}: {e}"));
                Some(self.fail(AbortReason::RemoteSyncFailed {
                    branch: branch.to_string(),
                    message: e.to_string(),
                }))
            }
            Err(e) => {
                self.warn(format!("Could not sync {branch}, continuing with the local branch: {e}"));
                Output::tip("To bring it up to date by hand:");
                Output::command_example(format!("git checkout {branch} && git pull {remote} {branch}"));
                None
            }
        }
    }

    fn ensure_branches_present(&mut self) -> SyncPhase {
        let missing: Vec<String> = self
            .stack
            .branches()
            .iter()
            .filter(|b| !self.repo.branch_exists(b))
            .cloned()
            .collect();

        if missing.is_empty() {
            return SyncPhase::ConflictPrecheck;
        }

        Output::error(format!("Branches not found locally: {}", missing.join(", ")));
        Output::tip("Create them (or fetch them from the remote) and run the sync again:");
        for branch in &missing {
            Output::command_example(format!("git checkout -b {branch} {}/{branch}", self.remote()));
        }
        self.fail(AbortReason::MissingBranches(missing))
    }

    fn conflict_precheck(&mut self) -> Result<SyncPhase> {
        if !self.options.conflict_check {
            Output::info("Conflict pre-check skipped");
            return Ok(SyncPhase::RealMergeLoop);
        }

        Output::section("Conflict pre-check");
        let spinner = Spinner::new("Trying each merge on a disposable branch...".to_string());
        let results = ConflictProber::new(&self.repo).probe_stack(&self.stack);
        spinner.stop();

        for result in &results {
            match &result.outcome {
                ProbeOutcome::Clean => Output::success(result.message()),
                ProbeOutcome::Conflicts(_) => Output::error(result.message()),
                ProbeOutcome::Failed(_) => self.warn(result.message()),
            }
        }
        self.report.probes = results.clone();

        let conflicting: Vec<ConflictProbeResult> =
            results.into_iter().filter(|r| r.has_conflicts()).collect();
        if conflicting.is_empty() {
            return Ok(SyncPhase::RealMergeLoop);
        }

        Output::error("No branches were merged. Resolve these conflicts first:");
        for result in &conflicting {
            Output::command_example(format!("git checkout {}", result.target));
            Output::command_example(format!("git merge {}", result.source));
            Output::sub_item("resolve the conflicts, then 'git add' and 'git commit'");
        }
        Output::tip("Then run the sync again from the start");
        Ok(self.fail(AbortReason::PredictedConflicts(conflicting)))
    }

    fn real_merge_loop(&mut self) -> Result<SyncPhase> {
        Output::section("Merging");
        let pairs: Vec<(String, String)> = self
            .stack
            .pairs()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect();

        for (index, (source, target)) in pairs.into_iter().enumerate() {
            self.session.current_index = index;
            info!("Merging {} into {} ({}/{})", source, target, index + 1, self.stack.len() - 1);

            if let Err(e) = self.repo.checkout_branch(&target) {
                Output::error(format!("Could not check out {target}: {e}"));
                return Ok(self.fail(AbortReason::MergeFailed {
                    source,
                    target,
                    message: e.to_string(),
                }));
            }

            match self.repo.merge(&source, MergeMode::Commit)? {
                MergeOutcome::Clean => {
                    Output::success(format!("Merged {source} into {target}"));
                    self.report.merged.push((source, target));
                }
                MergeOutcome::Conflicted(paths) => {
                    Output::error(format!("Merging {source} into {target} stopped on conflicts:"));
                    for path in &paths {
                        Output::bullet(format!("{} ({})", path.path, path.kind.label()));
                    }
                    Output::tip(format!("{target} is checked out with the merge in progress. To finish:"));
                    Output::command_example("resolve the files above, then: git add <files> && git commit");
                    Output::command_example("or give up on this merge: git merge --abort");
                    Output::tip("Then run the sync again from the start");
                    return Ok(self.fail(AbortReason::MergeConflict { source, target, paths }));
                }
                MergeOutcome::Failed(message) => {
                    Output::error(format!("Merging {source} into {target} failed: {message}"));
                    return Ok(self.fail(AbortReason::MergeFailed { source, target, message }));
                }
            }
        }

        if !self.session.remote_available {
            return Ok(SyncPhase::Restore);
        }
        if self.push_targets_are_local_only() {
            Output::info(format!(
                "None of the merged branches exist on {}; nothing to push",
                self.remote()
            ));
            return Ok(SyncPhase::Restore);
        }
        Ok(SyncPhase::PushPhase)
    }

    fn push_targets_are_local_only(&self) -> bool {
        let targets = self.stack.push_targets();
        let statuses: Vec<BranchStatus> = self
            .report
            .statuses
            .iter()
            .filter(|s| targets.contains(&s.branch))
            .cloned()
            .collect();
        is_local_only(&statuses)
    }

    fn push_phase(&mut self) -> Result<SyncPhase> {
        let targets = self.stack.push_targets().to_vec();

        let choice = if self.options.auto_push {
            info!("autoPush enabled, pushing all merged branches");
            PushChoice::PushAll
        } else {
            let choice = self.decisions.push(&targets)?;
            info!("Push decision: {:?}", choice);
            choice
        };

        match choice {
            PushChoice::PushAll => {
                for branch in &targets {
                    self.push_branch(branch);
                }
            }
            PushChoice::OneByOne => {
                for branch in &targets {
                    let confirmed = self.decisions.confirm_push(branch)?;
                    info!("Push '{}': {}", branch, if confirmed { "yes" } else { "no" });
                    if confirmed {
                        self.push_branch(branch);
                    }
                }
            }
            PushChoice::Skip => {
                Output::info("Skipped pushing. Push later with:");
                Output::command_example(format!("git push {} {}", self.remote(), targets.join(" ")));
            }
        }

        Ok(SyncPhase::Restore)
    }

    fn push_branch(&mut self, branch: &str) {
        let remote = self.remote().to_string();
        let set_upstream = !self.repo.remote_branch_exists(&remote, branch);

        match self.repo.push(&remote, branch, set_upstream) {
            Ok(()) => {
                Output::success(format!("Pushed {branch}"));
                self.report.pushed.push(branch.to_string());
            }
            Err(e) => {
                self.warn(format!("Push of {branch} failed: {e}"));
                Output::command_example(format!("git push {remote} {branch}"));
            }
        }
    }

    fn restore(&mut self) -> SyncPhase {
        let terminal = if self.failure.is_some() {
            SyncPhase::Aborted
        } else {
            SyncPhase::Done
        };

        if let Some(AbortReason::MergeConflict { target, .. }) = &self.failure {
            debug!("Leaving {} with the conflicted merge in place", target);
            Output::info(format!(
                "Stopped at merge {} of {}; {} stays checked out",
                self.session.current_index + 1,
                self.stack.len() - 1,
                target
            ));
            if self.session.stash_applied {
                self.warn(
                    "Your uncommitted changes are still stashed. After resolving the merge, restore them with 'git stash pop'"
                        .to_string(),
                );
                Output::command_example("git stash pop");
            }
            return terminal;
        }

        let mut back_on_original = true;
        if let Some(original) = self.session.original_branch.clone() {
            match self.repo.get_current_branch() {
                Ok(current) if current == original => {}
                _ => {
                    if let Err(e) = self.repo.checkout_branch(&original) {
                        back_on_original = false;
                        self.warn(format!("Could not switch back to {original}: {e}"));
                        Output::command_example(format!("git checkout {original}"));
                    }
                }
            }
        }

        if self.session.stash_applied {
            if !back_on_original {
                self.warn("Stashed changes were not restored".to_string());
                Output::command_example("git stash pop");
                return terminal;
            }

            match self.repo.stash_pop() {
                Ok(StashPopOutcome::Restored) => {
                    self.report.stash_restored = true;
                    Output::success("Restored stashed changes");
                }
                Ok(StashPopOutcome::Kept { paths, message }) => self.stash_kept(&paths, &message),
                Err(e) => self.stash_kept(&[], &e.to_string()),
            }
        }

        terminal
    }

    fn stash_kept(&mut self, paths: &[String], message: &str) {
        if paths.is_empty() {
            self.warn(format!("Could not restore stashed changes automatically: {message}"));
        } else {
            self.warn(format!(
                "Could not restore stashed changes automatically, blocked by {}: {message}",
                paths.join(", ")
            ));
            for path in paths {
                Output::bullet(path);
            }
        }
        Output::tip("The changes are still in the stash. Review them, move or resolve the paths above, then restore:");
        Output::command_example("git stash show -p");
        Output::command_example("git stash pop");
    }
}

fn print_statuses(statuses: &[BranchStatus]) {
    Output::section("Branch status");
    for status in statuses {
        let line = format!("{}: {}", status.branch, status.describe());
        match status.sync_state {
            SyncState::InSync => Output::success(line),
            SyncState::OutOfSync => Output::warning(line),
            SyncState::NoRemote => Output::info(line),
            SyncState::NotFound => Output::error(line),
        }
    }
}
