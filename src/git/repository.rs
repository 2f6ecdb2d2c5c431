use crate::errors::{StackSyncError, Result};
use crate::git::status::{
    conflicted_paths, parse_porcelain, stash_pop_blockers, ConflictedPath, StatusEntry,
};
use git2::Repository;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Captured result of a single `git` invocation
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Trimmed stdout, the usual shape of plumbing command answers
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }

    /// Best single-line explanation of a failure
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// How a merge should be performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Real merge that commits the result without opening an editor
    Commit,
    /// Trial merge: `--no-commit --no-ff`, leaves the result staged for inspection
    Trial,
}

/// Result of a merge attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merge applied without conflicts (or there was nothing to merge)
    Clean,
    /// Merge stopped with unmerged paths in the working tree
    Conflicted(Vec<ConflictedPath>),
    /// Merge failed for a reason other than conflicts
    Failed(String),
}

/// Result of restoring the most recent stash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashPopOutcome {
    Restored,
    /// Git kept the stash; `paths` are the files that blocked the restore
    Kept { paths: Vec<String>, message: String },
}

/// Wrapper around the `git` command line for a single working tree
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| StackSyncError::config(format!("Not a git repository: {}", e.message())))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| StackSyncError::config("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self { path: workdir })
    }

    /// Root of the working tree
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run git with the given arguments. Only a failure to spawn is an error;
    /// a non-zero exit is reported through [`GitOutput::success`].
    pub fn run(&self, args: &[&str]) -> Result<GitOutput> {
        debug!("git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| StackSyncError::git(args.join(" "), format!("could not run git: {e}")))?;

        let result = GitOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success {
            debug!("git {} failed: {}", args.join(" "), result.message());
        }

        Ok(result)
    }

    /// Run git and turn a non-zero exit into [`StackSyncError::Git`]
    fn run_checked(&self, args: &[&str]) -> Result<GitOutput> {
        let output = self.run(args)?;
        if output.success {
            Ok(output)
        } else {
            Err(StackSyncError::git(args.join(" "), output.message()))
        }
    }

    /// Get the current branch name, or the HEAD commit id when detached
    pub fn get_current_branch(&self) -> Result<String> {
        let symbolic = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if symbolic.success && !symbolic.text().is_empty() {
            return Ok(symbolic.text().to_string());
        }

        let head = self.rev_parse("HEAD")?.ok_or_else(|| {
            StackSyncError::branch("Could not determine HEAD (repository has no commits?)")
        })?;
        Ok(head)
    }

    /// Parsed `git status --porcelain -z`
    pub fn get_status(&self) -> Result<Vec<StatusEntry>> {
        let output = self.run_checked(&["status", "--porcelain", "-z"])?;
        Ok(parse_porcelain(&output.stdout))
    }

    /// Whether there are uncommitted or untracked changes outside `excluded`
    pub fn is_dirty_excluding(&self, excluded: &[String]) -> Result<bool> {
        let dirty = self
            .get_status()?
            .iter()
            .filter(|entry| !entry.is_ignored())
            .any(|entry| !excluded.iter().any(|path| path == &entry.path));
        Ok(dirty)
    }

    /// Unmerged paths currently in the working tree
    pub fn get_conflicted_files(&self) -> Result<Vec<ConflictedPath>> {
        Ok(conflicted_paths(&self.get_status()?))
    }

    /// Whether the working tree has unmerged paths
    pub fn has_conflicts(&self) -> Result<bool> {
        Ok(!self.get_conflicted_files()?.is_empty())
    }

    /// URL of the named remote, `None` when no such remote is configured
    pub fn get_remote_url(&self, name: &str) -> Result<Option<String>> {
        let output = self.run(&["remote", "get-url", name])?;
        if output.success && !output.text().is_empty() {
            Ok(Some(output.text().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Whether a remote with the given name exists
    pub fn has_remote(&self, name: &str) -> bool {
        matches!(self.get_remote_url(name), Ok(Some(_)))
    }

    /// Fetch from a remote, pruning deleted remote branches
    pub fn fetch(&self, remote: &str) -> Result<()> {
        info!("Fetching from {}", remote);
        self.run_checked(&["fetch", "--prune", remote])?;
        Ok(())
    }

    /// Resolve a reference to a commit id, `None` when it does not resolve
    pub fn rev_parse(&self, reference: &str) -> Result<Option<String>> {
        let spec = format!("{reference}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if output.success && !output.text().is_empty() {
            Ok(Some(output.text().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Commit id of a local branch
    pub fn get_branch_head(&self, name: &str) -> Result<Option<String>> {
        self.rev_parse(&format!("refs/heads/{name}"))
    }

    /// Commit id of a remote-tracking branch
    pub fn get_remote_branch_head(&self, remote: &str, name: &str) -> Result<Option<String>> {
        self.rev_parse(&format!("refs/remotes/{remote}/{name}"))
    }

    /// Check if a local branch exists
    pub fn branch_exists(&self, name: &str) -> bool {
        matches!(self.get_branch_head(name), Ok(Some(_)))
    }

    /// Check if a remote-tracking branch exists
    pub fn remote_branch_exists(&self, remote: &str, name: &str) -> bool {
        matches!(self.get_remote_branch_head(remote, name), Ok(Some(_)))
    }

    /// Local branches whose short name matches a `for-each-ref` pattern
    pub fn list_branches(&self, pattern: &str) -> Result<Vec<String>> {
        let refs = format!("refs/heads/{pattern}");
        let output = self.run_checked(&["for-each-ref", "--format=%(refname:short)", &refs])?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Commits `local` has that `upstream` lacks, and the reverse
    pub fn get_ahead_behind_counts(&self, local: &str, upstream: &str) -> Result<(usize, usize)> {
        let range = format!("{local}...{upstream}");
        let output = self.run_checked(&["rev-list", "--left-right", "--count", &range])?;

        let mut counts = output.text().split_whitespace();
        let parse = |value: Option<&str>| -> Result<usize> {
            value
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| StackSyncError::git(format!("rev-list --left-right --count {range}"), format!("unexpected output '{}'", output.text())))
        };

        let ahead = parse(counts.next())?;
        let behind = parse(counts.next())?;
        Ok((ahead, behind))
    }

    /// Switch to an existing branch (or commit)
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        debug!("Checking out {}", name);
        self.run_checked(&["checkout", "--quiet", name])?;
        Ok(())
    }

    /// Create `name` at `start_point` and switch to it
    pub fn checkout_new_branch(&self, name: &str, start_point: &str) -> Result<()> {
        debug!("Creating branch {} from {}", name, start_point);
        self.run_checked(&["checkout", "--quiet", "-b", name, start_point])?;
        Ok(())
    }

    /// Create a local branch tracking `remote/name` and switch to it
    pub fn checkout_from_remote(&self, remote: &str, name: &str) -> Result<()> {
        info!("Creating local branch {} from {}/{}", name, remote, name);
        let upstream = format!("{remote}/{name}");
        self.run_checked(&["checkout", "--quiet", "--track", "-b", name, &upstream])?;
        Ok(())
    }

    /// Merge `source` into the current branch
    pub fn merge(&self, source: &str, mode: MergeMode) -> Result<MergeOutcome> {
        let args: Vec<&str> = match mode {
            MergeMode::Commit => vec!["merge", "--no-edit", source],
            MergeMode::Trial => vec!["merge", "--no-commit", "--no-ff", source],
        };

        let output = self.run(&args)?;
        if output.success {
            return Ok(MergeOutcome::Clean);
        }

        let conflicts = self.get_conflicted_files()?;
        if conflicts.is_empty() {
            Ok(MergeOutcome::Failed(output.message()))
        } else {
            Ok(MergeOutcome::Conflicted(conflicts))
        }
    }

    /// Whether a merge is in progress (`MERGE_HEAD` exists)
    pub fn merge_in_progress(&self) -> bool {
        matches!(self.rev_parse("MERGE_HEAD"), Ok(Some(_)))
    }

    /// Abort the merge in progress
    pub fn abort_merge(&self) -> Result<()> {
        self.run_checked(&["merge", "--abort"])?;
        Ok(())
    }

    /// Discard every change to tracked files on the current branch
    pub fn reset_hard(&self) -> Result<()> {
        self.run_checked(&["reset", "--hard", "--quiet", "HEAD"])?;
        Ok(())
    }

    /// Delete a local branch
    pub fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run_checked(&["branch", flag, name])?;
        debug!("Deleted branch '{}'", name);
        Ok(())
    }

    /// Stash tracked and untracked changes, leaving `excluded` paths in place
    pub fn stash_push(&self, message: &str, excluded: &[String]) -> Result<()> {
        info!("Stashing local changes: {}", message);

        let exclusions: Vec<String> = excluded
            .iter()
            .filter(|path| self.path.join(path).exists())
            .map(|path| format!(":(exclude){path}"))
            .collect();

        let mut args = vec!["stash", "push", "--include-untracked", "-m", message];
        if !exclusions.is_empty() {
            args.push("--");
            args.push(".");
            args.extend(exclusions.iter().map(String::as_str));
        }

        self.run_checked(&args)?;
        Ok(())
    }

    /// Pop the most recent stash entry
    pub fn stash_pop(&self) -> Result<StashPopOutcome> {
        info!("Restoring stashed changes");
        let output = self.run(&["stash", "pop"])?;
        if output.success {
            return Ok(StashPopOutcome::Restored);
        }

        let mut paths = stash_pop_blockers(&format!("{}\n{}", output.stdout, output.stderr));
        for conflict in self.get_conflicted_files().unwrap_or_default() {
            if !paths.contains(&conflict.path) {
                paths.push(conflict.path);
            }
        }

        Ok(StashPopOutcome::Kept {
            paths,
            message: output.message(),
        })
    }

    /// Number of entries on the stash stack
    pub fn stash_count(&self) -> Result<usize> {
        let output = self.run_checked(&["stash", "list"])?;
        Ok(output.stdout.lines().filter(|l| !l.trim().is_empty()).count())
    }

    /// Fast-forward the current branch to its remote counterpart
    pub fn pull_fast_forward(&self, remote: &str, branch: &str) -> Result<()> {
        info!("Pulling {} from {}", branch, remote);
        self.run_checked(&["pull", "--ff-only", "--quiet", remote, branch])?;
        Ok(())
    }

    /// Push a branch, optionally recording the upstream
    pub fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<()> {
        info!("Pushing {} to {}", branch, remote);
        let mut args = vec!["push", "--quiet"];
        if set_upstream {
            args.push("--set-upstream");
        }
        args.push(remote);
        args.push(branch);
        self.run_checked(&args)?;
        Ok(())
    }
}
