//! Shared setup for the integration tests: throwaway repositories driven
//! through the real `git` binary.

#![allow(dead_code)]

use stack_sync::stack::{RunOptions, Stack};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run git in `repo_path`, panicking with its stderr on failure
pub fn git(repo_path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("git should be runnable");

    if !output.status.success() {
        panic!(
            "Git command failed: git {}\nStderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// Run git in `repo_path` and return trimmed stdout
pub fn git_stdout(repo_path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("git should be runnable");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Whether `git <args>` exits successfully
pub fn git_succeeds(repo_path: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn configure_identity(repo_path: &Path) {
    git(repo_path, &["config", "user.name", "Test User"]);
    git(repo_path, &["config", "user.email", "test@example.com"]);
    git(repo_path, &["config", "commit.gpgsign", "false"]);
    git(repo_path, &["config", "core.autocrlf", "false"]);
}

pub fn commit_file(repo_path: &Path, filename: &str, content: &str) {
    std::fs::write(repo_path.join(filename), content).unwrap();
    git(repo_path, &["add", filename]);
    git(repo_path, &["commit", "--quiet", "-m", &format!("Update {filename}")]);
}

/// A working repository with `main` checked out and an optional bare remote
pub struct TestRepo {
    temp_dir: TempDir,
    pub path: PathBuf,
    pub remote: Option<PathBuf>,
}

impl TestRepo {
    /// Local-only repository with one commit on `main`
    pub fn local() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("work");
        std::fs::create_dir_all(&path).unwrap();

        git(&path, &["init", "--quiet"]);
        git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        configure_identity(&path);
        commit_file(&path, "README.md", "# Test Repository\n");

        Self {
            temp_dir,
            path,
            remote: None,
        }
    }

    /// Repository with a bare `origin` that already has `main`
    pub fn with_remote() -> Self {
        let mut repo = Self::local();
        let remote = repo.temp_dir.path().join("origin.git");
        std::fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "--bare", "--quiet"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        git(&repo.path, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&repo.path, &["push", "--quiet", "-u", "origin", "main"]);
        repo.remote = Some(remote);
        repo
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create `name` from `from` with one commit of its own, then return to `main`
    pub fn branch_with_commit(&self, name: &str, from: &str, filename: &str, content: &str) {
        git(&self.path, &["checkout", "--quiet", "-b", name, from]);
        commit_file(&self.path, filename, content);
        git(&self.path, &["checkout", "--quiet", "main"]);
    }

    /// Add a commit on an existing branch, then return to `main`
    pub fn commit_on(&self, branch: &str, filename: &str, content: &str) {
        git(&self.path, &["checkout", "--quiet", branch]);
        commit_file(&self.path, filename, content);
        git(&self.path, &["checkout", "--quiet", "main"]);
    }

    pub fn push(&self, branches: &[&str]) {
        let mut args = vec!["push", "--quiet", "origin"];
        args.extend_from_slice(branches);
        git(&self.path, &args);
    }

    /// Second clone of the remote, for simulating other contributors
    pub fn other_clone(&self) -> PathBuf {
        let remote = self.remote.as_ref().expect("repository has no remote");
        let other = self.temp_dir.path().join("other");
        git(
            self.temp_dir.path(),
            &["clone", "--quiet", remote.to_str().unwrap(), other.to_str().unwrap()],
        );
        configure_identity(&other);
        other
    }

    pub fn current_branch(&self) -> String {
        git_stdout(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn head_of(&self, reference: &str) -> String {
        git_stdout(&self.path, &["rev-parse", reference])
    }

    /// Whether `ancestor` is reachable from `descendant`
    pub fn contains(&self, descendant: &str, ancestor: &str) -> bool {
        git_succeeds(&self.path, &["merge-base", "--is-ancestor", ancestor, descendant])
    }

    pub fn merge_in_progress(&self) -> bool {
        self.path.join(".git").join("MERGE_HEAD").exists()
    }

    pub fn stash_count(&self) -> usize {
        git_stdout(&self.path, &["stash", "list"]).lines().count()
    }

    pub fn probe_branches(&self) -> Vec<String> {
        git_stdout(
            &self.path,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads/stack-sync/probe"],
        )
        .lines()
        .map(str::to_string)
        .collect()
    }

    pub fn read(&self, filename: &str) -> String {
        std::fs::read_to_string(self.path.join(filename)).unwrap()
    }

    pub fn write(&self, filename: &str, content: &str) {
        std::fs::write(self.path.join(filename), content).unwrap();
    }
}

pub fn stack(names: &[&str]) -> Stack {
    Stack::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
}

pub fn options() -> RunOptions {
    RunOptions::default()
}

pub fn options_without_probe() -> RunOptions {
    RunOptions {
        conflict_check: false,
        ..RunOptions::default()
    }
}

/// `f1` and `f2` both branch from `main` and change `shared.txt` differently
pub fn create_conflicting_stack(repo: &TestRepo) {
    repo.branch_with_commit("f1", "main", "shared.txt", "from f1\n");
    repo.branch_with_commit("f2", "main", "shared.txt", "from f2\n");
}

/// Path to the compiled binary
pub fn stack_sync_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stack-sync"))
}

/// Run the binary in `dir` with configuration lookup isolated from the host
pub fn run_cli(dir: &Path, config_home: &Path, args: &[&str]) -> Output {
    Command::new(stack_sync_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("STACK_SYNC_CONFIG")
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env("CI", "true")
        .output()
        .expect("stack-sync binary should run")
}
