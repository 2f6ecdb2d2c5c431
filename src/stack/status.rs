use crate::git::GitRepository;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How a local branch relates to its remote-tracking counterpart
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    /// Local and remote point at the same commit
    InSync,
    /// Local and remote point at different commits
    OutOfSync,
    /// There is nothing to compare against on the remote
    NoRemote,
    /// The branch does not exist locally (or could not be queried)
    NotFound,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncState::InSync => "in sync",
            SyncState::OutOfSync => "out of sync",
            SyncState::NoRemote => "no remote",
            SyncState::NotFound => "not found",
        };
        f.write_str(label)
    }
}

/// Status of one branch of the stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchStatus {
    pub branch: String,
    pub exists_locally: bool,
    pub exists_remotely: bool,
    pub sync_state: SyncState,
    /// Commits on the local branch missing from the remote
    pub ahead: usize,
    /// Commits on the remote branch missing locally
    pub behind: usize,
}

impl BranchStatus {
    fn new(branch: &str, sync_state: SyncState) -> Self {
        Self {
            branch: branch.to_string(),
            exists_locally: false,
            exists_remotely: false,
            sync_state,
            ahead: 0,
            behind: 0,
        }
    }

    /// Whether syncing with the remote could change this branch: it diverged,
    /// or it exists only on the remote and can be created from there.
    pub fn needs_sync(&self) -> bool {
        match self.sync_state {
            SyncState::OutOfSync => true,
            SyncState::NotFound => self.exists_remotely,
            SyncState::InSync | SyncState::NoRemote => false,
        }
    }

    /// One-line description used in reports and prompts
    pub fn describe(&self) -> String {
        match self.sync_state {
            SyncState::OutOfSync => {
                format!("{} ({} ahead, {} behind)", self.sync_state, self.ahead, self.behind)
            }
            SyncState::NotFound if self.exists_remotely => {
                format!("{} locally, exists on remote", self.sync_state)
            }
            state => state.to_string(),
        }
    }
}

/// Read-only comparison of stack branches against a remote
pub struct StatusReporter<'a> {
    repo: &'a GitRepository,
    remote: &'a str,
}

impl<'a> StatusReporter<'a> {
    pub fn new(repo: &'a GitRepository, remote: &'a str) -> Self {
        Self { repo, remote }
    }

    /// Status for every branch of the stack, in stack order.
    ///
    /// Never fails as a whole: a branch whose queries fail is reported as
    /// [`SyncState::NotFound`].
    pub fn report(&self, stack: &Stack) -> Vec<BranchStatus> {
        let remote_exists = self.repo.has_remote(self.remote);
        if !remote_exists {
            debug!("Remote '{}' not configured, treating stack as local only", self.remote);
        }

        stack
            .branches()
            .iter()
            .map(|branch| self.branch_status(branch, remote_exists))
            .collect()
    }

    fn branch_status(&self, branch: &str, remote_exists: bool) -> BranchStatus {
        let local = match self.repo.get_branch_head(branch) {
            Ok(head) => head,
            Err(e) => {
                warn!("Could not query branch '{}': {}", branch, e);
                return BranchStatus::new(branch, SyncState::NotFound);
            }
        };

        if !remote_exists {
            let mut status = BranchStatus::new(branch, SyncState::NoRemote);
            status.exists_locally = local.is_some();
            return status;
        }

        let remote = match self.repo.get_remote_branch_head(self.remote, branch) {
            Ok(head) => head,
            Err(e) => {
                warn!("Could not query {}/{}: {}", self.remote, branch, e);
                None
            }
        };

        let mut status = BranchStatus::new(branch, SyncState::NotFound);
        status.exists_locally = local.is_some();
        status.exists_remotely = remote.is_some();

        match (local, remote) {
            (None, _) => {}
            (Some(_), None) => status.sync_state = SyncState::NoRemote,
            (Some(local), Some(remote)) if local == remote => {
                status.sync_state = SyncState::InSync;
            }
            (Some(_), Some(_)) => {
                let upstream = format!("refs/remotes/{}/{}", self.remote, branch);
                let local_ref = format!("refs/heads/{branch}");
                match self.repo.get_ahead_behind_counts(&local_ref, &upstream) {
                    Ok((ahead, behind)) => {
                        status.sync_state = SyncState::OutOfSync;
                        status.ahead = ahead;
                        status.behind = behind;
                    }
                    Err(e) => {
                        warn!("Could not compare '{}' with its remote: {}", branch, e);
                        status.sync_state = SyncState::NotFound;
                    }
                }
            }
        }

        status
    }
}

/// Whether every branch is in sync with the remote
pub fn all_in_sync(statuses: &[BranchStatus]) -> bool {
    statuses.iter().all(|s| s.sync_state == SyncState::InSync)
}

/// Whether none of the reported branches has a remote counterpart
pub fn is_local_only(statuses: &[BranchStatus]) -> bool {
    statuses.iter().all(|s| s.sync_state == SyncState::NoRemote && !s.exists_remotely)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::process::Command;
    use tempfile::TempDir;

    fn git(repo_path: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_path)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn init_repo(path: &Path) {
        git(path, &["init", "--quiet"]);
        git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(path, &["config", "user.name", "Test"]);
        git(path, &["config", "user.email", "test@test.com"]);
        git(path, &["config", "commit.gpgsign", "false"]);
    }

    fn commit_file(path: &Path, filename: &str, content: &str) {
        std::fs::write(path.join(filename), content).unwrap();
        git(path, &["add", filename]);
        git(path, &["commit", "--quiet", "-m", &format!("Update {filename}")]);
    }

    /// Local repository cloned from a bare remote, with `main` and `f1` pushed
    fn create_repo_with_remote() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let remote = temp_dir.path().join("remote.git");
        let local = temp_dir.path().join("local");
        std::fs::create_dir_all(&remote).unwrap();
        std::fs::create_dir_all(&local).unwrap();

        git(&remote, &["init", "--bare", "--quiet"]);
        init_repo(&local);
        commit_file(&local, "README.md", "# Test\n");
        git(&local, &["checkout", "--quiet", "-b", "f1"]);
        commit_file(&local, "f1.txt", "f1\n");
        git(&local, &["checkout", "--quiet", "main"]);
        git(&local, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&local, &["push", "--quiet", "origin", "main", "f1"]);

        (temp_dir, local, remote)
    }

    fn stack(names: &[&str]) -> Stack {
        Stack::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_no_remote_marks_every_branch() {
        let temp_dir = TempDir::new().unwrap();
        init_repo(temp_dir.path());
        commit_file(temp_dir.path(), "README.md", "# Test\n");
        git(temp_dir.path(), &["branch", "f1"]);

        let repo = GitRepository::open(temp_dir.path()).unwrap();
        let statuses = StatusReporter::new(&repo, "origin").report(&stack(&["main", "f1", "ghost"]));

        assert!(statuses.iter().all(|s| s.sync_state == SyncState::NoRemote));
        assert!(statuses[0].exists_locally);
        assert!(statuses[1].exists_locally);
        assert!(!statuses[2].exists_locally);
        assert!(is_local_only(&statuses));
        assert!(!statuses.iter().any(BranchStatus::needs_sync));
    }

    #[test]
    fn test_in_sync_and_missing_remote_branch() {
        let (_temp_dir, local, _remote) = create_repo_with_remote();
        git(&local, &["branch", "local-only"]);

        let repo = GitRepository::open(&local).unwrap();
        let statuses =
            StatusReporter::new(&repo, "origin").report(&stack(&["main", "f1", "local-only"]));

        assert_eq!(statuses[0].sync_state, SyncState::InSync);
        assert_eq!(statuses[1].sync_state, SyncState::InSync);
        assert_eq!(statuses[2].sync_state, SyncState::NoRemote);
        assert!(statuses[2].exists_locally);
        assert!(!statuses[2].exists_remotely);
        assert!(!all_in_sync(&statuses));
        assert!(all_in_sync(&statuses[..2]));
        assert!(!is_local_only(&statuses));
    }

    #[test]
    fn test_out_of_sync_counts() {
        let (temp_dir, local, remote) = create_repo_with_remote();

        // Another clone advances f1 on the remote by two commits
        let other = temp_dir.path().join("other");
        git(temp_dir.path(), &["clone", "--quiet", remote.to_str().unwrap(), other.to_str().unwrap()]);
        git(&other, &["config", "user.name", "Other"]);
        git(&other, &["config", "user.email", "other@test.com"]);
        git(&other, &["config", "commit.gpgsign", "false"]);
        git(&other, &["checkout", "--quiet", "f1"]);
        commit_file(&other, "remote-1.txt", "1\n");
        commit_file(&other, "remote-2.txt", "2\n");
        git(&other, &["push", "--quiet", "origin", "f1"]);

        // Local f1 gains one commit of its own
        git(&local, &["checkout", "--quiet", "f1"]);
        commit_file(&local, "local.txt", "local\n");
        git(&local, &["fetch", "--quiet", "origin"]);

        let repo = GitRepository::open(&local).unwrap();
        let statuses = StatusReporter::new(&repo, "origin").report(&stack(&["main", "f1"]));

        assert_eq!(statuses[0].sync_state, SyncState::InSync);
        let f1 = &statuses[1];
        assert_eq!(f1.sync_state, SyncState::OutOfSync);
        assert_eq!((f1.ahead, f1.behind), (1, 2));
        assert!(f1.needs_sync());
        assert_eq!(f1.describe(), "out of sync (1 ahead, 2 behind)");
    }

    #[test]
    fn test_remote_only_branch_is_not_found_but_syncable() {
        let (_temp_dir, local, _remote) = create_repo_with_remote();
        git(&local, &["branch", "--quiet", "-D", "f1"]);

        let repo = GitRepository::open(&local).unwrap();
        let statuses = StatusReporter::new(&repo, "origin").report(&stack(&["main", "f1", "ghost"]));

        let f1 = &statuses[1];
        assert_eq!(f1.sync_state, SyncState::NotFound);
        assert!(!f1.exists_locally);
        assert!(f1.exists_remotely);
        assert!(f1.needs_sync());

        let ghost = &statuses[2];
        assert_eq!(ghost.sync_state, SyncState::NotFound);
        assert!(!ghost.needs_sync());
    }
}
