mod integration {
    pub mod test_helpers;
}

use integration::test_helpers::*;
use stack_sync::git::{GitRepository, UnmergedKind};
use stack_sync::stack::{ConflictProber, ProbeBranch, ProbeOutcome};

#[test]
fn test_conflict_reported_only_for_conflicting_pair() {
    let repo = TestRepo::local();
    repo.branch_with_commit("f1", "main", "shared.txt", "from f1\n");
    repo.branch_with_commit("f2", "main", "shared.txt", "from f2\n");
    repo.branch_with_commit("f3", "f2", "other.txt", "from f3\n");

    let git_repo = GitRepository::open(&repo.path).unwrap();
    let results = ConflictProber::new(&git_repo).probe_stack(&stack(&["main", "f1", "f2", "f3"]));

    let conflicts: Vec<bool> = results.iter().map(|r| r.has_conflicts()).collect();
    assert_eq!(conflicts, vec![false, true, false]);

    let paths = results[1].conflicted_paths();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].path, "shared.txt");
    assert_eq!(paths[0].kind, UnmergedKind::BothAdded);

    assert!(repo.probe_branches().is_empty());
    assert!(!repo.merge_in_progress());
    assert_eq!(repo.current_branch(), "main");
}

#[test]
fn test_probe_does_not_move_any_branch() {
    let repo = TestRepo::local();
    repo.branch_with_commit("f1", "main", "f1.txt", "f1\n");
    commit_file(&repo.path, "main.txt", "main\n");
    let main_head = repo.head_of("main");
    let f1_head = repo.head_of("f1");

    let git_repo = GitRepository::open(&repo.path).unwrap();
    let result = ConflictProber::new(&git_repo).probe("main", "f1");

    assert_eq!(result.outcome, ProbeOutcome::Clean);
    assert_eq!(repo.head_of("main"), main_head);
    assert_eq!(repo.head_of("f1"), f1_head);
    assert_eq!(git_stdout(&repo.path, &["status", "--porcelain"]), "");
}

#[test]
fn test_modify_delete_conflict_is_cleaned_up() {
    let repo = TestRepo::local();
    commit_file(&repo.path, "doomed.txt", "original\n");
    repo.branch_with_commit("f1", "main", "doomed.txt", "changed on f1\n");
    git(&repo.path, &["checkout", "--quiet", "-b", "f2", "main"]);
    git(&repo.path, &["rm", "--quiet", "doomed.txt"]);
    git(&repo.path, &["commit", "--quiet", "-m", "Remove doomed.txt"]);

    let git_repo = GitRepository::open(&repo.path).unwrap();
    let result = ConflictProber::new(&git_repo).probe("f1", "f2");

    assert!(result.has_conflicts());
    assert_eq!(result.conflicted_paths()[0].kind, UnmergedKind::DeletedByUs);
    assert!(repo.probe_branches().is_empty());
    assert!(!repo.merge_in_progress());
    assert_eq!(repo.current_branch(), "f2");
    assert!(!repo.path.join("doomed.txt").exists());
}

#[test]
fn test_unknown_source_fails_without_leftovers() {
    let repo = TestRepo::local();
    repo.branch_with_commit("f1", "main", "f1.txt", "f1\n");

    let git_repo = GitRepository::open(&repo.path).unwrap();
    let result = ConflictProber::new(&git_repo).probe("does-not-exist", "f1");

    assert!(matches!(result.outcome, ProbeOutcome::Failed(_)));
    assert!(!result.has_conflicts());
    assert!(repo.probe_branches().is_empty());
}

#[test]
fn test_dropped_probe_branch_is_removed() {
    let repo = TestRepo::local();
    repo.branch_with_commit("f1", "main", "shared.txt", "from f1\n");
    repo.branch_with_commit("f2", "main", "shared.txt", "from f2\n");
    let git_repo = GitRepository::open(&repo.path).unwrap();

    {
        let branch = ProbeBranch::create(&git_repo, "f2").unwrap();
        assert_eq!(repo.current_branch(), branch.name());
        assert!(!git_succeeds(&repo.path, &["merge", "--no-commit", "--no-ff", "f1"]));
        assert!(repo.merge_in_progress());
    }

    assert!(repo.probe_branches().is_empty());
    assert!(!repo.merge_in_progress());
    assert_eq!(repo.current_branch(), "main");
}
