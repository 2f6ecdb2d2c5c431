//! Stack sync workflow
//!
//! - [`Stack`]: the ordered branch list and its merge pairs
//! - [`StatusReporter`]: read-only comparison with the remote
//! - [`ConflictProber`]: trial merges on disposable branches
//! - [`SyncOrchestrator`]: the end-to-end run

pub mod orchestrator;
pub mod probe;
pub mod stack;
pub mod status;

pub use orchestrator::{
    AbortReason, RunOptions, SyncOrchestrator, SyncOutcome, SyncPhase, SyncReport,
};
pub use probe::{ConflictProbeResult, ConflictProber, ProbeBranch, ProbeOutcome, PROBE_BRANCH_PREFIX};
pub use stack::{Stack, StackSource};
pub use status::{all_in_sync, is_local_only, BranchStatus, StatusReporter, SyncState};
