//! Parsing of `git status --porcelain -z` output.
//!
//! Records are NUL-terminated and paths are written verbatim, so names with
//! spaces, quotes or non-ASCII characters need no unescaping. Only the
//! two-letter status code and the path are interpreted. Unmerged
//! entries are classified so that callers can tell a conflicted merge apart
//! from an ordinary dirty working tree.

use serde::{Deserialize, Serialize};

/// Kind of unmerged path left behind by a merge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UnmergedKind {
    /// `DD`: deleted on both sides
    BothDeleted,
    /// `AU`: added by us
    AddedByUs,
    /// `UD`: deleted by them
    DeletedByThem,
    /// `UA`: added by them
    AddedByThem,
    /// `DU`: deleted by us
    DeletedByUs,
    /// `AA`: added on both sides
    BothAdded,
    /// `UU`: modified on both sides
    BothModified,
}

impl UnmergedKind {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "DD" => Some(Self::BothDeleted),
            "AU" => Some(Self::AddedByUs),
            "UD" => Some(Self::DeletedByThem),
            "UA" => Some(Self::AddedByThem),
            "DU" => Some(Self::DeletedByUs),
            "AA" => Some(Self::BothAdded),
            "UU" => Some(Self::BothModified),
            _ => None,
        }
    }

    /// Short human readable label, matching the wording `git status` uses
    pub fn label(&self) -> &'static str {
        match self {
            Self::BothDeleted => "both deleted",
            Self::AddedByUs => "added by us",
            Self::DeletedByThem => "deleted by them",
            Self::AddedByThem => "added by them",
            Self::DeletedByUs => "deleted by us",
            Self::BothAdded => "both added",
            Self::BothModified => "both modified",
        }
    }
}

/// One record of porcelain status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Raw two-letter code, e.g. ` M`, `??`, `UU`
    pub code: String,
    /// Path relative to the repository root (the destination for renames)
    pub path: String,
    /// Set when the entry is an unmerged path
    pub unmerged: Option<UnmergedKind>,
}

impl StatusEntry {
    pub fn is_ignored(&self) -> bool {
        self.code == "!!"
    }
}

/// A conflicted path together with how it conflicted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictedPath {
    pub path: String,
    pub kind: UnmergedKind,
}

/// Parse the full output of `git status --porcelain -z`
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut fields = output.split('\0');

    while let Some(record) = fields.next() {
        let Some(entry) = parse_record(record) else {
            continue;
        };
        // Renames and copies carry the source path as an extra field
        if entry.code.contains(|c| c == 'R' || c == 'C') {
            fields.next();
        }
        entries.push(entry);
    }

    entries
}

fn parse_record(record: &str) -> Option<StatusEntry> {
    if record.len() < 4 || !record.is_char_boundary(2) || record.as_bytes()[2] != b' ' {
        return None;
    }

    let code = &record[..2];
    let path = &record[3..];

    Some(StatusEntry {
        code: code.to_string(),
        path: path.to_string(),
        unmerged: UnmergedKind::from_code(code),
    })
}

/// Paths a failed `git stash pop` names as standing in its way: untracked
/// files it refused to overwrite, files with local changes, and paths that
/// conflicted while reapplying the stash.
pub fn stash_pop_blockers(output: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    let mut in_file_list = false;

    for line in output.lines() {
        let found = if let Some(path) = line.strip_suffix(" already exists, no checkout") {
            Some(path)
        } else if let Some((_, path)) = line.split_once("Merge conflict in ") {
            Some(path)
        } else if in_file_list && line.starts_with('\t') {
            Some(line.trim())
        } else {
            None
        };

        in_file_list = line.ends_with("would be overwritten by merge:")
            || (in_file_list && line.starts_with('\t'));

        if let Some(path) = found.map(str::trim).filter(|p| !p.is_empty()) {
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
    }

    paths
}

/// Extract the unmerged paths from parsed status entries
pub fn conflicted_paths(entries: &[StatusEntry]) -> Vec<ConflictedPath> {
    entries
        .iter()
        .filter_map(|entry| {
            entry.unmerged.map(|kind| ConflictedPath {
                path: entry.path.clone(),
                kind,
            })
        })
        .collect()
}
