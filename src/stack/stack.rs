use crate::config::StackSyncConfig;
use crate::errors::{StackSyncError, Result};
use std::fmt;

/// Ordered list of branches. Branch `i` is merged into branch `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    name: Option<String>,
    branches: Vec<String>,
}

/// Where a stack definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackSource {
    /// Branch names given on the command line
    Arguments,
    /// A named stack from the configuration file
    Named(String),
    /// The configuration's `defaultStack`
    Default(String),
}

impl Stack {
    /// Build a stack from branch names. At least two branches are required.
    pub fn new(branches: Vec<String>) -> Result<Self> {
        Self::build(None, branches)
    }

    /// Build a named stack
    pub fn named<S: Into<String>>(name: S, branches: Vec<String>) -> Result<Self> {
        Self::build(Some(name.into()), branches)
    }

    fn build(name: Option<String>, branches: Vec<String>) -> Result<Self> {
        let branches: Vec<String> = branches
            .into_iter()
            .map(|b| b.trim().to_string())
            .collect();

        if let Some(empty) = branches.iter().position(|b| b.is_empty()) {
            return Err(StackSyncError::validation(format!(
                "Branch name at position {} is empty",
                empty + 1
            )));
        }

        if branches.len() < 2 {
            return Err(StackSyncError::validation(format!(
                "A stack needs at least two branches to merge, got {}",
                branches.len()
            )));
        }

        Ok(Self { name, branches })
    }

    /// Resolve the stack to sync from command line targets and configuration.
    ///
    /// A single target naming a configured stack selects that stack; no
    /// targets select `defaultStack`; anything else is a branch list.
    pub fn resolve(targets: &[String], config: &StackSyncConfig) -> Result<(Self, StackSource)> {
        match targets {
            [] => {
                let (name, definition) = config.default_stack().ok_or_else(|| {
                    StackSyncError::config(
                        "No branches specified and no defaultStack configured",
                    )
                })?;
                let stack = Self::named(name, definition.branches.clone())?;
                Ok((stack, StackSource::Default(name.to_string())))
            }
            [single] => match config.stack(single) {
                Some(definition) => {
                    let stack = Self::named(single.clone(), definition.branches.clone())?;
                    Ok((stack, StackSource::Named(single.clone())))
                }
                None => Err(StackSyncError::validation(format!(
                    "'{single}' is not a configured stack, and a single branch cannot be merged anywhere"
                ))),
            },
            branches => Ok((Self::new(branches.to_vec())?, StackSource::Arguments)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// The first branch; it only ever acts as a merge source
    pub fn base(&self) -> &str {
        &self.branches[0]
    }

    /// Adjacent `(source, target)` pairs in merge order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.branches
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    /// Branches that receive merges and are therefore candidates for pushing
    pub fn push_targets(&self) -> &[String] {
        &self.branches[1..]
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.branches.join(" → "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn config() -> StackSyncConfig {
        StackSyncConfig::from_json(
            r#"{
                "stacks": {
                    "auth": {"branches": ["main", "auth-api", "auth-ui"]},
                    "solo-ish": {"branches": ["develop", "hotfix"]}
                },
                "defaultStack": "solo-ish"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_pairs_and_push_targets() {
        let stack = Stack::new(branches(&["main", "f1", "f2"])).unwrap();

        let pairs: Vec<(&str, &str)> = stack.pairs().collect();
        assert_eq!(pairs, vec![("main", "f1"), ("f1", "f2")]);
        assert_eq!(stack.base(), "main");
        assert_eq!(stack.push_targets(), &["f1".to_string(), "f2".to_string()]);
        assert_eq!(stack.to_string(), "main → f1 → f2");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let stack = Stack::new(branches(&["main", "f1", "main"])).unwrap();
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_rejects_short_or_empty() {
        assert!(Stack::new(branches(&["main"])).is_err());
        assert!(Stack::new(Vec::new()).is_err());
        assert!(Stack::new(branches(&["main", "  "])).is_err());
    }

    #[test]
    fn test_resolve_named_default_and_arguments() {
        let config = config();

        let (stack, source) = Stack::resolve(&branches(&["auth"]), &config).unwrap();
        assert_eq!(source, StackSource::Named("auth".to_string()));
        assert_eq!(stack.name(), Some("auth"));
        assert_eq!(stack.len(), 3);

        let (stack, source) = Stack::resolve(&[], &config).unwrap();
        assert_eq!(source, StackSource::Default("solo-ish".to_string()));
        assert_eq!(stack.branches(), &branches(&["develop", "hotfix"]));

        let (stack, source) = Stack::resolve(&branches(&["auth", "extra"]), &config).unwrap();
        assert_eq!(source, StackSource::Arguments);
        assert_eq!(stack.name(), None);
        assert_eq!(stack.base(), "auth");
    }

    #[test]
    fn test_resolve_errors() {
        let empty = StackSyncConfig::default();
        assert!(Stack::resolve(&[], &empty).is_err());

        let err = Stack::resolve(&branches(&["unknown"]), &config()).unwrap_err();
        assert!(err.to_string().contains("unknown"));
    }
}
