//! Project entities — the root of the benchmark hierarchy

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Kind of repository a project's sources live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    /// Git repository, checked out via libgit2
    Git,
    /// Subversion repository, checked out via the `svn` binary
    Svn,
    /// Sources shipped with the benchmark data itself
    Synthetic,
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Svn => write!(f, "svn"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Repository descriptor from project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Repository kind
    #[serde(rename = "type")]
    pub kind: RepoKind,
    /// Repository URL; absent for synthetic projects
    #[serde(default)]
    pub url: Option<String>,
}

/// A benchmarked software project
///
/// Projects are immutable once loaded from their metadata descriptor. The
/// pipeline iterates them in loaded order.
#[derive(Debug, Clone)]
pub struct Project {
    /// Project identifier (the data directory name)
    pub id: String,
    /// Repository descriptor, if any
    pub repository: Option<Repository>,
    /// Versions in loaded order
    pub versions: Vec<Version>,
}

impl Project {
    /// Create a project with no versions
    pub fn new(id: impl Into<String>, repository: Option<Repository>) -> Self {
        Self {
            id: id.into(),
            repository,
            versions: Vec::new(),
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repository_descriptor() {
        let repo: Repository =
            serde_yaml::from_str("type: git\nurl: https://example.com/repo.git").unwrap();
        assert_eq!(repo.kind, RepoKind::Git);
        assert_eq!(repo.url.as_deref(), Some("https://example.com/repo.git"));
    }

    #[test]
    fn parses_synthetic_repository_without_url() {
        let repo: Repository = serde_yaml::from_str("type: synthetic").unwrap();
        assert_eq!(repo.kind, RepoKind::Synthetic);
        assert!(repo.url.is_none());
    }
}
