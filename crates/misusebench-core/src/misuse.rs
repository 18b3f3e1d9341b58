//! Misuse entities and their pattern artifacts

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source location of a misuse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Source file, relative to the version's source directory
    pub file: String,
    /// Method containing the misuse, if known
    #[serde(default)]
    pub method: Option<String>,
}

/// A correct-usage pattern shipped with a misuse
///
/// Pattern sources are compiled alongside the project sources and their
/// classes are partitioned into a per-misuse directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Absolute path of the pattern source file
    pub path: PathBuf,
    /// Path relative to the misuse's patterns directory
    pub relative: PathBuf,
}

impl Pattern {
    /// Create a pattern from its absolute path and patterns-directory-relative path
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
        }
    }

    /// File stem used to match compiled class outputs
    pub fn class_stem(&self) -> Option<&str> {
        self.relative.file_stem().and_then(|stem| stem.to_str())
    }

    /// Directory component of the relative path, for package-structured patterns
    pub fn relative_dir(&self) -> &Path {
        self.relative.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// A documented API misuse within a project version
#[derive(Debug, Clone)]
pub struct Misuse {
    /// Identifier of the owning project
    pub project_id: String,
    /// Misuse identifier
    pub misuse_id: String,
    /// Source location of the misuse
    pub location: Location,
    /// Free-form description of the misused API usage
    pub description: Option<String>,
    /// Pattern artifacts, if any
    pub patterns: Vec<Pattern>,
}

impl Misuse {
    /// Create a misuse with no patterns
    pub fn new(
        project_id: impl Into<String>,
        misuse_id: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            misuse_id: misuse_id.into(),
            location,
            description: None,
            patterns: Vec::new(),
        }
    }

    /// Add a pattern
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}

impl fmt::Display for Misuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_id, self.misuse_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_class_stem() {
        let pattern = Pattern::new("/data/p/misuses/1/patterns/a/B.java", "a/B.java");
        assert_eq!(pattern.class_stem(), Some("B"));
        assert_eq!(pattern.relative_dir(), Path::new("a"));
    }

    #[test]
    fn pattern_without_package() {
        let pattern = Pattern::new("/data/p/misuses/1/patterns/P.java", "P.java");
        assert_eq!(pattern.class_stem(), Some("P"));
        assert_eq!(pattern.relative_dir(), Path::new(""));
    }

    #[test]
    fn parses_location() {
        let location: Location =
            serde_yaml::from_str("file: a/b.java\nmethod: \"open()\"").unwrap();
        assert_eq!(location.file, "a/b.java");
        assert_eq!(location.method.as_deref(), Some("open()"));
    }
}
