//! Project versions — checkout and build units of the pipeline

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::misuse::Misuse;

/// Build descriptor from version metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Source directory, relative to the checkout
    pub src: String,
    /// Build commands, executed in order against the assembled build directory
    pub commands: Vec<String>,
    /// Output-classes directory, relative to the build directory
    pub classes: String,
}

/// A specific revision of a project
///
/// A version without a [`BuildConfig`] is a valid entity; compile-dependent
/// stages skip it.
#[derive(Debug, Clone)]
pub struct Version {
    /// Identifier of the owning project (back-reference by id, not pointer)
    pub project_id: String,
    /// Version identifier
    pub version_id: String,
    /// Revision pointer into the project repository
    pub revision: Option<String>,
    /// Build descriptor, if the version is compilable
    pub build: Option<BuildConfig>,
    /// Misuses recorded for this version, in loaded order
    pub misuses: Vec<Misuse>,
    /// Directory the version metadata was loaded from
    pub data_path: PathBuf,
}

impl Version {
    /// Create a version with no misuses
    pub fn new(
        project_id: impl Into<String>,
        version_id: impl Into<String>,
        data_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            version_id: version_id.into(),
            revision: None,
            build: None,
            misuses: Vec::new(),
            data_path: data_path.into(),
        }
    }

    /// Set the build descriptor
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = Some(build);
        self
    }

    /// Set the revision pointer
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Full id in `project.version` form
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.project_id, self.version_id)
    }

    /// Additional build-time files shipped with the version metadata
    pub fn additional_compile_sources(&self) -> PathBuf {
        self.data_path.join("compile")
    }

    /// Sources shipped with the version metadata, for synthetic projects
    pub fn shipped_sources(&self) -> PathBuf {
        self.data_path.join("checkout")
    }

    /// Source files referenced by this version's misuse locations
    pub fn misuse_files(&self) -> Vec<&Path> {
        self.misuses
            .iter()
            .map(|misuse| Path::new(misuse.location.file.as_str()))
            .collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::misuse::{Location, Misuse};

    #[test]
    fn full_id_joins_project_and_version() {
        let version = Version::new("proj", "v1", "/tmp/data/proj/versions/v1");
        assert_eq!(version.full_id(), "proj.v1");
        assert_eq!(version.to_string(), "proj.v1");
    }

    #[test]
    fn misuse_files_lists_locations() {
        let mut version = Version::new("proj", "v1", "/tmp");
        version.misuses.push(Misuse::new(
            "proj",
            "mu1",
            Location {
                file: "a/mu.java".into(),
                method: None,
            },
        ));
        assert_eq!(version.misuse_files(), vec![Path::new("a/mu.java")]);
    }

    #[test]
    fn parses_build_config() {
        let build: BuildConfig =
            serde_yaml::from_str("src: src/main/java\ncommands:\n  - mvn compile\nclasses: target/classes")
                .unwrap();
        assert_eq!(build.src, "src/main/java");
        assert_eq!(build.commands, vec!["mvn compile"]);
        assert_eq!(build.classes, "target/classes");
    }
}
