//! Dataset loading
//!
//! The benchmark data directory is the source of truth for the entity
//! hierarchy:
//!
//! ```text
//! data/<project>/project.yml
//! data/<project>/versions/<version>/version.yml
//! data/<project>/misuses/<misuse>/misuse.yml
//! data/<project>/misuses/<misuse>/patterns/<file>.java
//! ```
//!
//! Projects, versions and misuses are loaded in sorted directory order so a
//! pipeline run visits entities deterministically. Malformed entries are
//! configuration errors: they are logged and skipped, never fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{ConfigError, Result};
use crate::misuse::{Location, Misuse, Pattern};
use crate::project::{Project, Repository};
use crate::version::{BuildConfig, Version};

/// Entity id filter built from `--only` / `--skip` CLI lists
///
/// Entries use `project`, `project.version`, or `project.version.misuse`
/// form. An entry covers an entity when its segments are a prefix of the
/// entity's id chain; for the allow list, the reverse also holds so that
/// `--only p.v` keeps project `p` in the walk.
#[derive(Debug, Clone, Default)]
pub struct IdFilter {
    only: Vec<String>,
    skip: Vec<String>,
}

impl IdFilter {
    /// Create a filter from allow and deny lists
    pub fn new(only: Vec<String>, skip: Vec<String>) -> Self {
        Self { only, skip }
    }

    /// Filter that passes everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether the given id chain should be processed
    pub fn allows(&self, ids: &[&str]) -> bool {
        if self.skip.iter().any(|entry| Self::is_prefix(entry, ids)) {
            return false;
        }
        if self.only.is_empty() {
            return true;
        }
        self.only
            .iter()
            .any(|entry| Self::is_prefix(entry, ids) || Self::is_extension(entry, ids))
    }

    /// Entry segments are a prefix of the id chain
    fn is_prefix(entry: &str, ids: &[&str]) -> bool {
        let segments: Vec<&str> = entry.split('.').collect();
        segments.len() <= ids.len() && segments.iter().zip(ids).all(|(a, b)| a == b)
    }

    /// Id chain is a prefix of the entry segments
    fn is_extension(entry: &str, ids: &[&str]) -> bool {
        let segments: Vec<&str> = entry.split('.').collect();
        ids.len() <= segments.len() && ids.iter().zip(&segments).all(|(a, b)| a == b)
    }
}

#[derive(Debug, Deserialize)]
struct ProjectMeta {
    #[serde(default)]
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
struct VersionMeta {
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    build: Option<BuildConfig>,
    #[serde(default)]
    misuses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MisuseMeta {
    location: Location,
    #[serde(default)]
    description: Option<String>,
}

/// Load all projects from the data directory, honoring the id filter
pub fn load_projects(data_path: &Path, filter: &IdFilter) -> Result<Vec<Project>> {
    let mut projects = Vec::new();
    for project_dir in sorted_subdirs(data_path)? {
        let project_id = dir_name(&project_dir);
        if !filter.allows(&[&project_id]) {
            debug!(project = %project_id, "filtered out");
            continue;
        }
        match load_project(&project_dir, &project_id, filter) {
            Ok(project) => projects.push(project),
            Err(err) => {
                warn!(project = %project_id, error = %err, "skipping project with bad metadata");
            }
        }
    }
    Ok(projects)
}

fn load_project(project_dir: &Path, project_id: &str, filter: &IdFilter) -> Result<Project> {
    let meta: ProjectMeta = read_yaml(&project_dir.join("project.yml"))?;
    let mut project = Project::new(project_id, meta.repository);

    let versions_dir = project_dir.join("versions");
    if versions_dir.is_dir() {
        for version_dir in sorted_subdirs(&versions_dir)? {
            let version_id = dir_name(&version_dir);
            if !filter.allows(&[project_id, &version_id]) {
                debug!(version = %version_id, "filtered out");
                continue;
            }
            match load_version(project_dir, &version_dir, project_id, &version_id, filter) {
                Ok(version) => project.versions.push(version),
                Err(err) => {
                    warn!(
                        version = format!("{project_id}.{version_id}"),
                        error = %err,
                        "skipping version with bad metadata"
                    );
                }
            }
        }
    }
    Ok(project)
}

fn load_version(
    project_dir: &Path,
    version_dir: &Path,
    project_id: &str,
    version_id: &str,
    filter: &IdFilter,
) -> Result<Version> {
    let meta: VersionMeta = read_yaml(&version_dir.join("version.yml"))?;
    let mut version = Version::new(project_id, version_id, version_dir);
    version.revision = meta.revision;
    version.build = meta.build;

    for misuse_id in &meta.misuses {
        if !filter.allows(&[project_id, version_id, misuse_id]) {
            debug!(misuse = %misuse_id, "filtered out");
            continue;
        }
        let misuse_dir = project_dir.join("misuses").join(misuse_id);
        match load_misuse(&misuse_dir, project_id, misuse_id) {
            Ok(misuse) => version.misuses.push(misuse),
            Err(err) => {
                warn!(
                    misuse = format!("{project_id}.{version_id}.{misuse_id}"),
                    error = %err,
                    "skipping misuse with bad metadata"
                );
            }
        }
    }
    Ok(version)
}

fn load_misuse(misuse_dir: &Path, project_id: &str, misuse_id: &str) -> Result<Misuse> {
    let meta: MisuseMeta = read_yaml(&misuse_dir.join("misuse.yml"))?;
    let mut misuse = Misuse::new(project_id, misuse_id, meta.location);
    misuse.description = meta.description;
    misuse.patterns = load_patterns(&misuse_dir.join("patterns"))?;
    Ok(misuse)
}

fn load_patterns(patterns_dir: &Path) -> Result<Vec<Pattern>> {
    let mut patterns = Vec::new();
    if !patterns_dir.is_dir() {
        return Ok(patterns);
    }
    for entry in WalkDir::new(patterns_dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(patterns_dir)
            .expect("pattern outside patterns dir")
            .to_path_buf();
        patterns.push(Pattern::new(entry.path(), relative));
    }
    Ok(patterns)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(ConfigError::MissingMetadata(path.to_path_buf()).into());
    }
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|source| {
        ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

fn sorted_subdirs(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
