//! Checkout materialization
//!
//! A checkout is a working copy of a version's sources at a deterministic
//! path keyed by project and version id. Materialization stages into a
//! sibling directory and renames into place, so a half-written checkout is
//! never observed by later stages.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CheckoutError, ConfigError};
use crate::fsutil;
use crate::project::{Project, RepoKind};
use crate::shell;
use crate::version::Version;

/// A materialized (or materializable) working copy of a version
#[derive(Debug, Clone)]
pub struct Checkout {
    project_id: String,
    version_id: String,
    kind: RepoKind,
    url: Option<String>,
    revision: Option<String>,
    /// Sources shipped with the version metadata, used for synthetic projects
    shipped_sources: PathBuf,
    checkout_dir: PathBuf,
}

impl Checkout {
    /// Derive the checkout for a version
    ///
    /// Fails with a configuration error when the project has no repository
    /// descriptor, or a non-synthetic descriptor has no URL.
    pub fn for_version(
        checkouts_base: &Path,
        project: &Project,
        version: &Version,
    ) -> Result<Self, ConfigError> {
        let repository = project
            .repository
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRepository(project.id.clone()))?;
        if repository.kind != RepoKind::Synthetic && repository.url.is_none() {
            return Err(ConfigError::MissingRepositoryUrl(project.id.clone()));
        }
        Ok(Self {
            project_id: project.id.clone(),
            version_id: version.version_id.clone(),
            kind: repository.kind,
            url: repository.url.clone(),
            revision: version.revision.clone(),
            shipped_sources: version.shipped_sources(),
            checkout_dir: checkouts_base
                .join(&project.id)
                .join(&version.version_id)
                .join("checkout"),
        })
    }

    /// Resolved working-copy directory
    pub fn path(&self) -> &Path {
        &self.checkout_dir
    }

    /// Whether a non-empty working copy exists
    pub fn exists(&self) -> bool {
        fsutil::dir_is_nonempty(&self.checkout_dir)
    }

    /// Materialize the working copy
    ///
    /// A no-op when the checkout already exists and `force` is unset.
    pub fn materialize(&self, force: bool) -> Result<(), CheckoutError> {
        if self.exists() && !force {
            debug!(checkout = %self.checkout_dir.display(), "checkout exists");
            return Ok(());
        }

        info!(
            project = %self.project_id,
            version = %self.version_id,
            kind = %self.kind,
            "materializing checkout"
        );

        fsutil::remove_tree(&self.checkout_dir)?;
        let staging = self
            .checkout_dir
            .parent()
            .map(|parent| parent.join(".checkout-staging"))
            .unwrap_or_else(|| PathBuf::from(".checkout-staging"));
        fsutil::remove_tree(&staging)?;
        fs::create_dir_all(&staging)?;

        let result = match self.kind {
            RepoKind::Git => self.materialize_git(&staging),
            RepoKind::Svn => self.materialize_svn(&staging),
            RepoKind::Synthetic => self.materialize_synthetic(&staging),
        };
        if let Err(err) = result {
            let _ = fsutil::remove_tree(&staging);
            return Err(err);
        }

        fs::rename(&staging, &self.checkout_dir)?;
        Ok(())
    }

    fn materialize_git(&self, target: &Path) -> Result<(), CheckoutError> {
        let url = self.url.as_deref().expect("validated at construction");
        let repo = git2::build::RepoBuilder::new().clone(url, target)?;
        if let Some(revision) = &self.revision {
            let object = repo.revparse_single(revision)?;
            let mut options = git2::build::CheckoutBuilder::new();
            options.force();
            repo.checkout_tree(&object, Some(&mut options))?;
            repo.set_head_detached(object.id())?;
        }
        Ok(())
    }

    fn materialize_svn(&self, target: &Path) -> Result<(), CheckoutError> {
        let url = self.url.as_deref().expect("validated at construction");
        let command = match &self.revision {
            Some(revision) => format!(
                "svn checkout --quiet -r {} {} {}",
                revision,
                url,
                target.display()
            ),
            None => format!("svn checkout --quiet {} {}", url, target.display()),
        };
        shell::run_command(&command, target)?;
        Ok(())
    }

    fn materialize_synthetic(&self, target: &Path) -> Result<(), CheckoutError> {
        if !self.shipped_sources.is_dir() {
            return Err(CheckoutError::MissingSources(self.shipped_sources.clone()));
        }
        fsutil::copy_tree(&self.shipped_sources, target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Repository;
    use tempfile::TempDir;

    fn synthetic_fixture(temp: &TempDir) -> (Project, Version) {
        let project = Project::new(
            "synth",
            Some(Repository {
                kind: RepoKind::Synthetic,
                url: None,
            }),
        );
        let version_dir = temp.path().join("data/synth/versions/v1");
        fs::create_dir_all(version_dir.join("checkout/src")).unwrap();
        fs::write(version_dir.join("checkout/src/A.java"), "class A {}").unwrap();
        let version = Version::new("synth", "v1", &version_dir);
        (project, version)
    }

    #[test]
    fn deterministic_path() {
        let temp = TempDir::new().unwrap();
        let (project, version) = synthetic_fixture(&temp);
        let base = temp.path().join("checkouts");
        let checkout = Checkout::for_version(&base, &project, &version).unwrap();
        assert_eq!(checkout.path(), base.join("synth/v1/checkout"));
    }

    #[test]
    fn missing_repository_is_config_error() {
        let temp = TempDir::new().unwrap();
        let project = Project::new("bare", None);
        let version = Version::new("bare", "v1", temp.path());
        let err = Checkout::for_version(temp.path(), &project, &version).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRepository(_)));
    }

    #[test]
    fn git_without_url_is_config_error() {
        let temp = TempDir::new().unwrap();
        let project = Project::new(
            "nourl",
            Some(Repository {
                kind: RepoKind::Git,
                url: None,
            }),
        );
        let version = Version::new("nourl", "v1", temp.path());
        let err = Checkout::for_version(temp.path(), &project, &version).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRepositoryUrl(_)));
    }

    #[test]
    fn materializes_synthetic_sources() {
        let temp = TempDir::new().unwrap();
        let (project, version) = synthetic_fixture(&temp);
        let base = temp.path().join("checkouts");
        let checkout = Checkout::for_version(&base, &project, &version).unwrap();

        assert!(!checkout.exists());
        checkout.materialize(false).unwrap();
        assert!(checkout.exists());
        assert!(checkout.path().join("src/A.java").is_file());
    }

    #[test]
    fn materialize_is_idempotent_without_force() {
        let temp = TempDir::new().unwrap();
        let (project, version) = synthetic_fixture(&temp);
        let base = temp.path().join("checkouts");
        let checkout = Checkout::for_version(&base, &project, &version).unwrap();

        checkout.materialize(false).unwrap();
        let marker = checkout.path().join("marker");
        fs::write(&marker, "local change").unwrap();

        checkout.materialize(false).unwrap();
        assert!(marker.exists(), "existing checkout must not be refreshed");

        checkout.materialize(true).unwrap();
        assert!(!marker.exists(), "forced refresh must rebuild the checkout");
    }

    #[test]
    fn synthetic_without_shipped_sources_fails() {
        let temp = TempDir::new().unwrap();
        let project = Project::new(
            "synth",
            Some(Repository {
                kind: RepoKind::Synthetic,
                url: None,
            }),
        );
        let version = Version::new("synth", "v1", temp.path().join("nope"));
        let checkout =
            Checkout::for_version(&temp.path().join("checkouts"), &project, &version).unwrap();
        let err = checkout.materialize(false).unwrap_err();
        assert!(matches!(err, CheckoutError::MissingSources(_)));
    }
}
