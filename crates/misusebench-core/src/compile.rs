//! Derived compile artifact paths
//!
//! All compile outputs live next to the checkout, addressed deterministically
//! by project and version id:
//!
//! ```text
//! <base>/<project>/<version>/checkout/
//! <base>/<project>/<version>/build/
//! <base>/<project>/<version>/original-src/
//! <base>/<project>/<version>/original-classes/
//! <base>/<project>/<version>/misuse-src/
//! <base>/<project>/<version>/misuse-classes/
//! <base>/<project>/<version>/patterns-src/<misuse>/
//! <base>/<project>/<version>/patterns-classes/<misuse>/
//! <base>/<project>/<version>/dependencies/
//! ```

use std::path::{Path, PathBuf};

/// Paths of the compile artifact for one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilePaths {
    base: PathBuf,
}

impl CompilePaths {
    /// Derive the compile paths for (project, version) under the artifact base
    pub fn new(compiles_base: &Path, project_id: &str, version_id: &str) -> Self {
        Self {
            base: compiles_base.join(project_id).join(version_id),
        }
    }

    /// Per-version artifact root
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Assembled build directory the external build runs in
    pub fn build_dir(&self) -> PathBuf {
        self.base.join("build")
    }

    /// Copy of the original sources
    pub fn original_sources(&self) -> PathBuf {
        self.base.join("original-src")
    }

    /// Compiled classes of the original sources
    pub fn original_classes(&self) -> PathBuf {
        self.base.join("original-classes")
    }

    /// Misuse-isolated source files
    pub fn misuse_sources(&self) -> PathBuf {
        self.base.join("misuse-src")
    }

    /// Compiled classes of the misuse sources, including inner classes
    pub fn misuse_classes(&self) -> PathBuf {
        self.base.join("misuse-classes")
    }

    /// Root of the per-misuse pattern sources
    pub fn patterns_sources_root(&self) -> PathBuf {
        self.base.join("patterns-src")
    }

    /// Pattern sources of one misuse
    pub fn pattern_sources(&self, misuse_id: &str) -> PathBuf {
        self.patterns_sources_root().join(misuse_id)
    }

    /// Root of the per-misuse pattern classes
    pub fn patterns_classes_root(&self) -> PathBuf {
        self.base.join("patterns-classes")
    }

    /// Pattern classes of one misuse
    pub fn pattern_classes(&self, misuse_id: &str) -> PathBuf {
        self.patterns_classes_root().join(misuse_id)
    }

    /// Build dependencies directory
    pub fn dependencies(&self) -> PathBuf {
        self.base.join("dependencies")
    }

    /// Cache check: the original classes exist, so the version is compiled
    pub fn is_compiled(&self) -> bool {
        self.original_classes().is_dir()
    }
}
