//! Stage contract and the typed per-entity context

use std::fmt;

use thiserror::Error;

use misusebench_core::{
    Checkout, CheckoutError, CommandError, CompilePaths, ConfigError, Misuse, Project, Run,
    Version,
};

/// Entity level a stage operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageScope {
    /// Once per project
    Project,
    /// Once per version
    Version,
    /// Once per misuse
    Misuse,
}

impl fmt::Display for StageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Version => write!(f, "version"),
            Self::Misuse => write!(f, "misuse"),
        }
    }
}

/// Kinds of derived artifacts threaded through the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A materialized working copy
    Checkout,
    /// Compiled class directories
    Compile,
    /// A detector execution record
    DetectorRun,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkout => write!(f, "checkout"),
            Self::Compile => write!(f, "compile"),
            Self::DetectorRun => write!(f, "detector run"),
        }
    }
}

/// Errors raised by stages
///
/// `Skip` models configuration errors: the runner records them and continues
/// with sibling entities. Every other variant is fatal for the current
/// entity's subtree only.
#[derive(Debug, Error)]
pub enum StageError {
    /// Configuration error; the entity is skipped, not failed
    #[error("{0}")]
    Skip(String),

    /// A required artifact was not produced by an earlier stage
    #[error("missing pipeline input: {0}")]
    MissingInput(ArtifactKind),

    /// External command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Checkout materialization failed
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error while reading or writing artifacts
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Any other stage failure
    #[error("{0}")]
    Failed(String),
}

impl StageError {
    /// Build a skip from any displayable reason
    pub fn skip(reason: impl fmt::Display) -> Self {
        Self::Skip(reason.to_string())
    }

    /// Whether this error is a skip rather than a failure
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

impl From<ConfigError> for StageError {
    fn from(err: ConfigError) -> Self {
        Self::Skip(err.to_string())
    }
}

/// Per-entity context threaded through the stages of one walk
///
/// Entity references come from the loaded hierarchy; artifact slots are
/// filled by producing stages and read by consuming ones. Artifacts are
/// never visible across sibling entities: each child context starts from a
/// clone of its parent's slots.
#[derive(Debug)]
pub struct StageContext<'a> {
    /// Current project
    pub project: &'a Project,
    /// Current version, at version scope and below
    pub version: Option<&'a Version>,
    /// Current misuse, at misuse scope
    pub misuse: Option<&'a Misuse>,
    /// Working copy produced by the checkout stage
    pub checkout: Option<Checkout>,
    /// Compile artifact produced by the compile stage
    pub compile: Option<CompilePaths>,
    /// Detector run produced by the detect stage
    pub run: Option<Run>,
}

impl<'a> StageContext<'a> {
    /// Context for a project walk
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            version: None,
            misuse: None,
            checkout: None,
            compile: None,
            run: None,
        }
    }

    /// Child context for a version walk, inheriting produced artifacts
    pub fn for_version(&self, version: &'a Version) -> Self {
        Self {
            project: self.project,
            version: Some(version),
            misuse: None,
            checkout: self.checkout.clone(),
            compile: self.compile.clone(),
            run: self.run.clone(),
        }
    }

    /// Child context for a misuse walk, inheriting produced artifacts
    pub fn for_misuse(&self, misuse: &'a Misuse) -> Self {
        Self {
            project: self.project,
            version: self.version,
            misuse: Some(misuse),
            checkout: self.checkout.clone(),
            compile: self.compile.clone(),
            run: self.run.clone(),
        }
    }

    /// Id chain of the current entity, for logging and reporting
    pub fn entity_id(&self) -> String {
        let mut id = self.project.id.clone();
        if let Some(version) = self.version {
            id.push('.');
            id.push_str(&version.version_id);
        }
        if let Some(misuse) = self.misuse {
            id.push('.');
            id.push_str(&misuse.misuse_id);
        }
        id
    }

    /// Current version, required by version-scoped stages
    pub fn version(&self) -> Result<&'a Version, StageError> {
        self.version
            .ok_or_else(|| StageError::Failed("stage requires a version context".into()))
    }

    /// Current misuse, required by misuse-scoped stages
    pub fn misuse(&self) -> Result<&'a Misuse, StageError> {
        self.misuse
            .ok_or_else(|| StageError::Failed("stage requires a misuse context".into()))
    }

    /// Checkout artifact, required by compile-dependent stages
    pub fn checkout(&self) -> Result<&Checkout, StageError> {
        self.checkout
            .as_ref()
            .ok_or(StageError::MissingInput(ArtifactKind::Checkout))
    }

    /// Compile artifact
    pub fn compile(&self) -> Result<&CompilePaths, StageError> {
        self.compile
            .as_ref()
            .ok_or(StageError::MissingInput(ArtifactKind::Compile))
    }

    /// Detector run artifact
    pub fn detector_run(&self) -> Result<&Run, StageError> {
        self.run
            .as_ref()
            .ok_or(StageError::MissingInput(ArtifactKind::DetectorRun))
    }

    /// Whether an artifact slot is filled
    pub fn has(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Checkout => self.checkout.is_some(),
            ArtifactKind::Compile => self.compile.is_some(),
            ArtifactKind::DetectorRun => self.run.is_some(),
        }
    }
}

/// A unit of pipeline work
///
/// A stage declares its scope and the artifact kinds it consumes and
/// produces; the composition check verifies the declarations line up before
/// any entity is processed.
pub trait Stage {
    /// Stage name, for logging and composition diagnostics
    fn name(&self) -> &'static str;

    /// Entity level this stage runs at
    fn scope(&self) -> StageScope;

    /// Artifact kinds this stage consumes
    fn requires(&self) -> &'static [ArtifactKind] {
        &[]
    }

    /// Artifact kinds this stage produces
    fn produces(&self) -> &'static [ArtifactKind] {
        &[]
    }

    /// Execute the stage against the current entity context
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError>;
}
