//! Configuration registry — mode string to stage list
//!
//! Every supported mode is registered exactly once as a factory producing
//! its stage list from the shared settings. Mode lists compose as prefix
//! extensions: `compile` re-declares the `checkout` stages, `detect`
//! re-declares `compile`'s, and so on, so a later mode run on a fresh
//! artifact tree still produces correct cached-or-built artifacts.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use misusebench_core::ShellBuilder;
use misusebench_review::HttpReviewSite;

use crate::runner::PipelineRunner;
use crate::stage::{ArtifactKind, Stage};
use crate::stages::checkout::CheckoutStage;
use crate::stages::compile::CompileStage;
use crate::stages::detect::{DetectStage, JavaDetectorExecutor};
use crate::stages::publish::PublishFindingsStage;

/// Registry and composition errors — fatal at startup, before any entity is
/// processed
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No registration matches the requested mode
    #[error("no configuration available for mode '{0}'")]
    NotFound(String),

    /// More than one registration claims the requested mode
    #[error("multiple configurations registered for mode '{0}'")]
    Ambiguous(String),

    /// A stage consumes an artifact no earlier stage produces
    #[error("stage '{stage}' requires {input} but no earlier stage produces it")]
    UnsatisfiedInput { stage: String, input: ArtifactKind },

    /// Stage scopes must not get broader along the list
    #[error("stage '{stage}' is scoped more broadly than an earlier stage")]
    ScopeOrder { stage: String },

    /// The requested mode needs settings that were not provided
    #[error("incomplete configuration: {0}")]
    Incomplete(String),
}

/// Detector to execute
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Detector identifier
    pub id: String,
    /// Path of the detector's executable jar
    pub jar: PathBuf,
}

/// Review-site connection settings
#[derive(Debug, Clone)]
pub struct ReviewSiteConfig {
    /// Review-site base URL
    pub url: Url,
    /// Username, if uploads are authenticated
    pub username: Option<String>,
    /// Password; prompted interactively when a username is set without one
    pub password: Option<String>,
}

/// Shared path and configuration context for stage factories
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Artifact root for checkouts and compiles
    pub checkouts_path: PathBuf,
    /// Root for detector findings and run records
    pub findings_path: PathBuf,
    /// Refresh existing checkouts
    pub force_checkout: bool,
    /// Rebuild existing compile artifacts
    pub force_compile: bool,
    /// Re-execute detectors with existing run records
    pub force_detect: bool,
    /// Detector execution time budget
    pub timeout: Option<Duration>,
    /// Detector, for detect and publish modes
    pub detector: Option<DetectorConfig>,
    /// Experiment identifier, for detect and publish modes
    pub experiment: Option<String>,
    /// Dataset identifier reported with every upload
    pub dataset: String,
    /// Review site, for publish modes
    pub review_site: Option<ReviewSiteConfig>,
    /// Hard per-request file-count ceiling for uploads
    pub max_files_per_post: usize,
}

impl PipelineSettings {
    /// Settings with the default knobs for the given artifact roots
    pub fn new(checkouts_path: impl Into<PathBuf>, findings_path: impl Into<PathBuf>) -> Self {
        Self {
            checkouts_path: checkouts_path.into(),
            findings_path: findings_path.into(),
            force_checkout: false,
            force_compile: false,
            force_detect: false,
            timeout: None,
            detector: None,
            experiment: None,
            dataset: "default".to_string(),
            review_site: None,
            max_files_per_post: PublishFindingsStage::DEFAULT_MAX_FILES_PER_POST,
        }
    }

    fn detector(&self) -> Result<&DetectorConfig, RegistryError> {
        self.detector
            .as_ref()
            .ok_or_else(|| RegistryError::Incomplete("no detector configured".into()))
    }

    fn experiment(&self) -> Result<&str, RegistryError> {
        self.experiment
            .as_deref()
            .ok_or_else(|| RegistryError::Incomplete("no experiment configured".into()))
    }

    fn review_site(&self) -> Result<&ReviewSiteConfig, RegistryError> {
        self.review_site
            .as_ref()
            .ok_or_else(|| RegistryError::Incomplete("no review site configured".into()))
    }
}

type StageFactory = Box<dyn Fn(&PipelineSettings) -> Result<Vec<Box<dyn Stage>>, RegistryError>>;

/// Registry of pipeline configurations, keyed by mode string
pub struct ConfigurationRegistry {
    entries: Vec<(String, StageFactory)>,
}

impl ConfigurationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a mode
    pub fn register<F>(&mut self, mode: impl Into<String>, factory: F)
    where
        F: Fn(&PipelineSettings) -> Result<Vec<Box<dyn Stage>>, RegistryError> + 'static,
    {
        self.entries.push((mode.into(), Box::new(factory)));
    }

    /// Registered mode strings, in registration order
    pub fn modes(&self) -> Vec<&str> {
        self.entries.iter().map(|(mode, _)| mode.as_str()).collect()
    }

    /// Resolve a mode into a validated pipeline runner
    ///
    /// Fails when zero or more than one registration matches, or when the
    /// produced stage list does not compose.
    pub fn lookup(
        &self,
        mode: &str,
        settings: &PipelineSettings,
    ) -> Result<PipelineRunner, RegistryError> {
        let mut matches = self
            .entries
            .iter()
            .filter(|(registered, _)| registered == mode);

        let Some((_, factory)) = matches.next() else {
            return Err(RegistryError::NotFound(mode.to_string()));
        };
        if matches.next().is_some() {
            return Err(RegistryError::Ambiguous(mode.to_string()));
        }

        let stages = factory(settings)?;
        debug!(mode, stages = stages.len(), "resolved pipeline configuration");
        PipelineRunner::new(stages)
    }
}

impl Default for ConfigurationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn checkout_stages(settings: &PipelineSettings) -> Vec<Box<dyn Stage>> {
    vec![Box::new(CheckoutStage::new(
        &settings.checkouts_path,
        settings.force_checkout,
    ))]
}

fn compile_stages(settings: &PipelineSettings) -> Vec<Box<dyn Stage>> {
    let mut stages = checkout_stages(settings);
    stages.push(Box::new(CompileStage::new(
        &settings.checkouts_path,
        settings.force_compile,
        Box::new(ShellBuilder),
    )));
    stages
}

fn detect_stages(settings: &PipelineSettings) -> Result<Vec<Box<dyn Stage>>, RegistryError> {
    let detector = settings.detector()?;
    let experiment = settings.experiment()?;
    let mut stages = compile_stages(settings);
    stages.push(Box::new(DetectStage::new(
        &settings.findings_path,
        &detector.id,
        experiment,
        Box::new(JavaDetectorExecutor::new(&detector.jar)),
        settings.force_detect,
        settings.timeout,
    )));
    Ok(stages)
}

fn publish_findings_stages(
    settings: &PipelineSettings,
) -> Result<Vec<Box<dyn Stage>>, RegistryError> {
    let detector = settings.detector()?.clone();
    let experiment = settings.experiment()?.to_string();
    let review_site = settings.review_site()?.clone();
    let mut stages = detect_stages(settings)?;
    let publish = PublishFindingsStage::new(
        &settings.dataset,
        &detector.id,
        &experiment,
        &review_site,
        Box::new(HttpReviewSite::new()),
    )
    .map_err(|err| RegistryError::Incomplete(err.to_string()))?
    .with_max_files_per_post(settings.max_files_per_post);
    stages.push(Box::new(publish));
    Ok(stages)
}

/// The built-in pipeline configurations
pub fn default_registry() -> ConfigurationRegistry {
    let mut registry = ConfigurationRegistry::new();
    registry.register("checkout", |settings| Ok(checkout_stages(settings)));
    registry.register("compile", |settings| Ok(compile_stages(settings)));
    registry.register("detect", detect_stages);
    registry.register("publish findings", publish_findings_stages);
    registry
}
