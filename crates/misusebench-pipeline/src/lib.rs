//! MisuseBench Pipeline - stage engine over the benchmark hierarchy
//!
//! This crate provides the stage contract and typed per-entity context, the
//! depth-first pipeline runner, the mode-keyed configuration registry and
//! the built-in stages: checkout, compile, detect and publish findings.

pub mod registry;
pub mod runner;
pub mod stage;
pub mod stages;

pub use registry::{
    default_registry, ConfigurationRegistry, DetectorConfig, PipelineSettings, RegistryError,
    ReviewSiteConfig,
};
pub use runner::{PipelineRunner, RunReport};
pub use stage::{ArtifactKind, Stage, StageContext, StageError, StageScope};
pub use stages::checkout::CheckoutStage;
pub use stages::compile::CompileStage;
pub use stages::detect::{DetectStage, DetectorExecutor, DetectorRequest, JavaDetectorExecutor};
pub use stages::publish::PublishFindingsStage;
