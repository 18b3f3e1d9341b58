//! MisuseBench Core - Entity model and artifact handling
//!
//! This crate provides the benchmark entity hierarchy (project, version,
//! misuse), dataset loading, derived on-disk artifacts (checkout, compile
//! paths, detector runs) and the shell layer used to drive external tools.

pub mod checkout;
pub mod compile;
pub mod dataset;
pub mod error;
pub mod fsutil;
pub mod misuse;
pub mod project;
pub mod run;
pub mod shell;
pub mod snippet;
pub mod version;

pub use checkout::Checkout;
pub use compile::CompilePaths;
pub use dataset::{load_projects, IdFilter};
pub use error::{
    CheckoutError, CommandError, ConfigError, CoreError, Result, SnippetError,
};
pub use misuse::{Location, Misuse, Pattern};
pub use project::{Project, RepoKind, Repository};
pub use run::{Finding, Run, RunResult};
pub use shell::{Builder, ShellBuilder};
pub use snippet::Snippet;
pub use version::{BuildConfig, Version};
