//! Error types for MisuseBench core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration-related errors (skip-class, per-entity)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External command failures
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Checkout materialization failures
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration-related errors
///
/// These describe missing or malformed entity metadata. The pipeline treats
/// them as per-entity skips, never as run-level failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Version has no build configuration
    #[error("no build configuration for {0}")]
    MissingBuild(String),

    /// Project has no repository descriptor
    #[error("no repository configured for {0}")]
    MissingRepository(String),

    /// Repository descriptor has no URL
    #[error("repository of {0} has no URL")]
    MissingRepositoryUrl(String),

    /// Metadata file does not exist
    #[error("missing metadata file {0}")]
    MissingMetadata(PathBuf),

    /// Metadata file could not be parsed
    #[error("malformed metadata in {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// External command failures
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command exited with a non-zero status
    #[error("command failed: {command}\n{output}")]
    Failed { command: String, output: String },

    /// Command exceeded its time budget and was killed
    #[error("command timed out after {timeout_secs}s: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    /// Command could not be launched at all
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },

    /// IO error while capturing command output
    #[error("IO error running '{command}': {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },
}

/// Checkout materialization failures
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Git operation failed
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Svn process failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Synthetic version has no shipped sources
    #[error("no sources for synthetic version at {0}")]
    MissingSources(PathBuf),

    /// IO error while materializing the working copy
    #[error("checkout IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Snippet extraction failures
///
/// Callers log these and continue; a finding without snippets is still valid.
#[derive(Debug, Error)]
pub enum SnippetError {
    /// The target source file could not be read
    #[error("cannot extract snippet from {file}: {reason}")]
    Unavailable { file: PathBuf, reason: String },
}
