//! Detector run records and findings

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnippetError};
use crate::snippet::{extract_snippet, Snippet};

/// Outcome of a detector execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunResult {
    /// Detector finished and produced findings
    Success,
    /// Detector exited with an error
    Error,
    /// Detector exceeded its time budget
    Timeout,
    /// Detector was never executed
    NotRun,
}

impl RunResult {
    /// Human-readable label used in upload payloads
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::NotRun => "not run",
        }
    }
}

/// A single detector finding
///
/// The detector reports free-form key/value data; the pipeline only
/// interprets the conventional `file` and `method` keys. Attached files are
/// resolved by the detect stage and uploaded alongside the finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Free-form finding data
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Files attached to this finding for upload
    #[serde(skip)]
    pub files: Vec<PathBuf>,
}

impl Finding {
    /// Create a finding from its data map
    pub fn new(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data,
            files: Vec::new(),
        }
    }

    /// Attach upload files
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// The `file` entry of the finding data, if present
    pub fn file(&self) -> Option<&str> {
        self.data.get("file").and_then(|value| value.as_str())
    }

    /// The `method` entry of the finding data, if present
    pub fn method(&self) -> Option<&str> {
        self.data.get("method").and_then(|value| value.as_str())
    }

    /// Extract code snippets for this finding from the given source tree
    ///
    /// A finding without a `file` entry has no snippets. Extraction failure
    /// is a typed error the caller logs and tolerates.
    pub fn snippets(&self, source_dir: &Path) -> std::result::Result<Vec<Snippet>, SnippetError> {
        match self.file() {
            Some(file) => Ok(vec![extract_snippet(source_dir, file, self.method())?]),
            None => Ok(Vec::new()),
        }
    }
}

/// Record of one detector execution against one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Execution outcome
    pub result: RunResult,
    /// Detector runtime in seconds
    pub runtime: f64,
    /// Total number of findings the detector reported
    pub number_of_findings: usize,
    /// When the run was recorded
    pub timestamp: DateTime<Utc>,
    /// Findings considered potential hits, pending review
    #[serde(skip)]
    pub potential_hits: Vec<Finding>,
}

impl Run {
    /// Create a run record
    pub fn new(result: RunResult, runtime: f64) -> Self {
        Self {
            result,
            runtime,
            number_of_findings: 0,
            timestamp: Utc::now(),
            potential_hits: Vec::new(),
        }
    }

    /// Record of a detector that was never executed
    pub fn not_run() -> Self {
        Self::new(RunResult::NotRun, 0.0)
    }

    /// Whether the detector finished successfully
    pub fn is_success(&self) -> bool {
        self.result == RunResult::Success
    }

    /// Whether the detector exited with an error
    pub fn is_error(&self) -> bool {
        self.result == RunResult::Error
    }

    /// Whether the detector timed out
    pub fn is_timeout(&self) -> bool {
        self.result == RunResult::Timeout
    }

    /// Run metadata included in every upload payload
    pub fn run_info(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut info = serde_json::Map::new();
        info.insert("runtime".into(), serde_json::json!(self.runtime));
        info.insert(
            "number_of_findings".into(),
            serde_json::json!(self.number_of_findings),
        );
        info
    }

    /// Load a persisted run record
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Persist this run record
    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}
