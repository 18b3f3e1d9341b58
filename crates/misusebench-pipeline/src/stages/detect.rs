//! Detect stage — incremental detector execution
//!
//! Findings live under a deterministic per-run directory,
//! `<findings>/<detector>/<experiment>/<project>/<version>/`. A persisted
//! `run.yml` is the cache check: it is loaded instead of re-executing the
//! detector unless force-detect is set. Detector failure and timeout are
//! recorded as run results, not raised as stage errors.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use misusebench_core::shell::run_with_timeout;
use misusebench_core::{CommandError, Finding, Run, RunResult, Version};

use crate::stage::{ArtifactKind, Stage, StageContext, StageError, StageScope};

/// Everything a detector invocation needs to know
#[derive(Debug, Clone)]
pub struct DetectorRequest {
    /// Directory the detector runs in and writes its outputs under
    pub findings_dir: PathBuf,
    /// File the detector writes its findings to, as multi-document YAML
    pub findings_file: PathBuf,
    /// Compiled target sources
    pub target_sources: PathBuf,
    /// Compiled target classes
    pub target_classes: PathBuf,
    /// Build dependencies directory
    pub dependencies: PathBuf,
    /// Execution time budget
    pub timeout: Option<Duration>,
}

/// Detector execution collaborator
///
/// Tests substitute a stub that fabricates findings files.
pub trait DetectorExecutor {
    /// Run the detector; it writes its findings to `request.findings_file`
    fn execute(&self, request: &DetectorRequest) -> Result<(), CommandError>;
}

/// Executes a detector shipped as an executable jar
#[derive(Debug)]
pub struct JavaDetectorExecutor {
    jar: PathBuf,
}

impl JavaDetectorExecutor {
    /// Create an executor for the given jar
    pub fn new(jar: &Path) -> Self {
        Self {
            jar: jar.to_path_buf(),
        }
    }
}

impl DetectorExecutor for JavaDetectorExecutor {
    fn execute(&self, request: &DetectorRequest) -> Result<(), CommandError> {
        let command = format!(
            "java -jar \"{}\" findings \"{}\" target_src_path \"{}\" target_classpath \"{}\" dep_classpath \"{}\"",
            self.jar.display(),
            request.findings_file.display(),
            request.target_sources.display(),
            request.target_classes.display(),
            request.dependencies.display(),
        );
        run_with_timeout(&command, &request.findings_dir, request.timeout)?;
        Ok(())
    }
}

/// Runs the configured detector against each compiled version
pub struct DetectStage {
    findings_base: PathBuf,
    detector_id: String,
    experiment: String,
    executor: Box<dyn DetectorExecutor>,
    force_detect: bool,
    timeout: Option<Duration>,
}

impl DetectStage {
    /// Create the stage
    pub fn new(
        findings_base: &Path,
        detector_id: &str,
        experiment: &str,
        executor: Box<dyn DetectorExecutor>,
        force_detect: bool,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            findings_base: findings_base.to_path_buf(),
            detector_id: detector_id.to_string(),
            experiment: experiment.to_string(),
            executor,
            force_detect,
            timeout,
        }
    }

    /// Per-version findings directory
    fn findings_dir(&self, version: &Version) -> PathBuf {
        self.findings_base
            .join(&self.detector_id)
            .join(&self.experiment)
            .join(&version.project_id)
            .join(&version.version_id)
    }

    fn execute(&self, request: &DetectorRequest) -> Run {
        let started = Instant::now();
        let outcome = self.executor.execute(request);
        let runtime = started.elapsed().as_secs_f64();
        match outcome {
            Ok(()) => Run::new(RunResult::Success, runtime),
            Err(CommandError::Timeout { timeout_secs, .. }) => {
                warn!(timeout_secs, "detector timed out");
                Run::new(RunResult::Timeout, runtime)
            }
            Err(err) => {
                warn!(error = %err, "detector failed");
                Run::new(RunResult::Error, runtime)
            }
        }
    }
}

impl Stage for DetectStage {
    fn name(&self) -> &'static str {
        "detect"
    }

    fn scope(&self) -> StageScope {
        StageScope::Version
    }

    fn requires(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Compile]
    }

    fn produces(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::DetectorRun]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let version = ctx.version()?;
        let compile = ctx.compile()?;

        let findings_dir = self.findings_dir(version);
        let findings_file = findings_dir.join("findings.yml");
        let run_file = findings_dir.join("run.yml");

        let mut run = if run_file.is_file() && !self.force_detect {
            debug!(version = %version, "reusing persisted detector run");
            Run::load(&run_file).map_err(|err| StageError::Failed(err.to_string()))?
        } else {
            info!(version = %version, detector = %self.detector_id, "running detector");
            fs::create_dir_all(&findings_dir)?;
            let request = DetectorRequest {
                findings_dir: findings_dir.clone(),
                findings_file: findings_file.clone(),
                target_sources: compile.original_sources(),
                target_classes: compile.original_classes(),
                dependencies: compile.dependencies(),
                timeout: self.timeout,
            };
            let mut run = self.execute(&request);
            if run.is_success() {
                run.number_of_findings = count_findings(&findings_file)?;
            }
            run.store(&run_file)
                .map_err(|err| StageError::Failed(err.to_string()))?;
            run
        };

        if run.is_success() {
            let findings = load_findings(&findings_file)?;
            run.number_of_findings = findings.len();
            run.potential_hits = potential_hits(findings, version);
        }

        ctx.run = Some(run);
        Ok(())
    }
}

/// Parse a multi-document findings file; a missing file means zero findings
fn load_findings(path: &Path) -> Result<Vec<Finding>, StageError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let mut findings = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        findings.push(Finding::deserialize(document)?);
    }
    Ok(findings)
}

fn count_findings(path: &Path) -> Result<usize, StageError> {
    Ok(load_findings(path)?.len())
}

/// Findings whose file matches a misuse location of the version
///
/// A version without declared misuses keeps every finding.
fn potential_hits(findings: Vec<Finding>, version: &Version) -> Vec<Finding> {
    let misuse_files = version.misuse_files();
    if misuse_files.is_empty() {
        return findings;
    }
    findings
        .into_iter()
        .filter(|finding| {
            finding
                .file()
                .is_some_and(|file| misuse_files.iter().any(|target| *target == Path::new(file)))
        })
        .collect()
}
