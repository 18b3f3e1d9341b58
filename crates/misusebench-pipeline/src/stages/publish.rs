//! Publish findings stage — chunked upload to the review site
//!
//! Potential hits of a detector run are uploaded in consecutive slices so
//! one request never carries more attached files than the configured
//! ceiling. A run without hits still issues exactly one request, so the
//! review site learns about the run itself. Transport errors abort the
//! remaining slices of the current run only.

use std::cell::OnceCell;
use std::path::PathBuf;

use dialoguer::Password;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use misusebench_core::{Finding, Run, Version};
use misusebench_review::{as_markdown_map, upload_url, Credentials, ReviewSite};

use crate::registry::ReviewSiteConfig;
use crate::stage::{ArtifactKind, Stage, StageContext, StageError, StageScope};

/// Uploads detector findings to the review site, one version at a time
pub struct PublishFindingsStage {
    dataset: String,
    detector_id: String,
    url: Url,
    username: Option<String>,
    password: Option<String>,
    prompted_password: OnceCell<String>,
    site: Box<dyn ReviewSite>,
    max_files_per_post: usize,
}

impl PublishFindingsStage {
    /// Hard per-request ceiling on attached files
    pub const DEFAULT_MAX_FILES_PER_POST: usize = 20;

    /// Create the stage, deriving the upload endpoint from the site config
    pub fn new(
        dataset: &str,
        detector_id: &str,
        experiment: &str,
        review_site: &ReviewSiteConfig,
        site: Box<dyn ReviewSite>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            dataset: dataset.to_string(),
            detector_id: detector_id.to_string(),
            url: upload_url(&review_site.url, experiment)?,
            username: review_site.username.clone(),
            password: review_site.password.clone(),
            prompted_password: OnceCell::new(),
            site,
            max_files_per_post: Self::DEFAULT_MAX_FILES_PER_POST,
        })
    }

    /// Override the per-request file ceiling
    pub fn with_max_files_per_post(mut self, max_files_per_post: usize) -> Self {
        self.max_files_per_post = max_files_per_post;
        self
    }

    /// Resolve upload credentials, prompting for the password at most once
    fn credentials(&self) -> Result<Option<Credentials>, StageError> {
        let Some(username) = &self.username else {
            return Ok(None);
        };
        if let Some(password) = &self.password {
            return Ok(Some(Credentials::new(username, password)));
        }
        if let Some(password) = self.prompted_password.get() {
            return Ok(Some(Credentials::new(username, password)));
        }
        let entered = Password::new()
            .with_prompt(format!("Password for {username}"))
            .interact()
            .map_err(|err| StageError::Failed(format!("cannot read password: {err}")))?;
        let _ = self.prompted_password.set(entered.clone());
        Ok(Some(Credentials::new(username, entered)))
    }

    /// Render one finding for upload, with extracted target snippets
    fn render_finding(&self, finding: &Finding, ctx: &StageContext<'_>) -> Value {
        let mut data = as_markdown_map(&finding.data);
        let snippets = match ctx.compile.as_ref() {
            Some(compile) => match finding.snippets(&compile.original_sources()) {
                Ok(snippets) => snippets,
                Err(err) => {
                    warn!(error = %err, "cannot extract snippet");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        data.insert(
            "target_snippets".into(),
            serde_json::to_value(snippets).unwrap_or(Value::Array(Vec::new())),
        );
        Value::Object(data)
    }

    /// The per-request payload for one slice of potential hits
    fn payload(
        &self,
        ctx: &StageContext<'_>,
        version: &Version,
        run: &Run,
        slice: &[&Finding],
    ) -> Value {
        let mut data = as_markdown_map(&run.run_info());
        data.insert("dataset".into(), json!(self.dataset));
        data.insert("detector".into(), json!(self.detector_id));
        data.insert("project".into(), json!(version.project_id));
        data.insert("version".into(), json!(version.version_id));
        data.insert("result".into(), json!(run.result.label()));
        data.insert(
            "potential_hits".into(),
            Value::Array(
                slice
                    .iter()
                    .map(|finding| self.render_finding(finding, ctx))
                    .collect(),
            ),
        );
        Value::Object(data)
    }
}

impl Stage for PublishFindingsStage {
    fn name(&self) -> &'static str {
        "publish findings"
    }

    fn scope(&self) -> StageScope {
        StageScope::Version
    }

    fn requires(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Compile, ArtifactKind::DetectorRun]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let version = ctx.version()?;
        let run = ctx.detector_run()?.clone();
        let credentials = self.credentials()?;

        let slices = slice_by_max_files(&run.potential_hits, self.max_files_per_post);
        info!(
            entity = %ctx.entity_id(),
            hits = run.potential_hits.len(),
            requests = slices.len(),
            "publishing findings"
        );

        for slice in slices {
            let payload = self.payload(ctx, version, &run, &slice);
            let files: Vec<PathBuf> = slice
                .iter()
                .flat_map(|finding| finding.files.iter().cloned())
                .collect();
            debug!(findings = slice.len(), files = files.len(), "posting slice");
            if let Err(err) = self.site.post(&self.url, &payload, &files, credentials.as_ref()) {
                match err.status() {
                    Some(status) => error!(
                        entity = %ctx.entity_id(),
                        status,
                        error = %err,
                        "upload rejected; dropping remaining requests for this run"
                    ),
                    None => error!(
                        entity = %ctx.entity_id(),
                        error = %err,
                        "upload failed; dropping remaining requests for this run"
                    ),
                }
                return Ok(());
            }
        }
        Ok(())
    }
}

/// Split findings into consecutive slices bounded by cumulative file count
///
/// A slice is flushed before adding a finding that would push it over the
/// ceiling, so a single finding with more files than the ceiling forms its
/// own slice. The final slice is always emitted, even when empty, so a run
/// without hits still produces one request.
fn slice_by_max_files(findings: &[Finding], max_files: usize) -> Vec<Vec<&Finding>> {
    let mut slices = Vec::new();
    let mut current: Vec<&Finding> = Vec::new();
    let mut current_files = 0usize;
    for finding in findings {
        let files = finding.files.len();
        if !current.is_empty() && current_files + files > max_files {
            slices.push(std::mem::take(&mut current));
            current_files = 0;
        }
        current.push(finding);
        current_files += files;
    }
    slices.push(current);
    slices
}
