//! Publish commands

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tracing::info;
use url::Url;

use misusebench_pipeline::{DetectorConfig, ReviewSiteConfig};

use crate::cli::commands::{run_mode, SelectionArgs};
use crate::cli::Cli;

/// Upload operations
#[derive(Debug, Args)]
pub struct PublishCommand {
    #[command(subcommand)]
    pub command: PublishSubcommand,
}

/// What to publish
#[derive(Debug, Subcommand)]
pub enum PublishSubcommand {
    /// Upload detector findings to the review site
    Findings(PublishFindingsCommand),
}

impl PublishCommand {
    /// Execute the publish command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            PublishSubcommand::Findings(cmd) => cmd.execute(cli),
        }
    }
}

/// Upload detector findings to the review site
#[derive(Debug, Args)]
pub struct PublishFindingsCommand {
    /// Detector identifier (directory name under the detectors path)
    pub detector: String,

    /// Experiment number
    pub experiment: u32,

    /// Review-site base URL
    #[arg(long, env = "MISUSEBENCH_REVIEW_SITE")]
    pub review_site: Url,

    /// Review-site username; the password is prompted when not given
    #[arg(long)]
    pub username: Option<String>,

    /// Review-site password
    #[arg(long, env = "MISUSEBENCH_REVIEW_PASSWORD")]
    pub password: Option<String>,

    /// Dataset identifier reported with every upload
    #[arg(long, default_value = "default")]
    pub dataset: String,

    /// Per-request ceiling on attached files
    #[arg(long)]
    pub max_files_per_post: Option<usize>,

    /// Detector time budget in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Re-execute the detector despite persisted runs
    #[arg(long)]
    pub force_detect: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl PublishFindingsCommand {
    /// Execute the publish findings command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            detector = %self.detector,
            experiment = self.experiment,
            site = %self.review_site,
            "executing publish findings command"
        );
        let mut settings = cli.settings();
        let jar: PathBuf = cli
            .detectors_path
            .join(&self.detector)
            .join(format!("{}.jar", self.detector));
        settings.detector = Some(DetectorConfig {
            id: self.detector.clone(),
            jar,
        });
        settings.experiment = Some(format!("ex{}", self.experiment));
        settings.timeout = self.timeout.map(Duration::from_secs);
        settings.force_detect = self.force_detect;
        settings.dataset = self.dataset.clone();
        settings.review_site = Some(ReviewSiteConfig {
            url: self.review_site.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        });
        if let Some(max) = self.max_files_per_post {
            settings.max_files_per_post = max;
        }
        run_mode(cli, "publish findings", &self.selection, settings)
    }
}
