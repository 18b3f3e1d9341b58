//! Detect command

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::info;

use misusebench_pipeline::DetectorConfig;

use crate::cli::commands::{run_mode, SelectionArgs};
use crate::cli::Cli;

/// Run a detector against all compiled versions
#[derive(Debug, Args)]
pub struct DetectCommand {
    /// Detector identifier (directory name under the detectors path)
    pub detector: String,

    /// Experiment number
    pub experiment: u32,

    /// Detector time budget in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Re-execute the detector despite persisted runs
    #[arg(long)]
    pub force_detect: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl DetectCommand {
    /// Execute the detect command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            detector = %self.detector,
            experiment = self.experiment,
            "executing detect command"
        );
        let mut settings = cli.settings();
        settings.detector = Some(self.detector_config(cli));
        settings.experiment = Some(format!("ex{}", self.experiment));
        settings.timeout = self.timeout.map(Duration::from_secs);
        settings.force_detect = self.force_detect;
        run_mode(cli, "detect", &self.selection, settings)
    }

    /// Detector jar convention: `<detectors>/<id>/<id>.jar`
    pub(crate) fn detector_config(&self, cli: &Cli) -> DetectorConfig {
        let jar: PathBuf = cli
            .detectors_path
            .join(&self.detector)
            .join(format!("{}.jar", self.detector));
        DetectorConfig {
            id: self.detector.clone(),
            jar,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    #[test]
    fn jar_path_follows_detector_convention() {
        let cli = Cli::try_parse_from(["misusebench", "detect", "demo", "2"]).unwrap();
        let Commands::Detect(cmd) = &cli.command else {
            panic!("expected detect command");
        };
        assert_eq!(cmd.detector, "demo");
        assert_eq!(cmd.experiment, 2);

        let config = cmd.detector_config(&cli);
        assert_eq!(config.id, "demo");
        assert_eq!(config.jar, std::path::Path::new("detectors/demo/demo.jar"));
    }
}
