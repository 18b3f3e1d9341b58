//! Check command - verify data directory and required external tools

use clap::Args;
use console::style;
use tracing::info;

use crate::cli::Cli;

/// Tools the pipeline shells out to
const REQUIRED_TOOLS: &[&str] = &["git", "svn", "java"];

/// Check data directory and required external tools
#[derive(Debug, Args)]
pub struct CheckCommand {}

impl CheckCommand {
    /// Execute the check command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing check command");
        let mut problems = 0;

        if cli.data_path.is_dir() {
            self.report_ok(cli, &format!("data directory {}", cli.data_path.display()));
        } else {
            problems += 1;
            self.report_fail(
                cli,
                &format!("data directory {} does not exist", cli.data_path.display()),
            );
        }

        for tool in REQUIRED_TOOLS {
            match which::which(tool) {
                Ok(path) => self.report_ok(cli, &format!("{tool} ({})", path.display())),
                Err(_) => {
                    problems += 1;
                    self.report_fail(cli, &format!("{tool} not found on PATH"));
                }
            }
        }

        if problems > 0 {
            anyhow::bail!("{problems} problem(s) found");
        }
        if !cli.quiet {
            println!("{} Environment looks good.", style("✓").green().bold());
        }
        Ok(())
    }

    fn report_ok(&self, cli: &Cli, message: &str) {
        if !cli.quiet {
            println!("{} {message}", style("✓").green().bold());
        }
    }

    fn report_fail(&self, cli: &Cli, message: &str) {
        if !cli.quiet {
            println!("{} {message}", style("✗").red().bold());
        }
    }
}
