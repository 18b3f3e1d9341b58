//! CLI commands

mod check;
mod checkout;
mod compile;
mod detect;
mod publish;

pub use check::CheckCommand;
pub use checkout::CheckoutCommand;
pub use compile::CompileCommand;
pub use detect::DetectCommand;
pub use publish::PublishCommand;

use clap::Args;
use console::style;
use tracing::info;

use misusebench_core::{load_projects, IdFilter};
use misusebench_pipeline::{default_registry, PipelineSettings};

use crate::cli::Cli;

/// Entity selection shared by all pipeline commands
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Process only these entities (project[.version[.misuse]])
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these entities (project[.version[.misuse]])
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
}

impl SelectionArgs {
    fn filter(&self) -> IdFilter {
        IdFilter::new(self.only.clone(), self.skip.clone())
    }
}

/// Resolve a pipeline mode, load the selected entities and run it
pub(crate) fn run_mode(
    cli: &Cli,
    mode: &str,
    selection: &SelectionArgs,
    settings: PipelineSettings,
) -> anyhow::Result<()> {
    info!(mode, data = %cli.data_path.display(), "running pipeline");
    let runner = default_registry().lookup(mode, &settings)?;

    let projects = load_projects(&cli.data_path, &selection.filter())?;
    if projects.is_empty() {
        if !cli.quiet {
            println!(
                "{}",
                style(format!("No projects found in {}.", cli.data_path.display())).yellow()
            );
        }
        return Ok(());
    }

    let report = runner.run(&projects);

    if !cli.quiet {
        for (entity, reason) in &report.skipped {
            println!("{} {}: {}", style("-").yellow().bold(), entity, reason);
        }
        for (entity, error) in &report.failed {
            println!("{} {}: {}", style("✗").red().bold(), entity, error);
        }
        let mark = if report.is_success() {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        println!("{mark} {report}");
    }

    if !report.is_success() {
        anyhow::bail!("{} entities failed", report.failed.len());
    }
    Ok(())
}
