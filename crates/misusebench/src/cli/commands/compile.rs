//! Compile command

use clap::Args;
use tracing::info;

use crate::cli::commands::{run_mode, SelectionArgs};
use crate::cli::Cli;

/// Compile benchmark versions into partitioned class directories
#[derive(Debug, Args)]
pub struct CompileCommand {
    /// Refresh existing checkouts first
    #[arg(long)]
    pub force_checkout: bool,

    /// Rebuild existing compile artifacts
    #[arg(long)]
    pub force_compile: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl CompileCommand {
    /// Execute the compile command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force_compile = self.force_compile, "executing compile command");
        let mut settings = cli.settings();
        settings.force_checkout = self.force_checkout;
        settings.force_compile = self.force_compile;
        run_mode(cli, "compile", &self.selection, settings)
    }
}
