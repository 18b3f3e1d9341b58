//! Checkout command

use clap::Args;
use tracing::info;

use crate::cli::commands::{run_mode, SelectionArgs};
use crate::cli::Cli;

/// Materialize working copies of all benchmark versions
#[derive(Debug, Args)]
pub struct CheckoutCommand {
    /// Refresh existing checkouts
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl CheckoutCommand {
    /// Execute the checkout command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, "executing checkout command");
        let mut settings = cli.settings();
        settings.force_checkout = self.force;
        run_mode(cli, "checkout", &self.selection, settings)
    }
}
