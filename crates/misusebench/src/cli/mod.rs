//! CLI definition and command handling

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use misusebench_pipeline::PipelineSettings;

use commands::{
    CheckCommand, CheckoutCommand, CompileCommand, DetectCommand, PublishCommand,
};

/// MisuseBench - API-misuse detector benchmark CLI
#[derive(Debug, Parser)]
#[command(name = "misusebench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Benchmark data directory
    #[arg(long, global = true, default_value = "data", env = "MISUSEBENCH_DATA")]
    pub data_path: PathBuf,

    /// Root for checkout and compile artifacts
    #[arg(long, global = true, default_value = "checkouts")]
    pub checkouts_path: PathBuf,

    /// Root for detector findings and run records
    #[arg(long, global = true, default_value = "findings")]
    pub findings_path: PathBuf,

    /// Directory the detector jars live in
    #[arg(long, global = true, default_value = "detectors")]
    pub detectors_path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check data directory and required external tools
    Check(CheckCommand),

    /// Materialize working copies of all benchmark versions
    Checkout(CheckoutCommand),

    /// Compile benchmark versions into partitioned class directories
    Compile(CompileCommand),

    /// Run a detector against all compiled versions
    Detect(DetectCommand),

    /// Upload operations
    Publish(PublishCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Check(ref cmd) => cmd.execute(&self),
            Commands::Checkout(ref cmd) => cmd.execute(&self),
            Commands::Compile(ref cmd) => cmd.execute(&self),
            Commands::Detect(ref cmd) => cmd.execute(&self),
            Commands::Publish(ref cmd) => cmd.execute(&self),
        }
    }

    /// Pipeline settings with this invocation's artifact roots
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings::new(&self.checkouts_path, &self.findings_path)
    }
}
