use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "spectra-recon")]
#[command(about = "Reconstruct an optical spectrum from a captured sensor image")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "recon.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log CPU / memory usage per stage
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Reconstruct the spectrum of the latest capture (or a given image)
    Reconstruct {
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Check that model assets load and report their shapes
    Check,
    /// Remove files under the capture and result directories
    Reset,
    /// Print the effective configuration
    ShowConfig,
}

impl CliConfig {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Reconstruct { image: None })
    }
}
