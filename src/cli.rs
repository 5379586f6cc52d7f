use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Inspect the state behind declarative resource evaluation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect or edit the value cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Check whether a resource is due for evaluation
    Due(DueArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Cache Commands
// ============================================================================

#[derive(Subcommand)]
pub enum CacheCommand {
    /// List resources with cached values
    List,

    /// Show cached values of a resource
    Show {
        /// Resource identity, e.g. "File[/etc/motd]"
        resource: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget everything cached for a resource
    Clear {
        /// Resource identity
        resource: String,
    },
}

// ============================================================================
// Due
// ============================================================================

#[derive(Parser)]
pub struct DueArgs {
    /// Resource identity
    pub resource: String,

    /// Named schedule from converge.toml
    #[arg(short, long)]
    pub schedule: Option<String>,

    /// Evaluate at this time instead of now (RFC 3339)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show effective settings, paths and schedules
    Show,
}
