// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for missionforge

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "missionforge")]
#[command(about = "Plans missions into dependent tasks and drives them through execution, validation and integration")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a mission described by a manifest
    Run {
        #[arg(help = "Path to mission manifest YAML file")]
        manifest: PathBuf,

        #[arg(long, help = "Maximum number of concurrent tasks")]
        max_concurrent: Option<usize>,

        #[arg(short, long, help = "Write the mission report as JSON to this file")]
        output: Option<PathBuf>,
    },

    /// Show the plan and execution waves for a manifest without running it
    Plan {
        #[arg(help = "Path to mission manifest YAML file")]
        manifest: PathBuf,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
