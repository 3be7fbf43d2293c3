//! CLI definitions for the `tloom` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run and inspect declarative workflow templates.
#[derive(Parser)]
#[command(name = "tloom", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding config.toml, templates and run logs.
    #[arg(long, global = true, default_value = ".", env = "TLOOM_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an executable and print its outputs as JSON.
    Run {
        /// Executable kind: task, process, action, generator, or tool.
        #[arg(long = "class-name")]
        class_name: String,

        /// Template id (or tool id).
        #[arg(long)]
        id: String,

        /// Inputs as a JSON object.
        #[arg(long, default_value = "{}")]
        inputs: String,
    },

    /// Print one template document.
    GetTemplate {
        #[arg(long = "class-name")]
        class_name: String,

        #[arg(long)]
        id: String,
    },

    /// Validate an inline template document and report every defect.
    ValidateTemplate {
        #[arg(long = "class-name")]
        class_name: String,

        /// The template document as a JSON string.
        #[arg(long)]
        template: String,
    },

    /// Print every registered tool as a leaf template.
    GetToolsTemplate,

    /// Print the registered tool ids and descriptions.
    GetTools,
}
