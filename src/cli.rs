use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;
use crate::github::{RepoRef, StateFilter};

#[derive(Parser, Debug)]
#[command(
    name = "gh-issues-pdf",
    about = "Export GitHub issues and their comments to PDF",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Repository to export, as OWNER/REPO
    pub repo: Option<RepoRef>,

    /// Path to configuration file
    #[arg(short, long, env = "GH_ISSUES_PDF_CONFIG")]
    pub config: Option<PathBuf>,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Which issues to export
    #[arg(long, value_enum)]
    pub state: Option<StateFilter>,

    /// Export only these issue numbers (can be repeated)
    #[arg(long = "issue", value_name = "NUMBER")]
    pub issues: Vec<u32>,

    /// Override the directory where files are written
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write all issues into one document instead of one file per issue
    #[arg(long)]
    pub combined: bool,

    /// Keep remote image URLs instead of embedding the images
    #[arg(long)]
    pub no_inline_images: bool,

    /// Path to the wkhtmltopdf binary
    #[arg(long, value_name = "PATH")]
    pub renderer: Option<PathBuf>,

    /// Resolution passed to the renderer
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Where to write the configuration file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}
