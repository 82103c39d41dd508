use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "archivault",
    about = "Archivault: inspect and check IIIF Presentation 3 archives",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with cache, trash and history settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Count entities by type
    Stats(FileArgs),
    /// Print the resource hierarchy
    Tree(TreeArgs),
    /// Cross-check every index of the normalized document
    Validate(FileArgs),
    /// Normalize and re-emit a document
    Roundtrip(RoundtripArgs),
    /// Move resources to the trash and report what it holds
    Trash(TrashArgs),
}

#[derive(Args)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct TreeArgs {
    pub file: PathBuf,
    #[arg(short, long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct RoundtripArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct TrashArgs {
    pub file: PathBuf,
    #[arg(required = true)]
    pub ids: Vec<String>,
}
