use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "chipdoc", about = "Inspect, verify and convert chip documents", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// TOML file with [save] and [text] tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Register the LEVEL2 unlock token for this process
    #[arg(long, global = true)]
    pub unlock: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the clear header of a document without decrypting it
    Inspect(FileArgs),
    /// Open a document fully and check every node
    Verify(FileArgs),
    /// Print the document tree as an indented outline
    Dump(DumpArgs),
    /// Rewrite a document in another format
    Convert(ConvertArgs),
}

#[derive(Args)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct DumpArgs {
    pub file: PathBuf,
    /// Stop descending below this depth
    #[arg(long)]
    pub max_depth: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetFormat {
    Binary,
    Xml,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CompressionArg {
    None,
    Fastest,
    Default,
    Smallest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EncryptionArg {
    None,
    Level1,
    Level2,
}

#[derive(Args)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Output format; guessed from the output extension when omitted
    #[arg(long)]
    pub to: Option<TargetFormat>,
    #[arg(long)]
    pub compression: Option<CompressionArg>,
    #[arg(long)]
    pub encryption: Option<EncryptionArg>,
    /// Vendor name whose signature is stored in a LEVEL2 document
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(long)]
    pub seed: Option<u32>,
    /// Write text output without indentation
    #[arg(long)]
    pub compact: bool,
}
