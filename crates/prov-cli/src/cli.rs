use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prov",
    about = "Content-addressed artifact repository with provenance tracking",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repo configuration file (defaults to ./prov.toml, then a local database under .prov/)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a new artifact
    Put(PutArgs),
    /// Show an artifact
    Get(IdArg),
    /// Print an artifact's value
    Value(IdArg),
    /// Print an artifact's provenance inputs
    Inputs(IdArg),
    /// Check whether an artifact is stored
    Contains(IdArg),
    /// Find an artifact by value id
    FindValue(IdArg),
    /// Delete an artifact and its blobs
    Delete(IdArg),
    /// List stored artifacts
    Ls,
    /// Manage artifact sets
    Set(SetArgs),
    /// Rewrite database journals to their live contents
    Compact,
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct IdArg {
    pub id: String,
}

#[derive(Args)]
pub struct PutArgs {
    /// Function name recorded on the artifact
    #[arg(short, long)]
    pub name: String,
    /// Value as JSON; bare text is stored as a string
    pub value: String,
    #[arg(long, default_value = "0")]
    pub version: u32,
    /// Literal input, `key=json`; repeatable
    #[arg(short, long = "input")]
    pub inputs: Vec<String>,
    /// Upstream artifact input, `key=artifact-id`; repeatable
    #[arg(short, long = "artifact")]
    pub artifacts: Vec<String>,
}

#[derive(Args)]
pub struct SetArgs {
    #[command(subcommand)]
    pub action: SetAction,
}

#[derive(Subcommand)]
pub enum SetAction {
    /// Store a named set of artifact ids
    Create { name: String, ids: Vec<String> },
    /// Show a set by id, or the newest set with `--name`
    Show {
        id: Option<String>,
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Delete a set (member artifacts are kept)
    Delete { id: String },
    /// List stored sets
    Ls,
}
