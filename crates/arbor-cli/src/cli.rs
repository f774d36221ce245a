use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "Arbor: inspect git object databases",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository path (a working tree or a git directory)
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    pub repo: PathBuf,

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
    /// Create an empty repository
    Init(InitArgs),
    /// Resolve a revision expression to an object id
    RevParse(RevParseArgs),
    /// Show an object's type or content
    CatFile(CatFileArgs),
    /// Show commit history
    Log(LogArgs),
    /// Compare the trees of two revisions
    DiffTree(DiffTreeArgs),
    /// List the paths in the index
    LsFiles(LsFilesArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    #[arg(long)]
    pub bare: bool,
}

#[derive(Args)]
pub struct RevParseArgs {
    pub expr: String,
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["pretty", "show_type"])))]
pub struct CatFileArgs {
    /// Pretty-print the content
    #[arg(short = 'p')]
    pub pretty: bool,
    /// Print the object type
    #[arg(short = 't')]
    pub show_type: bool,
    pub expr: String,
}

#[derive(Args)]
pub struct LogArgs {
    /// Never show a commit before its children
    #[arg(long)]
    pub topo: bool,
    /// Newest commit time first
    #[arg(long = "date-order")]
    pub date_order: bool,
    #[arg(long)]
    pub reverse: bool,
    #[arg(short = 'n', long = "max-count")]
    pub max_count: Option<usize>,
    #[arg(long = "no-merges")]
    pub no_merges: bool,
    /// Revisions: `A`, `^A`, or `A..B`
    pub revs: Vec<String>,
    /// Only commits touching these paths
    #[arg(last = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct DiffTreeArgs {
    pub old: String,
    pub new: String,
    #[arg(last = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct LsFilesArgs {
    /// Show mode, object id, and stage
    #[arg(short = 's', long)]
    pub stage: bool,
}
