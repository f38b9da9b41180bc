use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally", about = concat!("tally v", env!("CARGO_PKG_VERSION"), " - progress for markdown checklists"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Keep progress records in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<String>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a checklist as a tree
    Show(ShowArgs),
    /// Check items (cascades to children, and to parents once complete)
    Check(CheckArgs),
    /// Uncheck items (cascades to children)
    Uncheck(CheckArgs),
    /// Collapse or expand a header
    Toggle(ToggleArgs),
    /// Completion statistics
    Stats(FileArg),
    /// Last completed item and what comes next
    Next(NextArgs),
    /// Print the canonical markdown for a checklist
    Reconstruct(FileArg),
    /// Follow a checklist, reloading on every change
    Watch(FileArg),
    /// Manage tracked checklists
    Projects(ProjectsCmd),
    /// View or change settings
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Checklist command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct FileArg {
    /// Markdown (or RTF) checklist file
    pub file: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Markdown (or RTF) checklist file
    pub file: String,
    /// Include items under collapsed headers
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Markdown (or RTF) checklist file
    pub file: String,
    /// Item IDs or positions (as shown by `tally show`)
    #[arg(required = true)]
    pub items: Vec<String>,
}

#[derive(Args)]
pub struct ToggleArgs {
    /// Markdown (or RTF) checklist file
    pub file: String,
    /// Header ID or position
    pub header: String,
}

#[derive(Args)]
pub struct NextArgs {
    /// Markdown (or RTF) checklist file
    pub file: String,
    /// How many unchecked items to list
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectsCmd {
    #[command(subcommand)]
    pub action: Option<ProjectsAction>,
}

#[derive(Subcommand)]
pub enum ProjectsAction {
    /// List tracked checklists (default)
    List(ProjectsListArgs),
    /// Track a checklist file
    Add(ProjectsAddArgs),
    /// Stop tracking a checklist and forget its progress
    Remove(ProjectsRemoveArgs),
}

#[derive(Args, Default)]
pub struct ProjectsListArgs {
    /// Sort by name, progress or last-accessed (default from config)
    #[arg(long)]
    pub sort: Option<String>,
    /// Ascending order
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,
    /// Descending order
    #[arg(long)]
    pub desc: bool,
}

#[derive(Args)]
pub struct ProjectsAddArgs {
    /// Path to the checklist file
    pub path: String,
}

#[derive(Args)]
pub struct ProjectsRemoveArgs {
    /// File name or path
    pub name_or_path: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (default)
    Show,
    /// Set a value, e.g. `tally config set matching.threshold 0.8`
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// Dotted key (section.field)
    pub key: String,
    pub value: String,
}
