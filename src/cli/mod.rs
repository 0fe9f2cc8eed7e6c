//! CLI argument definitions for rot.

use clap::{Args, Parser, Subcommand};

/// rot - Roadmap, OKR and feature request tracker.
///
/// Start with `rot system init --admin <email>`, then `rot item create` and `rot roadmap`.
#[derive(Parser, Debug)]
#[command(name = "rot")]
#[command(author, version, about = "Plan roadmap items by quarter, track OKRs, sprints and feature requests", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if rot was started in <path> instead of the current directory.
    /// Can also be set via ROT_WORKSPACE environment variable.
    #[arg(short = 'C', long = "workspace", global = true, env = "ROT_WORKSPACE")]
    pub workspace: Option<std::path::PathBuf>,

    /// Act as the user with this email (overrides ROT_USER and default-user)
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the roadmap for a quarter (defaults to the current one)
    Roadmap {
        #[command(flatten)]
        view: RoadmapArgs,

        /// Measure progress at this date instead of now (YYYY-MM-DD)
        #[arg(long)]
        at: Option<String>,
    },

    /// Roadmap item management commands
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Objectives and key results
    Okr {
        #[command(subcommand)]
        command: OkrCommands,
    },

    /// Feature requests and voting
    Request {
        #[command(subcommand)]
        command: RequestCommands,
    },

    /// User and role management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Sprint records and performance
    Sprint {
        #[command(subcommand)]
        command: SprintCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Quarter, year and filters selecting what the roadmap shows.
#[derive(Args, Debug, Clone, Default)]
pub struct RoadmapArgs {
    /// Quarter to show (Q1-Q4)
    #[arg(short, long)]
    pub quarter: Option<String>,

    /// Year to show
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Case-insensitive text search over name, metric and thesis
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only items tagged with this product
    #[arg(long)]
    pub product: Option<String>,

    /// Only items tagged with this sub-product ("geral" with --product web shows all)
    #[arg(long)]
    pub sub_product: Option<String>,
}

/// Item fields shared by create and update.
#[derive(Args, Debug, Clone, Default)]
pub struct ItemArgs {
    /// Status (not_started, next_sprint, current_sprint, finishing, done)
    #[arg(long)]
    pub status: Option<String>,

    /// Start date (YYYY-MM-DD); only the month matters
    #[arg(long)]
    pub start: Option<String>,

    /// Number of months the item spans
    #[arg(long)]
    pub months: Option<i64>,

    /// Success metric
    #[arg(long)]
    pub metric: Option<String>,

    /// Thesis / rationale
    #[arg(long)]
    pub thesis: Option<String>,

    /// Product tag (e.g., web, app)
    #[arg(long)]
    pub product: Option<String>,

    /// Sub-product tag
    #[arg(long)]
    pub sub_product: Option<String>,

    /// Linked objective ID (e.g., okr-a1b2)
    #[arg(long)]
    pub objective: Option<String>,
}

/// Item subcommands
#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create a roadmap item
    Create {
        /// Item name
        name: String,

        #[command(flatten)]
        fields: ItemArgs,
    },

    /// List items in display order
    List {
        /// Filter by product
        #[arg(long)]
        product: Option<String>,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,
    },

    /// Show item details
    Show {
        /// Item ID (e.g., rm-a1b2)
        id: String,
    },

    /// Update an item (pass an empty string to clear a text field)
    Update {
        /// Item ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ItemArgs,

        /// Clear the start date and duration
        #[arg(long, conflicts_with_all = ["start", "months"])]
        undated: bool,
    },

    /// Delete an item
    Delete {
        /// Item ID
        id: String,
    },

    /// Delete several items at once
    ///
    /// With --visible, everything the roadmap query shows is selected and
    /// each --id toggles one item out of (or into) the selection.
    BulkDelete {
        /// Item IDs to select
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Select every item visible in the roadmap query
        #[arg(long)]
        visible: bool,

        #[command(flatten)]
        view: RoadmapArgs,
    },
}

/// OKR subcommands
#[derive(Subcommand, Debug)]
pub enum OkrCommands {
    /// Create an objective
    Create {
        /// Objective title
        title: String,

        /// Quarter (Q1-Q4)
        #[arg(short, long)]
        quarter: String,

        /// Year
        #[arg(short, long)]
        year: i32,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Owner email (defaults to the acting user)
        #[arg(long)]
        owner: Option<String>,
    },

    /// List objectives with progress
    List {
        /// Filter by quarter (Q1-Q4)
        #[arg(short, long)]
        quarter: Option<String>,

        /// Filter by year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Show an objective with its key results and linked items
    Show {
        /// Objective ID (e.g., okr-a1b2)
        id: String,
    },

    /// Delete an objective and its key results
    Delete {
        /// Objective ID
        id: String,
    },

    /// Add a key result to an objective
    KrAdd {
        /// Objective ID
        objective: String,

        /// Key result title
        title: String,

        /// Target value
        #[arg(long)]
        target: f64,

        /// Starting value (default 0)
        #[arg(long)]
        start: Option<f64>,

        /// Unit label (e.g., %, users)
        #[arg(long)]
        unit: Option<String>,
    },

    /// Record the current value of a key result
    KrUpdate {
        /// Key result ID (e.g., kr-a1b2)
        id: String,

        /// Current value
        #[arg(long)]
        current: f64,
    },
}

/// Feature request subcommands
#[derive(Subcommand, Debug)]
pub enum RequestCommands {
    /// Submit a feature request
    Create {
        /// Request title
        title: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Product tag
        #[arg(long)]
        product: Option<String>,
    },

    /// List requests, most voted first
    List {
        /// Filter by product
        #[arg(long)]
        product: Option<String>,

        /// Filter by status (open, planned, in_progress, shipped, declined)
        #[arg(long)]
        status: Option<String>,
    },

    /// Vote for a request
    Vote {
        /// Request ID (e.g., req-a1b2)
        id: String,
    },

    /// Withdraw your vote
    Unvote {
        /// Request ID
        id: String,
    },

    /// Change a request's status
    Status {
        /// Request ID
        id: String,

        /// New status (open, planned, in_progress, shipped, declined)
        status: String,
    },
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// Email address
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Role (viewer, editor, admin)
        #[arg(long, default_value = "viewer")]
        role: String,
    },

    /// List users
    List,

    /// Change a user's role
    Role {
        /// Email address
        email: String,

        /// New role (viewer, editor, admin)
        role: String,
    },
}

/// Sprint subcommands
#[derive(Subcommand, Debug)]
pub enum SprintCommands {
    /// Record a sprint
    Add {
        /// Sprint name
        name: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Points committed at planning
        #[arg(long, default_value_t = 0)]
        planned: u32,

        /// Points delivered
        #[arg(long, default_value_t = 0)]
        delivered: u32,
    },

    /// List sprints
    List,

    /// Velocity and completion over all sprints
    Performance,

    /// Delete a sprint
    Delete {
        /// Sprint ID (e.g., spr-a1b2)
        id: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// List all configuration values with their effective source
    List,
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize roteiro for this workspace
    Init {
        /// Register this email as the first admin and default user
        #[arg(long)]
        admin: Option<String>,
    },

    /// Show version, build and storage information
    Info,
}
