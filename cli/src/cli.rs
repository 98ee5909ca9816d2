use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

/// Inspect entity history recorded in a JSON-lines version store.
#[derive(Parser, Debug)]
#[command(name = "chronicle", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every recorded version of one entity, oldest first.
    Versions(VersionsArgs),

    /// Show the entity as it was at a point in time.
    Show(ShowArgs),

    /// Print the attribute-level audit trail, newest change first.
    Trail(TrailArgs),
}

/// Selects the store and the entity.
#[derive(Args, Debug)]
pub struct Target {
    /// JSON-lines file holding the versions.
    #[arg(long, value_name = "FILE")]
    pub store: PathBuf,

    /// TOML engine configuration (snapshot format, per-type ignore lists).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Item type, e.g. `Widget`.
    #[arg(long = "type", value_name = "TYPE")]
    pub item_type: String,

    /// Item id.
    #[arg(long = "id", value_name = "ID")]
    pub item_id: String,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct VersionsArgs {
    #[command(flatten)]
    pub target: Target,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: Target,

    /// RFC 3339 timestamp, e.g. `2024-05-01T12:00:00Z`.
    #[arg(long, value_name = "TIMESTAMP")]
    pub at: DateTime<Utc>,

    /// JSON object with the entity's current attributes. Needed when no
    /// version was recorded after `--at`.
    #[arg(long, value_name = "FILE")]
    pub live: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrailArgs {
    #[command(flatten)]
    pub target: Target,

    /// JSON object with the entity's current attributes.
    #[arg(long, value_name = "FILE")]
    pub live: PathBuf,

    /// Attributes left out of the diff. Defaults to the configured ignore
    /// list for the type, or `updated_at`.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub ignore: Option<Vec<String>>,
}
