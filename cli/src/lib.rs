mod cli;

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use chronicle_core::Attributes;
use chronicle_core::AuditEntry;
use chronicle_core::EngineConfig;
use chronicle_core::EntityState;
use chronicle_core::ItemRef;
use chronicle_core::JsonlVersionStore;
use chronicle_core::Navigator;
use chronicle_core::Origin;
use chronicle_core::SnapshotCodec;
use chronicle_core::TrailBuilder;
use chronicle_core::TrailOptions;
use chronicle_core::Version;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub use cli::Cli;
pub use cli::Command;
pub use cli::ShowArgs;
pub use cli::Target;
pub use cli::TrailArgs;
pub use cli::VersionsArgs;

/// Installs a stderr fmt layer filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let default_level = "warn";
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Runs one subcommand and returns what should be printed on stdout.
pub fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Command::Versions(args) => versions(&args),
        Command::Show(args) => show(&args),
        Command::Trail(args) => trail(&args),
    }
}

/// Store, codec and engine config resolved from the shared flags.
struct Session {
    item: ItemRef,
    store: JsonlVersionStore,
    codec: SnapshotCodec,
    config: EngineConfig,
}

impl Session {
    fn open(target: &Target) -> anyhow::Result<Self> {
        let config = match &target.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        debug!(store = %target.store.display(), "opening version store");
        Ok(Self {
            item: ItemRef::new(target.item_type.clone(), target.item_id.clone()),
            store: JsonlVersionStore::open(target.store.clone()),
            codec: SnapshotCodec::new(config.snapshot_format),
            config,
        })
    }

    fn navigator(&self) -> Navigator<&JsonlVersionStore> {
        Navigator::new(&self.store, self.codec)
    }

    /// Live state from a JSON attributes file, or an empty placeholder.
    fn live(&self, path: Option<&Path>) -> anyhow::Result<EntityState> {
        let attributes = match path {
            Some(path) => read_attributes(path)?,
            None => Attributes::new(),
        };
        Ok(EntityState::live(self.item.clone(), attributes))
    }
}

fn read_attributes(path: &Path) -> anyhow::Result<Attributes> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} must hold a JSON object of attributes", path.display()))
}

fn versions(args: &VersionsArgs) -> anyhow::Result<String> {
    let session = Session::open(&args.target)?;
    let live = session.live(None)?;
    let versions = session
        .navigator()
        .versions(&live)
        .with_context(|| format!("failed to list versions of {}", session.item))?;

    if args.target.json {
        return Ok(serde_json::to_string_pretty(&versions)?);
    }
    let mut out = String::new();
    for version in &versions {
        writeln!(out, "{}", render_version(version))?;
    }
    Ok(out)
}

fn render_version(version: &Version) -> String {
    let mut line = format!(
        "#{} {} by {} at {}",
        version.sequence_index,
        version.event,
        version.whodunnit.as_deref().unwrap_or("unknown"),
        version.created_at.to_rfc3339()
    );
    if !version.metadata.is_empty() {
        let metadata: Vec<String> = version
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        line.push_str(&format!(" [{}]", metadata.join(", ")));
    }
    line
}

fn show(args: &ShowArgs) -> anyhow::Result<String> {
    let session = Session::open(&args.target)?;
    let live = session.live(args.live.as_deref())?;
    let state = session
        .navigator()
        .state_at(&live, args.at)
        .with_context(|| format!("failed to reconstruct {}", session.item))?;

    if state.origin == Origin::Live && args.live.is_none() {
        anyhow::bail!(
            "no version of {} was recorded after {}; pass --live to show the current state",
            session.item,
            args.at.to_rfc3339()
        );
    }

    if args.target.json {
        return Ok(serde_json::to_string_pretty(&state)?);
    }
    let mut out = String::new();
    match state.origin {
        Origin::Live => writeln!(out, "{} (live)", session.item)?,
        Origin::Reified {
            sequence_index,
            event,
        } => writeln!(
            out,
            "{} (before {event} #{sequence_index})",
            session.item
        )?,
    }
    for (attribute, value) in &state.attributes {
        writeln!(out, "  {attribute}: {value}")?;
    }
    Ok(out)
}

fn trail(args: &TrailArgs) -> anyhow::Result<String> {
    let session = Session::open(&args.target)?;
    let live = session.live(Some(args.live.as_path()))?;
    let options = trail_options(args.ignore.as_deref(), &session.config, &session.item);
    let entries: Vec<AuditEntry> = TrailBuilder::new(&session.store, session.codec)
        .audit_trail(&live, &options)
        .with_context(|| format!("failed to build audit trail for {}", session.item))?;

    if args.target.json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }
    let mut out = String::new();
    for entry in &entries {
        writeln!(out, "{entry}")?;
    }
    Ok(out)
}

/// `--ignore` wins, then the type's configured ignore list, then the default.
fn trail_options(
    ignore: Option<&[String]>,
    config: &EngineConfig,
    item: &ItemRef,
) -> TrailOptions {
    match ignore.or_else(|| config.ignored_for(&item.item_type)) {
        Some(attributes) => TrailOptions::ignoring(attributes.iter().cloned()),
        None => TrailOptions::default(),
    }
}
