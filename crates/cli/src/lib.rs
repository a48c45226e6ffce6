use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use markup_core::{
    EditSession, EngineConfig, MarkerKind, PageIndex, PageRect, PageSurface, PhotoNumber,
    RenderSurface,
};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod script;

pub use script::{Replayer, Script, Step};

#[derive(Debug, Parser)]
#[command(name = "markup-cli")]
#[command(about = "Replay document markup edits through the markup engine")]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay an edit script and print the resulting markup as JSON.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        /// Override the script's page count
        #[arg(long)]
        pages: Option<usize>,
    },
    /// Print the number the next photo marker would get after a script.
    NextNumber {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    pages: usize,
    markers: Vec<MarkerOutput>,
    photo_numbers: Vec<PhotoNumber>,
    next_photo_number: Option<PhotoNumber>,
    can_undo: bool,
    can_redo: bool,
    undo_label: Option<String>,
    redo_label: Option<String>,
    rendered_objects: usize,
    sync: SyncTotals,
    issues: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MarkerOutput {
    tag: Option<String>,
    kind: MarkerKind,
    page: PageIndex,
    bounds: PageRect,
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SyncTotals {
    added: usize,
    removed: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load config")?;
    init_tracing(&config.log_filter);

    match cli.command {
        Commands::Replay { script, pages } => run_replay(&config, &script, pages),
        Commands::NextNumber { script } => run_next_number(&config, &script),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over the configured filter
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(markup_core::DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn run_replay(config: &EngineConfig, file: &Path, pages: Option<usize>) -> Result<()> {
    let mut script = load_script(file)?;
    if let Some(pages) = pages {
        script.pages = pages;
    }

    let mut replayer = replay(config, &script)?;
    let output = replay_output(&mut replayer);

    let json = serde_json::to_string_pretty(&output)?;
    println!("{json}");

    Ok(())
}

fn run_next_number(config: &EngineConfig, file: &Path) -> Result<()> {
    let script = load_script(file)?;
    let replayer = replay(config, &script)?;

    let number = replayer
        .session
        .next_photo_number()
        .context("no photo marker number available")?;
    println!("{number}");

    Ok(())
}

fn load_script(file: &Path) -> Result<Script> {
    if !file.is_file() {
        anyhow::bail!("script does not exist: {}", file.display());
    }
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    Script::from_json(&bytes)
}

fn replay(config: &EngineConfig, script: &Script) -> Result<Replayer> {
    let session = EditSession::new(config);
    let surface = PageSurface::new(script.pages).with_backref_defect(script.backref_defect);

    let mut replayer = Replayer::new(session, surface);
    replayer.run(&script.steps)?;
    Ok(replayer)
}

fn replay_output(replayer: &mut Replayer) -> ReplayOutput {
    // The surface already matches the store; this pass only reports skipped markers.
    let final_sync = replayer.session.sync(&mut replayer.surface);

    let session = &replayer.session;
    let snapshot = session.snapshot();
    let tags = replayer.tag_index();

    let mut markers: Vec<MarkerOutput> = snapshot
        .iter()
        .map(|marker| MarkerOutput {
            tag: tags.get(&marker.id()).map(|tag| tag.to_string()),
            kind: marker.kind(),
            page: marker.page_index(),
            bounds: marker.bounds(),
            content: marker.content().map(str::to_owned),
        })
        .collect();
    markers.sort_by(|a, b| (a.page, &a.tag).cmp(&(b.page, &b.tag)));

    ReplayOutput {
        pages: replayer.surface.page_count(),
        markers,
        photo_numbers: snapshot.photo_numbers().into_iter().collect(),
        next_photo_number: session.next_photo_number().ok(),
        can_undo: session.can_undo(),
        can_redo: session.can_redo(),
        undo_label: session.undo_label().map(str::to_owned),
        redo_label: session.redo_label().map(str::to_owned),
        rendered_objects: replayer.surface.object_count(),
        sync: SyncTotals {
            added: replayer.totals.added.len(),
            removed: replayer.totals.removed.len(),
        },
        issues: final_sync.issues.iter().map(ToString::to_string).collect(),
    }
}
