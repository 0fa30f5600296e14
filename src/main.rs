//! streamlist demo host - Entry Point

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use streamlist::view::DemoOptions;
use tracing::info;

/// Messages generated when no transcript is given.
const DEFAULT_GENERATED: usize = 500;

/// streamlist - scroll a long chat transcript through the virtualized list engine
#[derive(Parser, Debug)]
#[command(name = "streamlist")]
#[command(version)]
#[command(about = "Terminal viewer for long chat transcripts, rendered through a virtualized list")]
pub struct Args {
    /// Path to JSONL transcript ({"id","role","content"} per line)
    pub file: Option<PathBuf>,

    /// Generate N synthetic messages instead of reading a file
    #[arg(short, long, value_name = "N", conflicts_with = "file")]
    pub generate: Option<usize>,

    /// Simulate a streaming assistant appending tokens
    #[arg(short, long)]
    pub stream: bool,

    /// Milliseconds between streamed tokens
    #[arg(long, default_value = "80", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not load or save the height snapshot
    #[arg(long)]
    pub no_persist: bool,

    /// Path to log file (overrides config and STREAMLIST_LOG_FILE)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration with full precedence chain:
    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = streamlist::config::load_config_with_precedence(args.config.clone())?;
        let merged = streamlist::config::merge_config(config_file);
        let with_env = streamlist::config::apply_env_overrides(merged);

        // Only override persistence if the flag was explicitly set
        let persist_override = if args.no_persist { Some(false) } else { None };
        streamlist::config::apply_cli_overrides(with_env, args.log_file.clone(), persist_override)
    };

    let _log_guard = streamlist::logging::init(&config.log_file_path)?;

    info!(
        config = ?config,
        "Configuration loaded and resolved"
    );

    let items = match (&args.file, args.generate) {
        (Some(path), _) => streamlist::view::load_transcript(path)?,
        (None, Some(count)) => streamlist::view::generate(count),
        (None, None) => streamlist::view::generate(DEFAULT_GENERATED),
    };

    let options = DemoOptions {
        stream: args.stream,
        tick: Duration::from_millis(args.tick_ms),
    };
    streamlist::view::run(&config, items, options)?;

    Ok(())
}
