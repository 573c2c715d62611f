use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use argus_core::{Edition, FaceEngine, SettingsProvider, SettingsValue};
use argus_sim::{Script, SimEngineBackend};

mod session;

#[derive(Parser)]
#[command(name = "argus", about = "Argus face tracking CLI (simulation backend)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated tracking session and print the drained records
    Track {
        /// Settings document (TOML) for the engine and tracking module
        #[arg(short, long)]
        config: PathBuf,
        /// Number of frames to push (default: the demo script length)
        #[arg(long)]
        frames: Option<u64>,
        /// Random jitter, in pixels, applied to the scripted detections
        #[arg(long, default_value_t = 0.0)]
        jitter: f32,
        /// Seed for the jitter generator
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Read frame images from this directory instead of synthesizing them
        #[arg(long)]
        from_dir: Option<PathBuf>,
        /// Write the final best-shot crop of each track as a PNG into this directory
        #[arg(long)]
        save_best: Option<PathBuf>,
        /// Print records as JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Report engine edition and module availability
    Info {
        /// Settings document (TOML)
        #[arg(short, long)]
        config: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or edit a settings document
    Settings {
        /// Settings document (TOML)
        path: PathBuf,
        /// Print one value: --get SECTION KEY
        #[arg(long, num_args = 2, value_names = ["SECTION", "KEY"], conflicts_with = "set")]
        get: Option<Vec<String>>,
        /// Store one value and save: --set SECTION KEY VALUE
        #[arg(long, num_args = 3, value_names = ["SECTION", "KEY", "VALUE"])]
        set: Option<Vec<String>>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            config,
            frames,
            jitter,
            seed,
            from_dir,
            save_best,
            json,
        } => session::run(session::TrackOptions {
            config,
            frames,
            jitter,
            seed,
            from_dir,
            save_best,
            json,
        }),
        Commands::Info { config, json } => info(&config, json),
        Commands::Settings { path, get, set } => settings_command(&path, get, set),
    }
}

/// Build the simulated engine the way every subcommand does: edition
/// from the `[engine]` section, demo script as ground truth.
fn build_engine(settings: &SettingsProvider, script: Script) -> Result<Arc<FaceEngine>> {
    let edition = match settings.str_of("engine", "edition", "complete").as_str() {
        "complete" => Edition::Complete,
        "front-end" => Edition::FrontEnd,
        other => bail!("unknown engine edition {other:?} (expected \"complete\" or \"front-end\")"),
    };
    let backend = SimEngineBackend::new(edition, script);
    let mut engine = FaceEngine::new(Arc::new(backend));
    engine.set_settings_provider(settings.clone());
    Ok(Arc::new(engine))
}

fn info(config: &Path, json: bool) -> Result<()> {
    let settings = SettingsProvider::load(config)?;
    let engine = build_engine(&settings, Script::demo())?;

    let edition = engine.edition();
    let detector = engine.create_detector().is_ok();
    let extractor = engine.create_descriptor_extractor().is_ok();
    let index = engine.create_dense_index(1).is_ok();
    let tracking = engine.create_tracking(&settings).is_ok();

    if json {
        let report = serde_json::json!({
            "edition": edition.to_string(),
            "detection": detector,
            "descriptor_extraction": extractor,
            "dense_index": index,
            "tracking": tracking,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("edition:               {edition}");
        println!("detection:             {}", available(detector));
        println!("descriptor extraction: {}", available(extractor));
        println!("dense index:           {}", available(index));
        println!("tracking:              {}", available(tracking));
    }
    Ok(())
}

fn available(yes: bool) -> &'static str {
    if yes {
        "available"
    } else {
        "not available"
    }
}

fn settings_command(path: &Path, get: Option<Vec<String>>, set: Option<Vec<String>>) -> Result<()> {
    if let Some(args) = set {
        let mut settings = SettingsProvider::load(path)?;
        let (section, key, raw) = (&args[0], &args[1], &args[2]);
        settings.set(section, key, parse_value(raw));
        settings.save(path)?;
        println!("{section}.{key} = {raw}");
        return Ok(());
    }

    let settings = SettingsProvider::load(path)?;
    if let Some(args) = get {
        let (section, key) = (&args[0], &args[1]);
        match settings.get(section, key) {
            Some(value) => println!("{}", serde_json::to_string(value)?),
            None => bail!("no value for {section}.{key} in {}", path.display()),
        }
        return Ok(());
    }

    // No flags: print the whole document.
    print!("{}", toml::to_string(&settings).context("rendering settings")?);
    Ok(())
}

/// Parse a command-line value the way the document would: bool, then
/// integer, then float, falling back to a string.
fn parse_value(raw: &str) -> SettingsValue {
    if let Ok(b) = raw.parse::<bool>() {
        return SettingsValue::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return SettingsValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return SettingsValue::Float(f);
    }
    SettingsValue::Str(raw.to_string())
}
