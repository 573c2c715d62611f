//! The `track` subcommand: run a simulated session the way a host
//! application would, then report what the buffer delivered.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use argus_core::{Image, SettingsProvider, TrackId};
use argus_sim::Script;
use argus_track::{CallbackRecord, RecordKind, Stream, TrackEngine};

use crate::build_engine;

/// Synthesized frame size; every scripted rect fits inside.
const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;
/// Draining stops once the buffer stays quiet this long.
const QUIET_PERIOD: Duration = Duration::from_millis(200);
/// Upper bound on waiting for a worker-mode backend.
const DRAIN_DEADLINE: Duration = Duration::from_secs(5);

pub struct TrackOptions {
    pub config: PathBuf,
    pub frames: Option<u64>,
    pub jitter: f32,
    pub seed: u64,
    pub from_dir: Option<PathBuf>,
    pub save_best: Option<PathBuf>,
    pub json: bool,
}

pub fn run(options: TrackOptions) -> Result<()> {
    let settings = SettingsProvider::load(&options.config)?;

    let mut script = Script::demo();
    if options.jitter > 0.0 {
        script = jittered(&script, options.jitter, options.seed);
    }
    let frames = options.frames.unwrap_or(script.len() as u64);

    let engine = build_engine(&settings, script)?;
    let tracker = TrackEngine::with_settings(engine, settings)?;
    let mut stream = tracker.create_stream()?;

    let source = match &options.from_dir {
        Some(dir) => FrameSource::from_dir(dir)?,
        None => FrameSource::Synthetic,
    };

    tracing::info!(stream = %stream.id(), frames, "session starting");
    for index in 0..frames {
        stream.push_frame(source.frame(index));
    }
    let records = drain_until_quiet(&stream);

    if options.json {
        for record in &records {
            println!("{}", serde_json::to_string(&record.summary())?);
        }
    } else {
        print_table(&records);
    }

    let best_shots = records
        .iter()
        .filter(|r| r.kind() == RecordKind::BestShot)
        .count();
    let track_ends = records
        .iter()
        .filter(|r| r.kind() == RecordKind::TrackEnd)
        .count();
    tracing::info!(
        records = records.len(),
        best_shots,
        track_ends,
        "session finished"
    );

    if let Some(dir) = &options.save_best {
        let saved = save_best_shots(&records, dir)?;
        println!("saved {saved} best-shot crops to {}", dir.display());
    }
    Ok(())
}

/// Poll the buffer until it goes quiet. There is no delivery-complete
/// signal; a quiet period after the last record is the stop condition.
fn drain_until_quiet(stream: &Stream) -> Vec<CallbackRecord> {
    let mut records = Vec::new();
    let start = Instant::now();
    let mut last_activity = Instant::now();
    loop {
        let drained = stream.drain_callbacks();
        if !drained.is_empty() {
            records.extend(drained);
            last_activity = Instant::now();
            continue;
        }
        if last_activity.elapsed() >= QUIET_PERIOD || start.elapsed() >= DRAIN_DEADLINE {
            return records;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

fn print_table(records: &[CallbackRecord]) {
    if records.is_empty() {
        println!("no records");
        return;
    }
    println!(
        "{:<10} {:>5} {:>5}  {:<22} {:>5}",
        "kind", "track", "frame", "rect", "score"
    );
    for record in records {
        let summary = record.summary();
        let frame = summary
            .frame_id
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        let rect = summary
            .rect
            .map(|r| format!("{:.0}x{:.0} at ({:.0}, {:.0})", r.width, r.height, r.x, r.y))
            .unwrap_or_else(|| "-".to_string());
        let score = summary
            .score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:>5} {:>5}  {:<22} {:>5}",
            summary.kind.to_string(),
            summary.track_id,
            frame,
            rect,
            score
        );
    }
}

/// Export each track's final best shot as a grayscale PNG.
fn save_best_shots(records: &[CallbackRecord], dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    // Later records replace earlier ones, leaving the final best.
    let mut best: BTreeMap<TrackId, &CallbackRecord> = BTreeMap::new();
    for record in records {
        if record.kind() == RecordKind::BestShot {
            best.insert(record.track_id(), record);
        }
    }

    for (track, record) in &best {
        let (Some(image), Some(detection)) = (record.image(), record.detection()) else {
            continue;
        };
        let crop = image.crop(&detection.rect)?;
        let png = image::GrayImage::from_raw(crop.width(), crop.height(), crop.data().to_vec())
            .context("crop dimensions out of range")?;
        let frame = record.frame_id().unwrap_or(0);
        let path = dir.join(format!("track-{track}-frame-{frame}.png"));
        png.save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(track = *track, frame, path = %path.display(), "saved best shot");
    }
    Ok(best.len())
}

enum FrameSource {
    Synthetic,
    Files(Vec<Image>),
}

impl FrameSource {
    fn from_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_ascii_lowercase())
                        .as_deref(),
                    Some("png" | "jpg" | "jpeg" | "bmp")
                )
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            bail!("no image files in {}", dir.display());
        }

        let mut images = Vec::with_capacity(paths.len());
        for path in &paths {
            let gray = image::open(path)
                .with_context(|| format!("loading {}", path.display()))?
                .to_luma8();
            let (width, height) = gray.dimensions();
            images.push(Image::from_gray(gray.into_raw(), width, height)?);
        }
        Ok(FrameSource::Files(images))
    }

    fn frame(&self, index: u64) -> Image {
        match self {
            FrameSource::Synthetic => {
                // Mild per-frame brightness drift.
                Image::filled(FRAME_WIDTH, FRAME_HEIGHT, 110 + (index % 6) as u8 * 8)
            }
            FrameSource::Files(images) => images[(index as usize) % images.len()].clone(),
        }
    }
}

/// Shift every scripted detection by a seeded random offset, rect and
/// landmarks together.
fn jittered(script: &Script, jitter: f32, seed: u64) -> Script {
    let mut rng = StdRng::seed_from_u64(seed);
    let frames = script
        .frames()
        .iter()
        .map(|detections| {
            detections
                .iter()
                .map(|detection| {
                    let dx = rng.gen_range(-jitter..=jitter);
                    let dy = rng.gen_range(-jitter..=jitter);
                    let mut moved = detection.clone();
                    moved.rect.x += dx;
                    moved.rect.y += dy;
                    moved.landmarks = moved.landmarks.translated(dx, dy);
                    moved
                })
                .collect()
        })
        .collect();
    Script::with_frames(frames)
}
