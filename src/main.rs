use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emotune::{config, decode, emoji, startup, Outcome, Pipeline};
use emotune_vision::video::Camera;
use image::DynamicImage;
use log::{info, warn};
use serde_json::json;

#[derive(Parser)]
#[command(name = "emotune")]
#[command(version, about = "Infer emotions from faces in images and camera streams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the dominant face of one image
    Detect {
        /// Image file, or `-` for stdin
        image: PathBuf,
        /// Treat the input as base64 text (a data URL prefix is fine)
        #[arg(long)]
        base64: bool,
        /// Number of ranked emotions to show (defaults to `top_n` from config)
        #[arg(long)]
        top: Option<usize>,
        /// Report results under this confidence as low confidence
        #[arg(long)]
        min_confidence: Option<f32>,
        #[arg(long)]
        json: bool,
    },
    /// Classify several images, one result per image
    Batch {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Classify camera frames with temporal smoothing
    Live {
        /// Stop after this many frames (runs until interrupted otherwise)
        #[arg(short, long)]
        frames: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show classifier input/output shapes and labels
    Info,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(None)?;

    match cli.command {
        Commands::Detect {
            image,
            base64,
            top,
            min_confidence,
            json,
        } => {
            if min_confidence.is_some() {
                cfg.min_confidence = min_confidence;
            }
            let top = top.unwrap_or(cfg.top_n);
            detect(&cfg, &image, base64, top, json)
        }
        Commands::Batch { images, json } => batch(&cfg, &images, json),
        Commands::Live { frames, json } => live(&cfg, frames, json),
        Commands::Info => show_info(&cfg),
        Commands::Config => open_config(),
    }
}

fn read_image(path: &Path, base64: bool) -> Result<DynamicImage> {
    let mut bytes = Vec::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read stdin")?;
    } else {
        bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }

    let img = if base64 {
        let text = String::from_utf8(bytes).context("Base64 input is not UTF-8")?;
        decode::from_base64(&text)?
    } else {
        decode::from_bytes(&bytes)?
    };
    Ok(img)
}

fn log_outcome(prefix: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Detected(face) => info!(
            "{}{} {} at {}",
            prefix,
            emoji::for_label(&face.result.label),
            face.result,
            face.region
        ),
        Outcome::LowConfidence { region, best } => {
            warn!("{}Low confidence at {}: best guess {}", prefix, region, best)
        }
        Outcome::NoFace => warn!("{}No face detected", prefix),
    }
}

fn detect(cfg: &config::Config, path: &Path, base64: bool, top: usize, json: bool) -> Result<()> {
    let img = read_image(path, base64)?;
    let pipeline = startup::build_pipeline(cfg)?;

    let (outcome, ranked) = pipeline
        .detect_ranked(&img, top)
        .context("Failed to classify image")?;
    let ranked = (top > 1 && !ranked.is_empty()).then_some(ranked);

    if json {
        let emoji = outcome.emotion().map(|r| emoji::for_label(&r.label));
        let value = json!({
            "outcome": outcome,
            "emoji": emoji,
            "top": ranked,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    log_outcome("", &outcome);
    for (rank, (label, score)) in ranked.unwrap_or_default().iter().enumerate() {
        info!("  {}. {} {:.1}%", rank + 1, label, score * 100.0);
    }
    Ok(())
}

fn batch(cfg: &config::Config, paths: &[PathBuf], json: bool) -> Result<()> {
    let pipeline = startup::build_pipeline(cfg)?;

    // Undecodable files become failed items rather than aborting the run.
    let mut decoded = Vec::with_capacity(paths.len());
    let mut images = Vec::new();
    for path in paths {
        match decode::from_path(path) {
            Ok(img) => {
                decoded.push(Ok(images.len()));
                images.push(img);
            }
            Err(e) => decoded.push(Err(e)),
        }
    }

    let report = pipeline.detect_batch(&images);
    let mut results = report.items.into_iter();
    let mut successful = 0;
    let mut entries = Vec::with_capacity(paths.len());

    for (path, slot) in paths.iter().zip(decoded) {
        let item = match slot {
            Ok(_) => results
                .next()
                .context("Batch report is shorter than its input")?,
            Err(e) => Err(e),
        };
        let name = path.display().to_string();
        match item {
            Ok(outcome) => {
                if outcome.is_detected() {
                    successful += 1;
                }
                if !json {
                    log_outcome(&format!("{name}: "), &outcome);
                }
                entries.push(json!({ "image": name, "outcome": outcome }));
            }
            Err(e) => {
                if !json {
                    warn!("{}: {}", name, e);
                }
                entries.push(json!({ "image": name, "error": e.to_string() }));
            }
        }
    }

    if json {
        let value = json!({
            "results": entries,
            "total_processed": paths.len(),
            "successful": successful,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        info!("{}/{} image(s) classified", successful, paths.len());
    }
    Ok(())
}

fn live(cfg: &config::Config, frames: Option<usize>, json: bool) -> Result<()> {
    let pipeline = startup::build_pipeline(cfg)?;

    info!("Opening camera: {}", cfg.camera);
    let mut camera = Camera::open(&cfg.camera).context("Failed to open camera")?;
    let (width, height) = camera.dimensions();
    info!("Camera opened at {}x{}. Press Ctrl+C to stop.", width, height);

    let stream_id = uuid::Uuid::new_v4().to_string();
    let result = run_stream(&pipeline, &mut camera, &stream_id, frames, json);
    pipeline.end_stream(&stream_id);
    result
}

fn run_stream(
    pipeline: &Pipeline,
    camera: &mut Camera,
    stream_id: &str,
    frames: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut count = 0;
    while frames.map_or(true, |limit| count < limit) {
        count += 1;
        let frame = camera.frame().context("Failed to capture frame")?;

        match pipeline.detect_frame(&frame, stream_id) {
            Ok(outcome) if json => {
                let value = json!({ "frame": count, "stream": stream_id, "outcome": outcome });
                println!("{}", serde_json::to_string(&value)?);
            }
            Ok(outcome) => log_outcome(&format!("Frame {}: ", count), &outcome),
            Err(e) => warn!("Frame {}: {}", count, e),
        }
    }
    Ok(())
}

fn show_info(cfg: &config::Config) -> Result<()> {
    let runtime = startup::load_runtime(cfg)?;
    let info = runtime.describe();
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
