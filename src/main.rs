use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dwt_watermark::trace::TracingObserver;
use dwt_watermark::{
    colorspace, diagnostics, embed_image_with, extract_image_with, load_image, WatermarkConfig,
    WatermarkEngine, WatermarkError,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dwt_watermark", about = "Hide and recover text in image luminance")]
struct Args {
    /// QIM step, must match between embed and extract
    #[arg(long, global = true, default_value_t = dwt_watermark::qim::DEFAULT_DELTA)]
    delta: f64,
    /// Emit per-pass and per-tile trace events
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed a message and save the watermarked image
    Embed {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, short)]
        message: String,
    },
    /// Recover the message from a watermarked image
    Extract { input: PathBuf },
    /// Compare every tile against an expected message
    Inspect {
        input: PathBuf,
        #[arg(long, short)]
        message: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if !(args.delta > 0.0 && args.delta.is_finite()) {
        bail!("--delta must be a positive number, got {}", args.delta);
    }
    let mut engine = WatermarkEngine::with_config(WatermarkConfig { delta: args.delta });
    if args.verbose {
        engine = engine.with_observer(Arc::new(TracingObserver));
    }

    match args.command {
        Command::Embed {
            input,
            output,
            message,
        } => {
            let image = load_image(&input).with_context(|| format!("reading {}", input.display()))?;
            let marked = embed_image_with(&engine, &image, &message)?;
            marked
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("watermarked image saved to {}", output.display());
        }
        Command::Extract { input } => {
            let image = load_image(&input).with_context(|| format!("reading {}", input.display()))?;
            match extract_image_with(&engine, &image) {
                Ok(consensus) => {
                    info!(
                        "{}/{} tiles agree ({} of {} tiles held a message)",
                        consensus.votes, consensus.found, consensus.found, consensus.tiles
                    );
                    if args.verbose {
                        for index in &consensus.voters {
                            println!("tile {index}: {}", consensus.message);
                        }
                    }
                    println!("{}", consensus.message);
                }
                Err(WatermarkError::NotFound { tiles }) => {
                    bail!("no watermark found in {} ({tiles} tiles scanned)", input.display())
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Inspect { input, message } => {
            let image = load_image(&input).with_context(|| format!("reading {}", input.display()))?;
            let planes = colorspace::split_luma(&image)?;
            let report = diagnostics::inspect(&engine, &planes.luma, &message)?;

            let matching = report.iter().filter(|t| t.matches(&message)).count();
            for tile in &report {
                println!(
                    "tile {}: {}/{} bits ({:.2}%), {}",
                    tile.index,
                    tile.accuracy.matched,
                    tile.accuracy.compared,
                    tile.accuracy.ratio() * 100.0,
                    match &tile.message {
                        Some(found) => format!("message {found:?}"),
                        None => "no valid message".to_string(),
                    }
                );
            }
            println!("{matching}/{} tiles carry {message:?}", report.len());
        }
    }

    Ok(())
}
