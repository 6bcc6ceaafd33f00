use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use frame_batcher::{io::save_batch, Compositor, JobConfig};

#[derive(Parser)]
#[command(
    name = "frame-batcher",
    version,
    about = "Compose up to six image sources into a fixed-length frame batch",
    long_about = "Frame-Batcher places single images (repeated) and image batches (taken in order) at chosen frame positions, resizes everything to the first source's geometry, and writes the resulting frame sequence plus a mask sequence as PNG files."
)]
struct Cli {
    /// Job file (TOML) describing max_frames and the sources
    #[arg(short, long)]
    job: PathBuf,

    /// Output directory (overrides the job file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output length (overrides the job file)
    #[arg(short, long)]
    max_frames: Option<usize>,

    /// Normalize sources on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Frame-Batcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Job: {:?}", cli.job);

    let mut job = JobConfig::from_file(&cli.job).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    if let Some(output) = cli.output {
        job.output.directory = output;
    }
    if let Some(max_frames) = cli.max_frames {
        job.max_frames = max_frames;
    }
    if cli.sequential {
        job.processing.parallel = false;
    }
    job.validate().map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let sources = job
        .load_sources()
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to load sources")?;
    info!("Loaded {} of 6 sources", sources.bound_count());

    let compositor =
        Compositor::new(job.batch_options()).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let composition = compositor.compose(job.max_frames, &sources);

    for summary in &composition.summaries {
        if summary.slots.is_empty() {
            warn!(
                "Source {} ({}) placed no frames",
                summary.source, summary.regime
            );
            continue;
        }
        info!(
            "Source {} ({}): slots {}..={}{}",
            summary.source,
            summary.regime,
            summary.slots[0] + 1,
            summary.slots[summary.slots.len() - 1] + 1,
            if summary.truncated { " (truncated)" } else { "" }
        );
    }

    if composition.output.is_empty() {
        warn!("No sources bound; nothing to write");
        return Ok(());
    }

    let out_dir = &job.output.directory;
    let frames = save_batch(&composition.output, out_dir.join("frames"), &job.output.frame_prefix)?;
    let masks = save_batch(&composition.masks, out_dir.join("masks"), &job.output.mask_prefix)?;

    info!(
        "Wrote {} frames and {} masks to {:?}",
        frames.len(),
        masks.len(),
        out_dir
    );
    Ok(())
}
