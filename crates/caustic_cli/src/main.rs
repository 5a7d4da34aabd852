//! Command-line renderer for the glass pedestal scene.

mod obj;
mod progress;
mod scene;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use caustic_renderer::{render_into, CameraConfig, CancelToken, FrameBuffer, RenderStats};
use clap::Parser;

use crate::progress::{spawn_preview_writer, CliObserver};

#[derive(Parser, Debug)]
#[command(name = "caustic", version, about = "Spectral path tracer for dispersive glass")]
struct Args {
    /// Output PNG path
    #[arg(short, long, default_value = "caustic.png")]
    output: PathBuf,

    /// Camera configuration JSON; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OBJ mesh to place on the pedestal instead of the default cube
    #[arg(short, long)]
    mesh: Option<PathBuf>,

    /// Uniform scale applied to the mesh
    #[arg(long, default_value_t = 1.0)]
    mesh_scale: f32,

    #[arg(short = 'W', long)]
    width: Option<u32>,

    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Rays per sample
    #[arg(long)]
    rays: Option<u32>,

    /// Wavelength bins per ray
    #[arg(long)]
    spectral_samples: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds, keeping what has been rendered
    #[arg(short, long)]
    time_limit: Option<f64>,

    #[arg(short, long, default_value_t = 1.0)]
    exposure: f32,

    /// Periodically write the in-progress image here
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Disable the progress bar and previews
    #[arg(long)]
    no_progress: bool,

    /// Number of progressive passes
    #[arg(short, long, default_value_t = 1)]
    passes: u32,
}

/// Settings that give a reasonable first look at the pedestal scene.
fn demo_config() -> CameraConfig {
    CameraConfig::default()
        .with_field_of_view(40.0)
        .with_resolution(1024, 1024)
        .with_depth(3, 500, 0.01)
        .with_sampling(250, 10, 2)
        .with_progress(true, 15.0)
}

fn load_config(args: &Args) -> Result<CameraConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse camera config {}", path.display()))?
        }
        None => demo_config(),
    };

    let (width, height) = config.pixel_resolution;
    config.pixel_resolution = (args.width.unwrap_or(width), args.height.unwrap_or(height));
    if let Some(samples) = args.samples {
        config.pixel_samples = samples;
    }
    if let Some(rays) = args.rays {
        config.rays = rays;
    }
    if let Some(bins) = args.spectral_samples {
        config.spectral_samples = bins;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.no_progress {
        config.display_progress = false;
    }

    config.validate().context("invalid camera configuration")?;
    Ok(config)
}

fn report(stats: &RenderStats) {
    let paths = &stats.paths;
    log::info!(
        "{} paths: {} escaped, {} absorbed, {} roulette, {} culled, {} hit max depth (deepest {})",
        paths.paths,
        paths.escaped,
        paths.absorbed,
        paths.roulette_killed,
        paths.importance_culled,
        paths.max_depth_reached,
        paths.max_depth_seen
    );
    if stats.faulted_samples > 0 {
        log::warn!("{} samples faulted and were counted as black", stats.faulted_samples);
    }
    if stats.geometry_faults > 0 {
        log::warn!("{} ray/solid intersections failed", stats.geometry_faults);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    if args.passes == 0 {
        anyhow::bail!("--passes must be at least 1");
    }

    let gem = args
        .mesh
        .as_ref()
        .map(|path| obj::load_obj(path, args.mesh_scale))
        .transpose()?;
    let (scene, camera) = scene::pedestal_scene(gem)?;

    let cancel = CancelToken::new();
    if let Some(seconds) = args.time_limit {
        let limit = Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("invalid time limit {}", seconds))?;
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(limit);
            log::info!("Time limit reached, stopping");
            cancel.cancel();
        });
    }

    let preview = match (&args.preview, config.display_progress) {
        (Some(path), true) => Some(spawn_preview_writer(path.clone())),
        _ => None,
    };
    let mut observer = CliObserver::new(
        !config.display_progress,
        preview.as_ref().map(|(tx, _)| tx.clone()),
        args.exposure,
    );

    let mut frame = FrameBuffer::for_config(&config);
    for pass in 0..args.passes {
        let stats = render_into(&scene, &camera, &config, &mut frame, &observer, &cancel)
            .with_context(|| format!("render pass {} failed", pass))?;
        report(&stats);
        if !stats.completed {
            break;
        }
    }

    observer.close();
    if let Some((tx, handle)) = preview {
        drop(tx);
        if handle.join().is_err() {
            log::warn!("Preview writer thread panicked");
        }
    }

    let (width, height) = config.pixel_resolution;
    let image = image::RgbaImage::from_raw(width, height, frame.to_rgba8(args.exposure))
        .context("frame buffer does not match its resolution")?;
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("Saved {} after {} passes", args.output.display(), frame.passes());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_demo_settings() {
        let args = Args::parse_from(["caustic", "-W", "64", "--samples", "3", "--seed", "7", "--no-progress"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.pixel_resolution, (64, 1024));
        assert_eq!(config.pixel_samples, 3);
        assert_eq!(config.seed, 7);
        assert!(!config.display_progress);
        assert_eq!(config.ray_max_depth, 500);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let args = Args::parse_from(["caustic", "--spectral-samples", "0"]);
        assert!(load_config(&args).is_err());
    }
}
