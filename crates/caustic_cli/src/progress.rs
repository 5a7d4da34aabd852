//! Terminal progress and preview snapshots.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use caustic_renderer::{FrameBuffer, Progress, RenderObserver, RenderStats};
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};

/// An 8-bit snapshot of the frame.
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Preview {
    pub fn from_frame(frame: &FrameBuffer, exposure: f32) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            rgba: frame.to_rgba8(exposure),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .context("preview buffer does not match its dimensions")?;
        image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Drives a progress bar and hands snapshots to the preview writer.
pub struct CliObserver {
    bar: ProgressBar,
    previews: Option<Sender<Preview>>,
    exposure: f32,
}

impl CliObserver {
    pub fn new(hidden: bool, previews: Option<Sender<Preview>>, exposure: f32) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(1);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} buckets {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            bar,
            previews,
            exposure,
        }
    }

    /// Finish the bar after the last pass and drop the preview sender so
    /// the writer thread can finish.
    pub fn close(&mut self) {
        self.bar.finish();
        self.previews = None;
    }
}

impl RenderObserver for CliObserver {
    fn on_progress(&self, progress: &Progress, frame: &FrameBuffer) {
        self.bar.set_length(progress.buckets_total as u64);
        self.bar.set_position(progress.buckets_done as u64);
        self.bar.set_message(format!("pass {}", progress.pass + 1));

        if let Some(previews) = &self.previews {
            // a busy writer just misses this snapshot
            let _ = previews.try_send(Preview::from_frame(frame, self.exposure));
        }
    }

    // Called once per pass; the bar stays live for the next one.
    fn on_finished(&self, stats: &RenderStats, _frame: &FrameBuffer) {
        self.bar.set_length(stats.buckets_total as u64);
        self.bar.set_position(stats.buckets_completed as u64);
        let state = if stats.completed { "done" } else { "cancelled" };
        self.bar.set_message(format!("{} in {:.1?}", state, stats.elapsed));
    }
}

/// Start a thread writing each received preview to `path`.
pub fn spawn_preview_writer(path: PathBuf) -> (Sender<Preview>, JoinHandle<()>) {
    let (tx, rx): (Sender<Preview>, Receiver<Preview>) = bounded(1);
    let handle = thread::spawn(move || {
        for preview in rx {
            match preview.save(&path) {
                Ok(()) => log::debug!("Wrote preview {}", path.display()),
                Err(err) => log::warn!("{:#}", err),
            }
        }
    });
    (tx, handle)
}
