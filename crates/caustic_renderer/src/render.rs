//! Parallel render loop.
//!
//! Buckets are traced on the rayon pool and merged into the frame buffer
//! under a lock as they finish. Every pixel draws from its own generator
//! seeded by (seed, pass, pixel), so the result does not depend on how
//! buckets are scheduled.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::bucket::{generate_buckets, Bucket};
use crate::camera::{sub_pixel_offset, PinholeCamera, Projection};
use crate::config::CameraConfig;
use crate::frame::FrameBuffer;
use crate::scene::{PrimitiveId, Scene};
use crate::spectrum::Spectrum;
use crate::tracer::{PathStats, PathTracer};
use crate::RenderResult;

/// Shared flag for stopping a render from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Where a render is at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub buckets_done: usize,
    pub buckets_total: usize,
    /// Index of the pass being rendered
    pub pass: u32,
    pub elapsed: Duration,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.buckets_total == 0 {
            return 1.0;
        }
        self.buckets_done as f32 / self.buckets_total as f32
    }
}

/// Receives snapshots while a render runs.
///
/// `on_progress` is called from worker threads with a copy of the frame, at
/// most once per `display_update_interval`, and only when
/// `display_progress` is set. Implementations should return quickly.
pub trait RenderObserver: Sync {
    fn on_progress(&self, progress: &Progress, frame: &FrameBuffer);

    fn on_finished(&self, _stats: &RenderStats, _frame: &FrameBuffer) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RenderObserver for NullObserver {
    fn on_progress(&self, _progress: &Progress, _frame: &FrameBuffer) {}
}

/// Counters gathered over one render call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub paths: PathStats,
    /// Samples that panicked or produced non-finite radiance
    pub faulted_samples: u64,
    /// Intersection queries skipped on malformed geometry
    pub geometry_faults: u64,
    pub buckets_completed: usize,
    pub buckets_total: usize,
    pub elapsed: Duration,
    /// False when the render was cancelled before every bucket finished
    pub completed: bool,
}

/// A finished (or cancelled) render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub frame: FrameBuffer,
    pub stats: RenderStats,
}

impl RenderOutcome {
    pub fn completed(&self) -> bool {
        self.stats.completed
    }
}

/// Render `scene` through `camera` into a new frame buffer.
///
/// Blocks until every bucket is done or `cancel` is triggered.
pub fn render(
    scene: &Scene,
    camera: &PinholeCamera,
    config: &CameraConfig,
    observer: &dyn RenderObserver,
    cancel: &CancelToken,
) -> RenderResult<RenderOutcome> {
    config.validate()?;
    let mut frame = FrameBuffer::for_config(config);
    let stats = render_into(scene, camera, config, &mut frame, observer, cancel)?;
    Ok(RenderOutcome { frame, stats })
}

/// Render one more pass into an existing frame buffer.
///
/// The frame must match the configuration's resolution and spectral
/// binning; its existing samples are kept and the new ones averaged in.
pub fn render_into(
    scene: &Scene,
    camera: &PinholeCamera,
    config: &CameraConfig,
    frame: &mut FrameBuffer,
    observer: &dyn RenderObserver,
    cancel: &CancelToken,
) -> RenderResult<RenderStats> {
    config.validate()?;
    frame.check_compatible(config)?;

    let world = scene.prepare(config.degeneracy_epsilon)?;
    let projection = camera.projection(scene.graph(), config)?;
    let media = world.containing(projection.origin());
    let tracer = PathTracer::new(&world, config);

    let (width, height) = config.pixel_resolution;
    let buckets = generate_buckets(width, height, config.bucket_size);
    let pass = frame.passes();
    let context = PassContext {
        tracer: &tracer,
        projection: &projection,
        media: &media,
        config,
        pass,
    };

    log::info!(
        "Rendering {}x{} pass {}: {} samples x {} rays x {} bins, {} buckets",
        width,
        height,
        pass,
        config.pixel_samples,
        config.rays,
        config.spectral_samples,
        buckets.len()
    );

    let start = Instant::now();
    let shared = Mutex::new(SharedState {
        frame,
        paths: PathStats::default(),
        faulted_samples: 0,
        buckets_done: 0,
        last_update: start,
    });

    buckets.par_iter().for_each(|bucket| {
        if cancel.is_cancelled() {
            return;
        }
        let result = context.render_bucket(bucket);

        let mut state = lock(&shared);
        for (x, y, sum) in &result.pixels {
            if let Err(err) = state.frame.accumulate(*x, *y, sum, result.samples_per_pixel) {
                log::error!("Dropping pixel ({}, {}): {}", x, y, err);
            }
        }
        state.paths.merge(&result.stats);
        state.faulted_samples += result.faulted;
        state.buckets_done += 1;
        log::debug!("Bucket {} done ({}/{})", bucket.index, state.buckets_done, buckets.len());

        if config.display_progress && state.last_update.elapsed() >= config.update_interval() {
            state.last_update = Instant::now();
            let progress = Progress {
                buckets_done: state.buckets_done,
                buckets_total: buckets.len(),
                pass,
                elapsed: start.elapsed(),
            };
            let snapshot = state.frame.clone();
            drop(state);
            observer.on_progress(&progress, &snapshot);
        }
    });

    let mut state = shared.into_inner().unwrap_or_else(|e| e.into_inner());
    let completed = state.buckets_done == buckets.len();
    let stats = RenderStats {
        paths: state.paths,
        faulted_samples: state.faulted_samples,
        geometry_faults: world.geometry_faults(),
        buckets_completed: state.buckets_done,
        buckets_total: buckets.len(),
        elapsed: start.elapsed(),
        completed,
    };
    state.frame.finish_pass();

    if stats.faulted_samples > 0 {
        log::error!("{} samples faulted and were counted as black", stats.faulted_samples);
    }
    log::info!(
        "Render {} in {:.2?}: {}/{} buckets, {} paths",
        if completed { "finished" } else { "cancelled" },
        stats.elapsed,
        stats.buckets_completed,
        stats.buckets_total,
        stats.paths.paths
    );

    observer.on_finished(&stats, state.frame);
    Ok(stats)
}

struct SharedState<'f> {
    frame: &'f mut FrameBuffer,
    paths: PathStats,
    faulted_samples: u64,
    buckets_done: usize,
    last_update: Instant,
}

/// A poisoned lock only means another bucket panicked outside sample
/// isolation; the frame itself is still consistent.
fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct BucketResult {
    pixels: Vec<(u32, u32, Spectrum)>,
    samples_per_pixel: u64,
    stats: PathStats,
    faulted: u64,
}

/// Everything a worker needs for one pass.
struct PassContext<'a> {
    tracer: &'a PathTracer<'a>,
    projection: &'a Projection,
    media: &'a [PrimitiveId],
    config: &'a CameraConfig,
    pass: u32,
}

impl PassContext<'_> {
    fn render_bucket(&self, bucket: &Bucket) -> BucketResult {
        let config = self.config;
        let bins = config.bins();
        let mut stats = PathStats::default();
        let mut faulted = 0;
        let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);

        for (x, y) in bucket.pixels() {
            let pixel = y as u64 * config.pixel_resolution.0 as u64 + x as u64;
            let mut rng = StdRng::seed_from_u64(pixel_seed(config.seed, self.pass, pixel));
            let mut sum = Spectrum::zeros(bins);

            for sample in 0..config.pixel_samples {
                let offset = sub_pixel_offset(sample, config.pixel_samples, config.sub_sample, &mut rng);
                let ray = self.projection.primary_ray(x, y, offset);

                for _ in 0..config.rays {
                    let estimate = catch_unwind(AssertUnwindSafe(|| {
                        (0..bins.count)
                            .map(|bin| {
                                let wavelength = bins.sample(bin, &mut rng);
                                self.tracer.trace(ray, wavelength, self.media, &mut rng, &mut stats)
                            })
                            .collect::<Vec<f32>>()
                    }));

                    match estimate {
                        Ok(values) if values.iter().all(|v| v.is_finite()) => {
                            for (acc, v) in sum.values_mut().iter_mut().zip(values) {
                                *acc += v;
                            }
                        }
                        Ok(_) => {
                            log::debug!("Non-finite radiance at pixel ({}, {})", x, y);
                            faulted += 1;
                        }
                        Err(_) => {
                            log::error!("Sample panicked at pixel ({}, {})", x, y);
                            faulted += 1;
                        }
                    }
                }
            }
            pixels.push((x, y, sum));
        }

        BucketResult {
            pixels,
            samples_per_pixel: config.pixel_samples as u64 * config.rays as u64,
            stats,
            faulted,
        }
    }
}

/// SplitMix64 finaliser.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn pixel_seed(seed: u64, pass: u32, pixel: u64) -> u64 {
    mix(mix(seed) ^ mix(((pass as u64) << 40) ^ pixel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Dielectric, Material, UniformVolumeEmitter};
    use crate::solid::Solid;
    use crate::span::CsgOp;
    use crate::RenderError;
    use caustic_core::SceneGraph;
    use caustic_math::{translate, Transform, Vec3};
    use std::sync::atomic::AtomicUsize;

    fn cube(half: f32) -> Solid {
        Solid::cuboid(Vec3::splat(-half), Vec3::splat(half))
    }

    /// Absorbing shell around the origin, optionally filled with an emitter.
    fn sealed_box(emission_scale: Option<f32>) -> (Scene, PinholeCamera) {
        let mut scene = Scene::new();
        let root = SceneGraph::ROOT;
        let outer = scene
            .create_primitive("outer", cube(1.0), Material::AbsorbingSurface, root, Transform::IDENTITY)
            .unwrap();
        let inner = scene
            .create_primitive("inner", cube(0.9), Material::AbsorbingSurface, root, Transform::IDENTITY)
            .unwrap();
        scene
            .combine("enclosure", CsgOp::Subtract, outer, inner, Material::AbsorbingSurface, root, Transform::IDENTITY)
            .unwrap();
        if let Some(scale) = emission_scale {
            let light = UniformVolumeEmitter::new(1.0_f32, scale);
            scene
                .create_primitive("light", cube(0.89), Material::from(light), root, Transform::IDENTITY)
                .unwrap();
        }
        let node = scene.create_node(root, Transform::IDENTITY).unwrap();
        (scene, PinholeCamera::new(node))
    }

    fn small_config() -> CameraConfig {
        CameraConfig::default()
            .with_resolution(6, 4)
            .with_sampling(2, 2, 3)
            .with_bucket_size(4)
            .with_progress(false, 0.0)
    }

    fn frame_values(frame: &FrameBuffer) -> Vec<f32> {
        (0..frame.height())
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .filter_map(|(x, y)| frame.mean_radiance(x, y))
            .collect()
    }

    #[test]
    fn test_absorbing_box_renders_black() {
        let (scene, camera) = sealed_box(None);
        let outcome = render(&scene, &camera, &small_config(), &NullObserver, &CancelToken::new()).unwrap();

        assert!(outcome.completed());
        assert!(frame_values(&outcome.frame).iter().all(|&v| v == 0.0));
        assert!(outcome.frame.to_rgba8(1.0).chunks(4).all(|p| p == [0, 0, 0, 255]));
        assert_eq!(outcome.stats.paths.escaped, 0);
        assert!(outcome.stats.paths.absorbed > 0);
    }

    #[test]
    fn test_emitter_radiance_matches_path_length() {
        let (scene, camera) = sealed_box(Some(2.0));
        let config = small_config().with_field_of_view(1.0);
        let outcome = render(&scene, &camera, &config, &NullObserver, &CancelToken::new()).unwrap();

        // camera at the centre sees 0.89 units of emitter before the wall
        let expected = 2.0 * 0.89;
        for v in frame_values(&outcome.frame) {
            assert!((v - expected).abs() < 1e-3 * expected, "radiance {} vs {}", v, expected);
        }

        let (scene, camera) = sealed_box(Some(4.0));
        let brighter = render(&scene, &camera, &config, &NullObserver, &CancelToken::new()).unwrap();
        let ratio = brighter.frame.mean_radiance(0, 0).unwrap() / outcome.frame.mean_radiance(0, 0).unwrap();
        assert!((ratio - 2.0).abs() < 1e-4);
    }

    fn glass_scene() -> (Scene, PinholeCamera) {
        let (mut scene, _) = sealed_box(Some(1.0));
        let glass = Dielectric::new(caustic_core::schott("N-BK7").unwrap());
        scene
            .create_primitive(
                "glass",
                Solid::cuboid(Vec3::new(-0.3, -0.3, 0.2), Vec3::new(0.3, 0.3, 0.4)),
                Material::from(glass),
                SceneGraph::ROOT,
                Transform::IDENTITY,
            )
            .unwrap();
        let node = scene.create_node(SceneGraph::ROOT, translate(0.0, 0.0, -0.5)).unwrap();
        (scene, PinholeCamera::new(node))
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let (scene, camera) = glass_scene();
        let config = small_config().with_depth(1, 20, 0.3).with_seed(9);

        let run = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| render(&scene, &camera, &config, &NullObserver, &CancelToken::new()).unwrap())
        };
        let a = run(2);
        let b = run(2);
        assert_eq!(a.frame, b.frame);
        assert_eq!(a.stats.paths, b.stats.paths);

        // scheduling does not matter either
        assert_eq!(run(1).frame, a.frame);

        let other = render(&scene, &camera, &config.clone().with_seed(10), &NullObserver, &CancelToken::new()).unwrap();
        assert_ne!(other.frame, a.frame);
    }

    #[test]
    fn test_invalid_config_fails_before_rendering() {
        let (scene, camera) = sealed_box(None);
        let config = small_config().with_depth(3, 100, 1.0);
        let result = render(&scene, &camera, &config, &NullObserver, &CancelToken::new());
        assert!(matches!(result, Err(RenderError::Config(_))));

        let config = small_config().with_progress(true, 1e20);
        let result = render(&scene, &camera, &config, &NullObserver, &CancelToken::new());
        assert!(matches!(result, Err(RenderError::Config(_))));
    }

    #[test]
    fn test_cancelled_render_leaves_valid_frame() {
        let (scene, camera) = sealed_box(Some(1.0));
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = render(&scene, &camera, &small_config(), &NullObserver, &cancel).unwrap();

        assert!(!outcome.completed());
        assert_eq!(outcome.stats.buckets_completed, 0);
        assert_eq!(outcome.frame.width(), 6);
        assert!(frame_values(&outcome.frame).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_progressive_passes_accumulate() {
        let (scene, camera) = sealed_box(Some(1.0));
        let config = small_config();
        let mut frame = FrameBuffer::for_config(&config);

        render_into(&scene, &camera, &config, &mut frame, &NullObserver, &CancelToken::new()).unwrap();
        render_into(&scene, &camera, &config, &mut frame, &NullObserver, &CancelToken::new()).unwrap();
        assert_eq!(frame.passes(), 2);
        assert_eq!(frame.sample_count(0, 0), Some(8));

        let mut wrong = FrameBuffer::for_config(&config.clone().with_resolution(3, 3));
        let result = render_into(&scene, &camera, &config, &mut wrong, &NullObserver, &CancelToken::new());
        assert!(matches!(result, Err(RenderError::Config(_))));
    }

    struct CountingObserver {
        progress: AtomicUsize,
        finished: AtomicUsize,
    }

    impl RenderObserver for CountingObserver {
        fn on_progress(&self, progress: &Progress, frame: &FrameBuffer) {
            assert!(progress.fraction() > 0.0 && progress.fraction() <= 1.0);
            assert_eq!(frame.width(), 6);
            self.progress.fetch_add(1, Ordering::SeqCst);
        }

        fn on_finished(&self, stats: &RenderStats, _frame: &FrameBuffer) {
            assert!(stats.completed);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observer_receives_snapshots() {
        let (scene, camera) = sealed_box(None);
        let observer = CountingObserver {
            progress: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        };

        let config = small_config().with_progress(true, 0.0);
        let outcome = render(&scene, &camera, &config, &observer, &CancelToken::new()).unwrap();
        assert_eq!(observer.progress.load(Ordering::SeqCst), outcome.stats.buckets_total);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 1);

        let config = small_config().with_progress(false, 0.0);
        render(&scene, &camera, &config, &observer, &CancelToken::new()).unwrap();
        assert_eq!(observer.progress.load(Ordering::SeqCst), outcome.stats.buckets_total);
    }

    #[test]
    fn test_non_finite_samples_are_isolated() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (scene, camera) = sealed_box(Some(f32::INFINITY));
        let outcome = render(&scene, &camera, &small_config(), &NullObserver, &CancelToken::new()).unwrap();

        assert!(outcome.completed());
        assert_eq!(outcome.stats.faulted_samples, 6 * 4 * 2 * 2);
        assert!(frame_values(&outcome.frame).iter().all(|&v| v == 0.0));
    }
}
