//! Single-wavelength path integration.
//!
//! Sub-paths spawned at dielectric interfaces are kept on an explicit work
//! stack instead of recursing, so stack usage does not grow with path depth.
//! Every sub-path carries its own weight, depth and medium stack, and the
//! radiance of all of them is summed into one estimate.

use rand::Rng;

use crate::config::CameraConfig;
use crate::material::{Branch, SurfaceResponse};
use crate::scene::{Hit, PrimitiveId, World};
use caustic_math::{Ray, Vec3};

/// How paths ended, accumulated over any number of traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStats {
    /// Path evaluations started
    pub paths: u64,
    /// Sub-paths that left the scene
    pub escaped: u64,
    /// Sub-paths that ended on an absorbing surface
    pub absorbed: u64,
    pub roulette_killed: u64,
    /// Sub-paths culled by the importance threshold
    pub importance_culled: u64,
    pub max_depth_reached: u64,
    /// Deepest sub-path actually traced
    pub max_depth_seen: u32,
}

impl PathStats {
    pub fn merge(&mut self, other: &PathStats) {
        self.paths += other.paths;
        self.escaped += other.escaped;
        self.absorbed += other.absorbed;
        self.roulette_killed += other.roulette_killed;
        self.importance_culled += other.importance_culled;
        self.max_depth_reached += other.max_depth_reached;
        self.max_depth_seen = self.max_depth_seen.max(other.max_depth_seen);
    }
}

/// Terminate with probability `p`, otherwise return the weight divided by
/// `1 - p` so the expected weight is unchanged.
pub fn russian_roulette<R: Rng + ?Sized>(weight: f32, p: f32, rng: &mut R) -> Option<f32> {
    if p <= 0.0 {
        return Some(weight);
    }
    if rng.gen::<f32>() < p {
        None
    } else {
        Some(weight / (1.0 - p))
    }
}

/// Below `threshold`, survive with probability `weight / threshold` at
/// weight `threshold`. A zero threshold never culls.
pub fn importance_roulette<R: Rng + ?Sized>(weight: f32, threshold: f32, rng: &mut R) -> Option<f32> {
    if threshold <= 0.0 || weight >= threshold {
        return Some(weight);
    }
    if rng.gen::<f32>() * threshold < weight {
        Some(threshold)
    } else {
        None
    }
}

struct PathTask {
    ray: Ray,
    weight: f32,
    depth: u32,
    media: Vec<PrimitiveId>,
}

/// Integrates radiance along rays through a prepared [`World`].
pub struct PathTracer<'a> {
    world: &'a World<'a>,
    min_depth: u32,
    max_depth: u32,
    extinction_prob: f32,
    importance_threshold: f32,
    epsilon: f32,
}

impl<'a> PathTracer<'a> {
    pub fn new(world: &'a World<'a>, config: &CameraConfig) -> Self {
        Self {
            world,
            min_depth: config.ray_min_depth,
            max_depth: config.ray_max_depth,
            extinction_prob: config.ray_extinction_prob,
            importance_threshold: config.importance_threshold,
            epsilon: config.degeneracy_epsilon,
        }
    }

    /// Radiance arriving along `ray` at `wavelength` nm.
    ///
    /// `media` lists the primitives the ray origin lies inside.
    pub fn trace<R: Rng + ?Sized>(
        &self,
        ray: Ray,
        wavelength: f32,
        media: &[PrimitiveId],
        rng: &mut R,
        stats: &mut PathStats,
    ) -> f32 {
        stats.paths += 1;
        let mut radiance = 0.0;
        let mut stack = vec![PathTask {
            ray: ray.normalized(),
            weight: 1.0,
            depth: 0,
            media: media.to_vec(),
        }];

        while let Some(mut task) = stack.pop() {
            stats.max_depth_seen = stats.max_depth_seen.max(task.depth);

            if task.depth >= self.min_depth {
                match russian_roulette(task.weight, self.extinction_prob, rng) {
                    Some(weight) => task.weight = weight,
                    None => {
                        stats.roulette_killed += 1;
                        continue;
                    }
                }
            }
            match importance_roulette(task.weight, self.importance_threshold, rng) {
                Some(weight) => task.weight = weight,
                None => {
                    stats.importance_culled += 1;
                    continue;
                }
            }

            let Some(hit) = self.world.nearest_hit(&task.ray) else {
                stats.escaped += 1;
                continue;
            };

            radiance += self.traverse_media(&mut task, hit.t, wavelength);

            let Some(material) = self.world.material(hit.primitive) else {
                stats.escaped += 1;
                continue;
            };
            let response = material.scatter(task.ray.direction, hit.normal, hit.exiting, wavelength);
            if response == SurfaceResponse::Absorb {
                stats.absorbed += 1;
                continue;
            }

            let depth = task.depth + 1;
            if depth > self.max_depth {
                stats.max_depth_reached += 1;
                continue;
            }

            match response {
                SurfaceResponse::Absorb => {}
                SurfaceResponse::PassThrough => {
                    let pass = Branch::new(task.ray.direction, 1.0, true);
                    stack.push(self.spawn(&task, &hit, pass, depth));
                }
                SurfaceResponse::Split {
                    reflected,
                    transmitted,
                } => {
                    for branch in [Some(reflected), transmitted].into_iter().flatten() {
                        if branch.weight > 0.0 {
                            stack.push(self.spawn(&task, &hit, branch, depth));
                        }
                    }
                }
            }
        }
        radiance
    }

    /// Emission and attenuation of every medium the segment runs through.
    fn traverse_media(&self, task: &mut PathTask, length: f32, wavelength: f32) -> f32 {
        let mut added = 0.0;
        for &id in &task.media {
            if let Some(material) = self.world.material(id) {
                added += task.weight * material.emission(wavelength, length);
                task.weight *= material.attenuation(wavelength, length);
            }
        }
        added
    }

    fn spawn(&self, parent: &PathTask, hit: &Hit, branch: Branch, depth: u32) -> PathTask {
        let mut media = parent.media.clone();
        if branch.crosses {
            if hit.exiting {
                if let Some(pos) = media.iter().rposition(|&id| id == hit.primitive) {
                    media.remove(pos);
                }
            } else {
                media.push(hit.primitive);
            }
        }

        PathTask {
            ray: Ray::new(
                offset_origin(hit.point, hit.normal, branch.direction, self.epsilon),
                branch.direction,
            ),
            weight: parent.weight * branch.weight,
            depth,
            media,
        }
    }
}

/// Nudge a surface point off the surface on the side `direction` leaves
/// towards.
fn offset_origin(point: Vec3, normal: Vec3, direction: Vec3, epsilon: f32) -> Vec3 {
    if direction.dot(normal) >= 0.0 {
        point + normal * epsilon
    } else {
        point - normal * epsilon
    }
}
