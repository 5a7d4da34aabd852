//! Scene construction and the frozen, render-time view of it.
//!
//! A [`Scene`] owns the node graph and the primitives attached to it. Before
//! rendering it is resolved into a [`World`]: every primitive's world
//! transform and bounds are computed once, and the world borrows the scene so
//! nothing can change while rays are in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use caustic_core::{NodeId, SceneError, SceneGraph, SceneResult};
use caustic_math::{Aabb, Interval, Ray, Transform, Vec3};

use crate::material::Material;
use crate::solid::Solid;
use crate::span::CsgOp;

/// Handle to a primitive in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(usize);

impl PrimitiveId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A solid placed at a scene node, with its material.
#[derive(Debug)]
pub struct Primitive {
    pub name: String,
    pub node: NodeId,
    pub solid: Solid,
    pub material: Arc<Material>,
}

/// Node graph plus the primitives hanging off it.
#[derive(Debug, Default)]
pub struct Scene {
    graph: SceneGraph,
    // Slots emptied by `combine` keep the remaining ids stable.
    primitives: Vec<Option<Primitive>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    /// Create an empty grouping node.
    pub fn create_node(&mut self, parent: NodeId, transform: Transform) -> SceneResult<NodeId> {
        self.graph.create_node(parent, transform)
    }

    /// Place `solid` on a new node under `parent`.
    pub fn create_primitive(
        &mut self,
        name: impl Into<String>,
        solid: Solid,
        material: impl Into<Arc<Material>>,
        parent: NodeId,
        transform: Transform,
    ) -> SceneResult<PrimitiveId> {
        let name = name.into();
        let node = self.graph.create_named_node(name.clone(), parent, transform)?;
        let id = PrimitiveId(self.primitives.len());
        self.primitives.push(Some(Primitive {
            name,
            node,
            solid,
            material: material.into(),
        }));
        Ok(id)
    }

    /// Replace two primitives by their boolean combination.
    ///
    /// The operands' nodes are re-parented under the new primitive's node
    /// and their placement is captured in the combined solid. `a` and `b`
    /// are consumed: their ids no longer resolve afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn combine(
        &mut self,
        name: impl Into<String>,
        op: CsgOp,
        a: PrimitiveId,
        b: PrimitiveId,
        material: impl Into<Arc<Material>>,
        parent: NodeId,
        transform: Transform,
    ) -> SceneResult<PrimitiveId> {
        if a == b {
            return Err(SceneError::UnknownPrimitive(b.0));
        }
        self.primitive(a)?;
        self.primitive(b)?;

        let name = name.into();
        let node = self.graph.create_named_node(name.clone(), parent, transform)?;
        let solid_a = self.adopt_operand(a, node)?;
        let solid_b = self.adopt_operand(b, node)?;

        let id = PrimitiveId(self.primitives.len());
        self.primitives.push(Some(Primitive {
            name,
            node,
            solid: Solid::csg(op, solid_a, solid_b),
            material: material.into(),
        }));
        Ok(id)
    }

    /// Take an operand out of the scene, re-parenting its node under `node`
    /// and folding its local placement into the solid.
    fn adopt_operand(&mut self, id: PrimitiveId, node: NodeId) -> SceneResult<Solid> {
        let primitive = self
            .primitives
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SceneError::UnknownPrimitive(id.0))?;

        let local = self.graph.node(primitive.node)?.local_transform();
        self.graph.add_child(node, primitive.node, local)?;
        let placement = local * primitive.solid.transform;
        Ok(primitive.solid.with_transform(placement))
    }

    pub fn primitive(&self, id: PrimitiveId) -> SceneResult<&Primitive> {
        self.primitives
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SceneError::UnknownPrimitive(id.0))
    }

    /// Live primitives in creation order.
    pub fn primitives(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.primitives
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (PrimitiveId(i), p)))
    }

    /// Resolve world placement of every primitive for rendering.
    pub fn prepare(&self, epsilon: f32) -> SceneResult<World<'_>> {
        let mut entries = Vec::new();
        for (id, primitive) in self.primitives() {
            let to_world = self.graph.world_transform(primitive.node)?;
            let bounds = to_world.transform_aabb(&primitive.solid.bounds());
            entries.push(WorldEntry {
                id,
                primitive,
                to_world,
                to_local: to_world.inverse(),
                bounds,
                warned: AtomicBool::new(false),
            });
        }
        log::debug!("prepared {} primitives", entries.len());

        Ok(World {
            entries,
            epsilon,
            geometry_faults: AtomicU64::new(0),
        })
    }
}

struct WorldEntry<'a> {
    id: PrimitiveId,
    primitive: &'a Primitive,
    to_world: Transform,
    to_local: Transform,
    bounds: Aabb,
    warned: AtomicBool,
}

/// Nearest surface crossing along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub primitive: PrimitiveId,
    /// Distance along the (unit) world ray.
    pub t: f32,
    pub point: Vec3,
    /// Unit outward normal in world space.
    pub normal: Vec3,
    /// True when the ray leaves the primitive here.
    pub exiting: bool,
}

/// Read-only, render-time view of a [`Scene`].
pub struct World<'a> {
    entries: Vec<WorldEntry<'a>>,
    epsilon: f32,
    geometry_faults: AtomicU64,
}

impl<'a> World<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Union of all primitive bounds.
    pub fn bounds(&self) -> Aabb {
        self.entries
            .iter()
            .fold(Aabb::EMPTY, |acc, e| Aabb::surrounding(&acc, &e.bounds))
    }

    /// Intersection queries that failed on malformed geometry.
    pub fn geometry_faults(&self) -> u64 {
        self.geometry_faults.load(Ordering::Relaxed)
    }

    fn entry(&self, id: PrimitiveId) -> Option<&WorldEntry<'a>> {
        // entries are in id order with gaps for consumed operands
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&'a Primitive> {
        self.entry(id).map(|e| e.primitive)
    }

    pub fn material(&self, id: PrimitiveId) -> Option<&'a Material> {
        self.primitive(id).map(|p| p.material.as_ref())
    }

    /// Nearest crossing of any primitive surface with `t > epsilon`.
    ///
    /// Entering and exiting crossings both count. Equal distances keep the
    /// primitive created first.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        let mut t_max = f32::INFINITY;

        for entry in &self.entries {
            if entry.bounds.hit(ray, Interval::new(0.0, t_max)).is_none() {
                continue;
            }

            let local_ray = entry.to_local.transform_ray(ray);
            let spans = match entry.primitive.solid.spans(&local_ray, self.epsilon) {
                Ok(spans) => spans,
                Err(err) => {
                    self.report_fault(entry, err);
                    continue;
                }
            };

            let crossings = spans
                .iter()
                .flat_map(|s| [(s.enter, false), (s.exit, true)]);
            for (crossing, exiting) in crossings {
                if crossing.t > self.epsilon && crossing.t < t_max {
                    t_max = crossing.t;
                    best = Some(Hit {
                        primitive: entry.id,
                        t: crossing.t,
                        point: ray.at(crossing.t),
                        normal: entry.to_world.transform_normal(crossing.normal),
                        exiting,
                    });
                    // later crossings of this primitive are further away
                    break;
                }
            }
        }
        best
    }

    /// Primitives whose solid contains `point`, in creation order.
    pub fn containing(&self, point: Vec3) -> Vec<PrimitiveId> {
        self.entries
            .iter()
            .filter(|e| e.bounds.contains(point))
            .filter(|e| e.primitive.solid.contains(e.to_local.transform_point(point)))
            .map(|e| e.id)
            .collect()
    }

    fn report_fault(&self, entry: &WorldEntry<'_>, err: crate::GeometryError) {
        self.geometry_faults.fetch_add(1, Ordering::Relaxed);
        if !entry.warned.swap(true, Ordering::Relaxed) {
            log::warn!("{}; treating as no intersection", err.for_primitive(&entry.primitive.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caustic_math::translate;

    fn unit_box() -> Solid {
        Solid::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    fn absorber() -> Arc<Material> {
        Arc::new(Material::AbsorbingSurface)
    }

    #[test]
    fn test_nearest_hit_uses_world_placement() {
        let mut scene = Scene::new();
        let group = scene.create_node(scene.root(), translate(0.0, 0.0, 5.0)).unwrap();
        let id = scene
            .create_primitive("box", unit_box(), absorber(), group, translate(0.0, 0.0, 5.0))
            .unwrap();
        let world = scene.prepare(1e-6).unwrap();

        let hit = world.nearest_hit(&Ray::new(Vec3::ZERO, Vec3::Z)).unwrap();
        assert_eq!(hit.primitive, id);
        assert!((hit.t - 9.0).abs() < 1e-5);
        assert!(!hit.exiting);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_hit_from_inside_is_exiting() {
        let mut scene = Scene::new();
        scene
            .create_primitive("box", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let world = scene.prepare(1e-6).unwrap();

        let hit = world.nearest_hit(&Ray::new(Vec3::ZERO, Vec3::X)).unwrap();
        assert!(hit.exiting);
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.normal - Vec3::X).length() < 1e-6);
        assert_eq!(world.containing(Vec3::ZERO).len(), 1);
    }

    #[test]
    fn test_ray_missing_everything() {
        let mut scene = Scene::new();
        scene
            .create_primitive("box", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let world = scene.prepare(1e-6).unwrap();
        assert!(world.nearest_hit(&Ray::new(Vec3::new(0.0, 5.0, -5.0), Vec3::Z)).is_none());
        // surface behind the origin
        assert!(world.nearest_hit(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z)).is_none());
    }

    #[test]
    fn test_ties_prefer_first_primitive() {
        let mut scene = Scene::new();
        let first = scene
            .create_primitive("a", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        scene
            .create_primitive("b", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let world = scene.prepare(1e-6).unwrap();
        let hit = world.nearest_hit(&Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z)).unwrap();
        assert_eq!(hit.primitive, first);
    }

    #[test]
    fn test_combine_consumes_operands() {
        let mut scene = Scene::new();
        let outer = scene
            .create_primitive("outer", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let inner = scene
            .create_primitive(
                "inner",
                Solid::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5)),
                absorber(),
                SceneGraph::ROOT,
                translate(0.0, 0.0, 0.25),
            )
            .unwrap();
        let shell = scene
            .combine("shell", CsgOp::Subtract, outer, inner, absorber(), SceneGraph::ROOT, translate(0.0, 0.0, 10.0))
            .unwrap();

        assert!(scene.primitive(outer).is_err());
        assert_eq!(scene.primitives().count(), 1);
        let node = scene.primitive(shell).unwrap().node;
        assert_eq!(scene.graph().node(node).unwrap().children().len(), 2);

        let world = scene.prepare(1e-6).unwrap();
        // cavity runs from z = 9.75 to 10.75
        let hit = world.nearest_hit(&Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z)).unwrap();
        assert!((hit.t - 0.75).abs() < 1e-5);
        assert!(!hit.exiting);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-5);

        assert_eq!(
            scene.combine("again", CsgOp::Union, outer, shell, absorber(), SceneGraph::ROOT, Transform::IDENTITY),
            Err(SceneError::UnknownPrimitive(outer.index()))
        );
    }

    #[test]
    fn test_subtracting_identical_solids_leaves_nothing() {
        let mut scene = Scene::new();
        let a = scene
            .create_primitive("a", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let b = scene
            .create_primitive("b", unit_box(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        scene
            .combine("empty", CsgOp::Subtract, a, b, absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let world = scene.prepare(1e-6).unwrap();
        assert!(world.nearest_hit(&Ray::new(Vec3::new(0.2, 0.1, -5.0), Vec3::Z)).is_none());
    }

    #[test]
    fn test_open_mesh_is_skipped_and_counted() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut mesh = caustic_core::Mesh::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0));
        mesh.indices.drain(6..12);
        let mut scene = Scene::new();
        scene
            .create_primitive("open", Solid::mesh(Arc::new(mesh)).unwrap(), absorber(), SceneGraph::ROOT, Transform::IDENTITY)
            .unwrap();
        let world = scene.prepare(1e-6).unwrap();

        let ray = Ray::new(Vec3::new(0.2, 0.1, -5.0), Vec3::Z);
        assert!(world.nearest_hit(&ray).is_none());
        assert!(world.nearest_hit(&ray).is_none());
        assert_eq!(world.geometry_faults(), 2);
    }
}
