//! Scene graph arena.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`].
//! Children are owned by index from their parent; the parent link is a plain
//! back-index, so the graph never holds a reference cycle. Node 0 is the
//! world root and its world transform is always the identity.

use caustic_math::Transform;
use thiserror::Error;

/// Errors raised while building or querying the scene graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("attaching node {node:?} under {parent:?} would create an ancestry cycle")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),

    #[error("the world root cannot be transformed or re-parented")]
    RootIsFixed,

    #[error("primitive #{0} does not exist or was consumed by a CSG combination")]
    UnknownPrimitive(usize),
}

/// Result type for scene graph operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Handle to a node in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single entry of the arena.
#[derive(Debug, Clone)]
pub struct Node {
    /// Display name (used in log messages)
    pub name: String,
    local: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Transform relative to the parent node.
    pub fn local_transform(&self) -> Transform {
        self.local
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Hierarchy of transformed nodes rooted at the world node.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    /// Handle of the world root.
    pub const ROOT: NodeId = NodeId(0);

    /// Create a graph holding only the world root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "world".to_string(),
                local: Transform::IDENTITY,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id.0).ok_or(SceneError::UnknownNode(id))
    }

    /// Create an unnamed node under `parent`.
    pub fn create_node(&mut self, parent: NodeId, transform: Transform) -> SceneResult<NodeId> {
        let name = format!("node{}", self.nodes.len());
        self.create_named_node(name, parent, transform)
    }

    /// Create a node under `parent` with a local transform.
    pub fn create_named_node(
        &mut self,
        name: impl Into<String>,
        parent: NodeId,
        transform: Transform,
    ) -> SceneResult<NodeId> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            local: transform,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Attach `child` under `parent` with a new local transform.
    ///
    /// The child is detached from its previous parent first. Fails with
    /// [`SceneError::Cycle`] when `child` is `parent` or one of its ancestors.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        local_transform: Transform,
    ) -> SceneResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == Self::ROOT {
            return Err(SceneError::RootIsFixed);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle {
                node: child,
                parent,
            });
        }

        if let Some(old_parent) = self.nodes[child.0].parent {
            self.nodes[old_parent.0].children.retain(|&c| c != child);
        }
        self.nodes[parent.0].children.push(child);

        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.local = local_transform;
        log::debug!("attached {:?} ({}) under {:?}", child, node.name, parent);
        Ok(())
    }

    /// True when `ancestor` lies on the path from `node` to the root
    /// (a node counts as its own ancestor).
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// Node-to-world transform: the local transforms from the root down to
    /// `id`, composed parent * child.
    pub fn world_transform(&self, id: NodeId) -> SceneResult<Transform> {
        let mut transform = self.node(id)?.local;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            let node = &self.nodes[parent.0];
            transform = node.local * transform;
            current = node.parent;
        }
        Ok(transform)
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caustic_math::{rotate, rotate_y, translate, Vec3};

    #[test]
    fn test_root_world_transform_is_identity() {
        let graph = SceneGraph::new();
        let world = graph.world_transform(graph.root()).unwrap();
        assert_eq!(world, Transform::IDENTITY);
    }

    #[test]
    fn test_three_level_composition() {
        let mut graph = SceneGraph::new();
        let a = translate(1.0, 0.0, 0.0);
        let b = rotate_y(90.0);
        let c = translate(0.0, 2.0, -3.0) * rotate(10.0, 20.0, 30.0);

        let n1 = graph.create_node(SceneGraph::ROOT, a).unwrap();
        let n2 = graph.create_node(n1, b).unwrap();
        let n3 = graph.create_node(n2, c).unwrap();

        let resolved = graph.world_transform(n3).unwrap();
        assert!(resolved.abs_diff_eq(&(a * b * c), 1e-5));
        assert!(resolved.abs_diff_eq(&(a * (b * c)), 1e-5));

        let p = resolved.transform_point(Vec3::ZERO);
        let expected = a.transform_point(b.transform_point(c.transform_point(Vec3::ZERO)));
        assert!((p - expected).length() < 1e-5);
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node(SceneGraph::ROOT, Transform::IDENTITY).unwrap();
        let b = graph.create_node(a, Transform::IDENTITY).unwrap();

        assert_eq!(
            graph.add_child(b, a, Transform::IDENTITY),
            Err(SceneError::Cycle { node: a, parent: b })
        );
        assert_eq!(
            graph.add_child(a, a, Transform::IDENTITY),
            Err(SceneError::Cycle { node: a, parent: a })
        );
        assert_eq!(
            graph.add_child(a, SceneGraph::ROOT, Transform::IDENTITY),
            Err(SceneError::RootIsFixed)
        );
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node(SceneGraph::ROOT, translate(1.0, 0.0, 0.0)).unwrap();
        let b = graph.create_node(SceneGraph::ROOT, translate(0.0, 5.0, 0.0)).unwrap();
        let c = graph.create_node(a, Transform::IDENTITY).unwrap();

        graph.add_child(b, c, translate(0.0, 0.0, 1.0)).unwrap();

        assert!(graph.node(a).unwrap().children().is_empty());
        assert_eq!(graph.node(b).unwrap().children(), &[c]);
        let p = graph.world_transform(c).unwrap().transform_point(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 5.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_unknown_node() {
        let mut other = SceneGraph::new();
        let foreign = other.create_node(SceneGraph::ROOT, Transform::IDENTITY).unwrap();

        let graph = SceneGraph::new();
        assert_eq!(
            graph.world_transform(foreign),
            Err(SceneError::UnknownNode(foreign))
        );
    }
}
