//! caustic core - scene graph, geometry and spectral data.
//!
//! This crate provides the renderer-agnostic building blocks:
//!
//! - **Scene graph**: arena of transformed nodes (`SceneGraph`, `NodeId`)
//! - **Geometry**: closed triangle `Mesh`
//! - **Spectral data**: `SpectralFunction`, D65 daylight, Sellmeier
//!   dispersion with a small glass catalogue, CIE colour conversion
//!
//! # Example
//!
//! ```
//! use caustic_core::{SceneGraph, schott};
//! use caustic_math::translate;
//!
//! let mut graph = SceneGraph::new();
//! let node = graph.create_node(SceneGraph::ROOT, translate(0.0, 1.0, 0.0)).unwrap();
//! assert!(graph.world_transform(node).is_ok());
//! assert!(schott("N-BK7").is_some());
//! ```

pub mod color;
pub mod dispersion;
pub mod graph;
pub mod mesh;
pub mod spectral;

// Re-export commonly used types
pub use dispersion::{schott, RefractiveIndex, Sellmeier};
pub use graph::{Node, NodeId, SceneError, SceneGraph, SceneResult};
pub use mesh::{Mesh, MeshError};
pub use spectral::{d65_white, InterpolatedSpectrum, SpectralFunction, SpectrumError};
