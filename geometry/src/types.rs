// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core data model: polylines, meshes, entities, and pipeline statistics.
//!
//! Every type here has value semantics and flows linearly through the
//! pipeline: the parser constructs [`Entity`] values, the preprocessor
//! consumes them and produces an [`OptimizedGeometry`], and the writers
//! consume that. No stage holds references into another stage's data.

use nalgebra::{Point2, Point3, Vector3};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// An ordered run of 3D points on a named layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    /// Source layer name, carried through to the output scene.
    pub layer: String,
    pub points: Vec<Point3<f64>>,
    /// A closed polyline is logically closed; the edge from the last point
    /// back to the first is implied, never duplicated in `points`.
    pub is_closed: bool,
}

impl Polyline {
    pub fn new(layer: impl Into<String>, points: Vec<Point3<f64>>, is_closed: bool) -> Self {
        Self {
            layer: layer.into(),
            points,
            is_closed,
        }
    }
}

/// Indexed triangle mesh on a named layer.
///
/// Vertices are f64 for processing; conversion to f32 happens at the export
/// boundary only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub layer: String,
    pub vertices: Vec<Point3<f64>>,
    /// Flat triangle index list, three entries per triangle.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Append another mesh's geometry, offsetting its indices.
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        let offset = self.vertices.len() as u32;
        self.vertices.reserve(other.vertices.len());
        self.indices.reserve(other.indices.len());
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
    }

    /// Axis-aligned bounding box, or `None` for a mesh with no vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = *first;
        let mut max = *first;
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }
        Some((min, max))
    }

    /// Check the structural preconditions a parser-supplied mesh must meet:
    /// index count divisible by three and every index in range.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::MalformedMesh {
                layer: self.layer.clone(),
                indices: self.indices.len(),
            });
        }
        let vertices = self.vertices.len();
        for &index in &self.indices {
            if index as usize >= vertices {
                return Err(Error::IndexOutOfBounds {
                    layer: self.layer.clone(),
                    index,
                    vertices,
                });
            }
        }
        Ok(())
    }
}

/// A parsed CAD entity, ready for preprocessing.
///
/// This is a closed sum over the entity kinds the pipeline understands;
/// parser adapters construct the variants and the preprocessor dispatches by
/// exhaustive match. Angles are radians, coordinates are source units.
#[derive(Debug, Clone)]
pub enum Entity {
    Line {
        layer: String,
        start: Point3<f64>,
        end: Point3<f64>,
    },
    /// Lightweight 2D polyline at a fixed elevation.
    LwPolyline {
        layer: String,
        points: Vec<Point2<f64>>,
        elevation: f64,
        is_closed: bool,
    },
    Polyline3D {
        layer: String,
        points: Vec<Point3<f64>>,
        is_closed: bool,
    },
    Arc {
        layer: String,
        center: Point3<f64>,
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// End angle in radians.
        end_angle: f64,
        normal: Vector3<f64>,
    },
    Circle {
        layer: String,
        center: Point3<f64>,
        radius: f64,
        normal: Vector3<f64>,
    },
    Ellipse {
        layer: String,
        center: Point3<f64>,
        /// Major axis as a vector from the center; its length is the major
        /// radius and its direction fixes the in-plane rotation.
        major_axis: Vector3<f64>,
        /// Minor radius as a fraction of the major radius.
        minor_ratio: f64,
        normal: Vector3<f64>,
    },
    Spline {
        layer: String,
        degree: usize,
        control_points: Vec<Point3<f64>>,
    },
    /// Three or four corner points.
    Face3D {
        layer: String,
        corners: Vec<Point3<f64>>,
    },
    Mesh(Mesh),
}

impl Entity {
    pub fn layer(&self) -> &str {
        match self {
            Entity::Line { layer, .. }
            | Entity::LwPolyline { layer, .. }
            | Entity::Polyline3D { layer, .. }
            | Entity::Arc { layer, .. }
            | Entity::Circle { layer, .. }
            | Entity::Ellipse { layer, .. }
            | Entity::Spline { layer, .. }
            | Entity::Face3D { layer, .. } => layer,
            Entity::Mesh(mesh) => &mesh.layer,
        }
    }

    /// Entity kind name, used for the statistics histogram.
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Line { .. } => "Line",
            Entity::LwPolyline { .. } => "LwPolyline",
            Entity::Polyline3D { .. } => "Polyline",
            Entity::Arc { .. } => "Arc",
            Entity::Circle { .. } => "Circle",
            Entity::Ellipse { .. } => "Ellipse",
            Entity::Spline { .. } => "Spline",
            Entity::Face3D { .. } => "3DFace",
            Entity::Mesh(_) => "PolyfaceMesh",
        }
    }
}

/// Counters describing what the pipeline did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryStats {
    /// Estimated vertex count of the source entities. Curve entities
    /// contribute fixed heuristic estimates, so this is a reporting figure,
    /// not an exact measurement.
    pub original_vertices: usize,
    /// Exact vertex count of the optimized output.
    pub optimized_vertices: usize,
    pub original_entities: usize,
    pub optimized_polylines: usize,
    pub mesh_count: usize,
    pub triangle_count: usize,
    /// Histogram of source entity kinds. Ordered map so serialized output is
    /// stable across runs.
    pub entity_counts: BTreeMap<String, usize>,
}

impl GeometryStats {
    /// Vertex reduction as a percentage of the original estimate.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_vertices > 0 {
            (1.0 - self.optimized_vertices as f64 / self.original_vertices as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Final output bundle handed to the writers.
#[derive(Debug, Clone, Default)]
pub struct OptimizedGeometry {
    pub polylines: Vec<Polyline>,
    pub meshes: Vec<Mesh>,
    pub stats: GeometryStats,
}
