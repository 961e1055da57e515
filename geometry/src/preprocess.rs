// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preprocessing pipeline: entities in, optimized geometry bundle out.
//!
//! The preprocessor dispatches each entity to the matching sampler or
//! simplifier, accumulates polylines and meshes, then runs the optional
//! mesh optimization passes. Processing is single threaded and entirely
//! deterministic; the only observable side effects are progress callbacks
//! and log records.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cluster::{decimate, MAX_GRID, MIN_GRID};
use crate::error::Result;
use crate::junk::{cull_outliers, remove_islands};
use crate::math::{plane_basis, point_key};
use crate::options::PreprocessorOptions;
use crate::simplify::{simplify, simplify_chunked, DEFAULT_CHUNK_SIZE};
use crate::spline::{sample_bspline, sample_cubic_bezier};
use crate::tessellate::{sweep_angle, tessellate_arc, tessellate_circle, tessellate_ellipse};
use crate::types::{Entity, GeometryStats, Mesh, OptimizedGeometry, Polyline};

/// Polylines above this point count go through the chunked simplifier.
pub const LARGE_POLYLINE_THRESHOLD: usize = 500_000;

/// Meshes at or below this triangle count skip decimation.
const DECIMATE_TRIANGLE_FLOOR: usize = 1000;

/// Layer name used for the polyline accumulated from 3DFACE corners.
const FACE3D_LAYER: &str = "3DFace";

/// Progress callback: `(points_processed, points_total)` for the current
/// oversized polyline.
pub type Progress = Box<dyn Fn(usize, usize)>;

/// The preprocessing pipeline.
///
/// Construct with options, optionally attach a progress callback and a
/// cancellation flag, then feed any iterator of [`Entity`] values. The flag
/// is checked between entities; on cancellation the geometry assembled so
/// far is returned, never a partially converted entity.
pub struct Preprocessor {
    options: PreprocessorOptions,
    progress: Option<Progress>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Preprocessor {
    pub fn new(options: PreprocessorOptions) -> Self {
        Self {
            options,
            progress: None,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run the pipeline over an entity stream.
    ///
    /// The only error condition is a structurally invalid parser-supplied
    /// mesh; all geometric and numerical edge cases are absorbed.
    pub fn process<I>(&self, entities: I) -> Result<OptimizedGeometry>
    where
        I: IntoIterator<Item = Entity>,
    {
        let opts = &self.options;
        let include: Option<FxHashSet<String>> = opts.include_layers.as_ref().map(|layers| {
            layers.iter().map(|l| l.to_lowercase()).collect()
        });

        let mut stats = GeometryStats::default();
        let mut polylines: Vec<Polyline> = Vec::new();
        let mut meshes: Vec<Mesh> = Vec::new();
        let mut face3d_points: Vec<Point3<f64>> = Vec::new();
        let mut face3d_seen: FxHashSet<(i64, i64, i64)> = FxHashSet::default();
        let mut cancelled = false;

        for entity in entities {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }
            if let Some(include) = &include {
                if !include.contains(&entity.layer().to_lowercase()) {
                    continue;
                }
            }

            stats.original_entities += 1;
            *stats.entity_counts.entry(entity.kind().to_string()).or_insert(0) += 1;

            match entity {
                Entity::Line { layer, start, end } => {
                    stats.original_vertices += 2;
                    polylines.push(Polyline::new(layer, vec![start, end], false));
                }
                Entity::LwPolyline {
                    layer,
                    points,
                    elevation,
                    is_closed,
                } => {
                    if points.is_empty() {
                        continue;
                    }
                    stats.original_vertices += points.len();
                    let lifted: Vec<Point3<f64>> = points
                        .iter()
                        .map(|p| Point3::new(p.x, p.y, elevation))
                        .collect();
                    let simplified = self.simplify_polyline(&lifted);
                    polylines.push(Polyline::new(layer, simplified, is_closed));
                }
                Entity::Polyline3D {
                    layer,
                    points,
                    is_closed,
                } => {
                    if points.is_empty() {
                        continue;
                    }
                    stats.original_vertices += points.len();
                    let simplified = self.simplify_polyline(&points);
                    polylines.push(Polyline::new(layer, simplified, is_closed));
                }
                Entity::Arc {
                    layer,
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    normal,
                } => {
                    let sweep = sweep_angle(start_angle, end_angle);
                    stats.original_vertices += (sweep / (PI / 18.0)).ceil() as usize;
                    let points = tessellate_arc(
                        &center,
                        radius,
                        start_angle,
                        end_angle,
                        &normal,
                        opts.arc_chord_error,
                        opts.min_arc_segments,
                        opts.max_arc_segments,
                    );
                    polylines.push(Polyline::new(layer, points, false));
                }
                Entity::Circle {
                    layer,
                    center,
                    radius,
                    normal,
                } => {
                    stats.original_vertices += 36;
                    let mut points = tessellate_circle(
                        &center,
                        radius,
                        &normal,
                        opts.arc_chord_error,
                        opts.min_arc_segments,
                        opts.max_arc_segments,
                    );
                    // Closed polylines imply the closing edge; drop the
                    // duplicated seam sample.
                    points.pop();
                    polylines.push(Polyline::new(layer, points, true));
                }
                Entity::Ellipse {
                    layer,
                    center,
                    major_axis,
                    minor_ratio,
                    normal,
                } => {
                    stats.original_vertices += 72;
                    let major_radius = major_axis.norm();
                    let minor_radius = major_radius * minor_ratio;
                    // In-plane angle of the major axis within the arc basis.
                    let (u, v) = plane_basis(&normal);
                    let rotation = major_axis.dot(&v).atan2(major_axis.dot(&u));
                    let mut points = tessellate_ellipse(
                        &center,
                        major_radius,
                        minor_radius,
                        rotation,
                        &normal,
                        opts.arc_chord_error,
                        opts.min_arc_segments,
                        opts.max_arc_segments,
                    );
                    points.pop();
                    polylines.push(Polyline::new(layer, points, true));
                }
                Entity::Spline {
                    layer,
                    degree,
                    control_points,
                } => {
                    if control_points.is_empty() {
                        continue;
                    }
                    stats.original_vertices += 10 * control_points.len();
                    let sampled = if degree == 3 && control_points.len() == 4 {
                        sample_cubic_bezier(
                            &control_points[0],
                            &control_points[1],
                            &control_points[2],
                            &control_points[3],
                            opts.spline_tolerance,
                        )
                    } else {
                        let samples = (5 * control_points.len()).max(20);
                        sample_bspline(&control_points, degree, samples)
                    };
                    let simplified = self.simplify_polyline(&sampled);
                    polylines.push(Polyline::new(layer, simplified, false));
                }
                Entity::Face3D { layer: _, corners } => {
                    let mut corners = corners;
                    // A triangular face arrives with its fourth corner
                    // repeating the third.
                    if corners.len() == 4 && corners[3] == corners[2] {
                        corners.pop();
                    }
                    stats.original_vertices += corners.len();
                    for corner in corners {
                        if face3d_seen.insert(point_key(&corner)) {
                            face3d_points.push(corner);
                        }
                    }
                }
                Entity::Mesh(mesh) => {
                    mesh.validate()?;
                    stats.original_vertices += mesh.vertex_count();
                    if !mesh.is_empty() {
                        meshes.push(mesh);
                    }
                }
            }
        }

        if !face3d_points.is_empty() {
            let simplified = self.simplify_polyline(&face3d_points);
            polylines.push(Polyline::new(FACE3D_LAYER, simplified, false));
        }

        if opts.merge_distance > 0.0 {
            let merge_sq = opts.merge_distance * opts.merge_distance;
            for polyline in &mut polylines {
                polyline.points = merge_near_points(&polyline.points, merge_sq);
            }
        }

        let meshes = self.optimize_meshes(meshes);

        stats.optimized_vertices = polylines.iter().map(|p| p.points.len()).sum::<usize>()
            + meshes.iter().map(|m| m.vertex_count()).sum::<usize>();
        stats.optimized_polylines = polylines.len();
        stats.mesh_count = meshes.len();
        stats.triangle_count = meshes.iter().map(|m| m.triangle_count()).sum();

        tracing::info!(
            entities = stats.original_entities,
            polylines = stats.optimized_polylines,
            meshes = stats.mesh_count,
            original_vertices = stats.original_vertices,
            optimized_vertices = stats.optimized_vertices,
            reduction_percent = format!("{:.2}", stats.reduction_percent()),
            cancelled,
            "preprocessing finished"
        );

        Ok(OptimizedGeometry {
            polylines,
            meshes,
            stats,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn simplify_polyline(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let epsilon = self.options.polyline_epsilon;
        if points.len() > LARGE_POLYLINE_THRESHOLD {
            simplify_chunked(points, epsilon, DEFAULT_CHUNK_SIZE, self.progress.as_deref())
        } else {
            simplify(points, epsilon)
        }
    }

    /// Merge meshes sharing a layer, then run the enabled optimization
    /// passes per layer. Layer order follows first appearance in the input.
    fn optimize_meshes(&self, meshes: Vec<Mesh>) -> Vec<Mesh> {
        if meshes.is_empty() {
            return meshes;
        }
        let opts = &self.options;
        if !opts.junk_filter && opts.decimate_grid.is_none() {
            return meshes;
        }

        let mut layer_slot: FxHashMap<String, usize> = FxHashMap::default();
        let mut merged: Vec<Mesh> = Vec::new();
        for mesh in meshes {
            match layer_slot.get(&mesh.layer) {
                Some(&slot) => merged[slot].merge(&mesh),
                None => {
                    layer_slot.insert(mesh.layer.clone(), merged.len());
                    merged.push(mesh);
                }
            }
        }

        let mut out = Vec::with_capacity(merged.len());
        for mut mesh in merged {
            if opts.junk_filter {
                mesh = cull_outliers(&mesh, opts.cull_percentile, opts.cull_padding);
                mesh = remove_islands(&mesh, opts.min_island_triangles);
            }
            if let Some(grid) = opts.decimate_grid {
                if mesh.triangle_count() > DECIMATE_TRIANGLE_FLOOR {
                    mesh = decimate(&mesh, grid.clamp(MIN_GRID, MAX_GRID));
                }
            }
            if !mesh.is_empty() {
                out.push(mesh);
            }
        }
        out
    }
}

/// Drop consecutive points closer than the merge threshold, always keeping
/// the first point. A polyline that enters with at least two points leaves
/// with at least two: if everything merged away, the original endpoints are
/// restored.
fn merge_near_points(points: &[Point3<f64>], merge_distance_sq: f64) -> Vec<Point3<f64>> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![*first];
    for p in &points[1..] {
        let last = out.last().expect("merge output is never empty");
        if (p - last).norm_squared() > merge_distance_sq {
            out.push(*p);
        }
    }
    if points.len() >= 2 && out.len() < 2 {
        return vec![points[0], points[points.len() - 1]];
    }
    out
}
