// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertex-clustering mesh decimation.
//!
//! The mesh's bounding box is divided into a uniform `grid^3` lattice; all
//! vertices falling into the same cell collapse to their centroid and
//! triangles are remapped, dropping the ones that collapse to a point or an
//! edge. This trades the fidelity of error-metric simplifiers for a single
//! linear pass, which is the right trade for multi-million-triangle CAD
//! dumps feeding a realtime viewer.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::types::Mesh;

/// Smallest grid resolution accepted at the options boundary.
pub const MIN_GRID: u32 = 32;
/// Largest grid resolution accepted at the options boundary.
pub const MAX_GRID: u32 = 1024;

/// Padding added to each bounding box extent so the maximum face never lands
/// in cell index `grid`.
const EXTENT_PADDING: f64 = 0.001;

/// Decimate a mesh by clustering vertices on a uniform grid.
///
/// The caller-facing `[MIN_GRID, MAX_GRID]` clamp lives at the options
/// boundary; this function honors any `grid >= 1`. The output preserves the
/// layer, has at most one vertex per occupied cell, and never more triangles
/// than the input. Centroids accumulate in input order, so the result is
/// deterministic for a fixed input.
pub fn decimate(mesh: &Mesh, grid: u32) -> Mesh {
    let grid = grid.max(1);
    if mesh.is_empty() {
        return mesh.clone();
    }

    let (min, max) = mesh.bounds().expect("non-empty mesh has bounds");
    let extent = Vector3::new(
        (max.x - min.x) + EXTENT_PADDING,
        (max.y - min.y) + EXTENT_PADDING,
        (max.z - min.z) + EXTENT_PADDING,
    );
    let grid_f = grid as f64;
    let cell_size = extent / grid_f;

    let cell_of = |v: &Point3<f64>| -> u64 {
        let cx = (((v.x - min.x) / cell_size.x).floor() as i64).clamp(0, grid as i64 - 1) as u64;
        let cy = (((v.y - min.y) / cell_size.y).floor() as i64).clamp(0, grid as i64 - 1) as u64;
        let cz = (((v.z - min.z) / cell_size.z).floor() as i64).clamp(0, grid as i64 - 1) as u64;
        cx + cy * grid as u64 + cz * (grid as u64) * (grid as u64)
    };

    // One accumulator per occupied cell, indexed in first-seen order.
    let mut cell_index: FxHashMap<u64, u32> = FxHashMap::default();
    let mut sums: Vec<Vector3<f64>> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());

    for v in &mesh.vertices {
        let cell = cell_of(v);
        let slot = *cell_index.entry(cell).or_insert_with(|| {
            sums.push(Vector3::zeros());
            counts.push(0);
            (sums.len() - 1) as u32
        });
        sums[slot as usize] += v.coords;
        counts[slot as usize] += 1;
        remap.push(slot);
    }

    let vertices: Vec<Point3<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| Point3::from(sum / count as f64))
        .collect();

    let mut indices = Vec::with_capacity(mesh.indices.len());
    let mut dropped = 0usize;
    for triangle in mesh.indices.chunks_exact(3) {
        let a = remap[triangle[0] as usize];
        let b = remap[triangle[1] as usize];
        let c = remap[triangle[2] as usize];
        if a == b || b == c || a == c {
            dropped += 1;
            continue;
        }
        indices.extend_from_slice(&[a, b, c]);
    }

    tracing::debug!(
        layer = %mesh.layer,
        grid,
        vertices_in = mesh.vertex_count(),
        vertices_out = vertices.len(),
        triangles_kept = indices.len() / 3,
        triangles_dropped = dropped,
        "vertex clustering"
    );

    Mesh {
        layer: mesh.layer.clone(),
        vertices,
        indices,
    }
}
