// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Junk filtering: percentile bounding-box culling and island removal.
//!
//! CAD exports routinely carry stray geometry: dimension blocks dropped a
//! kilometer from the model, probe points, disconnected fragments of
//! detail. Two passes clean this up. The percentile cull keeps triangles
//! with at least one vertex inside a robust bounding box (so a handful of
//! outlier coordinates cannot blow up the scene extents), and island
//! removal drops connected components too small to be real structure.

use rustc_hash::FxHashMap;

use crate::types::Mesh;

/// Union-find over triangle indices with path compression and union by rank.
struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size as u32).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        // Iterative find with full path compression.
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        while self.parent[x as usize] != root {
            let next = self.parent[x as usize];
            self.parent[x as usize] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra as usize].cmp(&self.rank[rb as usize]) {
            std::cmp::Ordering::Less => self.parent[ra as usize] = rb,
            std::cmp::Ordering::Greater => self.parent[rb as usize] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb as usize] = ra;
                self.rank[ra as usize] += 1;
            }
        }
    }
}

/// Rebuild a mesh keeping only the triangles selected by `keep`, remapping
/// vertices so no unreferenced vertex survives. Vertex order follows first
/// use in the kept triangles.
fn rebuild_filtered(mesh: &Mesh, keep: &[bool]) -> Mesh {
    let mut remap: FxHashMap<u32, u32> = FxHashMap::default();
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(mesh.indices.len());

    for (t, triangle) in mesh.indices.chunks_exact(3).enumerate() {
        if !keep[t] {
            continue;
        }
        for &old in triangle {
            let new = *remap.entry(old).or_insert_with(|| {
                vertices.push(mesh.vertices[old as usize]);
                (vertices.len() - 1) as u32
            });
            indices.push(new);
        }
    }

    Mesh {
        layer: mesh.layer.clone(),
        vertices,
        indices,
    }
}

/// Percentile index into a sorted axis, clamped to the last element.
fn percentile_index(len: usize, fraction: f64) -> usize {
    ((len as f64 * fraction) as usize).min(len - 1)
}

/// Cull triangles that lie entirely outside a robust bounding box.
///
/// Per axis, the box spans the `(1 - percentile) / 2` and
/// `(1 + percentile) / 2` percentiles of the sorted coordinates, expanded by
/// `padding` times the resulting extent. A triangle survives if any of its
/// three vertices is inside the expanded box.
pub fn cull_outliers(mesh: &Mesh, percentile: f64, padding: f64) -> Mesh {
    if mesh.is_empty() || mesh.vertices.len() < 2 {
        return mesh.clone();
    }

    let mut low = [0.0f64; 3];
    let mut high = [0.0f64; 3];
    for axis in 0..3 {
        let mut coords: Vec<f64> = mesh.vertices.iter().map(|v| v.coords[axis]).collect();
        coords.sort_by(f64::total_cmp);

        let lo_idx = percentile_index(coords.len(), (1.0 - percentile) / 2.0);
        let mut hi_idx = percentile_index(coords.len(), (1.0 + percentile) / 2.0);
        if hi_idx <= lo_idx {
            hi_idx = (lo_idx + 1).min(coords.len() - 1);
        }

        let extent = coords[hi_idx] - coords[lo_idx];
        low[axis] = coords[lo_idx] - padding * extent;
        high[axis] = coords[hi_idx] + padding * extent;
    }

    let inside = |index: u32| -> bool {
        let v = &mesh.vertices[index as usize];
        (0..3).all(|axis| v.coords[axis] >= low[axis] && v.coords[axis] <= high[axis])
    };

    let keep: Vec<bool> = mesh
        .indices
        .chunks_exact(3)
        .map(|t| t.iter().any(|&i| inside(i)))
        .collect();

    let out = rebuild_filtered(mesh, &keep);
    tracing::debug!(
        layer = %mesh.layer,
        triangles_in = mesh.triangle_count(),
        triangles_out = out.triangle_count(),
        "outlier cull"
    );
    out
}

/// Remove connected components smaller than `min_triangles`.
///
/// Triangles are connected when they share an undirected edge. Components
/// are found with union-find over triangle indices; surviving triangles keep
/// their input order and vertices are remapped compactly.
pub fn remove_islands(mesh: &Mesh, min_triangles: usize) -> Mesh {
    let triangle_count = mesh.triangle_count();
    if triangle_count == 0 || min_triangles <= 1 {
        return mesh.clone();
    }

    let mut components = UnionFind::new(triangle_count);
    // First triangle seen per undirected edge; later owners union into it.
    let mut edge_owner: FxHashMap<(u32, u32), u32> = FxHashMap::default();

    for (t, triangle) in mesh.indices.chunks_exact(3).enumerate() {
        for e in 0..3 {
            let a = triangle[e];
            let b = triangle[(e + 1) % 3];
            let edge = (a.min(b), a.max(b));
            match edge_owner.entry(edge) {
                std::collections::hash_map::Entry::Occupied(owner) => {
                    components.union(*owner.get(), t as u32);
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(t as u32);
                }
            }
        }
    }

    let mut component_size: FxHashMap<u32, usize> = FxHashMap::default();
    let roots: Vec<u32> = (0..triangle_count as u32)
        .map(|t| components.find(t))
        .collect();
    for &root in &roots {
        *component_size.entry(root).or_insert(0) += 1;
    }

    let keep: Vec<bool> = roots
        .iter()
        .map(|root| component_size[root] >= min_triangles)
        .collect();

    let out = rebuild_filtered(mesh, &keep);
    tracing::debug!(
        layer = %mesh.layer,
        components = component_size.len(),
        triangles_in = triangle_count,
        triangles_out = out.triangle_count(),
        min_triangles,
        "island removal"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    /// Strip of `n` triangles sharing edges, offset by `origin`.
    fn strip(mesh: &mut Mesh, n: usize, origin: (f64, f64, f64)) {
        let base = mesh.vertices.len() as u32;
        for i in 0..n + 2 {
            mesh.vertices.push(Point3::new(
                origin.0 + (i / 2) as f64,
                origin.1 + (i % 2) as f64,
                origin.2,
            ));
        }
        for i in 0..n as u32 {
            mesh.indices.extend_from_slice(&[base + i, base + i + 1, base + i + 2]);
        }
    }

    #[test]
    fn small_islands_are_removed_and_large_survive() {
        let mut mesh = Mesh::new("model");
        strip(&mut mesh, 20, (0.0, 0.0, 0.0));
        strip(&mut mesh, 2, (100.0, 0.0, 0.0));

        let out = remove_islands(&mesh, 10);
        assert_eq!(out.triangle_count(), 20);
        // Vertices of the removed island are gone too.
        assert_eq!(out.vertex_count(), 22);
        for &i in &out.indices {
            assert!((i as usize) < out.vertex_count());
        }
    }

    #[test]
    fn removal_never_splits_a_surviving_component() {
        let mut mesh = Mesh::new("model");
        strip(&mut mesh, 30, (0.0, 0.0, 0.0));
        let before = remove_islands(&mesh, 10);
        assert_eq!(before.triangle_count(), 30);

        // Re-running on the output is a no-op: the survivor is intact.
        let again = remove_islands(&before, 10);
        assert_eq!(again.triangle_count(), 30);
        assert_eq!(again.indices, before.indices);
    }

    #[test]
    fn shared_vertex_without_shared_edge_is_not_connected() {
        // Two triangles touching at one vertex only: distinct components.
        let mut mesh = Mesh::new("model");
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        ];
        mesh.indices = vec![0, 1, 2, 0, 3, 4];
        let out = remove_islands(&mesh, 2);
        assert_eq!(out.triangle_count(), 0);
    }

    #[test]
    fn outlier_triangles_are_culled() {
        let mut mesh = Mesh::new("model");
        // 200 strip triangles near the origin, one triangle far away; the
        // three stray vertices stay under the 2.5% trim on each axis.
        strip(&mut mesh, 200, (0.0, 0.0, 0.0));
        let base = mesh.vertices.len() as u32;
        mesh.vertices.push(Point3::new(1e6, 1e6, 0.0));
        mesh.vertices.push(Point3::new(1e6 + 1.0, 1e6, 0.0));
        mesh.vertices.push(Point3::new(1e6, 1e6 + 1.0, 0.0));
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);

        let out = cull_outliers(&mesh, 0.95, 0.10);
        assert_eq!(out.triangle_count(), 200);
        assert_eq!(out.vertex_count(), 202);
    }

    #[test]
    fn cull_keeps_triangles_with_one_inside_vertex() {
        let mut mesh = Mesh::new("model");
        strip(&mut mesh, 200, (0.0, 0.0, 0.0));
        // Triangle with one vertex inside the cluster, two far away.
        let base = mesh.vertices.len() as u32;
        mesh.vertices.push(Point3::new(5.0, 0.5, 0.0));
        mesh.vertices.push(Point3::new(9000.0, 0.0, 0.0));
        mesh.vertices.push(Point3::new(9000.0, 1.0, 0.0));
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);

        let out = cull_outliers(&mesh, 0.95, 0.10);
        assert_eq!(out.triangle_count(), 201);
    }

    #[test]
    fn union_find_is_an_equivalence() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(4, 5);

        // Reflexive, symmetric, transitive.
        assert_eq!(uf.find(3), uf.find(3));
        assert_eq!(uf.find(0), uf.find(2));
        assert_eq!(uf.find(2), uf.find(0));
        assert_ne!(uf.find(0), uf.find(4));
        assert_ne!(uf.find(3), uf.find(5));
    }
}
