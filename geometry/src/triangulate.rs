// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ear-clipping triangulation of simple planar polygons in 3D.
//!
//! Polygons arrive as 3D point loops (no explicit closing vertex). The plane
//! normal is estimated with Newell's method, points are projected into an
//! in-plane 2D basis, the working order is flipped to counter-clockwise when
//! the signed area says so, and ears are clipped until three vertices
//! remain. Pathological inputs (self-intersections, fully collinear loops)
//! terminate through an iteration cap with a best-effort final triangle
//! rather than an error.

use nalgebra::{Point2, Point3, Vector3};

use crate::math::{normalize_or_zero, plane_basis};

/// Plane normal of a polygon via Newell's method.
///
/// Robust against concave outlines and near-collinear runs; a degenerate
/// polygon (zero area) falls back to `(0, 0, 1)`.
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for i in 0..points.len() {
        let current = &points[i];
        let next = &points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    let normal = normalize_or_zero(normal);
    if normal == Vector3::zeros() {
        Vector3::z()
    } else {
        normal
    }
}

/// Project polygon points into the 2D basis of their Newell plane.
fn project_to_plane(points: &[Point3<f64>]) -> Vec<Point2<f64>> {
    let normal = newell_normal(points);
    let (u, v) = plane_basis(&normal);
    points
        .iter()
        .map(|p| Point2::new(u.dot(&p.coords), v.dot(&p.coords)))
        .collect()
}

/// Twice the signed area of a 2D polygon. Positive means counter-clockwise.
fn signed_area_doubled(points: &[Point2<f64>], order: &[u32]) -> f64 {
    let mut area = 0.0;
    for i in 0..order.len() {
        let a = &points[order[i] as usize];
        let b = &points[order[(i + 1) % order.len()] as usize];
        area += a.x * b.y - b.x * a.y;
    }
    area
}

#[inline]
fn cross2(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Strict interior test via the three edge functions: inside iff all three
/// carry the same sign. Points on an edge do not count as inside.
fn strictly_inside(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> bool {
    let d1 = cross2(a, b, p);
    let d2 = cross2(b, c, p);
    let d3 = cross2(c, a, p);
    (d1 > 0.0 && d2 > 0.0 && d3 > 0.0) || (d1 < 0.0 && d2 < 0.0 && d3 < 0.0)
}

/// Triangulate a simple closed polygon given as 3D points.
///
/// Returns a flat list of triangle indices into `points`. Fewer than three
/// points produce an empty list; exactly three produce `[0, 1, 2]`.
pub fn ear_clip(points: &[Point3<f64>]) -> Vec<u32> {
    if points.len() < 3 {
        return Vec::new();
    }
    if points.len() == 3 {
        return vec![0, 1, 2];
    }

    let projected = project_to_plane(points);
    let mut order: Vec<u32> = (0..points.len() as u32).collect();
    if signed_area_doubled(&projected, &order) < 0.0 {
        order.reverse();
    }

    let mut triangles = Vec::with_capacity((points.len() - 2) * 3);
    let max_iterations = points.len() * points.len();
    let mut iterations = 0usize;
    let mut since_last_ear = 0usize;

    let mut i = 0usize;
    while order.len() > 3 {
        iterations += 1;
        if iterations > max_iterations || since_last_ear > order.len() {
            // No ear in a full pass: polygon is not simple. Close what is
            // left with one triangle and bail.
            tracing::warn!(
                remaining = order.len(),
                "no ear found, emitting best-effort triangle"
            );
            triangles.extend_from_slice(&[order[0], order[1], order[2]]);
            return triangles;
        }

        let n = order.len();
        let ia = order[(i + n - 1) % n];
        let ib = order[i % n];
        let ic = order[(i + 1) % n];
        let a = &projected[ia as usize];
        let b = &projected[ib as usize];
        let c = &projected[ic as usize];

        let convex = cross2(a, b, c) > 0.0;
        let mut is_ear = convex;
        if is_ear {
            for &other in &order {
                if other == ia || other == ib || other == ic {
                    continue;
                }
                if strictly_inside(&projected[other as usize], a, b, c) {
                    is_ear = false;
                    break;
                }
            }
        }

        if is_ear {
            triangles.extend_from_slice(&[ia, ib, ic]);
            order.remove(i % n);
            since_last_ear = 0;
            if i >= order.len() {
                i = 0;
            }
        } else {
            since_last_ear += 1;
            i = (i + 1) % order.len();
        }
    }

    triangles.extend_from_slice(&[order[0], order[1], order[2]]);
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle_area(points: &[Point3<f64>], tri: &[u32]) -> f64 {
        let a = &points[tri[0] as usize];
        let b = &points[tri[1] as usize];
        let c = &points[tri[2] as usize];
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    #[test]
    fn degenerate_inputs_yield_no_triangles() {
        assert!(ear_clip(&[]).is_empty());
        assert!(ear_clip(&[Point3::origin()]).is_empty());
        assert!(ear_clip(&[Point3::origin(), Point3::new(1.0, 0.0, 0.0)]).is_empty());
    }

    #[test]
    fn triangle_passes_through() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert_eq!(ear_clip(&points), vec![0, 1, 2]);
    }

    #[test]
    fn square_becomes_two_triangles_of_unit_area() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices = ear_clip(&points);
        assert_eq!(indices.len(), 6);
        let area: f64 = indices.chunks(3).map(|t| triangle_area(&points, t)).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn clockwise_square_triangulates_identically_in_area() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let indices = ear_clip(&points);
        assert_eq!(indices.len(), 6);
        let area: f64 = indices.chunks(3).map(|t| triangle_area(&points, t)).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn convex_polygon_yields_n_minus_two_triangles() {
        let n = 12;
        let points: Vec<_> = (0..n)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / n as f64;
                Point3::new(theta.cos(), theta.sin(), 0.0)
            })
            .collect();
        let indices = ear_clip(&points);
        assert_eq!(indices.len(), (n - 2) * 3);

        // Every input vertex is referenced.
        let mut seen = vec![false; n];
        for &i in &indices {
            seen[i as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));

        // Triangle areas sum to the polygon area (no overlaps, no holes).
        let polygon_area = 0.5 * n as f64 * (std::f64::consts::TAU / n as f64).sin();
        let area: f64 = indices.chunks(3).map(|t| triangle_area(&points, t)).sum();
        assert_relative_eq!(area, polygon_area, epsilon = 1e-9);
    }

    #[test]
    fn concave_polygon_covers_its_area() {
        // L-shape, area 3.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let indices = ear_clip(&points);
        assert_eq!(indices.len(), (points.len() - 2) * 3);
        let area: f64 = indices.chunks(3).map(|t| triangle_area(&points, t)).sum();
        assert_relative_eq!(area, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn tilted_planar_polygon_projects_cleanly() {
        // Unit square rotated out of the XY plane.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(1.0, 1.0, 0.5),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices = ear_clip(&points);
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn bowtie_terminates_with_best_effort_output() {
        // Self-intersecting: not a simple polygon. The clipper must stop,
        // not spin, and still emit at least one triangle.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices = ear_clip(&points);
        assert!(!indices.is_empty());
        assert_eq!(indices.len() % 3, 0);
    }

    #[test]
    fn newell_normal_of_ccw_square_points_up() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let n = newell_normal(&points);
        assert_relative_eq!(n.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn newell_normal_of_degenerate_polygon_falls_back() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert_eq!(newell_normal(&points), Vector3::z());
    }
}
