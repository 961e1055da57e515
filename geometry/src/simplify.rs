// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ramer-Douglas-Peucker polyline simplification.
//!
//! Two entry points: [`simplify`] runs the classic farthest-point algorithm
//! on an explicit work stack (inputs can exceed a million points, so call
//! recursion is off the table), and [`simplify_chunked`] windows very large
//! inputs, simplifying each window independently and stitching at shared
//! seam points while reporting progress.

use nalgebra::Point3;

use crate::math::perpendicular_distance;

/// Window size used by the preprocessor for oversized polylines.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Progress observer for chunked simplification: `(points_processed, total)`.
pub type ProgressFn<'a> = &'a dyn Fn(usize, usize);

/// Simplify a polyline, keeping every removed point within `epsilon` of the
/// surviving segments.
///
/// The first and last input points are always kept, output order matches
/// input order, and the result is deterministic for fixed input.
pub fn simplify(points: &[Point3<f64>], epsilon: f64) -> Vec<Point3<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut max_distance = 0.0;
        let mut pivot = start;
        for i in start + 1..end {
            let d = perpendicular_distance(&points[i], &points[start], &points[end]);
            if d > max_distance {
                max_distance = d;
                pivot = i;
            }
        }
        if max_distance > epsilon {
            keep[pivot] = true;
            stack.push((start, pivot));
            stack.push((pivot, end));
        }
    }

    points
        .iter()
        .zip(&keep)
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

/// Simplify a very large polyline in windows.
///
/// Inputs up to `2 * chunk_size` points go through [`simplify`] directly.
/// Beyond that the polyline is cut into windows of `chunk_size + overlap`
/// points (overlap is `chunk_size / 10` capped at 1000) where consecutive
/// windows share exactly one seam point; each window simplifies on its own
/// and the shared seam is emitted once. The last input point is always
/// present in the output, and `progress` is invoked after every window.
pub fn simplify_chunked(
    points: &[Point3<f64>],
    epsilon: f64,
    chunk_size: usize,
    progress: Option<ProgressFn<'_>>,
) -> Vec<Point3<f64>> {
    let total = points.len();
    let chunk_size = chunk_size.max(2);
    if total <= chunk_size * 2 {
        let out = simplify(points, epsilon);
        if let Some(report) = progress {
            report(total, total);
        }
        return out;
    }

    let overlap = (chunk_size / 10).min(1000);
    let window = chunk_size + overlap;
    let mut out: Vec<Point3<f64>> = Vec::new();
    let mut start = 0usize;
    let mut chunks = 0usize;

    loop {
        let end = (start + window).min(total);
        let piece = simplify(&points[start..end], epsilon);
        if start == 0 {
            out.extend(piece);
        } else {
            // The window starts on the seam point the previous window already
            // emitted as its endpoint.
            out.extend(piece.into_iter().skip(1));
        }
        chunks += 1;
        if let Some(report) = progress {
            report(end, total);
        }
        if end == total {
            break;
        }
        start = end - 1;
    }

    if out.last() != points.last() {
        out.push(points[total - 1]);
    }
    tracing::debug!(
        input = total,
        output = out.len(),
        chunks,
        "chunked polyline simplification finished"
    );
    out
}
