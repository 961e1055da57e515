// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arc, circle and ellipse tessellation.
//!
//! Parametric curves become polylines under a chord-error contract: the
//! segment count is derived from the largest angle step whose chord deviates
//! from the true curve by at most the requested error, then clamped into the
//! caller's `[min, max]` window. Every degenerate input still produces a
//! valid polyline of at least `min + 1` points.

use nalgebra::{Point3, Vector3};
use std::f64::consts::TAU;

use crate::math::plane_basis;

/// Number of segments needed to keep the chord error of a circular sweep
/// below `chord_error`, clamped into `[min_segments, max_segments]`.
///
/// A non-positive radius or chord error yields `min_segments`; a chord error
/// so large that the angle-per-segment bound collapses yields `max_segments`.
pub fn segment_count(
    radius: f64,
    chord_error: f64,
    sweep: f64,
    min_segments: usize,
    max_segments: usize,
) -> usize {
    if radius <= 0.0 || chord_error <= 0.0 {
        return min_segments;
    }
    // Chord error e at radius r allows at most 2*acos(1 - e/r) per segment.
    let cos_half = (1.0 - chord_error / radius).clamp(-1.0, 1.0);
    let max_angle_per_segment = 2.0 * cos_half.acos();
    if max_angle_per_segment <= 0.0 {
        return max_segments;
    }
    let n = (sweep / max_angle_per_segment).ceil() as usize;
    n.clamp(min_segments, max_segments)
}

/// Sweep from `start_angle` to `end_angle`, normalized to `[0, 2*pi]` by
/// adding a full turn when the raw difference is negative.
#[inline]
pub fn sweep_angle(start_angle: f64, end_angle: f64) -> f64 {
    let mut sweep = end_angle - start_angle;
    if sweep < 0.0 {
        sweep += TAU;
    }
    sweep
}

/// Tessellate a circular arc into `n + 1` points.
///
/// Angles are radians measured in the plane basis derived from `normal`
/// (which the caller need not normalize). The output always starts at
/// `start_angle` and ends at `end_angle`.
pub fn tessellate_arc(
    center: &Point3<f64>,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    normal: &Vector3<f64>,
    chord_error: f64,
    min_segments: usize,
    max_segments: usize,
) -> Vec<Point3<f64>> {
    let sweep = sweep_angle(start_angle, end_angle);
    let n = segment_count(radius, chord_error, sweep, min_segments, max_segments);
    let (u, v) = plane_basis(normal);

    let step = sweep / n as f64;
    let mut points = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let theta = start_angle + step * i as f64;
        points.push(center + u * (radius * theta.cos()) + v * (radius * theta.sin()));
    }
    points
}

/// Tessellate a full circle. The first and last points coincide.
pub fn tessellate_circle(
    center: &Point3<f64>,
    radius: f64,
    normal: &Vector3<f64>,
    chord_error: f64,
    min_segments: usize,
    max_segments: usize,
) -> Vec<Point3<f64>> {
    tessellate_arc(
        center,
        radius,
        0.0,
        TAU,
        normal,
        chord_error,
        min_segments,
        max_segments,
    )
}

/// Tessellate a full ellipse.
///
/// The segment estimate uses the larger radius, and the clamp window is
/// doubled relative to circular arcs since an ellipse covers a full turn with
/// uneven curvature. `rotation` turns the basis in-plane so the major axis
/// lands where the source had it.
pub fn tessellate_ellipse(
    center: &Point3<f64>,
    major_radius: f64,
    minor_radius: f64,
    rotation: f64,
    normal: &Vector3<f64>,
    chord_error: f64,
    min_segments: usize,
    max_segments: usize,
) -> Vec<Point3<f64>> {
    let n = segment_count(
        major_radius.max(minor_radius),
        chord_error,
        TAU,
        min_segments * 2,
        max_segments * 2,
    );
    let (u, v) = plane_basis(normal);
    let (sin_r, cos_r) = rotation.sin_cos();
    let major_dir = u * cos_r - v * sin_r;
    let minor_dir = u * sin_r + v * cos_r;

    let step = TAU / n as f64;
    let mut points = Vec::with_capacity(n + 1);
    for i in 0..=n {
        let theta = step * i as f64;
        points.push(
            center + major_dir * (major_radius * theta.cos()) + minor_dir * (minor_radius * theta.sin()),
        );
    }
    points
}
