// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preprocessor configuration.

/// Tuning knobs for the preprocessing pipeline. All fields have working
/// defaults; distances are in source units.
#[derive(Debug, Clone)]
pub struct PreprocessorOptions {
    /// Polyline simplification tolerance. Default: 0.1
    pub polyline_epsilon: f64,

    /// Maximum chord error when tessellating arcs, circles and ellipses.
    /// Default: 0.01
    pub arc_chord_error: f64,

    /// Flatness threshold for adaptive Bezier subdivision. Default: 0.05
    pub spline_tolerance: f64,

    /// Merge threshold for consecutive near-identical polyline points.
    /// 0 disables the merge pass. Default: 0.001
    pub merge_distance: f64,

    /// Layer allowlist, matched case-insensitively. `None` keeps all layers.
    pub include_layers: Option<Vec<String>>,

    /// Lower clamp on arc tessellation segment counts. Default: 8
    pub min_arc_segments: usize,

    /// Upper clamp on arc tessellation segment counts. Default: 128
    pub max_arc_segments: usize,

    /// Vertex clustering grid resolution, clamped to `[32, 1024]`.
    /// `None` disables decimation. Default: `None`
    pub decimate_grid: Option<u32>,

    /// Enable the outlier cull + island removal pass on meshes.
    /// Default: false
    pub junk_filter: bool,

    /// Connected components smaller than this many triangles are removed by
    /// the junk filter. Default: 100
    pub min_island_triangles: usize,

    /// Fraction of coordinates kept per axis by the percentile bounding box.
    /// Default: 0.95
    pub cull_percentile: f64,

    /// Bounding box expansion as a fraction of each axis extent.
    /// Default: 0.10
    pub cull_padding: f64,
}

impl Default for PreprocessorOptions {
    fn default() -> Self {
        Self {
            polyline_epsilon: 0.1,
            arc_chord_error: 0.01,
            spline_tolerance: 0.05,
            merge_distance: 0.001,
            include_layers: None,
            min_arc_segments: 8,
            max_arc_segments: 128,
            decimate_grid: None,
            junk_filter: false,
            min_island_triangles: 100,
            cull_percentile: 0.95,
            cull_padding: 0.10,
        }
    }
}
