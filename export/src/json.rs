// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stable JSON handoff format.
//!
//! Field names are snake_case, points are `[x, y, z]` triples, the
//! reduction percentage carries two decimals, and absent values are omitted
//! rather than written as `null`. The writer pretty-prints so downstream
//! diffs stay readable.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use dxf_lite_geometry::{OptimizedGeometry, Polyline};

use crate::error::{Error, Result};

#[derive(Serialize)]
struct PolylineDto<'a> {
    layer: &'a str,
    points: Vec<[f64; 3]>,
    closed: bool,
}

#[derive(Serialize)]
struct StatsDto<'a> {
    original_vertices: usize,
    optimized_vertices: usize,
    reduction_percent: f64,
    original_entities: usize,
    optimized_polylines: usize,
    entity_counts: &'a BTreeMap<String, usize>,
}

#[derive(Serialize)]
struct GeometryDto<'a> {
    polylines: Vec<PolylineDto<'a>>,
    stats: StatsDto<'a>,
}

fn polyline_dto(polyline: &Polyline) -> PolylineDto<'_> {
    PolylineDto {
        layer: &polyline.layer,
        points: polyline.points.iter().map(|p| [p.x, p.y, p.z]).collect(),
        closed: polyline.is_closed,
    }
}

/// Serialize the geometry bundle to the handoff JSON text.
pub fn to_json_string(geometry: &OptimizedGeometry) -> Result<String> {
    let stats = &geometry.stats;
    let dto = GeometryDto {
        polylines: geometry.polylines.iter().map(polyline_dto).collect(),
        stats: StatsDto {
            original_vertices: stats.original_vertices,
            optimized_vertices: stats.optimized_vertices,
            reduction_percent: (stats.reduction_percent() * 100.0).round() / 100.0,
            original_entities: stats.original_entities,
            optimized_polylines: stats.optimized_polylines,
            entity_counts: &stats.entity_counts,
        },
    };
    Ok(serde_json::to_string_pretty(&dto)?)
}

/// Write the handoff JSON to a file.
pub fn write_json(geometry: &OptimizedGeometry, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = to_json_string(geometry)?;
    std::fs::write(path, text).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), "wrote geometry JSON");
    Ok(())
}
