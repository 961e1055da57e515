// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Section walker and entity decoding.
//!
//! The walker recognizes the HEADER and ENTITIES sections and skips
//! everything else. Entity decoding is permissive: unknown entity types are
//! counted and skipped, missing coordinates default to zero, and a file
//! truncated mid-entity yields the entities read so far. Hard errors are
//! reserved for input that is not a DXF pair stream at all.

use std::collections::BTreeMap;
use std::path::Path;

use dxf_lite_geometry::{Entity, Mesh, Point2, Point3, Vector3};

use crate::error::{Error, Result};
use crate::reader::{CodePair, CodePairReader};
use crate::version::{peek_version, DxfVersion};

/// A parsed drawing: the detected version, the decoded entities, and a
/// histogram of entity types that were skipped.
#[derive(Debug, Default)]
pub struct DxfDocument {
    pub version: Option<DxfVersion>,
    pub entities: Vec<Entity>,
    pub skipped: BTreeMap<String, usize>,
}

/// Read and parse a DXF file from disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<DxfDocument> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&content)
}

/// Parse a DXF document from a string.
pub fn parse_str(content: &str) -> Result<DxfDocument> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("empty input".to_string()));
    }

    let mut document = DxfDocument {
        version: peek_version(content),
        ..Default::default()
    };
    if let Some(version) = &document.version {
        tracing::debug!(%version, "detected drawing version");
    }

    let mut reader = CodePairReader::new(content);
    loop {
        let pair = match reader.next_pair() {
            Ok(Some(pair)) => pair,
            Ok(None) => break,
            Err(Error::UnexpectedEof { line }) => {
                tracing::warn!(line, "file truncated, keeping entities read so far");
                break;
            }
            Err(e) => return Err(e),
        };
        if pair.code != 0 {
            continue;
        }
        match pair.value.as_str() {
            "SECTION" => {
                let name = section_name(&mut reader)?;
                if name.as_deref() == Some("ENTITIES") {
                    parse_entities(&mut reader, &mut document)?;
                }
                // Other sections fall through; the outer loop skips their
                // records until the next 0-group.
            }
            "EOF" => break,
            _ => {}
        }
    }

    if !document.skipped.is_empty() {
        tracing::debug!(skipped = ?document.skipped, "unsupported entity types");
    }
    Ok(document)
}

/// Read the `2`-group naming a just-opened section, if present.
fn section_name(reader: &mut CodePairReader<'_>) -> Result<Option<String>> {
    let name = match reader.peek_pair()? {
        Some(pair) if pair.code == 2 => pair.value.clone(),
        _ => return Ok(None),
    };
    reader.next_pair()?;
    Ok(Some(name))
}

fn parse_entities(reader: &mut CodePairReader<'_>, document: &mut DxfDocument) -> Result<()> {
    loop {
        let pair = match reader.next_pair() {
            Ok(Some(pair)) => pair,
            Ok(None) => return Ok(()),
            Err(Error::UnexpectedEof { line }) => {
                tracing::warn!(line, "entities section truncated");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if pair.code != 0 {
            continue;
        }
        match pair.value.as_str() {
            "ENDSEC" => return Ok(()),
            "POLYLINE" => {
                if let Some(entity) = decode_polyline(reader)? {
                    document.entities.push(entity);
                }
            }
            kind => {
                let Some(attrs) = collect_attributes(reader)? else {
                    return Ok(());
                };
                let entity = match kind {
                    "LINE" => Some(decode_line(&attrs)?),
                    "LWPOLYLINE" => decode_lwpolyline(&attrs)?,
                    "CIRCLE" => Some(decode_circle(&attrs)?),
                    "ARC" => Some(decode_arc(&attrs)?),
                    "ELLIPSE" => Some(decode_ellipse(&attrs)?),
                    "SPLINE" => decode_spline(&attrs)?,
                    "3DFACE" => decode_face3d(&attrs)?,
                    other => {
                        *document.skipped.entry(other.to_string()).or_insert(0) += 1;
                        None
                    }
                };
                if let Some(entity) = entity {
                    document.entities.push(entity);
                }
            }
        }
    }
}

/// Consume every pair up to (not including) the next 0-group.
///
/// Returns `None` when the stream ends mid-record; the in-flight entity is
/// incomplete and must be dropped rather than emitted half-built.
fn collect_attributes(reader: &mut CodePairReader<'_>) -> Result<Option<Vec<CodePair>>> {
    let mut attributes = Vec::new();
    loop {
        let at_boundary = match reader.peek_pair() {
            Ok(Some(pair)) => pair.code == 0,
            Ok(None) => true,
            Err(Error::UnexpectedEof { line }) => {
                tracing::warn!(line, "entity truncated, dropping it");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if at_boundary {
            return Ok(Some(attributes));
        }
        attributes.push(reader.next_pair()?.expect("peeked pair exists"));
    }
}

fn layer_of(attrs: &[CodePair]) -> String {
    attrs
        .iter()
        .find(|p| p.code == 8)
        .map(|p| p.value.clone())
        .unwrap_or_else(|| "0".to_string())
}

fn f64_of(attrs: &[CodePair], code: i32, default: f64) -> Result<f64> {
    match attrs.iter().find(|p| p.code == code) {
        Some(pair) => pair.as_f64(),
        None => Ok(default),
    }
}

fn i64_of(attrs: &[CodePair], code: i32, default: i64) -> Result<i64> {
    match attrs.iter().find(|p| p.code == code) {
        Some(pair) => pair.as_i64(),
        None => Ok(default),
    }
}

fn point_of(attrs: &[CodePair], x_code: i32) -> Result<Point3<f64>> {
    Ok(Point3::new(
        f64_of(attrs, x_code, 0.0)?,
        f64_of(attrs, x_code + 10, 0.0)?,
        f64_of(attrs, x_code + 20, 0.0)?,
    ))
}

/// Extrusion normal (groups 210/220/230), defaulting to +Z.
fn normal_of(attrs: &[CodePair]) -> Result<Vector3<f64>> {
    Ok(Vector3::new(
        f64_of(attrs, 210, 0.0)?,
        f64_of(attrs, 220, 0.0)?,
        f64_of(attrs, 230, 1.0)?,
    ))
}

fn decode_line(attrs: &[CodePair]) -> Result<Entity> {
    Ok(Entity::Line {
        layer: layer_of(attrs),
        start: point_of(attrs, 10)?,
        end: point_of(attrs, 11)?,
    })
}

fn decode_circle(attrs: &[CodePair]) -> Result<Entity> {
    Ok(Entity::Circle {
        layer: layer_of(attrs),
        center: point_of(attrs, 10)?,
        radius: f64_of(attrs, 40, 0.0)?,
        normal: normal_of(attrs)?,
    })
}

fn decode_arc(attrs: &[CodePair]) -> Result<Entity> {
    Ok(Entity::Arc {
        layer: layer_of(attrs),
        center: point_of(attrs, 10)?,
        radius: f64_of(attrs, 40, 0.0)?,
        // Angles are stored in degrees.
        start_angle: f64_of(attrs, 50, 0.0)?.to_radians(),
        end_angle: f64_of(attrs, 51, 0.0)?.to_radians(),
        normal: normal_of(attrs)?,
    })
}

fn decode_ellipse(attrs: &[CodePair]) -> Result<Entity> {
    Ok(Entity::Ellipse {
        layer: layer_of(attrs),
        center: point_of(attrs, 10)?,
        // Group 11 is the major axis endpoint relative to the center.
        major_axis: point_of(attrs, 11)?.coords,
        minor_ratio: f64_of(attrs, 40, 1.0)?,
        normal: normal_of(attrs)?,
    })
}

fn decode_lwpolyline(attrs: &[CodePair]) -> Result<Option<Entity>> {
    let mut points: Vec<Point2<f64>> = Vec::new();
    for pair in attrs {
        match pair.code {
            // Group 10 opens a vertex; 20 completes it. Bulges (42) describe
            // arc segments this pipeline renders as straight edges.
            10 => points.push(Point2::new(pair.as_f64()?, 0.0)),
            20 => {
                if let Some(last) = points.last_mut() {
                    last.y = pair.as_f64()?;
                }
            }
            _ => {}
        }
    }
    if points.is_empty() {
        return Ok(None);
    }
    let flags = i64_of(attrs, 70, 0)?;
    Ok(Some(Entity::LwPolyline {
        layer: layer_of(attrs),
        points,
        elevation: f64_of(attrs, 38, 0.0)?,
        is_closed: flags & 1 != 0,
    }))
}

fn decode_spline(attrs: &[CodePair]) -> Result<Option<Entity>> {
    let mut control_points: Vec<Point3<f64>> = Vec::new();
    for pair in attrs {
        match pair.code {
            10 => control_points.push(Point3::new(pair.as_f64()?, 0.0, 0.0)),
            20 => {
                if let Some(last) = control_points.last_mut() {
                    last.y = pair.as_f64()?;
                }
            }
            30 => {
                if let Some(last) = control_points.last_mut() {
                    last.z = pair.as_f64()?;
                }
            }
            // Knots (40) and fit points (11/21/31) are superseded by
            // resampling downstream.
            _ => {}
        }
    }
    if control_points.is_empty() {
        return Ok(None);
    }
    Ok(Some(Entity::Spline {
        layer: layer_of(attrs),
        degree: i64_of(attrs, 71, 3)?.max(1) as usize,
        control_points,
    }))
}

fn decode_face3d(attrs: &[CodePair]) -> Result<Option<Entity>> {
    let mut corners = Vec::with_capacity(4);
    for x_code in [10, 11, 12, 13] {
        if attrs.iter().any(|p| p.code == x_code) {
            corners.push(point_of(attrs, x_code)?);
        }
    }
    if corners.len() < 3 {
        return Ok(None);
    }
    Ok(Some(Entity::Face3D {
        layer: layer_of(attrs),
        corners,
    }))
}

/// Vertex record flags.
const VERTEX_FLAG_MESH_VERTEX: i64 = 64;
const VERTEX_FLAG_FACE_RECORD: i64 = 128;
/// Polyline flags.
const POLYLINE_FLAG_CLOSED: i64 = 1;
const POLYLINE_FLAG_POLYFACE: i64 = 64;

/// Decode a heavyweight POLYLINE: its own attributes, then VERTEX records
/// until SEQEND. Produces either a 3D polyline or, for polyface meshes, a
/// triangulated [`Mesh`].
fn decode_polyline(reader: &mut CodePairReader<'_>) -> Result<Option<Entity>> {
    let Some(attrs) = collect_attributes(reader)? else {
        return Ok(None);
    };
    let layer = layer_of(&attrs);
    let flags = i64_of(&attrs, 70, 0)?;

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[i64; 4]> = Vec::new();

    loop {
        let marker = match reader.peek_pair()? {
            Some(pair) if pair.code == 0 => pair.value.clone(),
            Some(_) => {
                // Stray records between members; skip.
                reader.next_pair()?;
                continue;
            }
            None => break,
        };
        match marker.as_str() {
            "VERTEX" => {
                reader.next_pair()?;
                let Some(vertex_attrs) = collect_attributes(reader)? else {
                    return Ok(None);
                };
                let vertex_flags = i64_of(&vertex_attrs, 70, 0)?;
                if vertex_flags & VERTEX_FLAG_FACE_RECORD != 0
                    && vertex_flags & VERTEX_FLAG_MESH_VERTEX == 0
                {
                    faces.push([
                        i64_of(&vertex_attrs, 71, 0)?,
                        i64_of(&vertex_attrs, 72, 0)?,
                        i64_of(&vertex_attrs, 73, 0)?,
                        i64_of(&vertex_attrs, 74, 0)?,
                    ]);
                } else {
                    vertices.push(point_of(&vertex_attrs, 10)?);
                }
            }
            "SEQEND" => {
                reader.next_pair()?;
                let _ = collect_attributes(reader)?;
                break;
            }
            // Next entity began without SEQEND; stop here and let the
            // caller handle it.
            _ => break,
        }
    }

    if flags & POLYLINE_FLAG_POLYFACE != 0 {
        return Ok(build_polyface(layer, vertices, &faces));
    }

    if vertices.is_empty() {
        return Ok(None);
    }
    Ok(Some(Entity::Polyline3D {
        layer,
        points: vertices,
        is_closed: flags & POLYLINE_FLAG_CLOSED != 0,
    }))
}

/// Assemble a polyface mesh from vertex and face records. Face indices are
/// 1-based; negative values mark invisible edges and count as references.
/// Quads split into two triangles with the source winding preserved.
fn build_polyface(layer: String, vertices: Vec<Point3<f64>>, faces: &[[i64; 4]]) -> Option<Entity> {
    let mut mesh = Mesh::new(layer);
    mesh.vertices = vertices;

    let resolve = |raw: i64| -> Option<u32> {
        let index = raw.unsigned_abs();
        if index == 0 || index as usize > mesh.vertices.len() {
            return None;
        }
        Some((index - 1) as u32)
    };

    for face in faces {
        let mut corners = Vec::with_capacity(4);
        for &raw in face {
            if raw == 0 {
                continue;
            }
            match resolve(raw) {
                Some(index) => corners.push(index),
                None => {
                    tracing::debug!(raw, "face record references a missing vertex, dropped");
                    corners.clear();
                    break;
                }
            }
        }
        match corners.len() {
            3 => mesh.indices.extend_from_slice(&corners),
            4 => {
                mesh.indices
                    .extend_from_slice(&[corners[0], corners[1], corners[2]]);
                mesh.indices
                    .extend_from_slice(&[corners[0], corners[2], corners[3]]);
            }
            _ => {}
        }
    }

    if mesh.is_empty() {
        return None;
    }
    Some(Entity::Mesh(mesh))
}
