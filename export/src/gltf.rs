// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary glTF 2.0 (GLB) scene writer.
//!
//! The scene carries one root node per source layer. Closed polylines are
//! triangulated into TRIANGLES primitives (or kept as line loops in
//! wireframe mode), open polylines become LINES primitives, and meshes pass
//! through as TRIANGLES. Positions are written as 32-bit floats after
//! translating the model to the origin; indices are 32-bit unsigned. Every
//! mesh gets a flat, unlit, double-sided material.

use serde::Serialize;
use std::path::Path;

use dxf_lite_geometry::triangulate::ear_clip;
use dxf_lite_geometry::{Mesh, OptimizedGeometry, Point3, Vector3};

use crate::error::{Error, Result};

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_F32: u32 = 5126;
const COMPONENT_U32: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
const MODE_LINES: u32 = 1;
const MODE_TRIANGLES: u32 = 4;

/// Cap on the number of points sampled when centering large models.
const MAX_CENTER_SAMPLES: usize = 100_000;

// ---------- glTF JSON document ----------

#[derive(Serialize)]
struct Gltf {
    asset: Asset,
    #[serde(rename = "extensionsUsed", skip_serializing_if = "Vec::is_empty")]
    extensions_used: Vec<&'static str>,
    scene: usize,
    scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meshes: Vec<GltfMesh>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    materials: Vec<Material>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews", skip_serializing_if = "Vec::is_empty")]
    buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffers: Vec<Buffer>,
}

#[derive(Serialize)]
struct Asset {
    version: &'static str,
    generator: &'static str,
}

#[derive(Serialize)]
struct Scene {
    nodes: Vec<usize>,
}

#[derive(Serialize)]
struct Node {
    name: String,
    mesh: usize,
}

#[derive(Serialize)]
struct GltfMesh {
    primitives: Vec<Primitive>,
}

#[derive(Serialize)]
struct Primitive {
    attributes: Attributes,
    indices: usize,
    mode: u32,
    material: usize,
}

#[derive(Serialize)]
struct Attributes {
    #[serde(rename = "POSITION")]
    position: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Material {
    name: String,
    pbr_metallic_roughness: PbrMetallicRoughness,
    double_sided: bool,
    extensions: MaterialExtensions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PbrMetallicRoughness {
    base_color_factor: [f32; 4],
    metallic_factor: f32,
    roughness_factor: f32,
}

#[derive(Serialize)]
struct MaterialExtensions {
    #[serde(rename = "KHR_materials_unlit")]
    unlit: Unlit,
}

#[derive(Serialize)]
struct Unlit {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    accessor_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<[f32; 3]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    byte_offset: usize,
    byte_length: usize,
    target: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    byte_length: usize,
}

// ---------- binary payload assembly ----------

#[derive(Default)]
struct BinBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl BinBuilder {
    /// Write translated f32 positions and return the accessor index.
    fn push_positions(&mut self, points: &[Point3<f64>], translation: &Vector3<f64>) -> usize {
        let offset = self.bin.len();
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in points {
            let shifted = [
                (p.x + translation.x) as f32,
                (p.y + translation.y) as f32,
                (p.z + translation.z) as f32,
            ];
            for axis in 0..3 {
                min[axis] = min[axis].min(shifted[axis]);
                max[axis] = max[axis].max(shifted[axis]);
                self.bin.extend_from_slice(&shifted[axis].to_le_bytes());
            }
        }
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: offset,
            byte_length: self.bin.len() - offset,
            target: TARGET_ARRAY_BUFFER,
        });
        self.accessors.push(Accessor {
            buffer_view: self.buffer_views.len() - 1,
            component_type: COMPONENT_F32,
            count: points.len(),
            accessor_type: "VEC3",
            min: Some(min),
            max: Some(max),
        });
        self.accessors.len() - 1
    }

    /// Write u32 indices and return the accessor index.
    fn push_indices(&mut self, indices: &[u32]) -> usize {
        let offset = self.bin.len();
        for &index in indices {
            self.bin.extend_from_slice(&index.to_le_bytes());
        }
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: offset,
            byte_length: self.bin.len() - offset,
            target: TARGET_ELEMENT_ARRAY_BUFFER,
        });
        self.accessors.push(Accessor {
            buffer_view: self.buffer_views.len() - 1,
            component_type: COMPONENT_U32,
            count: indices.len(),
            accessor_type: "SCALAR",
            min: None,
            max: None,
        });
        self.accessors.len() - 1
    }
}

/// Geometry waiting to become one glTF primitive.
enum PrimitiveSource<'a> {
    Triangles {
        points: &'a [Point3<f64>],
        indices: Vec<u32>,
    },
    Lines {
        points: &'a [Point3<f64>],
        closed: bool,
    },
}

/// Build the GLB byte stream for an optimized geometry bundle.
pub fn to_glb_bytes(geometry: &OptimizedGeometry, wireframe: bool) -> Result<Vec<u8>> {
    let translation = -center_of(geometry).coords;

    // Group primitive sources per layer, first-seen order.
    let mut layers: Vec<(String, Vec<PrimitiveSource<'_>>)> = Vec::new();
    for polyline in &geometry.polylines {
        let Some(source) = polyline_primitive(polyline.is_closed, &polyline.points, wireframe)
        else {
            continue;
        };
        let slot = slot_for(&mut layers, &polyline.layer);
        layers[slot].1.push(source);
    }
    for mesh in &geometry.meshes {
        if mesh.is_empty() {
            continue;
        }
        let slot = slot_for(&mut layers, &mesh.layer);
        layers[slot].1.push(mesh_primitive(mesh));
    }

    let mut bin = BinBuilder::default();
    let mut nodes = Vec::new();
    let mut meshes = Vec::new();
    let mut materials = Vec::new();

    for (layer, sources) in &layers {
        if sources.is_empty() {
            continue;
        }
        let material = materials.len();
        materials.push(flat_material(layer));

        let mut primitives = Vec::with_capacity(sources.len());
        for source in sources {
            primitives.push(build_primitive(source, &mut bin, &translation, material));
        }
        nodes.push(Node {
            name: layer.clone(),
            mesh: meshes.len(),
        });
        meshes.push(GltfMesh { primitives });
    }

    let buffers = if bin.bin.is_empty() {
        Vec::new()
    } else {
        vec![Buffer {
            byte_length: bin.bin.len(),
        }]
    };

    let document = Gltf {
        asset: Asset {
            version: "2.0",
            generator: "dxf-lite",
        },
        extensions_used: if materials.is_empty() {
            Vec::new()
        } else {
            vec!["KHR_materials_unlit"]
        },
        scene: 0,
        scenes: vec![Scene {
            nodes: (0..nodes.len()).collect(),
        }],
        nodes,
        meshes,
        materials,
        accessors: bin.accessors,
        buffer_views: bin.buffer_views,
        buffers,
    };

    Ok(assemble_glb(&document, bin.bin)?)
}

/// Write a GLB file.
pub fn write_glb(
    geometry: &OptimizedGeometry,
    path: impl AsRef<Path>,
    wireframe: bool,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_glb_bytes(geometry, wireframe)?;
    std::fs::write(path, &bytes).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote GLB");
    Ok(())
}

/// Index of `name` in the layer list, appending it on first sight.
fn slot_for<T>(layers: &mut Vec<(String, Vec<T>)>, name: &str) -> usize {
    match layers.iter().position(|(layer, _)| layer == name) {
        Some(slot) => slot,
        None => {
            layers.push((name.to_string(), Vec::new()));
            layers.len() - 1
        }
    }
}

fn polyline_primitive(
    closed: bool,
    points: &[Point3<f64>],
    wireframe: bool,
) -> Option<PrimitiveSource<'_>> {
    if points.len() < 2 {
        return None;
    }
    if closed && !wireframe && points.len() >= 3 {
        let indices = ear_clip(points);
        if !indices.is_empty() {
            return Some(PrimitiveSource::Triangles { points, indices });
        }
    }
    Some(PrimitiveSource::Lines { points, closed })
}

fn mesh_primitive(mesh: &Mesh) -> PrimitiveSource<'_> {
    PrimitiveSource::Triangles {
        points: &mesh.vertices,
        indices: mesh.indices.clone(),
    }
}

fn build_primitive(
    source: &PrimitiveSource<'_>,
    bin: &mut BinBuilder,
    translation: &Vector3<f64>,
    material: usize,
) -> Primitive {
    match source {
        PrimitiveSource::Triangles { points, indices } => Primitive {
            attributes: Attributes {
                position: bin.push_positions(points, translation),
            },
            indices: bin.push_indices(indices),
            mode: MODE_TRIANGLES,
            material,
        },
        PrimitiveSource::Lines { points, closed } => {
            let mut indices = Vec::with_capacity(points.len() * 2);
            for i in 0..points.len() as u32 - 1 {
                indices.extend_from_slice(&[i, i + 1]);
            }
            if *closed {
                indices.extend_from_slice(&[points.len() as u32 - 1, 0]);
            }
            Primitive {
                attributes: Attributes {
                    position: bin.push_positions(points, translation),
                },
                indices: bin.push_indices(&indices),
                mode: MODE_LINES,
                material,
            }
        }
    }
}

fn flat_material(layer: &str) -> Material {
    Material {
        name: layer.to_string(),
        pbr_metallic_roughness: PbrMetallicRoughness {
            base_color_factor: [0.8, 0.8, 0.8, 1.0],
            metallic_factor: 0.0,
            roughness_factor: 1.0,
        },
        double_sided: true,
        extensions: MaterialExtensions { unlit: Unlit {} },
    }
}

/// AABB center over at most [`MAX_CENTER_SAMPLES`] points sampled uniformly
/// across polylines and meshes.
fn center_of(geometry: &OptimizedGeometry) -> Point3<f64> {
    let total: usize = geometry.polylines.iter().map(|p| p.points.len()).sum::<usize>()
        + geometry.meshes.iter().map(|m| m.vertex_count()).sum::<usize>();
    if total == 0 {
        return Point3::origin();
    }
    let stride = (total / MAX_CENTER_SAMPLES).max(1);

    let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
    let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);
    let all_points = geometry
        .polylines
        .iter()
        .flat_map(|p| p.points.iter())
        .chain(geometry.meshes.iter().flat_map(|m| m.vertices.iter()));
    for p in all_points.step_by(stride) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }
    Point3::new(
        (min.x + max.x) / 2.0,
        (min.y + max.y) / 2.0,
        (min.z + max.z) / 2.0,
    )
}

/// Assemble the two-chunk GLB container: JSON padded with spaces, binary
/// payload padded with zeros, both to 4-byte boundaries.
fn assemble_glb(document: &Gltf, mut bin: Vec<u8>) -> serde_json::Result<Vec<u8>> {
    let mut json = serde_json::to_vec(document)?;
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let mut total = 12 + 8 + json.len();
    if !bin.is_empty() {
        total += 8 + bin.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);

    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf_lite_geometry::Polyline;

    fn sample_geometry() -> OptimizedGeometry {
        let open = Polyline::new(
            "edges",
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
            ],
            false,
        );
        let closed = Polyline::new(
            "fills",
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            true,
        );
        let mut mesh = Mesh::new("solids");
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        mesh.indices = vec![0, 1, 2];

        OptimizedGeometry {
            polylines: vec![open, closed],
            meshes: vec![mesh],
            stats: Default::default(),
        }
    }

    fn json_chunk(bytes: &[u8]) -> serde_json::Value {
        assert_eq!(&bytes[0..4], b"glTF");
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(version, 2);
        let total = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(total as usize, bytes.len());

        let json_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        assert_eq!(&bytes[16..20], b"JSON");
        assert_eq!(json_len % 4, 0);
        serde_json::from_slice(&bytes[20..20 + json_len]).unwrap()
    }

    #[test]
    fn container_layout_is_valid() {
        let bytes = to_glb_bytes(&sample_geometry(), false).unwrap();
        let json = json_chunk(&bytes);
        assert_eq!(json["asset"]["version"], "2.0");

        // BIN chunk follows, 4-byte aligned.
        let json_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        let bin_header = 20 + json_len;
        let bin_len = u32::from_le_bytes(bytes[bin_header..bin_header + 4].try_into().unwrap());
        assert_eq!(&bytes[bin_header + 4..bin_header + 8], b"BIN\0");
        assert_eq!(bin_len % 4, 0);
        assert_eq!(
            json["buffers"][0]["byteLength"].as_u64().unwrap() as usize,
            bin_len as usize
        );
    }

    #[test]
    fn one_node_per_layer_with_matching_modes() {
        let bytes = to_glb_bytes(&sample_geometry(), false).unwrap();
        let json = json_chunk(&bytes);

        let nodes = json["nodes"].as_array().unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["edges", "fills", "solids"]);

        // Open polyline renders as LINES, closed as TRIANGLES, mesh as
        // TRIANGLES.
        let mode_of = |node: usize| {
            let mesh = json["nodes"][node]["mesh"].as_u64().unwrap() as usize;
            json["meshes"][mesh]["primitives"][0]["mode"].as_u64().unwrap() as u32
        };
        assert_eq!(mode_of(0), MODE_LINES);
        assert_eq!(mode_of(1), MODE_TRIANGLES);
        assert_eq!(mode_of(2), MODE_TRIANGLES);

        // The closed square triangulated into 2 triangles.
        let fills_mesh = json["nodes"][1]["mesh"].as_u64().unwrap() as usize;
        let indices_accessor =
            json["meshes"][fills_mesh]["primitives"][0]["indices"].as_u64().unwrap() as usize;
        assert_eq!(json["accessors"][indices_accessor]["count"], 6);
    }

    #[test]
    fn wireframe_keeps_closed_polylines_as_line_loops() {
        let bytes = to_glb_bytes(&sample_geometry(), true).unwrap();
        let json = json_chunk(&bytes);
        let fills_mesh = json["nodes"][1]["mesh"].as_u64().unwrap() as usize;
        let primitive = &json["meshes"][fills_mesh]["primitives"][0];
        assert_eq!(primitive["mode"].as_u64().unwrap() as u32, MODE_LINES);

        // 4 edges including the closing one: 8 indices.
        let indices_accessor = primitive["indices"].as_u64().unwrap() as usize;
        assert_eq!(json["accessors"][indices_accessor]["count"], 8);
    }

    #[test]
    fn geometry_is_centered_at_the_origin() {
        let bytes = to_glb_bytes(&sample_geometry(), false).unwrap();
        let json = json_chunk(&bytes);

        let mut low = [f64::MAX; 3];
        let mut high = [f64::MIN; 3];
        for accessor in json["accessors"].as_array().unwrap() {
            if accessor["type"] == "VEC3" {
                for axis in 0..3 {
                    low[axis] = low[axis].min(accessor["min"][axis].as_f64().unwrap());
                    high[axis] = high[axis].max(accessor["max"][axis].as_f64().unwrap());
                }
            }
        }
        for axis in 0..3 {
            let center = (low[axis] + high[axis]) / 2.0;
            assert!(center.abs() < 1e-6, "axis {axis} center {center}");
        }
    }

    #[test]
    fn materials_are_unlit_and_double_sided() {
        let bytes = to_glb_bytes(&sample_geometry(), false).unwrap();
        let json = json_chunk(&bytes);
        assert_eq!(json["extensionsUsed"][0], "KHR_materials_unlit");
        for material in json["materials"].as_array().unwrap() {
            assert_eq!(material["doubleSided"], true);
            assert!(material["extensions"]["KHR_materials_unlit"].is_object());
        }
        // One material per mesh.
        assert_eq!(
            json["materials"].as_array().unwrap().len(),
            json["meshes"].as_array().unwrap().len()
        );
    }

    #[test]
    fn empty_geometry_is_a_json_only_glb() {
        let geometry = OptimizedGeometry::default();
        let bytes = to_glb_bytes(&geometry, false).unwrap();
        let json = json_chunk(&bytes);
        assert_eq!(json["scenes"][0]["nodes"].as_array().unwrap().len(), 0);
        assert!(json.get("buffers").is_none());
        // No BIN chunk at all.
        let json_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), 20 + json_len);
    }
}
