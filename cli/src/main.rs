// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DXF-Lite command line front end.
//!
//! Parses a DXF drawing, runs the preprocessing pipeline, and writes either
//! the JSON handoff or a binary glTF scene. Exits non-zero on missing files
//! and parse failures.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use dxf_lite_geometry::{Preprocessor, PreprocessorOptions};

#[derive(Parser, Debug)]
#[command(name = "dxf-lite", version, about = "Convert DXF drawings to compact 3D assets")]
struct Args {
    /// Input DXF file.
    input: PathBuf,

    /// Output path. Defaults to the input with a .json or .glb extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a binary glTF scene instead of the JSON handoff.
    #[arg(short, long)]
    glb: bool,

    /// Keep closed outlines as line loops instead of filled triangles.
    #[arg(short, long)]
    wireframe: bool,

    /// Remove outlier geometry and small disconnected islands from meshes.
    #[arg(short = 'j', long = "junk-filter")]
    junk_filter: bool,

    /// Decimate meshes by vertex clustering at this grid resolution
    /// (32-1024).
    #[arg(short = 'd', long = "decimate", value_parser = clap::value_parser!(u32).range(32..=1024))]
    decimate: Option<u32>,

    /// Minimum triangle count for a connected component to survive the junk
    /// filter.
    #[arg(long = "min-component", default_value_t = 100)]
    min_component: usize,

    /// Only convert these layers (comma separated, case insensitive).
    #[arg(short = 'l', long = "layers", value_delimiter = ',')]
    layers: Vec<String>,

    /// Polyline simplification tolerance in drawing units.
    #[arg(short = 'e', long = "epsilon", default_value_t = 0.1)]
    epsilon: f64,

    /// Maximum chord error for arc and ellipse tessellation.
    #[arg(long = "arc-error", default_value_t = 0.01)]
    arc_error: f64,

    /// Flatness tolerance for spline sampling.
    #[arg(long = "spline-tol", default_value_t = 0.05)]
    spline_tol: f64,

    /// Merge distance for near-duplicate polyline points; 0 disables.
    #[arg(long = "merge", default_value_t = 0.001)]
    merge: f64,
}

fn options_from_args(args: &Args) -> PreprocessorOptions {
    PreprocessorOptions {
        polyline_epsilon: args.epsilon,
        arc_chord_error: args.arc_error,
        spline_tolerance: args.spline_tol,
        merge_distance: args.merge,
        include_layers: if args.layers.is_empty() {
            None
        } else {
            Some(args.layers.clone())
        },
        decimate_grid: args.decimate,
        junk_filter: args.junk_filter,
        min_island_triangles: args.min_component,
        ..Default::default()
    }
}

fn output_path(args: &Args) -> PathBuf {
    match &args.output {
        Some(path) => path.clone(),
        None => {
            let extension = if args.glb { "glb" } else { "json" };
            args.input.with_extension(extension)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let started = Instant::now();

    let document = dxf_lite_parser::parse_file(&args.input)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    if let Some(version) = &document.version {
        tracing::info!(%version, entities = document.entities.len(), "parsed drawing");
    } else {
        tracing::info!(entities = document.entities.len(), "parsed drawing (no version header)");
    }

    let preprocessor = Preprocessor::new(options_from_args(&args));
    let geometry = preprocessor
        .process(document.entities)
        .context("preprocessing failed")?;

    let output = output_path(&args);
    if args.glb {
        dxf_lite_export::write_glb(&geometry, &output, args.wireframe)
            .with_context(|| format!("failed to write {}", output.display()))?;
    } else {
        dxf_lite_export::write_json(&geometry, &output)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    let stats = &geometry.stats;
    tracing::info!(
        output = %output.display(),
        entities = stats.original_entities,
        polylines = stats.optimized_polylines,
        meshes = stats.mesh_count,
        vertices_before = stats.original_vertices,
        vertices_after = stats.optimized_vertices,
        reduction_percent = format!("{:.2}", stats.reduction_percent()),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "conversion finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_one_to_one() {
        let args = Args::parse_from([
            "dxf-lite",
            "model.dxf",
            "--glb",
            "-j",
            "-d",
            "128",
            "--min-component",
            "50",
            "-l",
            "Walls,Doors",
            "-e",
            "0.25",
            "--arc-error",
            "0.02",
            "--spline-tol",
            "0.1",
            "--merge",
            "0",
        ]);
        let options = options_from_args(&args);
        assert_eq!(options.polyline_epsilon, 0.25);
        assert_eq!(options.arc_chord_error, 0.02);
        assert_eq!(options.spline_tolerance, 0.1);
        assert_eq!(options.merge_distance, 0.0);
        assert_eq!(options.decimate_grid, Some(128));
        assert!(options.junk_filter);
        assert_eq!(options.min_island_triangles, 50);
        assert_eq!(
            options.include_layers,
            Some(vec!["Walls".to_string(), "Doors".to_string()])
        );
    }

    #[test]
    fn defaults_match_the_pipeline_defaults() {
        let args = Args::parse_from(["dxf-lite", "model.dxf"]);
        let options = options_from_args(&args);
        let defaults = PreprocessorOptions::default();
        assert_eq!(options.polyline_epsilon, defaults.polyline_epsilon);
        assert_eq!(options.arc_chord_error, defaults.arc_chord_error);
        assert_eq!(options.spline_tolerance, defaults.spline_tolerance);
        assert_eq!(options.merge_distance, defaults.merge_distance);
        assert_eq!(options.include_layers, None);
        assert_eq!(options.decimate_grid, None);
        assert!(!options.junk_filter);
    }

    #[test]
    fn output_path_follows_the_format_flag() {
        let json_args = Args::parse_from(["dxf-lite", "plans/model.dxf"]);
        assert_eq!(output_path(&json_args), PathBuf::from("plans/model.json"));

        let glb_args = Args::parse_from(["dxf-lite", "plans/model.dxf", "--glb"]);
        assert_eq!(output_path(&glb_args), PathBuf::from("plans/model.glb"));

        let explicit = Args::parse_from(["dxf-lite", "model.dxf", "-o", "out/scene.glb", "-g"]);
        assert_eq!(output_path(&explicit), PathBuf::from("out/scene.glb"));
    }

    #[test]
    fn rejects_out_of_range_decimation() {
        assert!(Args::try_parse_from(["dxf-lite", "model.dxf", "-d", "8"]).is_err());
        assert!(Args::try_parse_from(["dxf-lite", "model.dxf", "-d", "4096"]).is_err());
        assert!(Args::try_parse_from(["dxf-lite", "model.dxf", "-d", "1024"]).is_ok());
    }
}
