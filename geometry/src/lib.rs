// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF-Lite Geometry Core
//!
//! Geometry preprocessing and mesh optimization for converting CAD drawings
//! into compact realtime-viewable assets:
//!
//! - **Curve tessellation**: arcs, circles and ellipses under a chord-error
//!   contract ([`tessellate`])
//! - **Spline sampling**: adaptive cubic Bezier and uniform B-spline
//!   ([`spline`])
//! - **Polyline simplification**: stack-safe Ramer-Douglas-Peucker with a
//!   chunked variant for multi-million-point inputs ([`simplify`])
//! - **Triangulation**: ear clipping with robust 3D planar projection
//!   ([`triangulate`])
//! - **Mesh optimization**: grid-based vertex clustering ([`cluster`]) and
//!   junk filtering ([`junk`])
//! - **Pipeline**: the [`Preprocessor`] orchestrates everything over a
//!   parsed entity stream
//!
//! The crate is parser-agnostic: anything that yields [`Entity`] values can
//! feed the pipeline. Processing is single threaded and deterministic.

pub mod cluster;
pub mod error;
pub mod junk;
pub mod math;
pub mod options;
pub mod preprocess;
pub mod simplify;
pub mod spline;
pub mod tessellate;
pub mod triangulate;
pub mod types;

pub use error::{Error, Result};
pub use options::PreprocessorOptions;
pub use preprocess::{Preprocessor, LARGE_POLYLINE_THRESHOLD};
pub use types::{Entity, GeometryStats, Mesh, OptimizedGeometry, Polyline};

pub use nalgebra::{Point2, Point3, Vector3};
