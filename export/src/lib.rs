// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF-Lite Export
//!
//! Writers for the two output formats:
//!
//! - [`json`]: the stable snake_case JSON handoff (polylines + statistics)
//! - [`gltf`]: binary glTF 2.0 scenes with one root node per layer

pub mod error;
pub mod gltf;
pub mod json;

pub use error::{Error, Result};
pub use gltf::{to_glb_bytes, write_glb};
pub use json::{to_json_string, write_json};
