// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors observable at the core boundary.
///
/// Degenerate geometry and numerical edge cases are absorbed with documented
/// fallbacks and never surface here; these variants only fire on violated
/// structural preconditions in caller-supplied data.
#[derive(Error, Debug)]
pub enum Error {
    #[error("mesh on layer {layer:?} has {indices} indices, which is not a multiple of 3")]
    MalformedMesh { layer: String, indices: usize },

    #[error("mesh on layer {layer:?} references vertex {index} but only has {vertices} vertices")]
    IndexOutOfBounds {
        layer: String,
        index: u32,
        vertices: usize,
    },
}
