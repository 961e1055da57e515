// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # DXF-Lite Parser
//!
//! Hand-written reader for ASCII DXF drawings. The format is a flat stream
//! of group-code/value line pairs; this crate tokenizes that stream
//! ([`reader`]), detects the drawing version from the header ([`version`]),
//! walks the ENTITIES section, and decodes the supported entity types into
//! [`dxf_lite_geometry::Entity`] values ([`document`]).
//!
//! The reader is deliberately permissive: unknown entity types and sections
//! are skipped with counters, missing attributes take their documented
//! defaults, and truncated files yield the entities read so far. Hard
//! failures are limited to input that is not a DXF pair stream at all.

pub mod document;
pub mod error;
pub mod reader;
pub mod version;

pub use document::{parse_file, parse_str, DxfDocument};
pub use error::{Error, Result};
pub use reader::{CodePair, CodePairReader};
pub use version::{peek_version, DxfVersion, VERSION_PEEK_LINES};
