// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a DXF file.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a DXF document: {0}")]
    InvalidInput(String),

    #[error("line {line}: expected an integer group code, found {found:?}")]
    BadGroupCode { line: usize, found: String },

    #[error("line {line}: group {code} has non-numeric value {value:?}")]
    BadNumber {
        line: usize,
        code: i32,
        value: String,
    },

    #[error("unexpected end of file after group code on line {line}")]
    UnexpectedEof { line: usize },
}
