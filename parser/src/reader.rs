// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Group-code pair reader.
//!
//! ASCII DXF is a flat stream of two-line records: an integer group code
//! followed by its value. Everything above this layer (sections, entities,
//! the header) is interpretation; the reader only yields pairs, tracks line
//! numbers for diagnostics, and tolerates CR/LF endings and stray blank
//! value lines.

use crate::error::{Error, Result};

/// One group-code/value record.
#[derive(Debug, Clone, PartialEq)]
pub struct CodePair {
    pub code: i32,
    pub value: String,
    /// 1-based line number of the group code line.
    pub line: usize,
}

impl CodePair {
    /// Parse the value as f64.
    pub fn as_f64(&self) -> Result<f64> {
        self.value.parse().map_err(|_| Error::BadNumber {
            line: self.line,
            code: self.code,
            value: self.value.clone(),
        })
    }

    /// Parse the value as i64.
    pub fn as_i64(&self) -> Result<i64> {
        self.value.parse().map_err(|_| Error::BadNumber {
            line: self.line,
            code: self.code,
            value: self.value.clone(),
        })
    }
}

/// Pull-based reader over the pair stream with one pair of lookahead.
pub struct CodePairReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
    peeked: Option<Option<CodePair>>,
}

impl<'a> CodePairReader<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines(),
            line_number: 0,
            peeked: None,
        }
    }

    /// Next pair, or `None` at end of input.
    pub fn next_pair(&mut self) -> Result<Option<CodePair>> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(peeked);
        }
        self.read_pair()
    }

    /// Look at the next pair without consuming it.
    pub fn peek_pair(&mut self) -> Result<Option<&CodePair>> {
        if self.peeked.is_none() {
            let pair = self.read_pair()?;
            self.peeked = Some(pair);
        }
        Ok(self.peeked.as_ref().and_then(|p| p.as_ref()))
    }

    fn read_pair(&mut self) -> Result<Option<CodePair>> {
        let code_line = loop {
            let Some(raw) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                break trimmed.to_string();
            }
            // Blank lines between records happen in hand-edited files.
        };
        let line = self.line_number;

        let code: i32 = code_line.parse().map_err(|_| Error::BadGroupCode {
            line,
            found: code_line.clone(),
        })?;

        let Some(raw_value) = self.lines.next() else {
            return Err(Error::UnexpectedEof { line });
        };
        self.line_number += 1;
        // Values keep interior whitespace (layer names may contain spaces)
        // but shed line-ending artifacts and DXF's leading padding.
        let value = raw_value.trim().to_string();

        Ok(Some(CodePair { code, value, line }))
    }
}
