// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drawing version detection.
//!
//! The header variable `$ACADVER` names the file format generation. The peek
//! is bounded: it scans at most [`VERSION_PEEK_LINES`] lines so a corrupt or
//! enormous header cannot stall startup. An absent or unknown version is
//! fine; the reader is permissive either way and the version is only used
//! for diagnostics.

use std::fmt;

/// Maximum number of lines scanned while looking for `$ACADVER`.
pub const VERSION_PEEK_LINES: usize = 2000;

/// Known drawing format generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DxfVersion {
    R12,
    R2000,
    R2004,
    R2007,
    R2010,
    R2013,
    R2018,
    /// A marker this reader does not recognize, kept verbatim.
    Other(String),
}

impl DxfVersion {
    /// Map an `$ACADVER` marker like `AC1027` to a version.
    pub fn from_acadver(marker: &str) -> Self {
        match marker {
            "AC1009" => DxfVersion::R12,
            "AC1015" => DxfVersion::R2000,
            "AC1018" => DxfVersion::R2004,
            "AC1021" => DxfVersion::R2007,
            "AC1024" => DxfVersion::R2010,
            "AC1027" => DxfVersion::R2013,
            "AC1032" => DxfVersion::R2018,
            other => DxfVersion::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DxfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DxfVersion::R12 => write!(f, "R12"),
            DxfVersion::R2000 => write!(f, "R2000"),
            DxfVersion::R2004 => write!(f, "R2004"),
            DxfVersion::R2007 => write!(f, "R2007"),
            DxfVersion::R2010 => write!(f, "R2010"),
            DxfVersion::R2013 => write!(f, "R2013"),
            DxfVersion::R2018 => write!(f, "R2018"),
            DxfVersion::Other(marker) => write!(f, "unknown ({marker})"),
        }
    }
}

/// Scan the head of the document for `$ACADVER` and return the version.
///
/// Looks at raw lines rather than decoded pairs so it works on files whose
/// body would not survive full parsing.
pub fn peek_version(content: &str) -> Option<DxfVersion> {
    let mut lines = content.lines().take(VERSION_PEEK_LINES);
    while let Some(line) = lines.next() {
        if line.trim() != "$ACADVER" {
            continue;
        }
        // The variable is followed by a group 1 record carrying the marker.
        for candidate in lines.by_ref().take(4) {
            let candidate = candidate.trim();
            if candidate.starts_with("AC") {
                return Some(DxfVersion::from_acadver(candidate));
            }
        }
        return None;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_version_in_a_header() {
        let content = "0\nSECTION\n2\nHEADER\n9\n$ACADVER\n1\nAC1027\n0\nENDSEC\n";
        assert_eq!(peek_version(content), Some(DxfVersion::R2013));
    }

    #[test]
    fn unknown_markers_are_preserved() {
        let content = "9\n$ACADVER\n1\nAC9999\n";
        assert_eq!(
            peek_version(content),
            Some(DxfVersion::Other("AC9999".to_string()))
        );
    }

    #[test]
    fn missing_version_is_none() {
        assert_eq!(peek_version("0\nSECTION\n2\nENTITIES\n"), None);
    }

    #[test]
    fn peek_is_bounded() {
        let mut content = "0\nfiller\n".repeat(VERSION_PEEK_LINES);
        content.push_str("9\n$ACADVER\n1\nAC1015\n");
        assert_eq!(peek_version(&content), None);
    }
}
