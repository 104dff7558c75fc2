// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-offset tail reading of a growing log file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Reads a log file incrementally from the last consumed byte offset.
///
/// Offsets are bookkept across polls so no byte is ever skipped or read
/// twice, regardless of how the file grows between reads.
pub struct LogTail {
    path: PathBuf,
    offset: u64,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read everything appended since the last call.
    ///
    /// Returns an empty string when the file does not exist yet or has not
    /// grown.
    pub fn read_new(&mut self) -> std::io::Result<String> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(e),
        };
        file.seek(SeekFrom::Start(self.offset))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        self.offset += bytes.len() as u64;
        Ok(latin1_to_utf8(&bytes))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Transcode latin-1 bytes to UTF-8.
///
/// Every byte maps to exactly one scalar value, so arbitrary child output
/// (including split multi-byte sequences) round-trips without loss of
/// byte count.
pub fn latin1_to_utf8(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
#[path = "logtail_tests.rs"]
mod tests;
