/*
 * This file is part of Fanpilot.
 *
 * Copyright (C) 2025 Fanpilot contributors
 *
 * Fanpilot is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Fanpilot is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Fanpilot. If not, see <https://www.gnu.org/licenses/>.
 */

//! Sensor sources
//!
//! A [`Source`] polls one scalar reading per cycle and caches it. Backends only
//! implement [`Reading`]; the caching and failure handling live in [`Source`] so
//! every backend degrades the same way: a failed read clears the cached value
//! and is logged, it never reaches the control loop.
//!
//! Sources are owned by a [`SourceSet`] and referenced by [`SourceId`], which
//! lets several fans share one sensor without shared ownership.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use fp_error::{FanpilotError, Result};
use tracing::{debug, trace};

use crate::constants::source::MAX_READ_BYTES;

/// Capability to read one integer from an external endpoint
#[cfg_attr(test, mockall::automock)]
pub trait Reading: Send {
    fn read(&mut self) -> Result<i32>;
}

/// Reads an integer from a file, typically an hwmon `tempN_input` (millidegrees)
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reading for FileSource {
    fn read(&mut self) -> Result<i32> {
        let file = File::open(&self.path)
            .map_err(|e| FanpilotError::source_read(&self.path, format!("Failed to open: {}", e)))?;

        let mut raw = Vec::with_capacity(MAX_READ_BYTES);
        file.take(MAX_READ_BYTES as u64)
            .read_to_end(&mut raw)
            .map_err(|e| FanpilotError::source_read(&self.path, format!("Failed to read: {}", e)))?;

        parse_reading(&raw).map_err(|reason| FanpilotError::source_read(&self.path, reason))
    }
}

/// Parse the integer at the start of a raw reading.
///
/// Leading whitespace is skipped, then an optional `-` and the run of decimal
/// digits that follows it are parsed. Whatever comes after the digits (sysfs
/// values end with a newline) is not inspected, not even for valid UTF-8.
pub fn parse_reading(raw: &[u8]) -> std::result::Result<i32, String> {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| "empty reading".to_string())?;
    let rest = &raw[start..];

    let sign = usize::from(rest.first() == Some(&b'-'));
    let digits = rest[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Err(format!(
            "no integer at start of '{}'",
            String::from_utf8_lossy(rest).trim_end()
        ));
    }

    // Sign and digits are ASCII
    let token = String::from_utf8_lossy(&rest[..sign + digits]);
    token
        .parse::<i32>()
        .map_err(|e| format!("Failed to parse '{}': {}", token, e))
}

/// A polled sensor with its last successful reading
pub struct Source {
    label: String,
    reader: Box<dyn Reading>,
    last_value: Option<i32>,
}

impl Source {
    pub fn new(label: impl Into<String>, reader: impl Reading + 'static) -> Self {
        Self {
            label: label.into(),
            reader: Box::new(reader),
            last_value: None,
        }
    }

    /// Source backed by a file endpoint
    pub fn from_file(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(label, FileSource::new(path))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Last cached reading, `None` if the last poll failed or none happened yet
    pub fn last_value(&self) -> Option<i32> {
        self.last_value
    }

    /// Poll the endpoint once. Failures clear the cache and are only logged.
    pub fn update(&mut self) {
        match self.reader.read() {
            Ok(value) => {
                self.last_value = Some(value);
                trace!(source = %self.label, value, "Source updated");
            }
            Err(e) => {
                self.last_value = None;
                debug!(source = %self.label, error = %e, "Source read failed, value cleared");
            }
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("label", &self.label)
            .field("last_value", &self.last_value)
            .finish_non_exhaustive()
    }
}

/// Index of a [`Source`] inside its [`SourceSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

impl SourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry owning every source for the lifetime of the controller.
///
/// Sources are append-only, so a [`SourceId`] handed out stays valid.
#[derive(Debug, Default)]
pub struct SourceSet {
    sources: Vec<Source>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: Source) -> SourceId {
        self.sources.push(source);
        SourceId(self.sources.len() - 1)
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(id.0)
    }

    /// Look up a source by label
    pub fn find(&self, label: &str) -> Option<SourceId> {
        self.sources.iter().position(|s| s.label == label).map(SourceId)
    }

    /// Poll every source in insertion order
    pub fn update_all(&mut self) {
        for source in &mut self.sources {
            source.update();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &Source)> {
        self.sources.iter().enumerate().map(|(i, s)| (SourceId(i), s))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reading_sysfs_format() {
        assert_eq!(parse_reading(b"45000\n"), Ok(45000));
        assert_eq!(parse_reading(b"-1500"), Ok(-1500));
        assert_eq!(parse_reading(b"  70000  \n"), Ok(70000));
    }

    #[test]
    fn test_parse_reading_invalid() {
        assert!(parse_reading(b"").is_err());
        assert!(parse_reading(b"\n").is_err());
        assert!(parse_reading(b"hot").is_err());
        assert!(parse_reading(b"99999999999").is_err());
        assert!(parse_reading(&[0xff, 0xfe]).is_err());
        assert!(parse_reading(b"-").is_err());
        assert!(parse_reading(b"+5").is_err());
    }

    #[test]
    fn test_parse_reading_ignores_trailing_bytes() {
        assert_eq!(parse_reading(b"45000abc"), Ok(45000));
        assert_eq!(parse_reading(b"-12.5"), Ok(-12));
        assert_eq!(parse_reading(&[b'4', b'2', 0xff, 0xfe]), Ok(42));
    }

    #[test]
    fn test_file_source_reads_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp1_input");
        fs::write(&path, "52000\n").unwrap();

        let mut source = FileSource::new(&path);
        assert_eq!(source.read().unwrap(), 52000);
        assert_eq!(source.path(), path.as_path());
    }

    #[test]
    fn test_file_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut source = FileSource::new(dir.path().join("temp9_input"));
        let err = source.read().unwrap_err();
        assert!(matches!(err, FanpilotError::SourceRead { .. }));
    }

    #[test]
    fn test_file_source_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp1_input");
        fs::write(&path, "N/A\n").unwrap();
        assert!(FileSource::new(&path).read().is_err());
    }

    #[test]
    fn test_source_caches_and_clears() {
        let mut reader = MockReading::new();
        let mut seq = mockall::Sequence::new();
        reader.expect_read().times(1).in_sequence(&mut seq).returning(|| Ok(61000));
        reader
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(FanpilotError::source_read("/dev/null", "gone")));

        let mut source = Source::new("cpu", reader);
        assert_eq!(source.last_value(), None);

        source.update();
        assert_eq!(source.last_value(), Some(61000));

        source.update();
        assert_eq!(source.last_value(), None);
    }

    #[test]
    fn test_source_set_lookup() {
        let mut set = SourceSet::new();
        assert!(set.is_empty());

        let cpu = set.insert(Source::from_file("cpu", "/nonexistent/temp1_input"));
        let disk = set.insert(Source::from_file("disk", "/nonexistent/temp2_input"));

        assert_eq!(set.len(), 2);
        assert_eq!(set.find("disk"), Some(disk));
        assert_eq!(set.find("gpu"), None);
        assert_eq!(set.get(cpu).map(Source::label), Some("cpu"));
        assert_eq!(cpu.to_string(), "#0");
    }

    #[test]
    fn test_update_all_unreadable_source_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("temp1_input");
        fs::write(&good, "40000\n").unwrap();

        let mut set = SourceSet::new();
        let ok = set.insert(Source::from_file("good", &good));
        let bad = set.insert(Source::from_file("bad", dir.path().join("missing")));

        set.update_all();

        assert_eq!(set.get(ok).and_then(Source::last_value), Some(40000));
        assert_eq!(set.get(bad).and_then(Source::last_value), None);
    }
}
