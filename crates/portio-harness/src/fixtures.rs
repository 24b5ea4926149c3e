//! Fixture loading and management.
//!
//! A fixture case describes a port to build, a script of operations to run
//! against it, and the rendered result expected from each operation.

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// How to construct the port under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortSetup {
    /// In-memory input over UTF-8 text.
    InputString { text: String },
    /// In-memory input over raw bytes.
    InputBytes { bytes: Vec<u8> },
    /// In-memory output.
    Output,
    /// Buffered input whose device yields one chunk per read.
    ChunkedInput {
        chunks: Vec<Vec<u8>>,
        #[serde(default)]
        mode: Option<String>,
        #[serde(default)]
        buffer_size: Option<usize>,
    },
    /// Buffered input over a seekable in-memory file.
    SeekableInput {
        text: String,
        #[serde(default)]
        buffer_size: Option<usize>,
    },
    /// Buffered output into a recording device.
    BufferedOutput {
        #[serde(default)]
        mode: Option<String>,
        #[serde(default)]
        buffer_size: Option<usize>,
    },
}

/// One scripted port operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    GetByte,
    GetChar,
    GetBlock { len: usize },
    ReadLine,
    PeekByte,
    PeekChar,
    UngetByte { byte: u8 },
    UngetChar { c: char },
    PutByte { byte: u8 },
    PutChar { c: char },
    PutStr { s: String },
    Flush,
    IsReady,
    Seek { offset: i64, whence: String },
    Tell,
    Close,
    /// Everything that reached the device (or memory) so far.
    Written,
}

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// What the case demonstrates.
    #[serde(default)]
    pub description: String,
    pub port: PortSetup,
    pub ops: Vec<Op>,
    /// Rendered result of each op, in order.
    pub expected: Vec<String>,
}

/// A collection of fixture cases for one operation family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Operation family name.
    pub family: String,
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Load every `*.json` fixture set in `dir`, sorted by file name.
    pub fn load_dir(dir: &std::path::Path) -> Result<Vec<Self>, HarnessError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(HarnessError::NoFixtures(dir.to_path_buf()));
        }
        paths.iter().map(|p| Self::from_file(p)).collect()
    }
}
