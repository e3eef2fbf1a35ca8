//! CSV reader for the yearly observation files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::source::{RawTable, SourceMetadata};
use crate::error::{Result, XbtError};

/// How a yearly file is brought into memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableBackend {
    /// Read the whole file, then parse the buffered bytes.
    #[default]
    InMemory,
    /// Parse records straight off the open file without buffering it.
    Streaming,
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Quote character.
    pub quote: u8,
    /// How files are read.
    pub backend: TableBackend,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            backend: TableBackend::default(),
        }
    }
}

/// Reads yearly CSV files into raw string tables.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse the file holding observations for `year`.
    pub fn parse_file(&self, path: impl AsRef<Path>, year: i32) -> Result<(RawTable, SourceMetadata)> {
        let path = path.as_ref();
        let io_err = |source: io::Error| XbtError::Io {
            path: path.to_path_buf(),
            source,
        };

        let (table, hash, size_bytes) = match self.config.backend {
            TableBackend::InMemory => {
                let contents = std::fs::read(path).map_err(io_err)?;
                let hash = format!("sha256:{:x}", Sha256::digest(&contents));
                let table = self.parse_reader(contents.as_slice())?;
                (table, hash, contents.len() as u64)
            }
            TableBackend::Streaming => {
                let file = File::open(path).map_err(io_err)?;
                let mut hashing = HashingReader::new(file);
                let table = self.parse_reader(&mut hashing)?;
                // Drain anything the CSV reader left unread so the hash covers the file.
                io::copy(&mut hashing, &mut io::sink()).map_err(io_err)?;
                let (hash, size_bytes) = hashing.finish();
                (table, hash, size_bytes)
            }
        };

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            year,
            hash,
            size_bytes,
            table.rows.len(),
            table.headers.len(),
        );

        Ok((table, metadata))
    }

    /// Parse CSV records from any reader.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .quote(self.config.quote)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if headers.is_empty() {
            return Err(XbtError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();

            // Pad or truncate ragged rows to the header width
            row.resize(expected_cols, String::new());

            rows.push(row);
        }

        Ok(RawTable::new(headers, rows))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader adapter that hashes and counts every byte passing through it.
struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    bytes: u64,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    fn finish(self) -> (String, u64) {
        (format!("sha256:{:x}", self.hasher.finalize()), self.bytes)
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}
