//! On-disk layout of a zone data file
//!
//! ```text
//! [0..4]   magic "WARZ"
//! [4..8]   schema version (u32 LE)
//! [8..12]  section count (u32 LE)
//! [12..16] xxHash32 of everything after the header
//! then per section: name length (u16 LE), name, data length (u64 LE), data
//! ```
//!
//! Every section holds one bitcode-encoded table. Writes go through a
//! [`Transaction`] so the file on disk and the in-memory copy only change
//! together.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use bitcode::{Decode, Encode};
use xxhash_rust::xxh32::xxh32;

use super::StoreError;
use crate::util::fs::atomic_write;

pub const MAGIC: [u8; 4] = *b"WARZ";
pub const HEADER_SIZE: usize = 16;
const XXHASH_SEED: u32 = 0;

/// Decoded zone file: schema version plus raw table sections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneFile {
    pub version: u32,
    sections: BTreeMap<String, Vec<u8>>,
}

impl ZoneFile {
    /// A zone that has never been written (schema version 0)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_version(version: u32) -> Self {
        Self {
            version,
            sections: BTreeMap::new(),
        }
    }

    /// Read a zone file; a missing file is an empty version 0 store
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Self::decode(&bytes, path),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::empty()),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_SIZE || bytes[..4] != MAGIC {
            return Err(StoreError::NotAZoneFile(path.to_path_buf()));
        }

        let version = read_u32(bytes, 4);
        let count = read_u32(bytes, 8);
        let expected = read_u32(bytes, 12);
        let payload = &bytes[HEADER_SIZE..];
        let found = xxh32(payload, XXHASH_SEED);
        if found != expected {
            return Err(StoreError::Checksum { expected, found });
        }

        let mut reader = Reader { buf: payload, pos: 0 };
        let mut sections = BTreeMap::new();
        for _ in 0..count {
            let name_len = reader.take_u16()? as usize;
            let name = std::str::from_utf8(reader.take(name_len)?)
                .map_err(|_| StoreError::Corrupt("section name is not UTF-8".into()))?
                .to_string();
            let data_len = usize::try_from(reader.take_u64()?)
                .map_err(|_| StoreError::Corrupt(format!("section {name} is too large")))?;
            let data = reader.take(data_len)?.to_vec();
            sections.insert(name, data);
        }
        if reader.pos != payload.len() {
            return Err(StoreError::Corrupt("trailing bytes after last section".into()));
        }

        Ok(Self { version, sections })
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_sections(self.version, self.sections.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Decode a whole table
    pub fn table<T>(&self, name: &str) -> Result<T, StoreError>
    where
        T: for<'de> Decode<'de>,
    {
        let bytes = self
            .sections
            .get(name)
            .ok_or_else(|| StoreError::MissingTable(name.to_string()))?;
        bitcode::decode(bytes).map_err(|e| StoreError::Decode {
            table: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Create a table in place when absent; used by migrations before the first write
    pub fn ensure_table<T: Encode + ?Sized>(&mut self, name: &str, initial: &T) -> bool {
        if self.has_table(name) {
            return false;
        }
        self.sections.insert(name.to_string(), bitcode::encode(initial));
        true
    }

    /// Move every section whose name passes `take` into `other`; returns how many moved
    pub fn split_off(&mut self, other: &mut ZoneFile, take: impl Fn(&str) -> bool) -> usize {
        let names: Vec<String> = self.sections.keys().filter(|n| take(n)).cloned().collect();
        for name in &names {
            if let Some(data) = self.sections.remove(name) {
                other.sections.insert(name.clone(), data);
            }
        }
        names.len()
    }

    /// Write `txn` merged over this file, then apply it in memory
    pub fn commit(&mut self, path: &Path, txn: Transaction) -> Result<(), StoreError> {
        let bytes = {
            let merged = self
                .sections
                .iter()
                .filter(|(name, _)| !txn.deletes.contains(*name) && !txn.puts.contains_key(*name))
                .chain(txn.puts.iter())
                .map(|(k, v)| (k.as_str(), v.as_slice()));
            encode_sections(self.version, merged)
        };
        atomic_write(path, &bytes).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        for name in txn.deletes {
            self.sections.remove(&name);
        }
        self.sections.extend(txn.puts);
        Ok(())
    }
}

/// Pending table writes applied all at once by [`ZoneFile::commit`]
#[derive(Debug, Default)]
pub struct Transaction {
    puts: BTreeMap<String, Vec<u8>>,
    deletes: BTreeSet<String>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Encode + ?Sized>(&mut self, name: &str, rows: &T) {
        self.deletes.remove(name);
        self.puts.insert(name.to_string(), bitcode::encode(rows));
    }

    pub fn delete(&mut self, name: &str) {
        self.puts.remove(name);
        self.deletes.insert(name.to_string());
    }
}

fn encode_sections<'a>(version: u32, sections: impl Iterator<Item = (&'a str, &'a [u8])>) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut count: u32 = 0;
    for (name, data) in sections {
        payload.extend_from_slice(&(name.len() as u16).to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        payload.extend_from_slice(&(data.len() as u64).to_le_bytes());
        payload.extend_from_slice(data);
        count += 1;
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&xxh32(&payload, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], StoreError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| StoreError::Corrupt(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_u16(&mut self) -> Result<u16, StoreError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn take_u64(&mut self) -> Result<u64, StoreError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }
}
