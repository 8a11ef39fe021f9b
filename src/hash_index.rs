//! Canonical hash list
//!
//! Holds the ordered list of block hashes (position `i` is the hash of the
//! block at height `i`) together with a membership set for the
//! "is this block on the chain at all" check.

use crate::error::{LinearizeError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct HashIndex {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl HashIndex {
    /// Build an index from hashes already in canonical order
    pub fn new(hashes: Vec<String>) -> Self {
        let members = hashes.iter().cloned().collect();
        Self {
            ordered: hashes,
            members,
        }
    }

    /// Load the list from a text file, one hash per line.
    ///
    /// Trailing whitespace is trimmed, blank lines are ignored and hashes are
    /// lowercased. Anything that is not 64 hex characters is rejected with
    /// its line number.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LinearizeError::io(path, e))?;
        let index = Self::from_reader(BufReader::new(file), path)?;
        info!("Read {} hashes from {}", index.len(), path.display());
        Ok(index)
    }

    fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self> {
        let mut hashes = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| LinearizeError::io(path, e))?;
            let hash = line.trim();
            if hash.is_empty() {
                continue;
            }
            if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(LinearizeError::config(
                    "hashlist",
                    format!(
                        "{} line {}: not a 64-character hex hash: {:?}",
                        path.display(),
                        line_no + 1,
                        hash
                    ),
                ));
            }
            hashes.push(hash.to_ascii_lowercase());
        }
        Ok(Self::new(hashes))
    }

    /// Is `hash` anywhere in the canonical chain?
    pub fn contains(&self, hash: &str) -> bool {
        self.members.contains(hash)
    }

    /// Hash expected at `height`, if the list reaches that far
    pub fn expected_at(&self, height: usize) -> Option<&str> {
        self.ordered.get(height).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
