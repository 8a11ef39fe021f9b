//! Block File Reader
//!
//! Reads framed block records from a numbered series of block files
//! (`blk00000.dat`, `blk00001.dat`, ...) in Bitcoin Core's on-disk format:
//! - Magic bytes: 4 bytes (network specific)
//! - Block size: 4 bytes (little-endian)
//! - Block data: variable size, starting with the 80-byte header
//!
//! A record whose first magic byte is zero marks the end of the useful data
//! in a file (Core preallocates files and leaves a zero tail), so reading
//! moves on to the next file.

use crate::block_hash::BLOCK_HEADER_SIZE;
use crate::error::{LinearizeError, ProtocolError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Magic + size prefix in front of every block
pub const RECORD_PREFIX_SIZE: usize = 8;

/// I/O buffer size for block file reading
const IO_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Path of the numbered block file `index` inside `dir`
pub fn block_file_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("blk{:05}.dat", index))
}

/// Where a record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSource {
    pub file_index: usize,
    pub offset: u64,
}

/// One framed block record, kept byte-for-byte
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Magic + little-endian length, exactly as read
    pub prefix: [u8; RECORD_PREFIX_SIZE],
    /// Block data (header + transactions)
    pub payload: Vec<u8>,
    header: [u8; BLOCK_HEADER_SIZE],
    pub source: BlockSource,
}

impl RawBlock {
    /// Frame `payload` under `magic`. `None` if the payload can't hold a
    /// header or its length doesn't fit the 32-bit size field.
    pub fn new(magic: [u8; 4], payload: Vec<u8>, source: BlockSource) -> Option<Self> {
        let len = u32::try_from(payload.len()).ok()?;
        let header: [u8; BLOCK_HEADER_SIZE] = payload.get(..BLOCK_HEADER_SIZE)?.try_into().ok()?;
        let mut prefix = [0u8; RECORD_PREFIX_SIZE];
        prefix[..4].copy_from_slice(&magic);
        prefix[4..].copy_from_slice(&len.to_le_bytes());
        Some(Self {
            prefix,
            payload,
            header,
            source,
        })
    }

    pub fn header(&self) -> &[u8; BLOCK_HEADER_SIZE] {
        &self.header
    }

    /// Size of the record on disk (prefix + payload)
    pub fn record_len(&self) -> u64 {
        (RECORD_PREFIX_SIZE + self.payload.len()) as u64
    }
}

/// Block file reader for the numbered blk*.dat series
#[derive(Debug, Clone)]
pub struct BlockFileReader {
    input_dir: PathBuf,
    magic: [u8; 4],
}

impl BlockFileReader {
    pub fn new(input_dir: impl AsRef<Path>, magic: [u8; 4]) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            magic,
        }
    }

    /// Read blocks in file order, starting at `blk00000.dat`.
    ///
    /// The first file must exist. After that, a missing next file ends the
    /// sequence; whether that is premature is up to the caller.
    pub fn read_blocks_sequential(&self) -> BlockIterator {
        BlockIterator {
            reader: self.clone(),
            next_file_idx: 0,
            current_file: None,
            current_path: PathBuf::new(),
            current_offset: 0,
            blocks_in_file: 0,
            files_opened: 0,
            finished: false,
        }
    }
}

/// Iterator over blocks in block files
pub struct BlockIterator {
    reader: BlockFileReader,
    next_file_idx: usize,
    current_file: Option<BufReader<File>>,
    current_path: PathBuf,
    current_offset: u64,
    blocks_in_file: usize,
    files_opened: usize,
    finished: bool,
}

impl BlockIterator {
    /// Number of input files opened so far
    pub fn files_opened(&self) -> usize {
        self.files_opened
    }

    /// Open the next numbered file. `Ok(false)` when it does not exist and at
    /// least one file has already been read.
    fn next_file(&mut self) -> Result<bool> {
        let file_idx = self.next_file_idx;
        let path = block_file_path(&self.reader.input_dir, file_idx);

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound && self.files_opened > 0 => {
                info!("No more input files ({} not found)", path.display());
                return Ok(false);
            }
            Err(e) => return Err(LinearizeError::io(path, e)),
        };

        info!("Input file {}", path.display());
        self.current_file = Some(BufReader::with_capacity(IO_BUFFER_SIZE, file));
        self.current_path = path;
        self.current_offset = 0;
        self.blocks_in_file = 0;
        self.files_opened += 1;
        self.next_file_idx += 1;
        Ok(true)
    }

    fn close_file(&mut self) {
        if self.current_file.take().is_some() {
            debug!(
                "Closed {} after {} blocks",
                self.current_path.display(),
                self.blocks_in_file
            );
        }
    }

    /// Read one record from the open file. `Ok(None)` at end of file or at a
    /// null-magic sentinel.
    fn read_next_from_file(&mut self) -> Result<Option<RawBlock>> {
        let file = match &mut self.current_file {
            Some(f) => f,
            None => return Ok(None),
        };
        let offset = self.current_offset;

        let mut prefix = [0u8; RECORD_PREFIX_SIZE];
        let got = read_up_to(file, &mut prefix)
            .map_err(|e| LinearizeError::io(&self.current_path, e))?;
        if got == 0 || prefix[0] == 0 {
            return Ok(None);
        }
        if got < RECORD_PREFIX_SIZE {
            return Err(ProtocolError::PartialPrefix {
                path: self.current_path.clone(),
                offset,
                len: got,
            }
            .into());
        }

        if prefix[..4] != self.reader.magic {
            return Err(ProtocolError::BadMagic {
                path: self.current_path.clone(),
                offset,
                expected: hex::encode(self.reader.magic),
                found: hex::encode(&prefix[..4]),
            }
            .into());
        }

        let declared = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
        let mut payload = Vec::new();
        file.by_ref()
            .take(u64::from(declared))
            .read_to_end(&mut payload)
            .map_err(|e| LinearizeError::io(&self.current_path, e))?;
        if payload.len() < declared as usize {
            return Err(ProtocolError::Truncated {
                path: self.current_path.clone(),
                offset,
                declared,
                available: payload.len(),
            }
            .into());
        }
        let len = payload.len();
        let source = BlockSource {
            file_index: self.next_file_idx - 1,
            offset,
        };
        let Some(block) = RawBlock::new(self.reader.magic, payload, source) else {
            return Err(ProtocolError::ShortHeader {
                path: self.current_path.clone(),
                offset,
                len,
            }
            .into());
        };

        self.current_offset += block.record_len();
        self.blocks_in_file += 1;
        Ok(Some(block))
    }
}

impl Iterator for BlockIterator {
    type Item = Result<RawBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.current_file.is_none() {
                match self.next_file() {
                    Ok(true) => {}
                    Ok(false) => {
                        self.finished = true;
                        return None;
                    }
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            match self.read_next_from_file() {
                Ok(Some(block)) => return Some(Ok(block)),
                // End of segment: move on to the next file
                Ok(None) => self.close_file(),
                Err(e) => {
                    self.close_file();
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Fill as much of `buf` as the reader can supply; returns the byte count.
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
