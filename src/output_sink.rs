//! Output sink
//!
//! Appends accepted records to the output file(s), deciding before every
//! write whether the current file has to be closed and the next numbered one
//! started. Records are written byte-for-byte (prefix + payload).

use crate::block_file_reader::{block_file_path, RawBlock};
use crate::block_hash::{header_timestamp, month_start};
use crate::config::SplitPolicy;
use crate::error::{LinearizeError, Result};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// I/O buffer size for output writes
const IO_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Progress reporting interval (number of blocks)
pub const PROGRESS_REPORT_INTERVAL: usize = 1000;

/// An open output file
struct OutputFile {
    path: PathBuf,
    writer: BufWriter<File>,
    size: u64,
}

pub struct OutputSink {
    policy: SplitPolicy,
    current: Option<OutputFile>,
    next_file_idx: usize,
    /// First day of the month of the last block written (monthly mode)
    last_month: Option<NaiveDate>,
    blocks_written: usize,
    rotations: usize,
    files: Vec<PathBuf>,
}

impl OutputSink {
    /// Create a sink. Output directories are created here; no file is opened
    /// until the first block arrives.
    pub fn new(policy: SplitPolicy) -> Result<Self> {
        match &policy {
            SplitPolicy::Single { .. } => {}
            SplitPolicy::BySize { dir, .. } | SplitPolicy::ByMonth { dir } => {
                std::fs::create_dir_all(dir).map_err(|e| LinearizeError::io(dir, e))?;
            }
        }
        Ok(Self {
            policy,
            current: None,
            next_file_idx: 0,
            last_month: None,
            blocks_written: 0,
            rotations: 0,
            files: Vec::new(),
        })
    }

    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    /// Number of times an open file was closed to start the next one
    pub fn rotations(&self) -> usize {
        self.rotations
    }

    /// Number of output files opened so far
    pub fn files_opened(&self) -> usize {
        self.files.len()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Append one record, rotating first if the policy asks for it.
    pub fn write_block(&mut self, block: &RawBlock, hash: &str) -> Result<()> {
        if self.needs_rotation(block, hash) {
            self.close_current()?;
            self.rotations += 1;
        }
        let mut out = match self.current.take() {
            Some(out) => out,
            None => self.open_next()?,
        };
        out.writer
            .write_all(&block.prefix)
            .and_then(|_| out.writer.write_all(&block.payload))
            .map_err(|e| LinearizeError::io(&out.path, e))?;
        out.size += block.record_len();
        self.current = Some(out);

        self.blocks_written += 1;
        if self.blocks_written % PROGRESS_REPORT_INTERVAL == 0 {
            info!("Wrote {} blocks", self.blocks_written);
        }
        Ok(())
    }

    /// Should the open file be closed before `block` is written?
    ///
    /// Also advances the month marker in monthly mode, including for the very
    /// first block when there is nothing open to rotate away from.
    fn needs_rotation(&mut self, block: &RawBlock, hash: &str) -> bool {
        match &self.policy {
            SplitPolicy::Single { .. } => false,
            // Only the payload is counted against the cap, so a file may end up
            // over it by one 8-byte record prefix. An open file always holds at
            // least one record, so an oversized record still gets a file.
            SplitPolicy::BySize { max_bytes, .. } => self
                .current
                .as_ref()
                .is_some_and(|out| out.size + block.payload.len() as u64 > *max_bytes),
            SplitPolicy::ByMonth { .. } => {
                let month = month_start(header_timestamp(block.header()));
                if self.last_month.is_some_and(|last| month <= last) {
                    return false;
                }
                info!("New month {} @ {}", month.format("%Y-%m"), hash);
                self.last_month = Some(month);
                self.current.is_some()
            }
        }
    }

    fn open_next(&mut self) -> Result<OutputFile> {
        let path = match &self.policy {
            SplitPolicy::Single { path } => path.clone(),
            SplitPolicy::BySize { dir, .. } | SplitPolicy::ByMonth { dir } => {
                block_file_path(dir, self.next_file_idx)
            }
        };
        let file = File::create(&path).map_err(|e| LinearizeError::io(&path, e))?;
        info!("Output file {}", path.display());

        self.next_file_idx += 1;
        self.files.push(path.clone());
        Ok(OutputFile {
            path,
            writer: BufWriter::with_capacity(IO_BUFFER_SIZE, file),
            size: 0,
        })
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut out) = self.current.take() {
            out.writer
                .flush()
                .map_err(|e| LinearizeError::io(&out.path, e))?;
            debug!("Closed {} ({} bytes)", out.path.display(), out.size);
        }
        Ok(())
    }

    /// Flush and close; returns every output file written, in order.
    pub fn finish(mut self) -> Result<Vec<PathBuf>> {
        self.close_current()?;
        Ok(self.files)
    }

    /// Close after a fatal error. Records already handed to the sink are
    /// flushed; nothing more is written.
    pub fn abort(mut self) {
        if let Err(e) = self.close_current() {
            warn!("Failed to close output after error: {}", e);
        }
    }
}
