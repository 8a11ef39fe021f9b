//! Linearize run: block files in, canonical-order block files out
//!
//! Pulls records from the [`BlockFileReader`], checks each against the
//! [`HashIndex`], and hands blocks that are next in canonical order to the
//! [`OutputSink`]. Unknown blocks are skipped; a known block arriving at the
//! wrong height stops the run.

use crate::block_file_reader::{BlockFileReader, BlockIterator};
use crate::config::LinearizeConfig;
use crate::error::{LinearizeError, Result};
use crate::hash_index::HashIndex;
use crate::output_sink::OutputSink;
use crate::validator::{BlockValidator, Verdict};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub blocks_written: usize,
    pub blocks_skipped: usize,
    pub records_read: usize,
    pub input_files: usize,
    pub rotations: usize,
    pub output_files: Vec<PathBuf>,
}

pub struct Linearizer<'a> {
    config: &'a LinearizeConfig,
    index: &'a HashIndex,
}

impl<'a> Linearizer<'a> {
    /// Check preconditions. Nothing on disk is touched here.
    pub fn new(config: &'a LinearizeConfig, index: &'a HashIndex) -> Result<Self> {
        if index.is_empty() {
            return Err(LinearizeError::Precondition(
                "canonical hash list is empty".to_string(),
            ));
        }
        if !index.contains(&config.genesis_hash) {
            return Err(LinearizeError::Precondition(format!(
                "genesis hash {} not found in hash list",
                config.genesis_hash
            )));
        }
        Ok(Self { config, index })
    }

    /// Copy every canonical block, in order, into the configured output.
    ///
    /// On error the output is closed without further writes and the error is
    /// returned unchanged.
    pub fn run(&self) -> Result<RunSummary> {
        let reader = BlockFileReader::new(&self.config.input_dir, self.config.netmagic);
        let mut blocks = reader.read_blocks_sequential();
        let mut sink = OutputSink::new(self.config.split.clone())?;
        let mut summary = RunSummary::default();

        if let Err(e) = self.copy_blocks(&mut blocks, &mut sink, &mut summary) {
            sink.abort();
            return Err(e);
        }

        summary.blocks_written = sink.blocks_written();
        summary.rotations = sink.rotations();
        summary.input_files = blocks.files_opened();
        summary.output_files = sink.finish()?;

        info!(
            "✅ Done: wrote {} blocks to {} file(s), skipped {} unknown",
            summary.blocks_written,
            summary.output_files.len(),
            summary.blocks_skipped
        );
        Ok(summary)
    }

    fn copy_blocks(
        &self,
        blocks: &mut BlockIterator,
        sink: &mut OutputSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let validator = BlockValidator::new(self.index);
        let mut height = 0usize;

        // Stop as soon as the list is used up; trailing input is never read
        while let Some(expected) = self.index.expected_at(height) {
            let block = match blocks.next() {
                Some(block) => block?,
                None => {
                    return Err(LinearizeError::InputExhausted {
                        written: height,
                        expected: self.index.len(),
                    })
                }
            };
            summary.records_read += 1;

            match validator.check(&block) {
                Verdict::Rejected(hash) => {
                    warn!("Skipping unknown block {}", hash);
                    summary.blocks_skipped += 1;
                }
                Verdict::Accepted(hash) => {
                    if hash != expected {
                        return Err(LinearizeError::OrderViolation {
                            height,
                            expected: expected.to_string(),
                            got: hash,
                        });
                    }
                    debug!(
                        "Block {} {} from file {} offset {}",
                        height, hash, block.source.file_index, block.source.offset
                    );
                    sink.write_block(&block, &hash)?;
                    height += 1;
                }
            }
        }
        debug_assert_eq!(height, sink.blocks_written());
        Ok(())
    }
}

/// Load the hash list named in `config` and run.
pub fn linearize(config: &LinearizeConfig) -> Result<RunSummary> {
    let index = HashIndex::load(&config.hashlist)?;
    Linearizer::new(config, &index)?.run()
}
