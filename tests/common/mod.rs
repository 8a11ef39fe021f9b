//! Test helpers: synthetic blocks, block files and hash lists

#![allow(dead_code)]

use blk_linearize::block_file_reader::block_file_path;
use blk_linearize::block_hash::block_hash_hex;
use blk_linearize::{LinearizeConfig, SplitPolicy};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MAGIC: [u8; 4] = [0xc0, 0xc0, 0xc0, 0xc0];

/// 2013-01-05, 2013-01-28 and 2013-02-01 (noon UTC)
pub const JAN_5_2013: u32 = 1357387200;
pub const JAN_28_2013: u32 = 1359374400;
pub const FEB_1_2013: u32 = 1359720000;

/// A block payload: 80-byte header plus `tx_len` bytes of filler.
/// `nonce` makes the hash unique.
#[derive(Debug, Clone)]
pub struct TestBlock {
    pub payload: Vec<u8>,
    pub hash: String,
}

impl TestBlock {
    pub fn new(nonce: u32, timestamp: u32, tx_len: usize) -> Self {
        let mut payload = vec![0u8; 80 + tx_len];
        payload[0..4].copy_from_slice(&1u32.to_le_bytes()); // version
        payload[68..72].copy_from_slice(&timestamp.to_le_bytes());
        payload[72..76].copy_from_slice(&0x207fffffu32.to_le_bytes()); // bits
        payload[76..80].copy_from_slice(&nonce.to_le_bytes());
        for (i, b) in payload[80..].iter_mut().enumerate() {
            *b = (i as u8) ^ (nonce as u8);
        }
        let header: [u8; 80] = payload[..80].try_into().unwrap();
        let hash = block_hash_hex(&header);
        Self { payload, hash }
    }

    pub fn simple(nonce: u32) -> Self {
        Self::new(nonce, JAN_5_2013, 20)
    }

    /// The on-disk record: magic, length, payload
    pub fn record(&self) -> Vec<u8> {
        frame(MAGIC, &self.payload)
    }
}

pub fn frame(magic: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = magic.to_vec();
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn concat_records(blocks: &[&TestBlock]) -> Vec<u8> {
    blocks.iter().flat_map(|b| b.record()).collect()
}

/// Temp workspace with `input/`, `out/` and `hashlist.txt`
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("input")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root().join("input")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    pub fn hashlist_path(&self) -> PathBuf {
        self.root().join("hashlist.txt")
    }

    pub fn write_input(&self, index: usize, bytes: &[u8]) {
        fs::write(block_file_path(&self.input_dir(), index), bytes).unwrap();
    }

    pub fn write_hashlist(&self, blocks: &[&TestBlock]) {
        let text: String = blocks.iter().map(|b| format!("{}\n", b.hash)).collect();
        fs::write(self.hashlist_path(), text).unwrap();
    }

    /// Config whose genesis is the first block of the chain
    pub fn config(&self, genesis: &TestBlock, split: SplitPolicy) -> LinearizeConfig {
        LinearizeConfig {
            netmagic: MAGIC,
            genesis_hash: genesis.hash.clone(),
            input_dir: self.input_dir(),
            hashlist: self.hashlist_path(),
            split,
        }
    }

    pub fn single_output(&self) -> SplitPolicy {
        SplitPolicy::Single {
            path: self.root().join("bootstrap.dat"),
        }
    }

    pub fn output_file(&self, index: usize) -> PathBuf {
        block_file_path(&self.out_dir(), index)
    }
}
