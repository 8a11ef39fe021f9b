//! blk-linearize - Build a linear, fork-free copy of Bitcoin-style block files
//!
//! Block files written by a node hold blocks in arrival order, orphans and
//! stale forks included. Given the canonical list of block hashes, this crate
//! copies exactly those blocks, in chain order, into fresh `blk*.dat` files
//! (or one bootstrap file), split by size or by calendar month.

pub mod block_file_reader;
pub mod block_hash;
pub mod config;
pub mod error;
pub mod hash_index;
pub mod linearize;
pub mod output_sink;
pub mod validator;

pub use config::{LinearizeConfig, Settings, SplitPolicy};
pub use error::{LinearizeError, ProtocolError, Result};
pub use hash_index::HashIndex;
pub use linearize::{linearize, Linearizer, RunSummary};
