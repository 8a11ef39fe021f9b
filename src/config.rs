//! Run configuration
//!
//! Settings come from a `key=value` text file (optional) and command-line
//! overrides. They are collected into [`Settings`] and then resolved once into
//! an immutable, validated [`LinearizeConfig`] that the engine borrows.

use crate::error::{LinearizeError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_NETMAGIC: &str = "c0c0c0c0";
pub const DEFAULT_GENESIS_HASH: &str =
    "1a91e3dace36e2be3bf030a65679fe821aa1d6ef92e7c9902eb318182c355691";
pub const DEFAULT_INPUT_DIR: &str = "input";
pub const DEFAULT_HASHLIST: &str = "hashlist.txt";
pub const DEFAULT_MAX_OUT_SZ: u64 = 1000 * 1000 * 1000;

const KNOWN_KEYS: &[&str] = &[
    "netmagic",
    "genesis_hash",
    "input",
    "hashlist",
    "split_timestamp",
    "max_out_sz",
    "output_file",
    "output",
];

/// Where matched blocks go and when a new output file is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Everything into one fixed file
    Single { path: PathBuf },
    /// Numbered files in `dir`, a new one whenever the next record would pass `max_bytes`
    BySize { dir: PathBuf, max_bytes: u64 },
    /// Numbered files in `dir`, a new one at each calendar month boundary
    ByMonth { dir: PathBuf },
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct LinearizeConfig {
    pub netmagic: [u8; 4],
    pub genesis_hash: String,
    pub input_dir: PathBuf,
    pub hashlist: PathBuf,
    pub split: SplitPolicy,
}

/// Raw `key -> value` settings, later entries win
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LinearizeError::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Parse `key = value` lines.
    ///
    /// Lines whose first non-blank character is `#` are comments. Keys are
    /// word characters starting at column 0; lines that don't fit the shape
    /// are ignored.
    pub fn parse(text: &str) -> Self {
        let mut settings = Self::default();
        for line in text.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim_end();
            if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            settings.set(key, value);
        }
        settings
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl LinearizeConfig {
    /// Apply defaults and validate.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        for key in settings.values.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!("Ignoring unknown setting `{}`", key);
            }
        }

        let netmagic = parse_netmagic(settings.get("netmagic").unwrap_or(DEFAULT_NETMAGIC))?;
        let genesis_hash =
            parse_hash("genesis_hash", settings.get("genesis_hash").unwrap_or(DEFAULT_GENESIS_HASH))?;
        let input_dir = PathBuf::from(settings.get("input").unwrap_or(DEFAULT_INPUT_DIR));
        let hashlist = PathBuf::from(settings.get("hashlist").unwrap_or(DEFAULT_HASHLIST));

        let split_timestamp = match settings.get("split_timestamp") {
            Some(v) => parse_number::<i64>("split_timestamp", v)? != 0,
            None => false,
        };
        let max_bytes = match settings.get("max_out_sz") {
            Some(v) => parse_number::<u64>("max_out_sz", v)?,
            None => DEFAULT_MAX_OUT_SZ,
        };
        if max_bytes == 0 {
            return Err(LinearizeError::config("max_out_sz", "must be greater than zero"));
        }

        let split = match (settings.get("output_file"), settings.get("output")) {
            (None, None) => {
                return Err(LinearizeError::config("output", "missing output file / directory"))
            }
            (Some(_), Some(_)) => {
                return Err(LinearizeError::config(
                    "output",
                    "`output_file` and `output` are mutually exclusive",
                ))
            }
            (Some(_), None) if split_timestamp => {
                return Err(LinearizeError::config(
                    "split_timestamp",
                    "monthly splitting needs an output directory (`output`), not `output_file`",
                ))
            }
            (Some(file), None) => SplitPolicy::Single {
                path: PathBuf::from(file),
            },
            (None, Some(dir)) if split_timestamp => SplitPolicy::ByMonth {
                dir: PathBuf::from(dir),
            },
            (None, Some(dir)) => SplitPolicy::BySize {
                dir: PathBuf::from(dir),
                max_bytes,
            },
        };

        Ok(Self {
            netmagic,
            genesis_hash,
            input_dir,
            hashlist,
            split,
        })
    }
}

fn parse_netmagic(value: &str) -> Result<[u8; 4]> {
    let bytes = hex::decode(value)
        .map_err(|e| LinearizeError::config("netmagic", format!("{value:?}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        LinearizeError::config("netmagic", format!("expected 4 bytes, got {}", b.len()))
    })
}

fn parse_hash(key: &str, value: &str) -> Result<String> {
    if value.len() != 64 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(LinearizeError::config(
            key,
            format!("not a 64-character hex hash: {value:?}"),
        ));
    }
    Ok(value.to_ascii_lowercase())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| LinearizeError::config(key, format!("{value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_output_dir() {
        let settings = Settings::parse("output=out\n");
        let cfg = LinearizeConfig::from_settings(&settings).unwrap();
        assert_eq!(cfg.netmagic, [0xc0, 0xc0, 0xc0, 0xc0]);
        assert_eq!(cfg.genesis_hash, DEFAULT_GENESIS_HASH);
        assert_eq!(cfg.input_dir, PathBuf::from("input"));
        assert_eq!(cfg.hashlist, PathBuf::from("hashlist.txt"));
        assert_eq!(
            cfg.split,
            SplitPolicy::BySize {
                dir: PathBuf::from("out"),
                max_bytes: DEFAULT_MAX_OUT_SZ
            }
        );
    }

    #[test]
    fn test_parse_comments_and_overrides() {
        let text = "\
# linearize config
  # indented comment
netmagic=f9beb4d9
input = /data/blocks
max_out_sz = 5000
not a setting
 leading=ignored
output_file=first.dat
output_file = bootstrap.dat
";
        let settings = Settings::parse(text);
        assert_eq!(settings.get("leading"), None);
        assert_eq!(settings.get("output_file"), Some("bootstrap.dat"));

        let cfg = LinearizeConfig::from_settings(&settings).unwrap();
        assert_eq!(cfg.netmagic, [0xf9, 0xbe, 0xb4, 0xd9]);
        assert_eq!(cfg.input_dir, PathBuf::from("/data/blocks"));
        assert_eq!(
            cfg.split,
            SplitPolicy::Single {
                path: PathBuf::from("bootstrap.dat")
            }
        );
    }

    #[test]
    fn test_split_timestamp_selects_monthly() {
        let settings = Settings::parse("output=out\nsplit_timestamp=1\n");
        let cfg = LinearizeConfig::from_settings(&settings).unwrap();
        assert_eq!(
            cfg.split,
            SplitPolicy::ByMonth {
                dir: PathBuf::from("out")
            }
        );
    }

    #[test]
    fn test_missing_output_is_error() {
        let err = LinearizeConfig::from_settings(&Settings::parse("input=x\n")).unwrap_err();
        assert!(err.to_string().contains("missing output file / directory"));
    }

    #[test]
    fn test_conflicting_outputs_rejected() {
        let both = Settings::parse("output=out\noutput_file=a.dat\n");
        assert!(LinearizeConfig::from_settings(&both).is_err());

        let monthly_file = Settings::parse("output_file=a.dat\nsplit_timestamp=1\n");
        let err = LinearizeConfig::from_settings(&monthly_file).unwrap_err();
        assert!(matches!(err, LinearizeError::Config { ref key, .. } if key == "split_timestamp"));
    }

    #[test]
    fn test_bad_values_name_the_key() {
        let cases = [
            ("output=o\nnetmagic=c0c0\n", "netmagic"),
            ("output=o\nnetmagic=zzzzzzzz\n", "netmagic"),
            ("output=o\nmax_out_sz=lots\n", "max_out_sz"),
            ("output=o\nmax_out_sz=0\n", "max_out_sz"),
            ("output=o\nsplit_timestamp=yes\n", "split_timestamp"),
            ("output=o\ngenesis_hash=abc\n", "genesis_hash"),
        ];
        for (text, expected_key) in cases {
            match LinearizeConfig::from_settings(&Settings::parse(text)) {
                Err(LinearizeError::Config { key, .. }) => assert_eq!(key, expected_key, "{text}"),
                other => panic!("expected config error for {text:?}, got {other:?}"),
            }
        }
    }
}
