//! Engine options and configuration keys

use crate::error::{Result, SplitError};
use std::collections::HashMap;

/// Default number of parallel workers used to size buckets
pub const DEFAULT_PARALLELISM: usize = 8;
/// Default lower bound on a bucket (32 MiB)
pub const DEFAULT_MIN_PARTITION_BYTES: u64 = 32 * 1024 * 1024;
/// Default upper bound on a bucket (1 GiB)
pub const DEFAULT_MAX_PARTITION_BYTES: u64 = 1024 * 1024 * 1024;

/// String configuration keys accepted by [`PartitionOptions::from_map`]
pub mod keys {
    /// Input path, possibly containing `*`
    pub const FILEPATH: &str = "filepath";
    /// Recurse into directories ("true" / "false")
    pub const RECURSIVE: &str = "recursive";
    /// Wildcard filter applied to file names; empty disables
    pub const PATH_GLOB_FILTER: &str = "pathGlobFilter";
    /// Base path prepended to relative inputs
    pub const HDFS_PATH: &str = "hdfsPath";
    /// Input text encoding
    pub const ENCODING: &str = "encoding";
    /// Worker count used to size buckets
    pub const PARALLELISM: &str = "parallelism";
    /// Lower bound on bucket size in bytes
    pub const MIN_PARTITION_BYTES: &str = "minPartitionBytes";
    /// Upper bound on bucket size in bytes
    pub const MAX_PARTITION_BYTES: &str = "maxPartitionBytes";
}

/// Options controlling file enumeration and bucket sizing
#[derive(Debug, Clone)]
pub struct PartitionOptions {
    /// Input path; a `*` anywhere switches enumeration to wildcard matching
    pub filepath: String,
    /// Recurse into directories
    pub recursive: bool,
    /// Wildcard filter applied to candidate file names
    pub path_glob_filter: Option<String>,
    /// Base path prepended to relative inputs
    pub base_path: Option<String>,
    /// Input text encoding; only UTF-8 is supported
    pub encoding: String,
    /// Worker count used to size buckets
    pub parallelism: usize,
    /// Lower bound on bucket size in bytes
    pub min_partition_bytes: u64,
    /// Upper bound on bucket size in bytes
    pub max_partition_bytes: u64,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            filepath: String::new(),
            recursive: false,
            path_glob_filter: None,
            base_path: None,
            encoding: "utf-8".to_string(),
            parallelism: DEFAULT_PARALLELISM,
            min_partition_bytes: DEFAULT_MIN_PARTITION_BYTES,
            max_partition_bytes: DEFAULT_MAX_PARTITION_BYTES,
        }
    }
}

impl PartitionOptions {
    /// Build options from string key/value pairs, validating each value.
    /// Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let mut opts = Self::default();

        if let Some(path) = map.get(keys::FILEPATH) {
            opts.filepath = path.clone();
        }
        if let Some(raw) = map.get(keys::RECURSIVE) {
            opts.recursive = parse_bool(keys::RECURSIVE, raw)?;
        }
        if let Some(filter) = map.get(keys::PATH_GLOB_FILTER) {
            if !filter.is_empty() {
                opts.path_glob_filter = Some(filter.clone());
            }
        }
        if let Some(base) = map.get(keys::HDFS_PATH) {
            if !base.is_empty() {
                opts.base_path = Some(base.clone());
            }
        }
        if let Some(encoding) = map.get(keys::ENCODING) {
            opts.encoding = encoding.clone();
        }
        if let Some(raw) = map.get(keys::PARALLELISM) {
            opts.parallelism = parse_num(keys::PARALLELISM, raw)?;
        }
        if let Some(raw) = map.get(keys::MIN_PARTITION_BYTES) {
            opts.min_partition_bytes = parse_num(keys::MIN_PARTITION_BYTES, raw)?;
        }
        if let Some(raw) = map.get(keys::MAX_PARTITION_BYTES) {
            opts.max_partition_bytes = parse_num(keys::MAX_PARTITION_BYTES, raw)?;
        }

        opts.validate()?;
        Ok(opts)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(SplitError::InvalidOptions(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.min_partition_bytes == 0 {
            return Err(SplitError::InvalidOptions(
                "minPartitionBytes must be at least 1".to_string(),
            ));
        }
        if self.min_partition_bytes > self.max_partition_bytes {
            return Err(SplitError::InvalidOptions(format!(
                "minPartitionBytes ({}) exceeds maxPartitionBytes ({})",
                self.min_partition_bytes, self.max_partition_bytes
            )));
        }
        if !self.encoding.eq_ignore_ascii_case("utf-8") && !self.encoding.eq_ignore_ascii_case("utf8")
        {
            return Err(SplitError::InvalidOptions(format!(
                "unsupported encoding '{}': only UTF-8 input is supported",
                self.encoding
            )));
        }
        Ok(())
    }

    /// Bucket size for a corpus of `total_bytes`: an even split across the
    /// configured parallelism, clamped to the configured bounds.
    pub fn bucket_size(&self, total_bytes: u64) -> u64 {
        let even = total_bytes.div_ceil(self.parallelism as u64);
        even.clamp(self.min_partition_bytes, self.max_partition_bytes)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(SplitError::InvalidOptions(format!(
            "{key}: expected \"true\" or \"false\", got \"{other}\""
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| SplitError::InvalidOptions(format!("{key}: invalid numeric value \"{raw}\"")))
}
