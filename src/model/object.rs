use std::{
    str::FromStr,
    time::{Duration, SystemTime},
};

use crate::model::error::StorageError;

/// Deadline applied to every bucket or object enumeration.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rows of delimited text, each an ordered sequence of fields.
pub type Table = Vec<Vec<String>>;

/// A bucket as reported by the store. Only `name` is interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketDescriptor {
    pub name: String,
    pub location: Option<String>,
    pub created: Option<SystemTime>,
}

/// Snapshot of a stored object taken at listing time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub key: String,
    pub size: i64,
    pub modified_time: SystemTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Backend enumeration order.
    #[default]
    None,
    /// Oldest first; ties keep backend order.
    ByModificationTime,
    /// Digit runs compare numerically, so `file2` precedes `file10`.
    NaturalName,
}

impl FromStr for SortMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(SortMode::None),
            "mtime" | "modification-time" => Ok(SortMode::ByModificationTime),
            "natural" => Ok(SortMode::NaturalName),
            _ => Err(StorageError::invalid(format!("unknown sort mode: {}", s))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    pub sort: SortMode,
    pub timeout: Duration,
}

impl ListingRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: String::new(),
            delimiter: None,
            sort: SortMode::None,
            timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Restrict results to a single level under the prefix.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
