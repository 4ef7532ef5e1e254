//! Centralized configuration for the pager.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - PagerConfig::from_env() reads TSP_* variables on top of the defaults.
//! - Fluent `with_*` setters for programmatic overrides (tests, CLI flags).
//!
//! Defaults:
//! - page_size = 4096, cache_pages = 256 (1 MiB of cached pages)
//! - sync = true (fsync barriers on commit/rollback/recovery)
//! - journal_mode = delete
//! - unique_file_id = false (stable FileId derived from the path)

use std::fmt;
use std::str::FromStr;

use crate::consts::{DEFAULT_CACHE_PAGES, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::{PagerError, Result};

/// How the journal is disposed of once a transaction ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JournalMode {
    /// Remove the journal file.
    Delete,
    /// Keep the file, truncate it to zero length.
    Truncate,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "delete",
            JournalMode::Truncate => "truncate",
        }
    }
}

impl FromStr for JournalMode {
    type Err = PagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(JournalMode::Delete),
            "truncate" => Ok(JournalMode::Truncate),
            other => Err(PagerError::InvalidArgument(format!(
                "unknown journal mode '{}' (expected delete|truncate)",
                other
            ))),
        }
    }
}

/// Top-level configuration of a pager file / environment.
#[derive(Clone, Debug)]
pub struct PagerConfig {
    /// Page size in bytes, 512..=65536.
    /// Env: TSP_PAGE_SIZE (default 4096)
    pub page_size: usize,

    /// Page cache capacity in pages (>= 1).
    /// Env: TSP_CACHE_PAGES (default 256)
    pub cache_pages: usize,

    /// Issue fsync barriers. Turning this off keeps write ordering but drops durability;
    /// only meant for benches and tests.
    /// Env: TSP_SYNC (default true; "0|false|off|no" => false)
    pub sync: bool,

    /// Journal disposal at the end of a transaction.
    /// Env: TSP_JOURNAL_MODE = delete|truncate (default delete)
    pub journal_mode: JournalMode,

    /// Fresh FileId on each open (ephemeral files sharing a cache namespace).
    /// Env: TSP_UNIQUE_FILE_ID (default false)
    pub unique_file_id: bool,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache_pages: DEFAULT_CACHE_PAGES,
            sync: true,
            journal_mode: JournalMode::Delete,
            unique_file_id: false,
        }
    }
}

#[inline]
fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl PagerConfig {
    /// Load configuration from environment variables. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TSP_PAGE_SIZE") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.page_size = n;
            }
        }

        if let Ok(v) = std::env::var("TSP_CACHE_PAGES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.cache_pages = n;
            }
        }

        if let Ok(v) = std::env::var("TSP_SYNC") {
            cfg.sync = env_flag(&v);
        }

        if let Ok(v) = std::env::var("TSP_JOURNAL_MODE") {
            if let Ok(m) = v.parse::<JournalMode>() {
                cfg.journal_mode = m;
            }
        }

        if let Ok(v) = std::env::var("TSP_UNIQUE_FILE_ID") {
            cfg.unique_file_id = env_flag(&v);
        }

        cfg
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cache_pages(mut self, pages: usize) -> Self {
        self.cache_pages = pages;
        self
    }

    pub fn with_sync(mut self, on: bool) -> Self {
        self.sync = on;
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn with_unique_file_id(mut self, on: bool) -> Self {
        self.unique_file_id = on;
        self
    }

    /// Check ranges; called by everything that consumes a config.
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.page_size)?;
        if self.cache_pages == 0 {
            return Err(PagerError::InvalidArgument(
                "cache_pages must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Page size must lie in [512 .. 65536].
pub fn validate_page_size(page_size: usize) -> Result<()> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(PagerError::InvalidArgument(format!(
            "page_size must be in [{} .. {}], got {}",
            MIN_PAGE_SIZE, MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

impl fmt::Display for PagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PagerConfig {{ \
             page_size: {}, \
             cache_pages: {}, \
             sync: {}, \
             journal_mode: {}, \
             unique_file_id: {} \
             }}",
            self.page_size,
            self.cache_pages,
            self.sync,
            self.journal_mode.as_str(),
            self.unique_file_id,
        )
    }
}
