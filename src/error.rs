//! Error taxonomy of the pager.
//!
//! - Io / IoAt        — OS boundary failures (open/read/write/fsync), never retried here.
//! - Corruption       — malformed journal, short read inside the file, foreign page id.
//! - ResourceExhausted — the page cache has no evictable slot; flush or unpin and retry.
//! - InvalidState     — API misuse (commit without a transaction, locked page buffer).
//! - InvalidArgument  — bad input (pgno 0, page size out of range, page of another file).

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PagerError>;

#[derive(Debug, Error)]
pub enum PagerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("I/O error: {context}: {source}")]
    IoAt {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("corruption detected: {0}")]
    Corruption(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PagerError {
    pub fn is_io(&self) -> bool {
        matches!(self, PagerError::Io(_) | PagerError::IoAt { .. })
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, PagerError::Corruption(_))
    }

    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, PagerError::ResourceExhausted(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, PagerError::InvalidState(_))
    }
}

/// Annotate an `io::Result` with the operation/path it failed on.
pub(crate) trait IoContext<T> {
    fn io_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|source| PagerError::IoAt {
            context: f(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_context_keeps_source_and_kind() {
        let r: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let e = r.io_context(|| "open /tmp/x".to_string()).unwrap_err();
        assert!(e.is_io());
        assert_eq!(e.to_string(), "I/O error: open /tmp/x: gone");
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn classifiers() {
        assert!(PagerError::Corruption("x".into()).is_corruption());
        assert!(PagerError::ResourceExhausted("x".into()).is_resource_exhausted());
        assert!(PagerError::InvalidState("x".into()).is_invalid_state());
        assert!(!PagerError::InvalidArgument("x".into()).is_io());
    }
}
