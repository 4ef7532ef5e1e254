//! Lightweight global metrics for the pager.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Page cache (per-process; каждый PageCache ведёт ещё и свои CacheStats)
//! - Disk I/O страниц
//! - Journal
//! - Транзакции и recovery

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Page cache -----
static PAGE_CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static PAGE_CACHE_MISSES: AtomicU64 = AtomicU64::new(0);
static PAGE_CACHE_EVICTIONS: AtomicU64 = AtomicU64::new(0);

// ----- Disk I/O -----
static PAGES_READ: AtomicU64 = AtomicU64::new(0);
static PAGES_WRITTEN: AtomicU64 = AtomicU64::new(0);

// ----- Journal -----
static JOURNAL_RECORDS: AtomicU64 = AtomicU64::new(0);
static JOURNAL_BYTES: AtomicU64 = AtomicU64::new(0);
static JOURNAL_FSYNCS: AtomicU64 = AtomicU64::new(0);

// ----- Transactions -----
static COMMITS: AtomicU64 = AtomicU64::new(0);
static COMMITTED_PAGES: AtomicU64 = AtomicU64::new(0);
static ROLLBACKS: AtomicU64 = AtomicU64::new(0);
static RECOVERIES: AtomicU64 = AtomicU64::new(0);
static RECOVERED_PAGES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    // Page cache
    pub page_cache_hits: u64,
    pub page_cache_misses: u64,
    pub page_cache_evictions: u64,

    // Disk I/O
    pub pages_read: u64,
    pub pages_written: u64,

    // Journal
    pub journal_records: u64,
    pub journal_bytes: u64,
    pub journal_fsyncs: u64,

    // Transactions
    pub commits: u64,
    pub committed_pages: u64,
    pub rollbacks: u64,
    pub recoveries: u64,
    pub recovered_pages: u64,
}

impl MetricsSnapshot {
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.page_cache_hits + self.page_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.page_cache_hits as f64 / total as f64
        }
    }

    pub fn avg_commit_pages(&self) -> f64 {
        if self.commits == 0 {
            0.0
        } else {
            self.committed_pages as f64 / self.commits as f64
        }
    }
}

// ----- Recorders (Page cache) -----
pub fn record_cache_hit() {
    PAGE_CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_cache_miss() {
    PAGE_CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_cache_eviction() {
    PAGE_CACHE_EVICTIONS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Disk I/O) -----
pub fn record_page_read() {
    PAGES_READ.fetch_add(1, Ordering::Relaxed);
}
pub fn record_page_written() {
    PAGES_WRITTEN.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Journal) -----
pub fn record_journal_append(bytes: usize) {
    JOURNAL_RECORDS.fetch_add(1, Ordering::Relaxed);
    JOURNAL_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_journal_fsync() {
    JOURNAL_FSYNCS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Transactions) -----
pub fn record_commit(pages: usize) {
    COMMITS.fetch_add(1, Ordering::Relaxed);
    COMMITTED_PAGES.fetch_add(pages as u64, Ordering::Relaxed);
}

pub fn record_rollback() {
    ROLLBACKS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_recovery(pages: u64) {
    RECOVERIES.fetch_add(1, Ordering::Relaxed);
    RECOVERED_PAGES.fetch_add(pages, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        page_cache_hits: PAGE_CACHE_HITS.load(Ordering::Relaxed),
        page_cache_misses: PAGE_CACHE_MISSES.load(Ordering::Relaxed),
        page_cache_evictions: PAGE_CACHE_EVICTIONS.load(Ordering::Relaxed),

        pages_read: PAGES_READ.load(Ordering::Relaxed),
        pages_written: PAGES_WRITTEN.load(Ordering::Relaxed),

        journal_records: JOURNAL_RECORDS.load(Ordering::Relaxed),
        journal_bytes: JOURNAL_BYTES.load(Ordering::Relaxed),
        journal_fsyncs: JOURNAL_FSYNCS.load(Ordering::Relaxed),

        commits: COMMITS.load(Ordering::Relaxed),
        committed_pages: COMMITTED_PAGES.load(Ordering::Relaxed),
        rollbacks: ROLLBACKS.load(Ordering::Relaxed),
        recoveries: RECOVERIES.load(Ordering::Relaxed),
        recovered_pages: RECOVERED_PAGES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    PAGE_CACHE_HITS.store(0, Ordering::Relaxed);
    PAGE_CACHE_MISSES.store(0, Ordering::Relaxed);
    PAGE_CACHE_EVICTIONS.store(0, Ordering::Relaxed);

    PAGES_READ.store(0, Ordering::Relaxed);
    PAGES_WRITTEN.store(0, Ordering::Relaxed);

    JOURNAL_RECORDS.store(0, Ordering::Relaxed);
    JOURNAL_BYTES.store(0, Ordering::Relaxed);
    JOURNAL_FSYNCS.store(0, Ordering::Relaxed);

    COMMITS.store(0, Ordering::Relaxed);
    COMMITTED_PAGES.store(0, Ordering::Relaxed);
    ROLLBACKS.store(0, Ordering::Relaxed);
    RECOVERIES.store(0, Ordering::Relaxed);
    RECOVERED_PAGES.store(0, Ordering::Relaxed);
}
