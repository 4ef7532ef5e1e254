use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use tspager::metrics::{self, MetricsSnapshot};
use tspager::{CacheStats, RecoveryReport};

use super::util::open_file;

#[derive(Serialize)]
struct Status {
    path: String,
    journal_path: String,
    file_id: String,
    page_size: usize,
    committed_size: u32,
    file_pages: u32,
    file_bytes: u64,
    recovered_on_open: bool,
    recovery: Option<RecoveryReport>,
    cache: CacheStats,
    metrics: MetricsSnapshot,
}

pub fn exec(path: PathBuf, page_size: usize, json: bool) -> Result<()> {
    let pf = open_file(&path, page_size)?;
    let file_bytes = std::fs::metadata(&path)?.len();

    let st = Status {
        path: pf.path().display().to_string(),
        journal_path: pf.journal_path().display().to_string(),
        file_id: pf.file_id().to_string(),
        page_size: pf.page_size(),
        committed_size: pf.committed_size(),
        file_pages: pf.file_pages(),
        file_bytes,
        recovered_on_open: pf.recovered_on_open(),
        recovery: pf.recovery_report().copied(),
        cache: pf.cache().stats(),
        metrics: metrics::snapshot(),
    };
    pf.close()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&st)?);
        return Ok(());
    }

    println!("path:            {}", st.path);
    println!("journal:         {}", st.journal_path);
    println!("file_id:         {}", st.file_id);
    println!("page_size:       {}", st.page_size);
    println!("committed_size:  {}", st.committed_size);
    println!("file_pages:      {} ({} B)", st.file_pages, st.file_bytes);
    match st.recovery {
        Some(r) => println!(
            "recovered:       yes ({} page(s) restored, txn started at {} pages)",
            r.pages_restored, r.orig_db_pages
        ),
        None => println!("recovered:       no"),
    }
    println!(
        "io:              pages_read={} pages_written={} recoveries={}",
        st.metrics.pages_read, st.metrics.pages_written, st.metrics.recoveries
    );
    Ok(())
}
