// tests/metrics_counters.rs
//
// Глобальные счётчики: один тест на бинарник, чтобы reset() не мешал соседям.

use anyhow::Result;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tspager::journal::journal_path;
use tspager::metrics;
use tspager::{PageCache, PageFile, PagerConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[test]
fn counters_follow_pager_activity() -> Result<()> {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let root = std::env::temp_dir().join(format!("tspager-metrics-{pid}-{t}-{id}"));
    fs::create_dir_all(&root)?;
    let path = root.join("data.tdb");
    let cfg = PagerConfig::default().with_page_size(512).with_sync(false);

    metrics::reset();
    let mut pf = PageFile::open_with_config(&path, PageCache::new(512, 4)?, &cfg)?;
    pf.alloc_pages(2)?;
    pf.begin()?;
    pf.commit()?;

    let p = pf.get(1)?;
    pf.update(&p, |buf| buf.fill(1))?;
    drop(p);
    pf.commit()?;

    let p = pf.get(2)?;
    pf.update(&p, |buf| buf.fill(2))?;
    drop(p);
    pf.rollback()?;

    let m = metrics::snapshot();
    assert_eq!(m.commits, 2);
    assert_eq!(m.committed_pages, 1);
    assert_eq!(m.rollbacks, 1);
    assert_eq!(m.journal_records, 2);
    assert_eq!(m.journal_bytes, 2 * (8 + 512));
    assert!(m.page_cache_hits >= 2);
    assert!(m.page_cache_misses >= 2);
    assert!(m.cache_hit_ratio() > 0.0 && m.cache_hit_ratio() < 1.0);
    assert!((m.avg_commit_pages() - 0.5).abs() < f64::EPSILON);

    // горячий журнал в копии: recovery попадает в счётчики
    let p = pf.get(2)?;
    pf.update(&p, |buf| buf.fill(3))?;
    drop(p);
    pf.commit_phase_one()?;
    let crash = root.join("crash.tdb");
    fs::copy(&path, &crash)?;
    fs::copy(pf.journal_path(), journal_path(&crash))?;
    pf.rollback()?;
    pf.close()?;

    let copy = PageFile::open_with_config(&crash, PageCache::new(512, 4)?, &cfg)?;
    assert!(copy.recovered_on_open());
    let m = metrics::snapshot();
    assert_eq!(m.recoveries, 1);
    assert_eq!(m.recovered_pages, 1);
    copy.close()?;

    let json = serde_json::to_string(&m)?;
    assert!(json.contains("\"recoveries\":1"));

    metrics::reset();
    assert_eq!(metrics::snapshot().commits, 0);
    Ok(())
}
