// tests/page_cache.rs
//
// PageCache:
// - LRU-вытеснение от хвоста, hit переносит страницу в голову;
// - закреплённые и грязные страницы не вытесняются (ResourceExhausted);
// - упавший loader не оставляет следов, повторный fetch грузит заново;
// - одна загрузка на PageId при конкурентных промахах;
// - Clone/Drop хэндла двигают счётчик пинов;
// - общий кэш для нескольких файлов, purge при close, отцепленные страницы после rollback;
// - отцепленный хэндл нельзя передать в write().

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tspager::{FileId, PageCache, PageFile, PageId, PagerConfig, PagerError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let root = std::env::temp_dir().join(format!("tspager-cache-{prefix}-{pid}-{t}-{id}"));
    fs::create_dir_all(&root).unwrap();
    root
}

const PS: usize = 512;

fn pid(pgno: u32) -> PageId {
    PageId::new(FileId::from_parts(1, 2, 0), pgno)
}

fn fill_with(pgno: u32) -> impl FnOnce(&mut [u8]) -> tspager::Result<()> {
    move |buf: &mut [u8]| {
        buf.fill(pgno as u8);
        Ok(())
    }
}

#[test]
fn constructor_rejects_bad_geometry() {
    assert!(matches!(
        PageCache::new(100, 4),
        Err(PagerError::InvalidArgument(_))
    ));
    assert!(matches!(
        PageCache::new(PS, 0),
        Err(PagerError::InvalidArgument(_))
    ));
    let c = PageCache::new(PS, 4).unwrap();
    assert_eq!(c.page_size(), PS);
    assert_eq!(c.capacity(), 4);
    assert!(c.is_empty());
}

#[test]
fn lru_evicts_least_recently_used() -> Result<()> {
    let cache = PageCache::new(PS, 3)?;
    for pgno in 1..=3 {
        let p = cache.fetch(pid(pgno), fill_with(pgno))?;
        assert_eq!(p.data()[0], pgno as u8);
    }
    assert_eq!(cache.len(), 3);

    // hit: страница 1 становится самой свежей, хвост — страница 2
    let p1 = cache.fetch(pid(1), |_| panic!("resident page must not be reloaded"))?;
    assert_eq!(p1.data()[0], 1);
    drop(p1);

    let p4 = cache.fetch(pid(4), fill_with(4))?;
    assert_eq!(p4.pgno(), 4);
    drop(p4);

    assert!(cache.contains(pid(1)));
    assert!(!cache.contains(pid(2)));
    assert!(cache.contains(pid(3)));
    assert!(cache.contains(pid(4)));

    let st = cache.stats();
    assert_eq!(st.misses, 4);
    assert_eq!(st.hits, 1);
    assert_eq!(st.evictions, 1);
    assert_eq!(st.loads, 4);
    Ok(())
}

#[test]
fn pinned_pages_are_not_evicted() -> Result<()> {
    let cache = PageCache::new(PS, 2)?;
    let p1 = cache.fetch(pid(1), fill_with(1))?;
    let p2 = cache.fetch(pid(2), fill_with(2))?;
    assert_eq!(cache.pinned_pages(), 2);

    let err = cache.fetch(pid(3), fill_with(3)).unwrap_err();
    assert!(err.is_resource_exhausted(), "got {err}");
    assert_eq!(cache.len(), 2);

    drop(p1);
    let p3 = cache.fetch(pid(3), fill_with(3))?;
    assert!(!cache.contains(pid(1)));
    assert!(cache.contains(pid(2)));
    assert_eq!(p3.data()[0], 3);
    drop((p2, p3));
    assert_eq!(cache.pinned_pages(), 0);
    Ok(())
}

#[test]
fn failed_load_leaves_no_trace() -> Result<()> {
    let cache = PageCache::new(PS, 2)?;
    let err = cache
        .fetch(pid(7), |_| Err(PagerError::Corruption("short read".into())))
        .unwrap_err();
    assert!(err.is_corruption());
    assert!(!cache.contains(pid(7)));
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.pinned_pages(), 0);

    let p = cache.fetch(pid(7), fill_with(7))?;
    assert!(p.data().iter().all(|&b| b == 7));

    // слот упавшей загрузки вернулся в пул: ёмкость не потеряна
    let q = cache.fetch(pid(8), fill_with(8))?;
    assert_eq!(cache.len(), 2);
    drop((p, q));
    Ok(())
}

#[test]
fn concurrent_misses_share_one_load() -> Result<()> {
    const THREADS: usize = 8;
    let cache = PageCache::new(PS, 4)?;
    let loads = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = cache.clone();
            let loads = loads.clone();
            let barrier = barrier.clone();
            thread::spawn(move || -> tspager::Result<u8> {
                barrier.wait();
                let p = cache.fetch(pid(5), |buf| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    buf.fill(0x5A);
                    Ok(())
                })?;
                let b = p.data()[PS - 1];
                Ok(b)
            })
        })
        .collect();

    for h in handles {
        let b = h.join().expect("fetch thread panicked")?;
        assert_eq!(b, 0x5A);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.pin_count(pid(5)), 0);
    Ok(())
}

#[test]
fn waiters_retry_after_failed_load() -> Result<()> {
    let cache = PageCache::new(PS, 4)?;
    let barrier = Arc::new(Barrier::new(2));
    let attempts = Arc::new(AtomicUsize::new(0));

    // первая загрузка падает; второй поток либо ждал её и повторил, либо пришёл позже
    let first = {
        let cache = cache.clone();
        let barrier = barrier.clone();
        let attempts = attempts.clone();
        thread::spawn(move || {
            cache.fetch(pid(9), |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
                thread::sleep(Duration::from_millis(20));
                Err(PagerError::Corruption("torn page".into()))
            })
        })
    };
    barrier.wait();
    let p = cache.fetch(pid(9), |buf| {
        attempts.fetch_add(1, Ordering::SeqCst);
        buf.fill(9);
        Ok(())
    })?;
    assert!(first.join().expect("loader thread panicked").is_err());
    assert!(p.data().iter().all(|&b| b == 9));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn clone_and_drop_move_pin_count() -> Result<()> {
    let cache = PageCache::new(PS, 2)?;
    let p = cache.fetch(pid(1), fill_with(1))?;
    assert_eq!(p.pin_count(), 1);

    let q = p.clone();
    assert_eq!(cache.pin_count(pid(1)), 2);
    assert_eq!(q.id(), p.id());

    // обе копии видят один буфер
    q.data_mut()[0] = 0xCC;
    assert_eq!(p.data()[0], 0xCC);

    drop(p);
    assert_eq!(q.pin_count(), 1);
    drop(q);
    assert_eq!(cache.pin_count(pid(1)), 0);
    assert!(cache.contains(pid(1)));
    Ok(())
}

#[test]
fn dirty_pages_stay_resident_until_commit() -> Result<()> {
    let root = unique_root("dirty");
    let path = root.join("data.tdb");
    let cfg = PagerConfig::default().with_page_size(PS).with_sync(false);

    {
        let mut pf = PageFile::open_with_config(&path, PageCache::new(PS, 8)?, &cfg)?;
        pf.alloc_pages(4)?;
        pf.begin()?;
        pf.commit()?;
        pf.close()?;
    }

    let cache = PageCache::new(PS, 2)?;
    let mut pf = PageFile::open_with_config(&path, cache.clone(), &cfg)?;
    for pgno in 1..=2 {
        let p = pf.get(pgno)?;
        pf.update(&p, |buf| buf.fill(pgno as u8))?;
    }
    assert_eq!(cache.dirty_pages(), 2);
    assert_eq!(cache.pinned_pages(), 0);

    let err = pf.get(3).unwrap_err();
    assert!(err.is_resource_exhausted(), "got {err}");
    // транзакция не пострадала
    assert!(pf.in_transaction());
    assert_eq!(pf.dirty_count(), 2);

    pf.commit()?;
    assert_eq!(cache.dirty_pages(), 0);
    assert!(pf.get(3)?.data().iter().all(|&b| b == 0));
    assert!(pf.get(4)?.data().iter().all(|&b| b == 0));
    assert!(pf.get(1)?.data().iter().all(|&b| b == 1));
    Ok(())
}

#[test]
fn files_share_a_cache_by_file_id() -> Result<()> {
    let root = unique_root("shared");
    let cache = PageCache::new(PS, 8)?;
    let mut a = PageFile::open(&root.join("a.tdb"), cache.clone())?;
    let mut b = PageFile::open(&root.join("b.tdb"), cache.clone())?;
    assert_ne!(a.file_id(), b.file_id());

    let (pa, _) = a.alloc_page()?;
    a.update(&pa, |buf| buf.fill(0xA0))?;
    let (pb, _) = b.alloc_page()?;
    b.update(&pb, |buf| buf.fill(0xB0))?;
    let (ida, idb) = (pa.id(), pb.id());
    assert_eq!(ida.pgno, idb.pgno);
    drop((pa, pb));
    a.commit()?;
    b.commit()?;

    assert_eq!(a.get(1)?.data()[0], 0xA0);
    assert_eq!(b.get(1)?.data()[0], 0xB0);
    assert!(cache.contains(ida));
    assert!(cache.contains(idb));

    a.close()?;
    assert!(!cache.contains(ida));
    assert!(cache.contains(idb));
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[test]
fn rollback_detaches_pinned_pages_past_old_size() -> Result<()> {
    let root = unique_root("detach");
    let path = root.join("data.tdb");
    let cache = PageCache::new(PS, 8)?;
    let mut pf = PageFile::open(&path, cache.clone())?;
    pf.alloc_page()?;
    pf.begin()?;
    pf.commit()?;

    pf.begin()?;
    let (p2, pgno) = pf.alloc_page()?;
    assert_eq!(pgno, 2);
    pf.update(&p2, |buf| buf.fill(9))?;
    pf.rollback()?;

    assert_eq!(pf.committed_size(), 1);
    assert!(!cache.contains(p2.id()));
    // хэндл жив, буфер при нём
    assert_eq!(p2.pin_count(), 1);
    assert!(!p2.is_dirty());
    assert_eq!(p2.data()[0], 9);
    drop(p2);
    assert_eq!(cache.pinned_pages(), 0);

    // свежая выдача после отката — нули
    assert!(pf.get(2)?.data().iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn stale_handle_after_rollback_cannot_be_written() -> Result<()> {
    let root = unique_root("stale");
    let path = root.join("data.tdb");
    let cfg = PagerConfig::default().with_page_size(PS).with_sync(false);
    let cache = PageCache::new(PS, 8)?;
    let mut pf = PageFile::open_with_config(&path, cache.clone(), &cfg)?;
    pf.alloc_page()?;
    pf.begin()?;
    pf.commit()?;

    pf.begin()?;
    let (stale, pgno) = pf.alloc_page()?;
    assert_eq!(pgno, 2);
    pf.rollback()?;

    // тот же pgno выдаётся заново, уже в другом слоте
    let (fresh, pgno) = pf.alloc_page()?;
    assert_eq!(pgno, 2);
    assert_eq!(fresh.id(), stale.id());
    pf.update(&fresh, |buf| buf.fill(0xAA))?;

    let err = pf.write(&stale).unwrap_err();
    assert!(err.is_invalid_state(), "got {err}");
    assert_eq!(pf.dirty_count(), 1);

    // запись в отцепленный буфер не видна ни кэшу, ни диску
    stale.data_mut().fill(0x55);
    drop((stale, fresh));
    pf.commit()?;
    assert!(pf.read_on_disk(2)?.iter().all(|&b| b == 0xAA));
    assert!(pf.get(2)?.data().iter().all(|&b| b == 0xAA));
    Ok(())
}

#[test]
fn handle_kept_across_reopen_is_rejected() -> Result<()> {
    let root = unique_root("reopen");
    let path = root.join("data.tdb");
    let cfg = PagerConfig::default().with_page_size(PS).with_sync(false);
    let cache = PageCache::new(PS, 8)?;

    let mut pf = PageFile::open_with_config(&path, cache.clone(), &cfg)?;
    pf.alloc_pages(2)?;
    pf.begin()?;
    pf.commit()?;
    let old = pf.get(1)?;
    pf.close()?;
    assert!(!cache.contains(old.id()));

    let mut pf = PageFile::open_with_config(&path, cache.clone(), &cfg)?;
    assert_eq!(pf.file_id(), old.id().file_id);
    let err = pf.write(&old).unwrap_err();
    assert!(err.is_invalid_state(), "got {err}");
    assert!(!pf.in_transaction());

    let cur = pf.get(1)?;
    pf.update(&cur, |buf| buf.fill(1))?;
    drop((old, cur));
    pf.commit()?;
    assert!(pf.read_on_disk(1)?.iter().all(|&b| b == 1));
    Ok(())
}
