//! PageCache — ограниченный пул страниц с пинами и LRU-вытеснением.
//!
//! Design:
//! - Арена слотов фиксированной ёмкости; HashMap<PageId, slot> для поиска.
//! - Интрузивный двусвязный LRU по индексам слотов (prev/next), head = MRU, tail = LRU.
//! - Вытеснение идёт от tail и пропускает закреплённые, грязные и ещё загружаемые слоты.
//!   Нет кандидата — ResourceExhausted (вызывающий должен сделать commit или снять пины).
//! - Не более одной загрузки на PageId: промах ставит слот в Loading и отпускает лок кэша;
//!   конкурентные fetch того же id пинят слот и ждут на Condvar.
//! - Неудачная загрузка переводит слот в Failed, убирает его из map и будит ждущих,
//!   они повторяют fetch. Последний unpin освобождает слот.
//!
//! Lock order: state → frame. Под локом кэша буферы страниц не блокируются.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;

use crate::error::{PagerError, Result};
use crate::metrics::{record_cache_eviction, record_cache_hit, record_cache_miss};
use crate::page::{Frame, Page, PageId};
use crate::util::FileId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotStatus {
    Free,
    Loading,
    Ready,
    Failed,
    // убран из map, но ещё закреплён хэндлами
    Detached,
}

struct Slot {
    id: Option<PageId>,
    frame: Arc<Frame>,
    pins: u32,
    dirty: bool,
    status: SlotStatus,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Slot {
    fn new(page_size: usize) -> Self {
        Self {
            id: None,
            frame: Arc::new(RwLock::new(vec![0u8; page_size].into_boxed_slice())),
            pins: 0,
            dirty: false,
            status: SlotStatus::Free,
            prev: None,
            next: None,
        }
    }
}

struct CacheState {
    slots: Vec<Slot>,
    map: HashMap<PageId, usize>,
    free: Vec<usize>,
    head: Option<usize>, // Most-recently used
    tail: Option<usize>, // Least-recently used
}

/// Per-cache counters (в дополнение к глобальным metrics).
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub loads: u64,
}

#[derive(Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    loads: AtomicU64,
}

pub struct PageCache {
    page_size: usize,
    capacity: usize,
    state: Mutex<CacheState>,
    load_done: Condvar,
    stats: StatCounters,
}

impl PageCache {
    /// Create a cache for `capacity` pages of `page_size` bytes.
    /// Буферы выделяются лениво, по мере заполнения слотов.
    pub fn new(page_size: usize, capacity: usize) -> Result<Arc<Self>> {
        crate::config::validate_page_size(page_size)?;
        if capacity == 0 {
            return Err(PagerError::InvalidArgument(
                "page cache capacity must be at least 1".into(),
            ));
        }
        Ok(Arc::new(Self {
            page_size,
            capacity,
            state: Mutex::new(CacheState {
                slots: Vec::with_capacity(capacity),
                map: HashMap::with_capacity(capacity),
                free: Vec::new(),
                head: None,
                tail: None,
            }),
            load_done: Condvar::new(),
            stats: StatCounters::default(),
        }))
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return a pinned page for `id`.
    ///
    /// On a miss `loader` fills the whole buffer; it runs without the cache lock held.
    /// Concurrent fetches of the same missing id wait for that single load.
    pub fn fetch<F>(self: &Arc<Self>, id: PageId, loader: F) -> Result<Page>
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        let mut st = self.state.lock();
        loop {
            if let Some(&slot) = st.map.get(&id) {
                st.slots[slot].pins += 1;
                while st.slots[slot].status == SlotStatus::Loading {
                    self.load_done.wait(&mut st);
                }
                if st.slots[slot].status == SlotStatus::Ready {
                    st.touch(slot);
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    record_cache_hit();
                    let frame = st.slots[slot].frame.clone();
                    return Ok(Page::new(self.clone(), slot, id, frame));
                }
                // загрузка упала (или слот отцеплен) — отпускаем и пробуем заново
                st.unpin(slot);
                continue;
            }

            let slot = self.acquire_slot(&mut st)?;
            {
                let s = &mut st.slots[slot];
                s.id = Some(id);
                s.pins = 1;
                s.dirty = false;
                s.status = SlotStatus::Loading;
            }
            st.map.insert(id, slot);
            st.attach_front(slot);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            record_cache_miss();

            let frame = st.slots[slot].frame.clone();
            drop(st);

            let res = {
                let mut buf = frame.write();
                loader(&mut buf[..])
            };

            let mut st = self.state.lock();
            return match res {
                Ok(()) => {
                    st.slots[slot].status = SlotStatus::Ready;
                    self.stats.loads.fetch_add(1, Ordering::Relaxed);
                    self.load_done.notify_all();
                    Ok(Page::new(self.clone(), slot, id, frame))
                }
                Err(e) => {
                    debug!("page cache: load of {} failed: {}", id, e);
                    st.map.remove(&id);
                    st.detach(slot);
                    st.slots[slot].status = SlotStatus::Failed;
                    self.load_done.notify_all();
                    st.unpin(slot);
                    Err(e)
                }
            };
        }
    }

    /// Is `id` resident and loaded.
    pub fn contains(&self, id: PageId) -> bool {
        let st = self.state.lock();
        st.map
            .get(&id)
            .map(|&slot| st.slots[slot].status == SlotStatus::Ready)
            .unwrap_or(false)
    }

    /// Pin count of a resident page (0 if absent).
    pub fn pin_count(&self, id: PageId) -> u32 {
        let st = self.state.lock();
        st.map.get(&id).map(|&slot| st.slots[slot].pins).unwrap_or(0)
    }

    /// Resident pages (loaded or loading).
    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pinned_pages(&self) -> usize {
        let st = self.state.lock();
        st.slots.iter().filter(|s| s.pins > 0).count()
    }

    pub fn dirty_pages(&self) -> usize {
        let st = self.state.lock();
        st.slots.iter().filter(|s| s.dirty).count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            loads: self.stats.loads.load(Ordering::Relaxed),
        }
    }

    /// Drop every resident page of `file_id` (закрытие файла).
    pub fn purge_file(&self, file_id: FileId) -> usize {
        self.discard_where(|id| id.file_id == file_id)
    }

    // ---------------- crate API (PageFile / Page) ----------------

    pub(crate) fn repin(&self, slot: usize) {
        self.state.lock().slots[slot].pins += 1;
    }

    /// FetchFinish: снять пин. Страница с 0 пинов и без dirty становится вытесняемой.
    pub(crate) fn unpin(&self, slot: usize) {
        self.state.lock().unpin(slot);
    }

    pub(crate) fn slot_pins(&self, slot: usize) -> u32 {
        self.state.lock().slots[slot].pins
    }

    pub(crate) fn slot_is_dirty(&self, slot: usize) -> bool {
        self.state.lock().slots[slot].dirty
    }

    pub(crate) fn set_dirty(&self, slot: usize, dirty: bool) {
        self.state.lock().slots[slot].dirty = dirty;
    }

    /// Слот сейчас обслуживает `id` в кэше (не отцеплен, не переиспользован).
    pub(crate) fn is_resident(&self, slot: usize, id: PageId) -> bool {
        let st = self.state.lock();
        st.map.get(&id) == Some(&slot) && st.slots[slot].status == SlotStatus::Ready
    }

    /// Buffer of a resident slot, verified against the expected id.
    pub(crate) fn frame_of(&self, slot: usize, id: PageId) -> Result<Arc<Frame>> {
        let st = self.state.lock();
        let s = &st.slots[slot];
        if s.id != Some(id) || s.status != SlotStatus::Ready {
            return Err(PagerError::InvalidState(format!(
                "page {} is no longer resident in slot {}",
                id, slot
            )));
        }
        Ok(s.frame.clone())
    }

    /// Remove matching loaded pages from the cache. Pinned ones become detached:
    /// their handles keep the buffer until the last pin is released.
    pub(crate) fn discard_where<P>(&self, pred: P) -> usize
    where
        P: Fn(&PageId) -> bool,
    {
        let mut st = self.state.lock();
        let victims: Vec<(PageId, usize)> = st
            .map
            .iter()
            .filter(|(id, slot)| pred(*id) && st.slots[**slot].status == SlotStatus::Ready)
            .map(|(id, slot)| (*id, *slot))
            .collect();

        for (id, slot) in &victims {
            st.map.remove(id);
            st.detach(*slot);
            st.slots[*slot].dirty = false;
            if st.slots[*slot].pins == 0 {
                st.release(*slot);
            } else {
                st.slots[*slot].status = SlotStatus::Detached;
            }
        }
        victims.len()
    }

    // ---------------- internal helpers ----------------

    fn acquire_slot(&self, st: &mut CacheState) -> Result<usize> {
        if let Some(slot) = st.free.pop() {
            return Ok(slot);
        }
        if st.slots.len() < self.capacity {
            st.slots.push(Slot::new(self.page_size));
            return Ok(st.slots.len() - 1);
        }

        // LRU victim: walk from the tail.
        let mut cur = st.tail;
        while let Some(slot) = cur {
            let (evictable, old_id, prev) = {
                let s = &st.slots[slot];
                (
                    s.status == SlotStatus::Ready && s.pins == 0 && !s.dirty,
                    s.id,
                    s.prev,
                )
            };
            if evictable {
                if let Some(old) = old_id {
                    st.map.remove(&old);
                    debug!("page cache: evict {}", old);
                }
                st.detach(slot);
                st.reset(slot);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                record_cache_eviction();
                return Ok(slot);
            }
            cur = prev;
        }

        Err(PagerError::ResourceExhausted(format!(
            "page cache full: all {} pages are pinned, dirty or loading",
            self.capacity
        )))
    }
}

impl CacheState {
    fn unpin(&mut self, slot: usize) {
        let s = &mut self.slots[slot];
        debug_assert!(s.pins > 0, "unpin of an unpinned slot");
        s.pins = s.pins.saturating_sub(1);
        if s.pins == 0 && matches!(s.status, SlotStatus::Failed | SlotStatus::Detached) {
            self.release(slot);
        }
    }

    fn release(&mut self, slot: usize) {
        self.reset(slot);
        self.free.push(slot);
    }

    fn reset(&mut self, slot: usize) {
        let s = &mut self.slots[slot];
        s.id = None;
        s.pins = 0;
        s.dirty = false;
        s.status = SlotStatus::Free;
        s.prev = None;
        s.next = None;
    }

    fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.attach_front(slot);
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        let linked = prev.is_some() || next.is_some() || self.head == Some(slot);
        if !linked {
            return;
        }

        if self.head == Some(slot) {
            self.head = next;
        }
        if self.tail == Some(slot) {
            self.tail = prev;
        }
        if let Some(p) = prev {
            self.slots[p].next = next;
        }
        if let Some(n) = next {
            self.slots[n].prev = prev;
        }

        self.slots[slot].prev = None;
        self.slots[slot].next = None;
    }

    fn attach_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
