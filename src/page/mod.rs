//! page — адресация страниц и закреплённый (pinned) хэндл страницы.
//!
//! - Pgno: 1-based номер страницы; страница n лежит по смещению (n-1) * page_size.
//! - PageId: (FileId, Pgno), уникален в общем кэше, обслуживающем несколько файлов.
//! - Page: RAII-пин слота кэша. Drop снимает пин, Clone добавляет ещё один.
//!
//! Буфер страницы принадлежит кэшу (Frame); хэндл держит только Arc на него.

use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::PageCache;
use crate::util::FileId;

pub type Pgno = u32;

/// Буфер страницы ровно page_size байт.
pub(crate) type Frame = RwLock<Box<[u8]>>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub file_id: FileId,
    pub pgno: Pgno,
}

impl PageId {
    pub fn new(file_id: FileId, pgno: Pgno) -> Self {
        Self { file_id, pgno }
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({}#{})", self.file_id, self.pgno)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file_id, self.pgno)
    }
}

/// Закреплённая страница. Пока хэндл жив, слот не может быть вытеснен.
pub struct Page {
    cache: Arc<PageCache>,
    slot: usize,
    id: PageId,
    frame: Arc<Frame>,
}

impl Page {
    pub(crate) fn new(cache: Arc<PageCache>, slot: usize, id: PageId, frame: Arc<Frame>) -> Self {
        Self {
            cache,
            slot,
            id,
            frame,
        }
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    #[inline]
    pub fn pgno(&self) -> Pgno {
        self.id.pgno
    }

    #[inline]
    pub fn file_id(&self) -> FileId {
        self.id.file_id
    }

    pub fn page_size(&self) -> usize {
        self.cache.page_size()
    }

    /// Shared view of the page bytes.
    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.frame.read(), |b| &**b)
    }

    /// Mutable view of the page bytes. Call `PageFile::write` before the first mutation
    /// in a transaction so the pre-image gets journaled.
    pub fn data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.frame.write(), |b| &mut **b)
    }

    /// Copy of the page bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data().to_vec()
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.slot_is_dirty(self.slot)
    }

    pub fn pin_count(&self) -> u32 {
        self.cache.slot_pins(self.slot)
    }

    #[inline]
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub(crate) fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }
}

impl Clone for Page {
    fn clone(&self) -> Self {
        self.cache.repin(self.slot);
        Self {
            cache: self.cache.clone(),
            slot: self.slot,
            id: self.id,
            frame: self.frame.clone(),
        }
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.cache.unpin(self.slot);
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .finish()
    }
}
