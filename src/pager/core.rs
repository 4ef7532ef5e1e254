//! pager/core — ядро PageFile: структура, open()/close(), get() и общие помощники.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::cache::PageCache;
use crate::config::{JournalMode, PagerConfig};
use crate::error::{IoContext, PagerError, Result};
use crate::journal::{journal_path, JournalWriter};
use crate::lock::{try_lock_exclusive, LockGuard};
use crate::metrics::record_page_read;
use crate::page::{Page, PageId, Pgno};
use crate::util::{generate_file_id, page_count, page_offset, pread_exact, FileId};

use super::recover::{recover_journal, RecoveryReport};

/// Запись dirty-списка: номер страницы и слот кэша, где живёт её буфер.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DirtyPage {
    pub(crate) pgno: Pgno,
    pub(crate) slot: usize,
}

/// Файл страниц с rollback-журналом.
///
/// Мутирующие операции берут `&mut self`: один писатель на файл.
/// `get` берёт `&self` и может идти параллельно для разных страниц.
pub struct PageFile {
    pub(crate) path: PathBuf,
    pub(crate) journal_path: PathBuf,
    pub(crate) file_id: FileId,
    pub(crate) file: File,
    pub(crate) cache: Arc<PageCache>,
    pub(crate) page_size: usize,
    pub(crate) sync: bool,
    pub(crate) journal_mode: JournalMode,

    /// Наибольший выделенный номер страницы (committedSize).
    pub(crate) committed_size: Pgno,
    /// Физическая длина файла в страницах; <= committed_size.
    pub(crate) file_pages: Pgno,

    // ----- transaction -----
    pub(crate) in_txn: bool,
    pub(crate) orig_size: Pgno,
    pub(crate) orig_file_pages: Pgno,
    pub(crate) dirty: Vec<DirtyPage>,
    pub(crate) journal: Option<JournalWriter>,
    // фаза 2 commit'а начала писать в основной файл
    pub(crate) main_touched: bool,

    pub(crate) recovered: Option<RecoveryReport>,
    pub(crate) closed: bool,
    _lock: LockGuard,
}

impl std::fmt::Debug for PageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFile")
            .field("path", &self.path)
            .field("file_id", &self.file_id)
            .field("page_size", &self.page_size)
            .field("journal_mode", &self.journal_mode)
            .field("committed_size", &self.committed_size)
            .field("in_txn", &self.in_txn)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl PageFile {
    /// Открыть файл с конфигурацией по умолчанию и page_size кэша.
    pub fn open(path: &Path, cache: Arc<PageCache>) -> Result<Self> {
        let cfg = PagerConfig::default().with_page_size(cache.page_size());
        Self::open_with_config(path, cache, &cfg)
    }

    /// Открыть (или создать) файл. Горячий журнал откатывается до того, как файл
    /// станет доступен; ошибка восстановления — ошибка open.
    pub fn open_with_config(path: &Path, cache: Arc<PageCache>, cfg: &PagerConfig) -> Result<Self> {
        cfg.validate()?;
        if cache.page_size() != cfg.page_size {
            return Err(PagerError::InvalidArgument(format!(
                "cache page size {} != file page size {}",
                cache.page_size(),
                cfg.page_size
            )));
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .io_context(|| format!("open {}", path.display()))?;
        let lock = try_lock_exclusive(&file, path)?;
        let file_id = generate_file_id(path, cfg.unique_file_id)?;
        let journal_path = journal_path(path);

        let recovered = recover_journal(&file, path, &journal_path, cfg)?;

        let len = file
            .metadata()
            .io_context(|| format!("stat {}", path.display()))?
            .len();
        let pages = page_count(len, cfg.page_size, path)?;

        // страницы от прежнего хэндла того же файла не должны пережить открытие
        cache.purge_file(file_id);

        debug!(
            "pager: opened {} (id={}, page_size={}, pages={})",
            path.display(),
            file_id,
            cfg.page_size,
            pages
        );

        Ok(Self {
            path: path.to_path_buf(),
            journal_path,
            file_id,
            file,
            cache,
            page_size: cfg.page_size,
            sync: cfg.sync,
            journal_mode: cfg.journal_mode,
            committed_size: pages,
            file_pages: pages,
            in_txn: false,
            orig_size: pages,
            orig_file_pages: pages,
            dirty: Vec::new(),
            journal: None,
            main_touched: false,
            recovered,
            closed: false,
            _lock: lock,
        })
    }

    /// Закрыть файл. Активная транзакция откатывается (никогда не коммитится молча).
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    /// Закреплённая страница pgno.
    ///
    /// Промах: страница за физическим концом файла (в том числе pgno > committedSize)
    /// заполняется нулями, остальные читаются с диска; короткое чтение — Corruption.
    pub fn get(&self, pgno: Pgno) -> Result<Page> {
        if pgno == 0 {
            return Err(PagerError::InvalidArgument("page numbers start at 1".into()));
        }
        let id = PageId::new(self.file_id, pgno);
        self.cache.fetch(id, |buf| self.load_page(pgno, buf))
    }

    /// Как get(), но по полному PageId. Чужой FileId — Corruption.
    pub fn get_by_id(&self, id: PageId) -> Result<Page> {
        if id.file_id != self.file_id {
            return Err(PagerError::Corruption(format!(
                "page {} does not belong to {} ({})",
                id,
                self.path.display(),
                self.file_id
            )));
        }
        self.get(id.pgno)
    }

    /// Сырой образ страницы с диска, мимо кэша.
    pub fn read_on_disk(&self, pgno: Pgno) -> Result<Vec<u8>> {
        if pgno == 0 {
            return Err(PagerError::InvalidArgument("page numbers start at 1".into()));
        }
        let mut buf = vec![0u8; self.page_size];
        self.load_page(pgno, &mut buf)?;
        Ok(buf)
    }

    // ---------- accessors ----------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Наибольший выделенный номер страницы.
    pub fn committed_size(&self) -> Pgno {
        self.committed_size
    }

    pub fn db_size(&self) -> Pgno {
        self.committed_size
    }

    /// Страниц физически в файле.
    pub fn file_pages(&self) -> Pgno {
        self.file_pages
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_txn
    }

    /// Записей в журнале текущей транзакции.
    pub fn journal_records(&self) -> u32 {
        self.journal.as_ref().map(|j| j.records()).unwrap_or(0)
    }

    /// Был ли откатан горячий журнал при открытии.
    pub fn recovered_on_open(&self) -> bool {
        self.recovered.is_some()
    }

    pub fn recovery_report(&self) -> Option<&RecoveryReport> {
        self.recovered.as_ref()
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    // ---------- helpers ----------

    pub(crate) fn page_id(&self, pgno: Pgno) -> PageId {
        PageId::new(self.file_id, pgno)
    }

    pub(crate) fn load_page(&self, pgno: Pgno, buf: &mut [u8]) -> Result<()> {
        if pgno > self.file_pages {
            buf.fill(0);
            return Ok(());
        }
        pread_exact(&self.file, buf, page_offset(pgno, self.page_size), &|| {
            format!("page {} of {}", pgno, self.path.display())
        })?;
        record_page_read();
        Ok(())
    }

    pub(crate) fn sync_main(&self) -> Result<()> {
        if self.sync {
            self.file
                .sync_all()
                .io_context(|| format!("fsync {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Привести длину основного файла к `pages` страницам.
    pub(crate) fn set_file_pages(&self, pages: Pgno) -> Result<()> {
        let want = pages as u64 * self.page_size as u64;
        let len = self
            .file
            .metadata()
            .io_context(|| format!("stat {}", self.path.display()))?
            .len();
        if len != want {
            self.file
                .set_len(want)
                .io_context(|| format!("truncate {} to {} pages", self.path.display(), pages))?;
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let res = if self.in_txn {
            warn!(
                "pager: {} closed with an active transaction, rolling back",
                self.path.display()
            );
            self.rollback()
        } else {
            Ok(())
        };
        self.cache.purge_file(self.file_id);
        debug!("pager: closed {}", self.path.display());
        res
    }
}

impl Drop for PageFile {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("pager: close of {} failed: {}", self.path.display(), e);
        }
    }
}
