//! pager/commit — фиксация транзакции.
//!
//! Порядок записи:
//! 1. фаза 1: fsync записей журнала → nrec в заголовок → fsync журнала (+ fsync каталога);
//! 2. фаза 2: грязные страницы в основной файл в порядке dirty-списка, расширение файла
//!    до committedSize, fsync основного файла;
//! 3. удаление (или усечение) журнала и fsync каталога.
//!
//! Любая ошибка оставляет транзакцию активной: можно повторить commit или сделать rollback.

use log::debug;

use crate::error::{IoContext, PagerError, Result};
use crate::metrics::{record_commit, record_page_written};
use crate::util::{page_offset, pwrite_all};

use super::core::PageFile;

impl PageFile {
    /// Зафиксировать активную транзакцию.
    pub fn commit(&mut self) -> Result<()> {
        if !self.in_txn {
            return Err(PagerError::InvalidState(
                "commit without an active transaction".into(),
            ));
        }
        self.commit_phase_one()?;
        self.commit_phase_two()
    }

    /// Фаза 1: сделать журнал устойчивым («горячим»). Основной файл ещё не тронут.
    pub fn commit_phase_one(&mut self) -> Result<()> {
        if !self.in_txn {
            return Err(PagerError::InvalidState(
                "commit without an active transaction".into(),
            ));
        }
        let journal = self.journal.as_mut().ok_or_else(|| {
            PagerError::InvalidState("active transaction without a journal".into())
        })?;
        journal.sync_records()
    }

    fn commit_phase_two(&mut self) -> Result<()> {
        self.main_touched = true;

        for d in &self.dirty {
            let frame = self.cache.frame_of(d.slot, self.page_id(d.pgno))?;
            let buf = frame.try_read().ok_or_else(|| {
                PagerError::InvalidState(format!(
                    "page {} is locked for writing; release data_mut() before commit()",
                    d.pgno
                ))
            })?;
            pwrite_all(&self.file, &buf, page_offset(d.pgno, self.page_size))
                .io_context(|| format!("write page {} of {}", d.pgno, self.path.display()))?;
            record_page_written();
        }

        // выделенные, но не записанные страницы тоже должны пережить reopen
        if self.committed_size > self.file_pages {
            self.set_file_pages(self.committed_size)?;
        }
        self.sync_main()?;

        if let Some(journal) = self.journal.as_mut() {
            journal.finish(self.journal_mode)?;
        }
        self.journal = None;

        let n = self.dirty.len();
        for d in self.dirty.drain(..) {
            self.cache.set_dirty(d.slot, false);
        }
        self.file_pages = self.committed_size;
        self.main_touched = false;
        self.in_txn = false;

        record_commit(n);
        debug!(
            "pager: {} commit ({} page(s), db_pages={})",
            self.path.display(),
            n,
            self.committed_size
        );
        Ok(())
    }
}
