//! pager/txn — границы транзакции и регистрация грязных страниц.
//!
//! - begin(): идемпотентно; создаёт журнал, запоминает committedSize и физическую длину файла.
//! - write(): первая запись страницы в транзакции журналирует её текущий образ
//!   (first-write-wins), дальше страница просто остаётся грязной.
//!   Страницы, выделенные после Begin, не журналируются: откат их отрезает.

use log::debug;

use crate::error::{PagerError, Result};
use crate::journal::JournalWriter;
use crate::page::Page;

use super::core::{DirtyPage, PageFile};

impl PageFile {
    /// Начать транзакцию. Повторный вызов внутри активной транзакции — no-op.
    pub fn begin(&mut self) -> Result<()> {
        if self.in_txn {
            return Ok(());
        }
        debug_assert!(self.dirty.is_empty());

        let journal = JournalWriter::create(
            &self.journal_path,
            self.page_size,
            self.committed_size,
            self.file_pages,
            self.sync,
        )?;
        self.journal = Some(journal);
        self.orig_size = self.committed_size;
        self.orig_file_pages = self.file_pages;
        self.main_touched = false;
        self.in_txn = true;

        debug!(
            "pager: {} begin (db_pages={}, file_pages={})",
            self.path.display(),
            self.orig_size,
            self.orig_file_pages
        );
        Ok(())
    }

    /// Зарегистрировать намерение изменить страницу. Вызывать до мутации буфера.
    ///
    /// Неявно начинает транзакцию. Буфер не должен быть захвачен `data_mut()` в момент вызова.
    pub fn write(&mut self, page: &Page) -> Result<()> {
        if page.file_id() != self.file_id {
            return Err(PagerError::InvalidArgument(format!(
                "page {} belongs to another file than {}",
                page.id(),
                self.path.display()
            )));
        }
        let pgno = page.pgno();
        if pgno > self.committed_size {
            return Err(PagerError::InvalidArgument(format!(
                "page {} is beyond the allocated size {} of {}",
                pgno,
                self.committed_size,
                self.path.display()
            )));
        }

        // хэндл, отцепленный rollback'ом или close, больше не представляет страницу
        if !self.cache.is_resident(page.slot(), page.id()) {
            return Err(PagerError::InvalidState(format!(
                "page {} handle is stale; get() the page again",
                page.id()
            )));
        }

        self.begin()?;

        if page.is_dirty() {
            return Ok(());
        }

        if pgno <= self.orig_size {
            let buf = page.frame().try_read().ok_or_else(|| {
                PagerError::InvalidState(format!(
                    "page {} is locked for writing; release data_mut() before write()",
                    pgno
                ))
            })?;
            let journal = self.journal.as_mut().ok_or_else(|| {
                PagerError::InvalidState("active transaction without a journal".into())
            })?;
            journal.append(pgno, &buf)?;
        }

        self.cache.set_dirty(page.slot(), true);
        self.dirty.push(DirtyPage {
            pgno,
            slot: page.slot(),
        });
        Ok(())
    }

    /// write() + мутация буфера в одном вызове.
    pub fn update<R, F>(&mut self, page: &Page, f: F) -> Result<R>
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        self.write(page)?;
        let mut buf = page.data_mut();
        Ok(f(&mut buf))
    }
}
