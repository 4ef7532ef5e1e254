//! pager/rollback — откат активной транзакции.
//!
//! 1. pre-image из журнала возвращаются в кэш (если страница резидентна) и на диск
//!    (если она не резидентна или фаза 2 commit'а уже писала в основной файл);
//! 2. страницы, выделенные после Begin, выкидываются из кэша;
//! 3. основной файл усекается до длины на момент Begin и fsync'ается;
//! 4. журнал удаляется, committedSize возвращается к значению на момент Begin.
//!
//! Ошибка на шагах 1–4 оставляет транзакцию активной; повторный rollback идемпотентен.

use std::collections::HashMap;

use log::debug;

use crate::error::{IoContext, PagerError, Result};
use crate::metrics::{record_page_written, record_rollback};
use crate::page::Pgno;
use crate::util::{page_offset, pwrite_all};

use super::core::PageFile;

impl PageFile {
    /// Отменить активную транзакцию. Без транзакции — InvalidState.
    pub fn rollback(&mut self) -> Result<()> {
        if !self.in_txn {
            return Err(PagerError::InvalidState(
                "rollback without an active transaction".into(),
            ));
        }

        self.ensure_dirty_unlocked()?;
        self.restore_pre_images()?;

        let orig = self.orig_size;
        let fid = self.file_id;
        self.dirty.retain(|d| d.pgno <= orig);
        let dropped = self
            .cache
            .discard_where(|id| id.file_id == fid && id.pgno > orig);

        self.set_file_pages(self.orig_file_pages)?;
        self.sync_main()?;

        if let Some(journal) = self.journal.as_mut() {
            journal.finish(self.journal_mode)?;
        }
        self.journal = None;

        for d in self.dirty.drain(..) {
            self.cache.set_dirty(d.slot, false);
        }
        self.committed_size = self.orig_size;
        self.file_pages = self.orig_file_pages;
        self.main_touched = false;
        self.in_txn = false;

        record_rollback();
        debug!(
            "pager: {} rollback (db_pages={}, dropped {} new page(s))",
            self.path.display(),
            self.committed_size,
            dropped
        );
        Ok(())
    }

    // ---------- helpers ----------

    // До первых изменений: ни один грязный буфер не должен быть захвачен вызывающим.
    fn ensure_dirty_unlocked(&self) -> Result<()> {
        for d in &self.dirty {
            let frame = self.cache.frame_of(d.slot, self.page_id(d.pgno))?;
            if frame.try_write().is_none() {
                return Err(PagerError::InvalidState(format!(
                    "page {} is locked; release its data guards before rollback()",
                    d.pgno
                )));
            }
        }
        Ok(())
    }

    fn restore_pre_images(&self) -> Result<()> {
        let journal = match self.journal.as_ref() {
            Some(j) => j,
            None => return Ok(()),
        };
        let resident: HashMap<Pgno, usize> =
            self.dirty.iter().map(|d| (d.pgno, d.slot)).collect();
        let mut image = vec![0u8; self.page_size];

        for idx in 0..journal.records() {
            let pgno = journal.read_record(idx, &mut image)?;
            let slot = resident.get(&pgno).copied();

            if let Some(slot) = slot {
                let frame = self.cache.frame_of(slot, self.page_id(pgno))?;
                let mut buf = frame.try_write().ok_or_else(|| {
                    PagerError::InvalidState(format!("page {} is locked during rollback", pgno))
                })?;
                buf.copy_from_slice(&image);
            }

            if (slot.is_none() || self.main_touched) && pgno <= self.orig_file_pages {
                pwrite_all(&self.file, &image, page_offset(pgno, self.page_size))
                    .io_context(|| format!("restore page {} of {}", pgno, self.path.display()))?;
                record_page_written();
            }
        }
        Ok(())
    }
}
