//! pager/alloc — аллокация страниц.
//!
//! Номера монотонны: pgno = committedSize + 1, повторно не выдаются (free-листа нет).
//! Новая страница материализуется нулевой; на диск она попадает только через commit.

use log::debug;

use crate::error::{PagerError, Result};
use crate::page::{Page, Pgno};

use super::core::PageFile;

impl PageFile {
    /// Выделить следующую страницу. Возвращает закреплённую нулевую страницу и её номер.
    pub fn alloc_page(&mut self) -> Result<(Page, Pgno)> {
        let pgno = self.committed_size.checked_add(1).ok_or_else(|| {
            PagerError::ResourceExhausted(format!(
                "{}: page number space exhausted",
                self.path.display()
            ))
        })?;

        self.committed_size = pgno;
        let page = match self.get(pgno) {
            Ok(p) => p,
            Err(e) => {
                self.committed_size = pgno - 1;
                return Err(e);
            }
        };

        // страница могла остаться в кэше после get() за концом файла
        let zeroed = match page.frame().try_write() {
            Some(mut buf) => {
                buf.fill(0);
                true
            }
            None => false,
        };
        if !zeroed {
            drop(page);
            self.committed_size = pgno - 1;
            return Err(PagerError::InvalidState(format!(
                "page {} is locked by another handle; release data_mut() before alloc_page()",
                pgno
            )));
        }

        debug!("pager: {} alloc page {}", self.path.display(), pgno);
        Ok((page, pgno))
    }

    /// Выделить `count` страниц подряд; возвращает номер первой.
    pub fn alloc_pages(&mut self, count: u32) -> Result<Pgno> {
        if count == 0 {
            return Err(PagerError::InvalidArgument("alloc_pages: count must be > 0".into()));
        }
        let first = self.committed_size.saturating_add(1);
        for _ in 0..count {
            let (_page, _pgno) = self.alloc_page()?;
        }
        Ok(first)
    }
}
