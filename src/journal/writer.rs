use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::JournalMode;
use crate::error::{IoContext, Result};
use crate::metrics::{record_journal_append, record_journal_fsync};
use crate::page::Pgno;
use crate::util::{fsync_parent_dir, pwrite_all};

use super::{dispose, encode_record_header, read_record_at, record_offset, JournalHeader};

/// Журнал активной транзакции. Создаётся на Begin, убирается на Commit/Rollback.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    header: JournalHeader,
    records: u32,
    sync: bool,
    dir_synced: bool,
}

impl JournalWriter {
    /// Создать (или перезаписать) журнал с заголовком nrec = 0.
    pub fn create(
        path: &Path,
        page_size: usize,
        orig_db_pages: u32,
        orig_file_pages: u32,
        sync: bool,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)
            .io_context(|| format!("open journal {}", path.display()))?;

        let header = JournalHeader {
            page_size: page_size as u32,
            orig_db_pages,
            orig_file_pages,
            nrec: 0,
        };
        pwrite_all(&file, &header.encode(), 0)
            .io_context(|| format!("write journal header {}", path.display()))?;

        debug!(
            "journal: created {} (orig_db_pages={}, orig_file_pages={})",
            path.display(),
            orig_db_pages,
            orig_file_pages
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            records: 0,
            sync,
            dir_synced: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> JournalHeader {
        self.header
    }

    /// Записи, добавленные в этой транзакции (включая ещё не учтённые в nrec).
    pub fn records(&self) -> u32 {
        self.records
    }

    fn page_size(&self) -> usize {
        self.header.page_size as usize
    }

    /// Добавить pre-image страницы.
    pub fn append(&mut self, pgno: Pgno, image: &[u8]) -> Result<()> {
        debug_assert_eq!(image.len(), self.page_size());
        let off = record_offset(self.records, self.page_size());
        let hdr = encode_record_header(pgno, image);
        pwrite_all(&self.file, &hdr, off)
            .io_context(|| format!("append journal {}", self.path.display()))?;
        pwrite_all(&self.file, image, off + hdr.len() as u64)
            .io_context(|| format!("append journal {}", self.path.display()))?;
        self.records += 1;
        record_journal_append(hdr.len() + image.len());
        Ok(())
    }

    /// Прочитать запись idx (для Rollback в том же процессе).
    pub fn read_record(&self, idx: u32, image: &mut [u8]) -> Result<Pgno> {
        read_record_at(&self.file, &self.path, idx, image)
    }

    /// Фаза 1 commit'а: записи на диск, затем nrec в заголовок, затем снова fsync.
    /// После этого журнал «горячий». Каталог fsync'ается один раз за транзакцию.
    pub fn sync_records(&mut self) -> Result<()> {
        if self.sync {
            self.file
                .sync_all()
                .io_context(|| format!("fsync journal {}", self.path.display()))?;
            record_journal_fsync();
        }

        self.header.nrec = self.records;
        pwrite_all(&self.file, &self.header.encode(), 0)
            .io_context(|| format!("write journal header {}", self.path.display()))?;

        if self.sync {
            self.file
                .sync_all()
                .io_context(|| format!("fsync journal {}", self.path.display()))?;
            record_journal_fsync();
            if !self.dir_synced {
                fsync_parent_dir(&self.path)
                    .io_context(|| format!("fsync dir of {}", self.path.display()))?;
                self.dir_synced = true;
            }
        }
        Ok(())
    }

    /// Длина файла журнала, ожидаемая для текущего числа записей.
    pub fn expected_len(&self) -> u64 {
        record_offset(self.records, self.page_size())
    }

    /// Убрать журнал (Delete/Truncate). Дескриптор остаётся открытым до drop писателя,
    /// так что при ошибке записи журнала остаются читаемыми для Rollback.
    pub fn finish(&mut self, mode: JournalMode) -> Result<()> {
        dispose(&self.path, mode, self.sync)?;
        debug!("journal: finished {} ({})", self.path.display(), mode.as_str());
        Ok(())
    }
}
