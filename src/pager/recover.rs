//! pager/recover — откат незавершённой транзакции при открытии файла.
//!
//! Журнал есть и «горячий» (nrec > 0): pre-image из журнала пишутся обратно, файл
//! усекается до длины на момент Begin, журнал удаляется. Холодный журнал просто убирается.
//! Повреждённый горячий журнал — Corruption, файл не открывается.

use std::fs::File;
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{JournalMode, PagerConfig};
use crate::error::{IoContext, PagerError, Result};
use crate::journal::{dispose, record_offset, JournalProbe, JournalReader};
use crate::metrics::{record_page_written, record_recovery};
use crate::page::Pgno;
use crate::util::{fsync_parent_dir, page_offset, pwrite_all};

/// Что было сделано при восстановлении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Записей журнала применено.
    pub pages_restored: u32,
    /// committedSize на момент Begin прерванной транзакции.
    pub orig_db_pages: Pgno,
    /// Длина основного файла (страниц) после отката.
    pub file_pages: Pgno,
}

pub(crate) fn recover_journal(
    file: &File,
    db_path: &Path,
    journal_path: &Path,
    cfg: &PagerConfig,
) -> Result<Option<RecoveryReport>> {
    let reader = match JournalReader::probe(journal_path)? {
        JournalProbe::Missing => return Ok(None),
        JournalProbe::Cold { len } => {
            if len > 0 || cfg.journal_mode == JournalMode::Delete {
                debug!(
                    "pager: discarding cold journal {} ({} bytes)",
                    journal_path.display(),
                    len
                );
                dispose(journal_path, cfg.journal_mode, cfg.sync)?;
            }
            return Ok(None);
        }
        JournalProbe::Hot(r) => r,
    };

    let hdr = reader.header();
    if reader.page_size() != cfg.page_size {
        return Err(PagerError::Corruption(format!(
            "{}: journal page size {} != {}",
            journal_path.display(),
            hdr.page_size,
            cfg.page_size
        )));
    }
    if hdr.orig_file_pages > hdr.orig_db_pages {
        return Err(PagerError::Corruption(format!(
            "{}: orig_file_pages {} > orig_db_pages {}",
            journal_path.display(),
            hdr.orig_file_pages,
            hdr.orig_db_pages
        )));
    }

    let ps = cfg.page_size;
    let expected = record_offset(reader.nrec(), ps);
    let jlen = std::fs::metadata(journal_path)
        .io_context(|| format!("stat journal {}", journal_path.display()))?
        .len();
    if jlen > expected {
        // оборванный append после фазы 1 не входит в nrec
        warn!(
            "pager: journal {} has {} trailing byte(s) past {} record(s), ignored",
            journal_path.display(),
            jlen - expected,
            reader.nrec()
        );
    }

    let mut image = vec![0u8; ps];
    for idx in 0..reader.nrec() {
        let pgno = reader.read_record(idx, &mut image)?;
        if pgno > hdr.orig_db_pages {
            return Err(PagerError::Corruption(format!(
                "{}: record {} for page {} beyond orig size {}",
                journal_path.display(),
                idx,
                pgno,
                hdr.orig_db_pages
            )));
        }
        // за orig_file_pages всё равно отрежется
        if pgno <= hdr.orig_file_pages {
            pwrite_all(file, &image, page_offset(pgno, ps))
                .io_context(|| format!("restore page {} of {}", pgno, db_path.display()))?;
            record_page_written();
        }
    }

    let want = hdr.orig_file_pages as u64 * ps as u64;
    file.set_len(want)
        .io_context(|| format!("truncate {}", db_path.display()))?;
    if cfg.sync {
        file.sync_all()
            .io_context(|| format!("fsync {}", db_path.display()))?;
        fsync_parent_dir(db_path).io_context(|| format!("fsync dir of {}", db_path.display()))?;
    }

    let report = RecoveryReport {
        pages_restored: reader.nrec(),
        orig_db_pages: hdr.orig_db_pages,
        file_pages: hdr.orig_file_pages,
    };
    drop(reader);
    dispose(journal_path, cfg.journal_mode, cfg.sync)?;

    record_recovery(report.pages_restored as u64);
    info!(
        "pager: recovered {} from hot journal: {} page(s) restored, {} page(s) in file",
        db_path.display(),
        report.pages_restored,
        report.file_pages
    );
    Ok(Some(report))
}
