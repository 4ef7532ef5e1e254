//! journal — rollback-журнал pre-image страниц.
//!
//! Файл: <db path>-journal. Формат (LE):
//! - Header (32 B): [magic8 "TSPJRNL1"][version u32][page_size u32][orig_db_pages u32]
//!   [orig_file_pages u32][nrec u32][crc32 u32 по байтам 0..28]
//! - Record: [pgno u32][crc32 u32 по pgno(LE) + image][image page_size]
//!
//! nrec = 0 до фазы 1 commit'а: такой журнал «холодный» (основной файл ещё не трогали)
//! и при открытии просто удаляется. После фазы 1 журнал «горячий» и откатывается.
//!
//! Подмодули:
//! - writer.rs — JournalWriter: создание, append, фаза 1 (nrec + fsync), удаление.
//! - reader.rs — JournalReader: probe/валидация для recovery и inspect для CLI.

pub mod reader;
pub mod writer;

pub use reader::{inspect, JournalInfo, JournalProbe, JournalReader};
pub use writer::JournalWriter;

use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::config::JournalMode;
use crate::consts::{
    JOURNAL_HDR_OFF_CRC32, JOURNAL_HDR_OFF_NREC, JOURNAL_HDR_OFF_ORIG_DB_PAGES,
    JOURNAL_HDR_OFF_ORIG_FILE_PAGES, JOURNAL_HDR_OFF_PAGE_SIZE, JOURNAL_HDR_OFF_VERSION,
    JOURNAL_HDR_SIZE, JOURNAL_MAGIC, JOURNAL_REC_HDR_SIZE, JOURNAL_REC_OFF_CRC32,
    JOURNAL_REC_OFF_PGNO, JOURNAL_SUFFIX, JOURNAL_VERSION,
};
use crate::error::{IoContext, PagerError, Result};
use crate::page::Pgno;
use crate::util::{fsync_parent_dir, pread};

/// Путь журнала для файла БД: path + "-journal".
pub fn journal_path(db_path: &Path) -> PathBuf {
    let mut s = db_path.as_os_str().to_os_string();
    s.push(JOURNAL_SUFFIX);
    PathBuf::from(s)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct JournalHeader {
    pub page_size: u32,
    /// committedSize на момент Begin.
    pub orig_db_pages: u32,
    /// Физическая длина основного файла (в страницах) на момент Begin.
    pub orig_file_pages: u32,
    pub nrec: u32,
}

impl JournalHeader {
    pub fn encode(&self) -> [u8; JOURNAL_HDR_SIZE] {
        let mut b = [0u8; JOURNAL_HDR_SIZE];
        b[..8].copy_from_slice(JOURNAL_MAGIC);
        LittleEndian::write_u32(&mut b[JOURNAL_HDR_OFF_VERSION..], JOURNAL_VERSION);
        LittleEndian::write_u32(&mut b[JOURNAL_HDR_OFF_PAGE_SIZE..], self.page_size);
        LittleEndian::write_u32(&mut b[JOURNAL_HDR_OFF_ORIG_DB_PAGES..], self.orig_db_pages);
        LittleEndian::write_u32(&mut b[JOURNAL_HDR_OFF_ORIG_FILE_PAGES..], self.orig_file_pages);
        LittleEndian::write_u32(&mut b[JOURNAL_HDR_OFF_NREC..], self.nrec);
        let crc = crc32fast::hash(&b[..JOURNAL_HDR_OFF_CRC32]);
        LittleEndian::write_u32(&mut b[JOURNAL_HDR_OFF_CRC32..], crc);
        b
    }

    /// Разобрать заголовок. Ok(None) — заголовок из одних нулей (журнал не успели заполнить).
    pub fn decode(b: &[u8]) -> Result<Option<Self>> {
        if b.len() < JOURNAL_HDR_SIZE {
            return Err(PagerError::Corruption(format!(
                "journal header too short: {} bytes",
                b.len()
            )));
        }
        let b = &b[..JOURNAL_HDR_SIZE];
        if b.iter().all(|&x| x == 0) {
            return Ok(None);
        }
        if &b[..8] != JOURNAL_MAGIC {
            return Err(PagerError::Corruption("bad journal magic".into()));
        }
        let version = LittleEndian::read_u32(&b[JOURNAL_HDR_OFF_VERSION..]);
        if version != JOURNAL_VERSION {
            return Err(PagerError::Corruption(format!(
                "unsupported journal version {}",
                version
            )));
        }
        let stored = LittleEndian::read_u32(&b[JOURNAL_HDR_OFF_CRC32..]);
        let calc = crc32fast::hash(&b[..JOURNAL_HDR_OFF_CRC32]);
        if stored != calc {
            return Err(PagerError::Corruption(format!(
                "journal header crc mismatch: stored={:#010x} calc={:#010x}",
                stored, calc
            )));
        }
        Ok(Some(Self {
            page_size: LittleEndian::read_u32(&b[JOURNAL_HDR_OFF_PAGE_SIZE..]),
            orig_db_pages: LittleEndian::read_u32(&b[JOURNAL_HDR_OFF_ORIG_DB_PAGES..]),
            orig_file_pages: LittleEndian::read_u32(&b[JOURNAL_HDR_OFF_ORIG_FILE_PAGES..]),
            nrec: LittleEndian::read_u32(&b[JOURNAL_HDR_OFF_NREC..]),
        }))
    }
}

/// Размер одной записи журнала в байтах.
#[inline]
pub fn record_size(page_size: usize) -> usize {
    JOURNAL_REC_HDR_SIZE + page_size
}

/// Смещение записи idx (0-based).
#[inline]
pub fn record_offset(idx: u32, page_size: usize) -> u64 {
    JOURNAL_HDR_SIZE as u64 + idx as u64 * record_size(page_size) as u64
}

/// CRC32 записи: pgno (LE) + image.
pub fn record_crc(pgno: Pgno, image: &[u8]) -> u32 {
    let mut h = crc32fast::Hasher::new();
    let mut tmp = [0u8; 4];
    LittleEndian::write_u32(&mut tmp, pgno);
    h.update(&tmp);
    h.update(image);
    h.finalize()
}

pub(crate) fn encode_record_header(pgno: Pgno, image: &[u8]) -> [u8; JOURNAL_REC_HDR_SIZE] {
    let mut hdr = [0u8; JOURNAL_REC_HDR_SIZE];
    LittleEndian::write_u32(&mut hdr[JOURNAL_REC_OFF_PGNO..], pgno);
    LittleEndian::write_u32(&mut hdr[JOURNAL_REC_OFF_CRC32..], record_crc(pgno, image));
    hdr
}

/// Прочитать запись idx в `image` (len = page_size) и проверить её CRC.
/// Короткая запись или несовпадение CRC — Corruption.
pub(crate) fn read_record_at(file: &File, path: &Path, idx: u32, image: &mut [u8]) -> Result<Pgno> {
    let off = record_offset(idx, image.len());
    let mut hdr = [0u8; JOURNAL_REC_HDR_SIZE];
    let n = pread(file, &mut hdr, off).io_context(|| format!("read {}", path.display()))?;
    if n != hdr.len() {
        return Err(PagerError::Corruption(format!(
            "{}: record {} truncated (header)",
            path.display(),
            idx
        )));
    }
    let n = pread(file, image, off + JOURNAL_REC_HDR_SIZE as u64)
        .io_context(|| format!("read {}", path.display()))?;
    if n != image.len() {
        return Err(PagerError::Corruption(format!(
            "{}: record {} truncated (image {} of {} bytes)",
            path.display(),
            idx,
            n,
            image.len()
        )));
    }

    let pgno = LittleEndian::read_u32(&hdr[JOURNAL_REC_OFF_PGNO..]);
    let stored = LittleEndian::read_u32(&hdr[JOURNAL_REC_OFF_CRC32..]);
    let calc = record_crc(pgno, image);
    if stored != calc {
        return Err(PagerError::Corruption(format!(
            "{}: record {} (pgno {}) crc mismatch",
            path.display(),
            idx,
            pgno
        )));
    }
    if pgno == 0 {
        return Err(PagerError::Corruption(format!(
            "{}: record {} has pgno 0",
            path.display(),
            idx
        )));
    }
    Ok(pgno)
}

/// Убрать журнал по завершении транзакции: Delete — удалить файл, Truncate — обнулить длину.
/// Отсутствующий файл не ошибка.
pub(crate) fn dispose(path: &Path, mode: JournalMode, sync: bool) -> Result<()> {
    match mode {
        JournalMode::Delete => match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(PagerError::IoAt {
                    context: format!("remove {}", path.display()),
                    source: e,
                })
            }
        },
        JournalMode::Truncate => {
            let f = match std::fs::OpenOptions::new().write(true).open(path) {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(PagerError::IoAt {
                        context: format!("open {}", path.display()),
                        source: e,
                    })
                }
            };
            f.set_len(0)
                .io_context(|| format!("truncate {}", path.display()))?;
            if sync {
                f.sync_all()
                    .io_context(|| format!("fsync {}", path.display()))?;
            }
        }
    }
    if sync {
        fsync_parent_dir(path).io_context(|| format!("fsync dir of {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_and_zero() {
        let h = JournalHeader {
            page_size: 4096,
            orig_db_pages: 3,
            orig_file_pages: 2,
            nrec: 5,
        };
        let b = h.encode();
        assert_eq!(JournalHeader::decode(&b).unwrap(), Some(h));
        assert_eq!(JournalHeader::decode(&[0u8; 32]).unwrap(), None);
    }

    #[test]
    fn header_damage_is_corruption() {
        let h = JournalHeader {
            page_size: 512,
            orig_db_pages: 1,
            orig_file_pages: 1,
            nrec: 1,
        };
        let mut b = h.encode();
        b[JOURNAL_HDR_OFF_NREC] ^= 0xFF;
        assert!(JournalHeader::decode(&b).unwrap_err().is_corruption());

        let mut b = h.encode();
        b[0] = b'X';
        assert!(JournalHeader::decode(&b).unwrap_err().is_corruption());

        assert!(JournalHeader::decode(&b[..10]).unwrap_err().is_corruption());
    }

    #[test]
    fn journal_path_appends_suffix() {
        let p = journal_path(Path::new("/tmp/data.tdb"));
        assert_eq!(p, PathBuf::from("/tmp/data.tdb-journal"));
    }

    #[test]
    fn record_crc_covers_pgno() {
        let img = vec![0xABu8; 64];
        assert_ne!(record_crc(1, &img), record_crc(2, &img));
    }
}
