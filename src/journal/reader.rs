use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::consts::JOURNAL_HDR_SIZE;
use crate::error::{IoContext, PagerError, Result};
use crate::page::Pgno;
use crate::util::pread;

use super::{read_record_at, record_offset, JournalHeader};

/// Результат проверки журнала при открытии файла.
pub enum JournalProbe {
    /// Журнала нет.
    Missing,
    /// Журнал есть, но основной файл не трогали: короче заголовка, нулевой заголовок или nrec=0.
    Cold { len: u64 },
    /// Незавершённая транзакция: нужен откат.
    Hot(JournalReader),
}

pub struct JournalReader {
    path: PathBuf,
    file: File,
    header: JournalHeader,
}

impl JournalReader {
    /// Открыть и классифицировать журнал. Повреждённый заголовок — Corruption.
    pub fn probe(path: &Path) -> Result<JournalProbe> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(JournalProbe::Missing),
            Err(e) => {
                return Err(PagerError::IoAt {
                    context: format!("open journal {}", path.display()),
                    source: e,
                })
            }
        };
        let len = file
            .metadata()
            .io_context(|| format!("stat journal {}", path.display()))?
            .len();
        if len < JOURNAL_HDR_SIZE as u64 {
            return Ok(JournalProbe::Cold { len });
        }

        let mut hdr = [0u8; JOURNAL_HDR_SIZE];
        let n = pread(&file, &mut hdr, 0)
            .io_context(|| format!("read journal header {}", path.display()))?;
        if n != hdr.len() {
            return Ok(JournalProbe::Cold { len });
        }
        let header = match JournalHeader::decode(&hdr) {
            Ok(Some(h)) => h,
            Ok(None) => return Ok(JournalProbe::Cold { len }),
            Err(e) => {
                return Err(PagerError::Corruption(format!("{}: {}", path.display(), e)))
            }
        };
        if header.nrec == 0 {
            return Ok(JournalProbe::Cold { len });
        }

        Ok(JournalProbe::Hot(JournalReader {
            path: path.to_path_buf(),
            file,
            header,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> JournalHeader {
        self.header
    }

    pub fn nrec(&self) -> u32 {
        self.header.nrec
    }

    pub fn page_size(&self) -> usize {
        self.header.page_size as usize
    }

    /// Прочитать запись idx < nrec в image (len = page_size).
    pub fn read_record(&self, idx: u32, image: &mut [u8]) -> Result<Pgno> {
        if idx >= self.header.nrec {
            return Err(PagerError::InvalidArgument(format!(
                "journal record {} out of range (nrec={})",
                idx, self.header.nrec
            )));
        }
        read_record_at(&self.file, &self.path, idx, image)
    }
}

/// Сводка по журналу без его применения (для `tspager check`).
#[derive(Debug, Clone, Serialize)]
pub struct JournalInfo {
    pub path: String,
    pub exists: bool,
    pub len: u64,
    pub hot: bool,
    pub header: Option<JournalHeader>,
    /// Записи, прошедшие проверку CRC (из nrec).
    pub valid_records: u32,
    /// Номера страниц в журнале, в порядке записи.
    pub pages: Vec<Pgno>,
    /// Первая найденная проблема.
    pub problem: Option<String>,
}

/// Проверить журнал: заголовок и CRC каждой записи из nrec.
pub fn inspect(path: &Path) -> Result<JournalInfo> {
    let mut info = JournalInfo {
        path: path.display().to_string(),
        exists: false,
        len: 0,
        hot: false,
        header: None,
        valid_records: 0,
        pages: Vec::new(),
        problem: None,
    };

    let probe = match JournalReader::probe(path) {
        Ok(p) => p,
        Err(e) if e.is_corruption() => {
            info.exists = true;
            info.len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            info.problem = Some(e.to_string());
            return Ok(info);
        }
        Err(e) => return Err(e),
    };

    match probe {
        JournalProbe::Missing => {}
        JournalProbe::Cold { len } => {
            info.exists = true;
            info.len = len;
        }
        JournalProbe::Hot(r) => {
            info.exists = true;
            info.hot = true;
            info.header = Some(r.header());
            info.len = r
                .file
                .metadata()
                .io_context(|| format!("stat journal {}", path.display()))?
                .len();

            let ps = r.page_size();
            if ps == 0 {
                info.problem = Some("page size 0 in journal header".into());
                return Ok(info);
            }
            let need = record_offset(r.nrec(), ps);
            if info.len < need {
                info.problem = Some(format!(
                    "journal shorter than nrec implies: {} < {} bytes",
                    info.len, need
                ));
            }

            let mut image = vec![0u8; ps];
            for idx in 0..r.nrec() {
                match r.read_record(idx, &mut image) {
                    Ok(pgno) => {
                        info.valid_records += 1;
                        info.pages.push(pgno);
                    }
                    Err(e) => {
                        info.problem = Some(e.to_string());
                        break;
                    }
                }
            }
        }
    }
    Ok(info)
}
