//! util — общие утилиты уровня файла.
//!
//! Содержит:
//! - file_id: стабильный идентификатор файла (FileId) для адресации страниц в общем кэше.
//! - get_file_size()/page_count(): длина файла в страницах (кратность page_size обязательна).
//! - pread_exact()/pwrite_all(): позиционные чтение/запись без сдвига курсора.
//! - fsync_parent_dir(): fsync каталога после create/remove/rename.

pub mod file_id;

pub use file_id::{generate_file_id, FileId};

use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{IoContext, PagerError, Result};

/// Длина файла по пути, в страницах.
/// Corruption, если длина не кратна page_size.
pub fn get_file_size(path: &Path, page_size: usize) -> Result<u32> {
    let md = std::fs::metadata(path).io_context(|| format!("stat {}", path.display()))?;
    page_count(md.len(), page_size, path)
}

/// Перевести длину в байтах в число страниц.
pub fn page_count(len: u64, page_size: usize, path: &Path) -> Result<u32> {
    let ps = page_size as u64;
    if ps == 0 {
        return Err(PagerError::InvalidArgument("page_size must be non-zero".into()));
    }
    if len % ps != 0 {
        return Err(PagerError::Corruption(format!(
            "{}: length {} is not a multiple of page size {}",
            path.display(),
            len,
            page_size
        )));
    }
    let pages = len / ps;
    u32::try_from(pages).map_err(|_| {
        PagerError::Corruption(format!(
            "{}: {} pages exceed the addressable range",
            path.display(),
            pages
        ))
    })
}

/// Смещение страницы pgno (1-based) в байтах.
#[inline]
pub fn page_offset(pgno: u32, page_size: usize) -> u64 {
    (pgno as u64 - 1) * page_size as u64
}

/// Прочитать до buf.len() байт с offset. Возвращает число прочитанных байт (< len только на EOF).
pub fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut done = 0usize;
    while done < buf.len() {
        match read_at(file, &mut buf[done..], offset + done as u64) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(done)
}

/// Позиционное чтение ровно buf.len() байт.
/// Короткое чтение внутри объявленного размера файла — Corruption (страницы фиксированного размера).
pub fn pread_exact(file: &File, buf: &mut [u8], offset: u64, what: &dyn Fn() -> String) -> Result<()> {
    let n = pread(file, buf, offset).io_context(|| format!("read {}", what()))?;
    if n != buf.len() {
        return Err(PagerError::Corruption(format!(
            "short read of {}: {} of {} bytes at offset {}",
            what(),
            n,
            buf.len(),
            offset
        )));
    }
    Ok(())
}

/// Позиционная запись всего буфера.
pub fn pwrite_all(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    let mut done = 0usize;
    while done < buf.len() {
        match write_at(file, &buf[done..], offset + done as u64) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

#[cfg(unix)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(buf, offset)
}

#[cfg(windows)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buf, offset)
}

/// fsync каталога, содержащего path (после create/remove журнала).
#[cfg(unix)]
pub fn fsync_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        let dir = if parent.as_os_str().is_empty() {
            File::open(".")?
        } else {
            File::open(parent)?
        };
        dir.sync_all()?;
    }
    Ok(())
}
#[cfg(not(unix))]
pub fn fsync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
