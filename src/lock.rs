//! File-based locking for single-writer safety.
//!
//! Cross-platform (fs2) advisory exclusive lock на сам файл БД:
//! - второй open того же файла (в этом или другом процессе) получает ошибку;
//! - так два хэндла с одинаковым FileId не делят общий кэш.
//!
//! Lock is released on Drop.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{IoContext, Result};

pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // unlock при drop: ошибку некуда вернуть
        let _ = FileExt::unlock(&self.file);
    }
}

/// Try to take the exclusive lock on an open database file. Err if already locked.
pub fn try_lock_exclusive(file: &File, path: &Path) -> Result<LockGuard> {
    let dup = file
        .try_clone()
        .io_context(|| format!("dup handle of {}", path.display()))?;
    FileExt::try_lock_exclusive(&dup)
        .io_context(|| format!("try_lock_exclusive failed (already open?): {}", path.display()))?;
    Ok(LockGuard {
        file: dup,
        path: path.to_path_buf(),
    })
}
