//! FileId — стабильный 24-байтовый идентификатор файла.
//!
//! Layout: [dev u64][ino u64][nonce u64], LE.
//! - unique=false: nonce=0, id воспроизводим между перезапусками процесса для того же пути.
//! - unique=true: nonce случайный (OsRng), каждый вызов даёт новый id.
//!
//! На unix dev/ino берутся из метаданных файла; на прочих платформах вместо них два
//! XxHash64 канонического пути с разными seed.

use std::fmt;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::FILE_ID_LEN;
use crate::error::{IoContext, Result};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId([u8; FILE_ID_LEN]);

impl FileId {
    pub fn from_parts(dev: u64, ino: u64, nonce: u64) -> Self {
        let mut b = [0u8; FILE_ID_LEN];
        LittleEndian::write_u64(&mut b[0..8], dev);
        LittleEndian::write_u64(&mut b[8..16], ino);
        LittleEndian::write_u64(&mut b[16..24], nonce);
        FileId(b)
    }

    pub fn from_bytes(bytes: [u8; FILE_ID_LEN]) -> Self {
        FileId(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; FILE_ID_LEN] {
        &self.0
    }

    #[inline]
    pub fn dev(&self) -> u64 {
        LittleEndian::read_u64(&self.0[0..8])
    }

    #[inline]
    pub fn ino(&self) -> u64 {
        LittleEndian::read_u64(&self.0[8..16])
    }

    #[inline]
    pub fn nonce(&self) -> u64 {
        LittleEndian::read_u64(&self.0[16..24])
    }

    pub fn is_unique(&self) -> bool {
        self.nonce() != 0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{:016x}:{:016x}", self.dev(), self.ino(), self.nonce())
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self)
    }
}

/// Сгенерировать FileId для существующего файла.
pub fn generate_file_id(path: &Path, unique: bool) -> Result<FileId> {
    let (dev, ino) = identity_parts(path)?;
    let nonce = if unique { fresh_nonce() } else { 0 };
    Ok(FileId::from_parts(dev, ino, nonce))
}

#[cfg(unix)]
fn identity_parts(path: &Path) -> Result<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    let md = std::fs::metadata(path).io_context(|| format!("stat {}", path.display()))?;
    Ok((md.dev(), md.ino()))
}

#[cfg(not(unix))]
fn identity_parts(path: &Path) -> Result<(u64, u64)> {
    use std::hash::Hasher;
    let canon = path
        .canonicalize()
        .io_context(|| format!("canonicalize {}", path.display()))?;
    let s = canon.to_string_lossy();
    let mut h1 = twox_hash::XxHash64::with_seed(0xD3B1_2A52_9F17_4B3C);
    h1.write(s.as_bytes());
    let mut h2 = twox_hash::XxHash64::with_seed(0x5EED_F11E_1D00_0001);
    h2.write(s.as_bytes());
    Ok((h1.finish(), h2.finish()))
}

fn fresh_nonce() -> u64 {
    use rand::RngCore;
    loop {
        let n = rand::rngs::OsRng.next_u64();
        // 0 зарезервирован за стабильным id
        if n != 0 {
            return n;
        }
    }
}
