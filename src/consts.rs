//! Общие константы форматов (pages, file identity, journal).

// -------- Pages --------
pub const MIN_PAGE_SIZE: usize = 512;
pub const MAX_PAGE_SIZE: usize = 65536;
pub const DEFAULT_PAGE_SIZE: usize = 4096;

// -------- Page cache --------
// 256 страниц = 1 MiB при 4 KiB страницах.
pub const DEFAULT_CACHE_PAGES: usize = 256;

// -------- File identity --------
// [dev u64][ino u64][nonce u64]; nonce=0 для стабильного id.
pub const FILE_ID_LEN: usize = 24;

// -------- Journal --------
pub const JOURNAL_SUFFIX: &str = "-journal";
pub const JOURNAL_MAGIC: &[u8; 8] = b"TSPJRNL1";
pub const JOURNAL_VERSION: u32 = 1;

// Header layout (32 B, LE):
// [magic8][version u32][page_size u32][orig_db_pages u32][orig_file_pages u32][nrec u32][crc32 u32]
pub const JOURNAL_HDR_SIZE: usize = 32;
pub const JOURNAL_HDR_OFF_VERSION: usize = 8;
pub const JOURNAL_HDR_OFF_PAGE_SIZE: usize = 12;
pub const JOURNAL_HDR_OFF_ORIG_DB_PAGES: usize = 16;
pub const JOURNAL_HDR_OFF_ORIG_FILE_PAGES: usize = 20;
pub const JOURNAL_HDR_OFF_NREC: usize = 24;
pub const JOURNAL_HDR_OFF_CRC32: usize = 28;

// Record layout: [pgno u32][crc32 u32][image page_size]
// crc32 считается по pgno (LE) + image.
pub const JOURNAL_REC_HDR_SIZE: usize = 8;
pub const JOURNAL_REC_OFF_PGNO: usize = 0;
pub const JOURNAL_REC_OFF_CRC32: usize = 4;
