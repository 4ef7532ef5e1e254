// Базовые модули
pub mod consts;
pub mod error;
pub mod config;
pub mod metrics;

// Файлы и адресация
pub mod util;   // src/util/{mod,file_id}.rs
pub mod lock;

// Модульная раскладка (папки с mod.rs)
pub mod page;    // src/page/mod.rs
pub mod cache;   // src/cache/mod.rs
pub mod journal; // src/journal/{mod,writer,reader}.rs
pub mod pager;   // src/pager/{mod,core,alloc,txn,commit,rollback,recover}.rs

pub mod env;

// Удобные реэкспорты
pub use cache::{CacheStats, PageCache};
pub use config::{JournalMode, PagerConfig};
pub use env::PagerEnv;
pub use error::{PagerError, Result};
pub use page::{Page, PageId, Pgno};
pub use pager::{PageFile, RecoveryReport};
pub use util::{generate_file_id, get_file_size, FileId};
