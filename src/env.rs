//! PagerEnv — каталог + конфигурация + один общий PageCache на много PageFile.
//!
//! Все файлы окружения делят один кэш; страницы разных файлов различаются FileId.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::cache::PageCache;
use crate::config::PagerConfig;
use crate::error::{IoContext, PagerError, Result};
use crate::pager::PageFile;

pub struct PagerEnv {
    root: PathBuf,
    cfg: PagerConfig,
    cache: Arc<PageCache>,
}

impl PagerEnv {
    /// Открыть окружение с конфигурацией из TSP_* переменных.
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_with_config(root, PagerConfig::from_env())
    }

    pub fn open_with_config(root: &Path, cfg: PagerConfig) -> Result<Self> {
        cfg.validate()?;
        std::fs::create_dir_all(root)
            .io_context(|| format!("create dir {}", root.display()))?;
        let cache = PageCache::new(cfg.page_size, cfg.cache_pages)?;
        debug!("pager env: {} with {}", root.display(), cfg);
        Ok(Self {
            root: root.to_path_buf(),
            cfg,
            cache,
        })
    }

    /// Открыть (или создать) файл `root/name` в общем кэше.
    pub fn open_file(&self, name: &str) -> Result<PageFile> {
        let rel = Path::new(name);
        let plain = matches!(rel.components().collect::<Vec<_>>()[..], [Component::Normal(_)]);
        if !plain {
            return Err(PagerError::InvalidArgument(format!(
                "file name must be a plain name inside the env root: '{}'",
                name
            )));
        }
        PageFile::open_with_config(&self.root.join(rel), self.cache.clone(), &self.cfg)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &PagerConfig {
        &self.cfg
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }
}
