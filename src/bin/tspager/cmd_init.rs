use anyhow::Result;
use std::path::PathBuf;

use super::util::open_file;

pub fn exec(path: PathBuf, page_size: usize, pages: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let existed = path.exists();
    let mut pf = open_file(&path, page_size)?;
    if existed && pf.committed_size() > 0 {
        println!(
            "Page file already initialized at {} ({} pages of {} B)",
            path.display(),
            pf.committed_size(),
            pf.page_size()
        );
        return pf.close().map_err(Into::into);
    }

    if pages > 0 {
        pf.alloc_pages(pages)?;
        // аллокации становятся устойчивыми только через commit
        pf.begin()?;
        pf.commit()?;
    }
    println!(
        "Initialized {} with {} pages of {} B",
        path.display(),
        pf.committed_size(),
        pf.page_size()
    );
    pf.close()?;
    Ok(())
}
