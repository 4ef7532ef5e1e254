use anyhow::Result;
use std::path::PathBuf;

use super::util::open_file;

pub fn exec(path: PathBuf, page_size: usize, count: u32) -> Result<()> {
    let mut pf = open_file(&path, page_size)?;
    let first = pf.alloc_pages(count)?;
    pf.begin()?;
    pf.commit()?;
    println!(
        "ALLOC {}..={} ({} page(s)), committed_size={}",
        first,
        pf.committed_size(),
        count,
        pf.committed_size()
    );
    pf.close()?;
    Ok(())
}
