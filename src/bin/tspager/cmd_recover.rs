use anyhow::Result;
use std::path::PathBuf;

use super::util::open_file;

pub fn exec(path: PathBuf, page_size: usize) -> Result<()> {
    let pf = open_file(&path, page_size)?;
    match pf.recovery_report() {
        Some(r) => println!(
            "RECOVERED {}: {} page(s) restored, {} page(s) in file (txn started at {} pages)",
            path.display(),
            r.pages_restored,
            r.file_pages,
            r.orig_db_pages
        ),
        None => println!("CLEAN {}: no hot journal", path.display()),
    }
    pf.close()?;
    Ok(())
}
