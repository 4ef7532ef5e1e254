use anyhow::{anyhow, Result};
use std::path::PathBuf;

use super::util::{decode_value_arg, open_file};

pub fn exec(path: PathBuf, page_size: usize, pgno: u32, offset: usize, value: String) -> Result<()> {
    let (bytes, kind) = decode_value_arg(&value)?;
    let mut pf = open_file(&path, page_size)?;
    if pgno == 0 || pgno > pf.committed_size() {
        return Err(anyhow!(
            "page {} out of range 1..={} (use `tspager alloc` first)",
            pgno,
            pf.committed_size()
        ));
    }
    let end = offset
        .checked_add(bytes.len())
        .filter(|&e| e <= pf.page_size())
        .ok_or_else(|| {
            anyhow!(
                "{} B at offset {} does not fit a {} B page",
                bytes.len(),
                offset,
                pf.page_size()
            )
        })?;

    let page = pf.get(pgno)?;
    pf.update(&page, |buf| buf[offset..end].copy_from_slice(&bytes))?;
    drop(page);
    pf.commit()?;

    println!("OK: page {} [{}..{}) <- {} B ({})", pgno, offset, end, bytes.len(), kind);
    pf.close()?;
    Ok(())
}
