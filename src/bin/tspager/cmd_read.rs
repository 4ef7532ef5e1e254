use anyhow::{anyhow, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use super::util::{hex_dump, open_file};

pub fn exec(path: PathBuf, page_size: usize, pgno: u32, out: Option<PathBuf>) -> Result<()> {
    let pf = open_file(&path, page_size)?;
    if pgno == 0 || pgno > pf.committed_size() {
        return Err(anyhow!(
            "page {} out of range 1..={} in {}",
            pgno,
            pf.committed_size(),
            path.display()
        ));
    }
    let page = pf.get(pgno)?;
    let bytes = page.to_vec();
    drop(page);

    if let Some(out_path) = out {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)?;
        f.write_all(&bytes)?;
        f.sync_all()?;
        println!("PAGE {}: {} B -> wrote to {}", pgno, bytes.len(), out_path.display());
    } else {
        println!("PAGE {}: {} B", pgno, bytes.len());
        print!("{}", hex_dump(&bytes));
    }
    pf.close()?;
    Ok(())
}
