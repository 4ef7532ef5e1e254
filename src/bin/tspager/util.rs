use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};

use tspager::{PageCache, PageFile, PagerConfig};

// CLI трогает единицы страниц за раз; большой кэш не нужен.
const CLI_CACHE_PAGES: usize = 16;

/// Открыть файл страниц с конфигурацией из окружения и заданным page_size.
pub fn open_file(path: &Path, page_size: usize) -> Result<PageFile> {
    let cfg = PagerConfig::from_env()
        .with_page_size(page_size)
        .with_cache_pages(CLI_CACHE_PAGES);
    let cache = PageCache::new(cfg.page_size, cfg.cache_pages)?;
    let pf = PageFile::open_with_config(path, cache, &cfg)
        .with_context(|| format!("open page file {}", path.display()))?;
    Ok(pf)
}

pub fn decode_value_arg(arg: &str) -> Result<(Vec<u8>, &'static str)> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok((buf, "stdin"));
    }
    if let Some(p) = arg.strip_prefix('@') {
        let path = PathBuf::from(p);
        let mut f = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("open value file {}", path.display()))?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        return Ok((buf, "file"));
    }
    if let Some(hx) = arg.strip_prefix("hex:") {
        let v = decode_hex(hx)?;
        return Ok((v, "hex"));
    }
    Ok((arg.as_bytes().to_vec(), "literal"))
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(anyhow!("hex string must have even length"));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for i in (0..bytes.len()).step_by(2) {
        let h = (bytes[i] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i))?;
        let l = (bytes[i + 1] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i + 1))?;
        out.push(((h << 4) | l) as u8);
    }
    Ok(out)
}

/// 16 байт на строку с offset'ом; хвост из нулей сворачивается в одну строку.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    let end = bytes.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
    let shown = end.div_ceil(16) * 16;
    for (row, chunk) in bytes[..shown.min(bytes.len())].chunks(16).enumerate() {
        out.push_str(&format!("{:08x}:", row * 16));
        for b in chunk {
            out.push_str(&format!(" {:02x}", b));
        }
        out.push('\n');
    }
    if shown < bytes.len() {
        out.push_str(&format!("{:08x}: ... zeros to {:#x}\n", shown, bytes.len()));
    }
    out
}
