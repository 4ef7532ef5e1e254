use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use tspager::journal::{inspect, journal_path, JournalInfo};

#[derive(Serialize)]
struct Check {
    path: String,
    page_size: usize,
    /// Страниц в основном файле; None, если длина не кратна page_size.
    file_pages: Option<u32>,
    file_problem: Option<String>,
    journal: JournalInfo,
    /// Откроется ли файл без ошибки восстановления.
    recoverable: bool,
}

/// Проверка без побочных эффектов: журнал не применяется, файл не блокируется.
pub fn exec(path: PathBuf, page_size: usize, json: bool) -> Result<()> {
    let (file_pages, file_problem) = match tspager::get_file_size(&path, page_size) {
        Ok(n) => (Some(n), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let journal = inspect(&journal_path(&path))?;

    let page_size_ok = journal
        .header
        .map(|h| h.page_size as usize == page_size)
        .unwrap_or(true);
    let recoverable = journal.problem.is_none() && page_size_ok;

    let ck = Check {
        path: path.display().to_string(),
        page_size,
        file_pages,
        file_problem,
        journal,
        recoverable,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ck)?);
        return Ok(());
    }

    println!("path:        {}", ck.path);
    match (ck.file_pages, &ck.file_problem) {
        (Some(n), _) => println!("file_pages:  {}", n),
        (None, Some(p)) => println!("file:        {}", p),
        (None, None) => {}
    }
    let j = &ck.journal;
    if !j.exists {
        println!("journal:     none");
    } else if !j.hot {
        println!("journal:     cold ({} B), discarded on next open", j.len);
    } else {
        if let Some(h) = j.header {
            println!(
                "journal:     HOT ({} B) nrec={} orig_db_pages={} orig_file_pages={} page_size={}",
                j.len, h.nrec, h.orig_db_pages, h.orig_file_pages, h.page_size
            );
        }
        println!("records ok:  {} {:?}", j.valid_records, j.pages);
    }
    if let Some(p) = &j.problem {
        println!("problem:     {}", p);
    }
    if !page_size_ok {
        println!("problem:     journal page size differs from --page-size {}", page_size);
    }
    println!("recoverable: {}", ck.recoverable);
    Ok(())
}
