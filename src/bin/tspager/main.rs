use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_init;
mod cmd_status;
mod cmd_read;
mod cmd_write;
mod cmd_alloc;
mod cmd_recover;
mod cmd_check;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    // Пример: RUST_LOG=debug ./tspager status --path data.tdb
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Init { path, page_size, pages } =>
            cmd_init::exec(path, page_size, pages),

        cli::Cmd::Status { path, page_size, json } =>
            cmd_status::exec(path, page_size, json),

        cli::Cmd::Read { path, page_size, pgno, out } =>
            cmd_read::exec(path, page_size, pgno, out),

        cli::Cmd::Write { path, page_size, pgno, offset, value } =>
            cmd_write::exec(path, page_size, pgno, offset, value),

        cli::Cmd::Alloc { path, page_size, count } =>
            cmd_alloc::exec(path, page_size, count),

        cli::Cmd::Recover { path, page_size } =>
            cmd_recover::exec(path, page_size),

        cli::Cmd::Check { path, page_size, json } =>
            cmd_check::exec(path, page_size, json),
    }
}
