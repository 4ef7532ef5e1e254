//! pager — PageFile: один файл БД + его rollback-журнал поверх общего PageCache.
//!
//! Подмодули:
//! - core.rs     — структура PageFile, open()/close()/get(), загрузка страниц, аксессоры.
//! - alloc.rs    — alloc_page(): монотонная аллокация (committedSize + 1).
//! - txn.rs      — begin()/write()/update(): ленивое начало транзакции, журналирование pre-image.
//! - commit.rs   — commit_phase_one()/commit(): порядок fsync (журнал → основной файл → удаление журнала).
//! - rollback.rs — rollback(): восстановление pre-image, отброс новых страниц, усечение файла.
//! - recover.rs  — откат «горячего» журнала при открытии.
//!
//! Состояния: Idle --write/begin--> Active --commit|rollback--> Idle. Вложенности нет.

pub mod core;
pub mod alloc;
pub mod txn;
pub mod commit;
pub mod rollback;
pub mod recover;

pub use self::core::PageFile;
pub use self::recover::RecoveryReport;
