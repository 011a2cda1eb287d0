pub mod reports;
pub mod sqlite;

pub use reports::FsReportSource;
pub use sqlite::SqliteStore;
