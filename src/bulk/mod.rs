// Bulk Data Port
// Batched, per-table transactional data movement between MySQL and flat files

pub mod csv;
pub mod sqldump;

pub use self::csv::{export_all_tables, export_csv, import_csv, import_present_csvs, EXPORT_DIR};
pub use self::sqldump::{import_sql_dump, DumpReport};
