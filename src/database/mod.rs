//! Spreadsheet-backed databases
//!
//! - `table`: CSV table with optional cells
//! - `sample_db`: sample/test descriptions captured at the bench
//! - `stat_db`: per-sample derived parameters for cohort statistics

pub mod table;
pub mod sample_db;
pub mod stat_db;

pub use table::Table;
pub use sample_db::{
    append_sample, create_database, find_sample, load_samples, sample_columns, unique_file_name,
    ExistingFile, SampleEntry,
};
pub use stat_db::{append_results, find_record, load_records, stat_columns, StatRecord, StatResults};
