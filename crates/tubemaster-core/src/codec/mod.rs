//! Text formats crossing the file boundary.

pub mod sheet_csv;

pub use self::sheet_csv::{CsvError, export_file_name, parse_topics, render_rows};
