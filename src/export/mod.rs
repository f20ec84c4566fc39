pub mod json_export;

pub use json_export::{load_report, JsonExporter, REPORT_FILE_NAME};
