use std::fs;
use std::path::{Path, PathBuf};

use crate::core::model::ReportDocument;
use crate::error::Result;

pub const REPORT_FILE_NAME: &str = "ocr_results.json";

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(REPORT_FILE_NAME)
    }

    /// Writes the report as indented UTF-8 JSON, creating the output directory
    /// if needed. Returns the path written.
    pub fn export(&self, report: &ReportDocument) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.report_path();
        let data = serde_json::to_string_pretty(report)?;
        fs::write(&path, data)?;
        Ok(path)
    }
}

pub fn load_report(path: &Path) -> Result<ReportDocument> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
