pub mod core;
pub mod error;
pub mod export;
pub mod ocr;
pub mod pipeline;

pub use crate::core::model::{DetectionRecord, PageReport, ReportDocument};
pub use error::{Error, Result};
