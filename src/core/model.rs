use serde::{Deserialize, Serialize};

use crate::core::geometry::Quad;

/// One recognized text line, or the printable form of an engine result that
/// carried no structured fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionRecord {
    Line {
        #[serde(rename = "box")]
        bbox: Quad,
        text: String,
        score: f64,
    },
    Raw {
        raw: String,
    },
}

impl DetectionRecord {
    pub fn line(bbox: Quad, text: impl Into<String>, score: f64) -> Self {
        DetectionRecord::Line {
            bbox,
            text: text.into(),
            score,
        }
    }

    pub fn raw(raw: impl Into<String>) -> Self {
        DetectionRecord::Raw { raw: raw.into() }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DetectionRecord::Line { text, .. } => Some(text),
            DetectionRecord::Raw { .. } => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, DetectionRecord::Raw { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// Absolute page number in the source document.
    pub page_index: usize,
    pub items: Vec<DetectionRecord>,
}

/// All processed pages in ascending page order. Serializes as a bare array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportDocument {
    pub pages: Vec<PageReport>,
}

impl ReportDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: PageReport) {
        self.pages.push(page);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }
}
