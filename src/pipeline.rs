use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::core::model::{PageReport, ReportDocument};
use crate::error::Result;
use crate::export::JsonExporter;
use crate::ocr::normalize::normalize_outputs;
use crate::ocr::renderer::{render_from, PageRange, PageSource};
use crate::ocr::OcrEngine;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dpi: u32,
    pub range: Option<PageRange>,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, dpi: u32) -> Self {
        Self {
            input,
            output,
            dpi,
            range: None,
        }
    }

    pub fn with_range(mut self, range: Option<PageRange>) -> Self {
        self.range = range;
        self
    }
}

/// Runs the engine over `images` in order and collects one page report per
/// image. `first_page` is the document page number of the first image.
///
/// Each image is dropped as soon as its page has been recognized. An engine
/// failure aborts the whole run.
pub fn process<I, E>(images: I, first_page: usize, engine: &mut E) -> Result<ReportDocument>
where
    I: IntoIterator<Item = RgbImage>,
    E: OcrEngine + ?Sized,
{
    let mut report = ReportDocument::new();
    for (offset, image) in images.into_iter().enumerate() {
        let page_index = first_page + offset;
        let outputs = engine.predict(&image)?;
        drop(image);

        let items = normalize_outputs(outputs);
        println!("Page {page_index}: {} lines", items.len());
        report.push(PageReport { page_index, items });
    }
    Ok(report)
}

/// Renders the configured pages of `source` and recognizes each of them.
pub fn build_report<S, E>(source: &S, config: &PipelineConfig, engine: &mut E) -> Result<ReportDocument>
where
    S: PageSource + ?Sized,
    E: OcrEngine + ?Sized,
{
    let pages = render_from(source, config.dpi, config.range)?;
    process(pages.images, pages.first_page, engine)
}

/// Writes the report to `ocr_results.json` in `out_dir`.
pub fn save(report: &ReportDocument, out_dir: &Path) -> Result<PathBuf> {
    JsonExporter::new(out_dir.to_path_buf()).export(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::error::Error;
    use crate::ocr::result::EngineOutput;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Engine answering from a script of canned replies, one per call.
    struct ScriptedEngine {
        replies: VecDeque<Result<Vec<EngineOutput>>>,
        seen: Vec<(u32, u32)>,
    }

    impl ScriptedEngine {
        fn new(replies: Vec<Result<Vec<EngineOutput>>>) -> Self {
            Self {
                replies: replies.into(),
                seen: Vec::new(),
            }
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn predict(&mut self, image: &RgbImage) -> Result<Vec<EngineOutput>> {
            self.seen.push(image.dimensions());
            self.replies.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn blank_pages(n: usize) -> Vec<RgbImage> {
        (0..n).map(|_| RgbImage::new(2, 2)).collect()
    }

    #[test]
    fn page_indices_start_at_first_page() {
        let mut engine = ScriptedEngine::new(vec![]);
        let report = process(blank_pages(3), 4, &mut engine).unwrap();
        let indices: Vec<usize> = report.pages.iter().map(|p| p.page_index).collect();
        assert_eq!(indices, vec![4, 5, 6]);
        assert_eq!(engine.seen.len(), 3);
    }

    #[test]
    fn counts_records_per_page() {
        let mut engine = ScriptedEngine::new(vec![
            Ok(vec![EngineOutput::from_value(json!({
                "dt_polys": [[[0, 0], [1, 0], [1, 1], [0, 1]], [[0, 2], [1, 2], [1, 3], [0, 3]]],
                "rec_texts": ["a", "b"],
                "rec_scores": [0.9, 0.8],
            }))]),
            Ok(vec![EngineOutput::Opaque("?".into())]),
        ]);
        let report = process(blank_pages(2), 0, &mut engine).unwrap();
        assert_eq!(report.pages[0].items.len(), 2);
        assert_eq!(report.pages[1].items.len(), 1);
        assert!(report.pages[1].items[0].is_raw());
    }

    #[test]
    fn engine_failure_aborts_run() {
        let mut engine = ScriptedEngine::new(vec![
            Ok(vec![]),
            Err(Error::Engine("boom".into())),
        ]);
        let err = process(blank_pages(3), 0, &mut engine).unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(engine.seen.len(), 2);
    }

    #[test]
    fn no_images_gives_empty_report() {
        let mut engine = ScriptedEngine::new(vec![]);
        let report = process(Vec::<RgbImage>::new(), 0, &mut engine).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn save_writes_report_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = save(&ReportDocument::new(), &tmp.path().join("out")).unwrap();
        assert!(path.ends_with("out/ocr_results.json"));
        assert!(path.is_file());
    }

    #[test]
    fn config_defaults_to_all_pages() {
        let config = PipelineConfig::new("in.pdf".into(), "out".into(), 200);
        assert_eq!(config.range, None);
        let config = config.with_range(Some(PageRange::new(1, 2)));
        assert_eq!(config.range, Some(PageRange::new(1, 2)));
    }
}
