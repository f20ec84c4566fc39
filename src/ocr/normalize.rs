use crate::core::model::DetectionRecord;
use crate::ocr::result::{EngineOutput, StructuredResult};

/// Flattens every engine output for one page into detection records.
pub fn normalize_outputs(outputs: Vec<EngineOutput>) -> Vec<DetectionRecord> {
    let mut records = Vec::new();
    for output in outputs {
        match output {
            EngineOutput::Structured(result) => records.extend(structured_records(&result)),
            EngineOutput::Opaque(raw) => records.push(DetectionRecord::raw(raw)),
        }
    }
    records
}

/// Pairs polygons, texts and scores by position. Lists of unequal length are
/// cut to the shortest one, and a position with a malformed entry is skipped.
pub fn structured_records(result: &StructuredResult) -> Vec<DetectionRecord> {
    let polygons = result.polygons();
    let texts = result.texts();
    let scores = result.scores();

    if polygons.len() != texts.len() || texts.len() != scores.len() {
        tracing::debug!(
            polygons = polygons.len(),
            texts = texts.len(),
            scores = scores.len(),
            "detection lists differ in length; truncating to shortest"
        );
    }

    let mut skipped = 0usize;
    let records: Vec<DetectionRecord> = polygons
        .iter()
        .zip(texts)
        .zip(scores)
        .filter_map(|triple| match triple {
            ((Some(bbox), Some(text)), Some(score)) => {
                Some(DetectionRecord::line(bbox.clone(), text.clone(), *score))
            }
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(skipped, "skipped detections with malformed entries");
    }
    records
}
