use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::core::geometry::Quad;

/// An OCR engine result, classified once at the adapter boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Structured(StructuredResult),
    /// Printable rendering of a result that exposed no key-value fields.
    Opaque(String),
}

/// The fields of a detection/recognition result that the report uses.
///
/// `dt_polys` and `dt_boxes` are alternative names for the same polygons;
/// engines emit one or the other depending on version. Lists are decoded
/// entry by entry: an entry of the wrong shape becomes `None` and keeps its
/// position, so the remaining entries still pair up correctly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredResult {
    #[serde(default, deserialize_with = "quads")]
    pub dt_polys: Option<Vec<Option<Quad>>>,
    #[serde(default, deserialize_with = "quads")]
    pub dt_boxes: Option<Vec<Option<Quad>>>,
    #[serde(default, deserialize_with = "texts")]
    pub rec_texts: Option<Vec<Option<String>>>,
    #[serde(default, deserialize_with = "scores")]
    pub rec_scores: Option<Vec<Option<f64>>>,
}

impl StructuredResult {
    pub fn polygons(&self) -> &[Option<Quad>] {
        match (&self.dt_polys, &self.dt_boxes) {
            (Some(polys), _) if !polys.is_empty() => polys.as_slice(),
            (_, Some(boxes)) => boxes.as_slice(),
            _ => &[],
        }
    }

    pub fn texts(&self) -> &[Option<String>] {
        self.rec_texts.as_deref().unwrap_or_default()
    }

    pub fn scores(&self) -> &[Option<f64>] {
        self.rec_scores.as_deref().unwrap_or_default()
    }
}

impl EngineOutput {
    /// Classifies one JSON value produced by an engine.
    ///
    /// Objects are the key-value form; PaddleOCR's `{"res": {...}}` envelope
    /// is unwrapped first. An object whose fields are not lists is kept as
    /// opaque text rather than failing the page.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let map = unwrap_envelope(map);
                match StructuredResult::deserialize(Value::Object(map.clone())) {
                    Ok(result) => EngineOutput::Structured(result),
                    Err(err) => {
                        tracing::debug!(error = %err, "result fields not usable; keeping raw form");
                        EngineOutput::Opaque(Value::Object(map).to_string())
                    }
                }
            }
            Value::String(text) => EngineOutput::Opaque(text),
            other => EngineOutput::Opaque(other.to_string()),
        }
    }

    /// Classifies an engine answer that may be a list of results or a single one.
    pub fn from_answer(value: Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            Value::Null => Vec::new(),
            single => vec![Self::from_value(single)],
        }
    }
}

fn unwrap_envelope(mut map: Map<String, Value>) -> Map<String, Value> {
    if map.len() == 1 {
        if let Some(Value::Object(_)) = map.get("res") {
            if let Some(Value::Object(inner)) = map.remove("res") {
                return inner;
            }
        }
    }
    map
}

/// Decodes a list whose entries are checked one at a time. A value that is not
/// a list at all is still an error.
fn entries<'de, D, T, F>(deserializer: D, entry: F) -> Result<Option<Vec<Option<T>>>, D::Error>
where
    D: Deserializer<'de>,
    F: Fn(Value) -> Option<T>,
{
    let items: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(items.map(|items| items.into_iter().map(entry).collect()))
}

fn quads<'de, D>(deserializer: D) -> Result<Option<Vec<Option<Quad>>>, D::Error>
where
    D: Deserializer<'de>,
{
    entries(deserializer, |value| Quad::deserialize(value).ok())
}

fn texts<'de, D>(deserializer: D) -> Result<Option<Vec<Option<String>>>, D::Error>
where
    D: Deserializer<'de>,
{
    entries(deserializer, |value| match value {
        Value::String(text) => Some(text),
        _ => None,
    })
}

/// Scores arrive as floats, but some engine builds emit numpy scalars as
/// strings. Non-finite scores are treated as missing.
fn scores<'de, D>(deserializer: D) -> Result<Option<Vec<Option<f64>>>, D::Error>
where
    D: Deserializer<'de>,
{
    entries(deserializer, |value| {
        let score = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        score.filter(|s| s.is_finite())
    })
}
