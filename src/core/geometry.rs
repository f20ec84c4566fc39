use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A polygon corner as reported by the OCR engine.
///
/// Coordinates keep the engine's number representation, so integer pixel
/// positions are written back as integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point(pub Number, pub Number);

impl Point {
    pub fn new(x: impl Into<Number>, y: impl Into<Number>) -> Self {
        Self(x.into(), y.into())
    }

    pub fn x(&self) -> Option<f64> {
        self.0.as_f64()
    }

    pub fn y(&self) -> Option<f64> {
        self.1.as_f64()
    }
}

/// Four-corner text region, in the engine's native corner order
/// (usually clockwise from top-left).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }
}
