pub mod bridge;
pub mod config;
pub mod normalize;
pub mod renderer;
pub mod result;

pub use bridge::BridgeEngine;
pub use config::{BridgeCommand, EngineConfig};
pub use renderer::{PageRange, PageRasterizer, PageSource};
pub use result::{EngineOutput, StructuredResult};

use image::RgbImage;

use crate::error::Result;

/// An OCR engine invoked once per page image.
pub trait OcrEngine {
    /// Runs detection and recognition on one image. Engines may answer with
    /// any number of results, including none.
    fn predict(&mut self, image: &RgbImage) -> Result<Vec<EngineOutput>>;
}
