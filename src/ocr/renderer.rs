use std::ops::Range;
use std::path::{Path, PathBuf};

use image::RgbImage;
use pdfium_render::prelude::*;

use crate::error::{Error, Result};

/// PDF user space is 72 points per inch.
pub const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Requested pages as a half-open interval. `end: None` runs to the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: i64,
    pub end: Option<i64>,
}

impl PageRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn from_start(start: i64) -> Self {
        Self { start, end: None }
    }

    /// Clamps the range to `0..page_count`. Out-of-bounds or inverted ranges
    /// shrink, possibly to nothing; they are never an error.
    pub fn clamp(&self, page_count: usize) -> Range<usize> {
        let count = i64::try_from(page_count).unwrap_or(i64::MAX);
        let start = self.start.clamp(0, count);
        let end = self.end.map_or(count, |end| end.clamp(0, count));
        let start = start as usize;
        let end = end as usize;
        if start >= end {
            start..start
        } else {
            start..end
        }
    }
}

/// Clamped pages for an optional range; `None` means every page.
pub fn resolve_range(range: Option<PageRange>, page_count: usize) -> Range<usize> {
    range.map_or(0..page_count, |range| range.clamp(page_count))
}

pub fn render_scale(dpi: u32) -> f32 {
    dpi as f32 / PDF_POINTS_PER_INCH
}

/// A document that can be rasterized page by page.
pub trait PageSource {
    fn page_count(&self) -> usize;
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbImage>;
}

impl PageSource for PdfDocument<'_> {
    fn page_count(&self) -> usize {
        self.pages().len() as usize
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbImage> {
        let index = u16::try_from(index)
            .map_err(|_| Error::Pdfium(format!("page index {index} out of range")))?;
        let page = self.pages().get(index)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page.render_with_config(&config)?;
        // The bitmap is rendered onto an opaque white page, so dropping alpha
        // loses nothing.
        Ok(bitmap.as_image().to_rgb8())
    }
}

/// Rendered images in page order, starting at document page `first_page`.
#[derive(Debug, Clone, Default)]
pub struct RenderedPages {
    pub first_page: usize,
    pub images: Vec<RgbImage>,
}

impl RenderedPages {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Renders the pages of `range` from `source`, in page order.
pub fn render_from<S: PageSource + ?Sized>(
    source: &S,
    dpi: u32,
    range: Option<PageRange>,
) -> Result<RenderedPages> {
    let pages = resolve_range(range, source.page_count());
    let scale = render_scale(dpi);
    let first_page = pages.start;

    let mut images = Vec::with_capacity(pages.len());
    for index in pages {
        let image = source.render_page(index, scale)?;
        tracing::debug!(
            page = index,
            width = image.width(),
            height = image.height(),
            "rendered page"
        );
        images.push(image);
    }
    Ok(RenderedPages { first_page, images })
}

/// PDF rasterizer backed by a PDFium shared library.
pub struct PageRasterizer {
    pdfium: Pdfium,
}

impl PageRasterizer {
    /// Binds PDFium from `library_dir`, then from the working directory,
    /// falling back to the system library path.
    pub fn new(library_dir: Option<&Path>) -> Result<Self> {
        let bindings = library_search_dirs(library_dir)
            .iter()
            .find_map(|dir| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                    .map_err(|err| {
                        tracing::debug!(dir = %dir.display(), error = %err, "PDFium not found");
                    })
                    .ok()
            })
            .map(Ok)
            .unwrap_or_else(Pdfium::bind_to_system_library)
            .map_err(|err| Error::Pdfium(format!("failed to bind PDFium library: {err}")))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    pub fn open(&self, path: &Path) -> Result<PdfDocument<'_>> {
        ensure_pdf_exists(path)?;
        let document = self.pdfium.load_pdf_from_file(path, None)?;
        Ok(document)
    }

    pub fn page_count(&self, path: &Path) -> Result<usize> {
        Ok(self.open(path)?.page_count())
    }

    /// Renders `range` of the PDF at `path` into RGB images at `dpi`.
    pub fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        range: Option<PageRange>,
    ) -> Result<RenderedPages> {
        let document = self.open(path)?;
        tracing::info!(
            path = %path.display(),
            pages = document.page_count(),
            dpi,
            "rendering PDF"
        );
        render_from(&document, dpi, range)
    }
}

/// Directories searched for the PDFium library, in order.
pub fn library_search_dirs(library_dir: Option<&Path>) -> Vec<PathBuf> {
    let cwd = PathBuf::from("./");
    match library_dir {
        Some(dir) if dir != cwd.as_path() => vec![dir.to_path_buf(), cwd],
        _ => vec![cwd],
    }
}

/// Fails with [`Error::PdfNotFound`] unless `path` is an existing file.
pub fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::PdfNotFound(path.to_path_buf()))
    }
}
