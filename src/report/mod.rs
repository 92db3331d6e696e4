use anyhow::{Context, Result};
use fs_err as fs;
use image::imageops::FilterType;
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference,
};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::errors::FortuneError;

// Page geometry of a 6.4in x 4.8in figure.
pub const PAGE_WIDTH_MM: f32 = 162.56;
pub const PAGE_HEIGHT_MM: f32 = 121.92;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.2;

pub const TEXT_PAGE_WIDTH: usize = 95;
pub const TEXT_PAGE_FONT: f32 = 8.0;
pub const CARD_IMAGE_SIZE: (u32, u32) = (240, 475);
pub const CARD_TITLE_FONT: f32 = 12.0;
const CARD_IMAGE_DPI: f32 = 100.0;

/// Description starts at size 8, 60 chars per line and 30 lines; every step
/// that reaches the line limit shrinks the font and widens the column.
const DESCRIPTION_START: (f32, usize, usize) = (8.0, 60, 30);

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub font_size: f32,
}

#[derive(Debug, Clone)]
pub enum Page {
    Text(TextBlock),
    Card {
        image: DynamicImage,
        title: String,
        description: TextBlock,
    },
}

/// Hard-wraps every line at `width` characters. Empty lines are dropped.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(width) {
            out.push(chunk.iter().collect());
        }
    }
    out
}

pub fn layout_description(text: &str) -> TextBlock {
    let (mut size, mut width, mut max_lines) = DESCRIPTION_START;
    loop {
        let lines = wrap(text, width);
        if lines.len() < max_lines || size <= 1.0 {
            return TextBlock { lines, font_size: size };
        }
        size -= 1.0;
        width += 10;
        max_lines += 8;
    }
}

#[derive(Debug, Default)]
pub struct Report {
    title: String,
    pages: Vec<Page>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), pages: Vec::new() }
    }

    /// `{YYYYmmdd_HHMMSS}results.pdf` inside `dir`.
    pub fn default_path(dir: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        dir.join(format!("{timestamp}results.pdf"))
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn add_text_page(&mut self, text: &str) {
        self.pages.push(Page::Text(TextBlock {
            lines: wrap(text, TEXT_PAGE_WIDTH),
            font_size: TEXT_PAGE_FONT,
        }));
    }

    /// Card on the left, title and description on the right.
    pub fn add_card_page(&mut self, image: &DynamicImage, title: &str, text: &str) {
        let (w, h) = CARD_IMAGE_SIZE;
        let resized = DynamicImage::ImageRgb8(image.resize_exact(w, h, FilterType::Lanczos3).to_rgb8());
        self.pages.push(Page::Card {
            image: resized,
            title: title.to_string(),
            description: layout_description(text),
        });
    }

    /// Renders and writes the report; an empty report writes nothing.
    pub fn save(&self, path: &Path) -> Result<Option<u64>> {
        if self.is_empty() {
            tracing::info!("no pages in the report, nothing saved");
            return Ok(None);
        }
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        let (doc, first_page, first_layer) =
            PdfDocument::new(&self.title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "page 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| FortuneError::Report(format!("{e:?}")))?;

        let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
        for i in 1..self.pages.len() {
            let (page, layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), format!("page {}", i + 1));
            layers.push(doc.get_page(page).get_layer(layer));
        }

        for (page, layer) in self.pages.iter().zip(layers) {
            match page {
                Page::Text(block) => {
                    draw_block(&layer, &font, block, PAGE_WIDTH_MM * 0.05, PAGE_HEIGHT_MM * 0.05);
                }
                Page::Card { image, title, description } => {
                    Image::from_dynamic_image(image).add_to_layer(
                        layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(0.0)),
                            translate_y: Some(Mm(0.0)),
                            dpi: Some(CARD_IMAGE_DPI),
                            ..Default::default()
                        },
                    );
                    layer.use_text(
                        title.as_str(),
                        CARD_TITLE_FONT,
                        Mm(PAGE_WIDTH_MM * 0.4),
                        Mm(PAGE_HEIGHT_MM * 0.9),
                        &font,
                    );
                    draw_block(&layer, &font, description, PAGE_WIDTH_MM * 0.4, PAGE_HEIGHT_MM * 0.05);
                }
            }
        }

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            doc.save(&mut writer)
                .map_err(|e| FortuneError::Report(format!("{e:?}")))?;
            writer.flush()?;
        }
        tmp.persist(path)
            .with_context(|| format!("writing report {}", path.display()))?;

        let bytes = fs::metadata(path)?.len();
        tracing::info!(path = %path.display(), pages = self.pages.len(), bytes, "report saved");
        Ok(Some(bytes))
    }
}

/// Lines grow upward from the baseline at (`x`, `y`), the last line lowest.
fn draw_block(layer: &PdfLayerReference, font: &IndirectFontRef, block: &TextBlock, x: f32, y: f32) {
    let line_height = block.font_size * LINE_SPACING * PT_TO_MM;
    let n = block.lines.len();
    for (i, line) in block.lines.iter().enumerate() {
        let offset = (n - 1 - i) as f32 * line_height;
        layer.use_text(line.as_str(), block.font_size, Mm(x), Mm(y + offset), font);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn wrap_splits_long_lines_and_drops_empty_ones() {
        let line = "a".repeat(130);
        let wrapped = wrap(&format!("{line}\n\nshort"), 60);
        assert_eq!(wrapped.len(), 4);
        assert_eq!(wrapped[0].len(), 60);
        assert_eq!(wrapped[2].len(), 10);
        assert_eq!(wrapped[3], "short");
    }

    #[test]
    fn short_description_keeps_default_font() {
        let block = layout_description("\nOne.\nTwo.");
        assert_eq!(block.font_size, 8.0);
        assert_eq!(block.lines, vec!["One.", "Two."]);
    }

    #[test]
    fn long_description_shrinks_font_until_it_fits() {
        let text = vec!["x".repeat(60); 35].join("\n");
        let block = layout_description(&text);
        assert_eq!(block.font_size, 7.0);
        assert_eq!(block.lines.len(), 35);

        let at_limit = vec!["x".repeat(10); 30].join("\n");
        assert_eq!(layout_description(&at_limit).font_size, 7.0);
        let below_limit = vec!["x".repeat(10); 29].join("\n");
        assert_eq!(layout_description(&below_limit).font_size, 8.0);

        let huge = vec!["word ".repeat(40); 200].join("\n");
        let block = layout_description(&huge);
        assert!(block.font_size >= 1.0 && block.font_size < 8.0);
    }

    #[test]
    fn saves_text_and_card_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let mut report = Report::new("Prophecies");
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 40, Rgb([10, 20, 30])));
        report.add_card_page(&img, "The Moon", "Dreams. Tides.");
        report.add_text_page("Summary of everything");
        match &report.pages()[0] {
            Page::Card { image, .. } => assert_eq!((image.width(), image.height()), CARD_IMAGE_SIZE),
            other => panic!("unexpected page {other:?}"),
        }

        let path = tmp.path().join("out").join("20250101_000000results.pdf");
        let bytes = report.save(&path).unwrap().unwrap();
        assert!(bytes > 0);
        let head = std::fs::read(&path).unwrap();
        assert!(head.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_report_is_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Report::default_path(tmp.path());
        assert!(path.to_string_lossy().ends_with("results.pdf"));
        let empty = Report::new("x");
        assert!(empty.is_empty());
        assert_eq!(empty.save(&path).unwrap(), None);
        assert!(!path.exists());
    }
}
