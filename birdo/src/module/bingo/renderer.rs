//! Bingo card renderer
//!
//! Page chrome and captions come from an SVG template rendered with resvg;
//! cell images are letterboxed into their slots on the same pixmap.

use anyhow::{Context, Result};
use birdo_common::GRID_SIDE;
use chrono::NaiveDate;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use resvg::tiny_skia;
use resvg::usvg::{fontdb, Options, Tree};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::composer::BingoCard;

const CARD_SVG_TEMPLATE: &str = include_str!("../../../resources/card_template.svg");

/// Name for a card written on `date`: `Birdo yy.mm.dd <label>.png`
pub fn card_filename(label: &str, date: NaiveDate) -> String {
    let label: String = label
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("Birdo {} {}.png", date.format("%y.%m.%d"), label)
}

/// Rectangle in page pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub struct CardRenderer {
    output_dir: PathBuf,
    fontdb: Arc<fontdb::Database>,
}

impl CardRenderer {
    /// 8x11 in at 200 dpi
    pub const PAGE_WIDTH: u32 = 1600;
    pub const PAGE_HEIGHT: u32 = 2200;

    const MARGIN_X: f32 = 50.0;
    const TOP_PADDING: f32 = 150.0;
    const CELL_WIDTH: f32 = 300.0;
    const CELL_HEIGHT: f32 = 400.0;
    const CAPTION_HEIGHT: f32 = 50.0;
    const IMAGE_PADDING: f32 = 10.0;
    const LONG_CAPTION: usize = 22;

    pub fn new(output_dir: impl AsRef<Path>, fonts_dir: Option<&Path>) -> Self {
        let mut fontdb = fontdb::Database::new();
        fontdb.load_system_fonts();
        if let Some(dir) = fonts_dir {
            fontdb.load_fonts_dir(dir);
        }
        tracing::debug!("Loaded {} font faces", fontdb.len());

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            fontdb: Arc::new(fontdb),
        }
    }

    /// Cell rectangle for grid position `index` (row-major)
    pub fn cell_slot(index: usize) -> Slot {
        let row = index / GRID_SIDE;
        let col = index % GRID_SIDE;
        Slot {
            x: Self::MARGIN_X + col as f32 * Self::CELL_WIDTH,
            y: Self::TOP_PADDING + row as f32 * Self::CELL_HEIGHT,
            width: Self::CELL_WIDTH,
            height: Self::CELL_HEIGHT,
        }
    }

    /// Area inside a cell reserved for the picture, below the caption
    pub fn image_slot(index: usize) -> Slot {
        let cell = Self::cell_slot(index);
        Slot {
            x: cell.x + Self::IMAGE_PADDING,
            y: cell.y + Self::CAPTION_HEIGHT,
            width: cell.width - 2.0 * Self::IMAGE_PADDING,
            height: cell.height - Self::CAPTION_HEIGHT - Self::IMAGE_PADDING,
        }
    }

    /// Render `card` to `<output_dir>/Birdo yy.mm.dd <label>.png`.
    ///
    /// An existing file with the same name is overwritten.
    pub async fn render(&self, card: &BingoCard) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .context("Failed to create output directory")?;

        let filename = card_filename(&card.label, chrono::Local::now().date_naive());
        let output_path = self.output_dir.join(filename);

        let svg = Self::build_svg(card);
        let mut pixmap = self.render_svg(&svg)?;

        for (index, cell) in card.cells.iter().enumerate() {
            draw_image(&mut pixmap, &cell.image, Self::image_slot(index))
                .context(format!("Failed to draw image for {}", cell.caption))?;
        }

        pixmap
            .save_png(&output_path)
            .context("Failed to save PNG")?;

        tracing::info!("Generated bingo card: {:?}", output_path);
        Ok(output_path)
    }

    fn build_svg(card: &BingoCard) -> String {
        let cells_svg: String = card
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| Self::build_cell_svg(index, &cell.caption))
            .collect();

        CARD_SVG_TEMPLATE
            .replace("{{SVG_WIDTH}}", &Self::PAGE_WIDTH.to_string())
            .replace("{{SVG_HEIGHT}}", &Self::PAGE_HEIGHT.to_string())
            .replace("{{CENTER_X}}", &format!("{:.0}", Self::PAGE_WIDTH as f32 / 2.0))
            .replace("{{SUBTITLE}}", &Self::escape_xml(&card.label))
            .replace("{{CELLS}}", &cells_svg)
    }

    fn build_cell_svg(index: usize, caption: &str) -> String {
        let cell = Self::cell_slot(index);
        let font_size = if caption.chars().count() > Self::LONG_CAPTION { 17 } else { 22 };

        format!(
            concat!(
                "  <rect x=\"{x:.0}\" y=\"{y:.0}\" width=\"{w:.0}\" height=\"{h:.0}\" fill=\"none\" stroke=\"#1F4E3D\" stroke-width=\"3\"/>\n",
                "  <text x=\"{cx:.0}\" y=\"{ty:.0}\" text-anchor=\"middle\" font-size=\"{fs}\" fill=\"#1A1A1A\">{caption}</text>\n",
            ),
            x = cell.x,
            y = cell.y,
            w = cell.width,
            h = cell.height,
            cx = cell.x + cell.width / 2.0,
            ty = cell.y + Self::CAPTION_HEIGHT * 0.72,
            fs = font_size,
            caption = Self::escape_xml(caption),
        )
    }

    fn render_svg(&self, svg_content: &str) -> Result<tiny_skia::Pixmap> {
        let mut options = Options::default();
        options.font_family = "DejaVu Sans".to_string();
        options.fontdb = self.fontdb.clone();

        let tree = Tree::from_str(svg_content, &options).context("Failed to parse SVG")?;

        let size = tree.size();
        let mut pixmap = tiny_skia::Pixmap::new(size.width() as u32, size.height() as u32)
            .context("Failed to create pixmap")?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
        Ok(pixmap)
    }

    fn escape_xml(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}

/// Scale `image` to fit `slot` keeping its aspect ratio, centred.
fn draw_image(pixmap: &mut tiny_skia::Pixmap, image: &DynamicImage, slot: Slot) -> Result<()> {
    let fitted = image.resize(slot.width as u32, slot.height as u32, FilterType::Triangle);
    let (width, height) = fitted.dimensions();

    let tile = to_pixmap(&fitted)?;
    let x = slot.x + (slot.width - width as f32) / 2.0;
    let y = slot.y + (slot.height - height as f32) / 2.0;

    pixmap.draw_pixmap(
        x.round() as i32,
        y.round() as i32,
        tile.as_ref(),
        &tiny_skia::PixmapPaint::default(),
        tiny_skia::Transform::identity(),
        None,
    );
    Ok(())
}

/// tiny-skia wants premultiplied RGBA
fn to_pixmap(image: &DynamicImage) -> Result<tiny_skia::Pixmap> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();

    for px in data.chunks_exact_mut(4) {
        let alpha = px[3] as u16;
        if alpha < 255 {
            for channel in &mut px[..3] {
                *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
            }
        }
    }

    let size = tiny_skia::IntSize::from_wh(width, height).context("Image has no pixels")?;
    tiny_skia::Pixmap::from_vec(data, size).context("Failed to wrap image pixels")
}
