//! printpdf-backed table rendering

use std::io::BufWriter;
use std::sync::Arc;

use async_trait::async_trait;
use printpdf::*;

use super::{BackendLoader, DocumentBackend, TableDocument};
use crate::error::{Error, Result};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 7.0;

/// Left edge and character budget of each column
const COLUMNS: [(f32, usize); 4] = [(15.0, 26), (68.0, 20), (108.0, 26), (158.0, 22)];

/// Renders [`TableDocument`]s with printpdf's built-in Helvetica
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPdfBackend;

/// Loader handing out [`PrintPdfBackend`]; it never fails
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPdfLoader;

#[async_trait]
impl BackendLoader for PrintPdfLoader {
    async fn load(&self) -> Result<Arc<dyn DocumentBackend>> {
        Ok(Arc::new(PrintPdfBackend))
    }
}

impl DocumentBackend for PrintPdfBackend {
    fn render(&self, table: &TableDocument) -> Result<Vec<u8>> {
        let (doc, page1, layer1) = PdfDocument::new(&table.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::export(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::export(format!("PDF font error: {e}")))?;

        let mut layer = doc.get_page(page1).get_layer(layer1);
        let mut y = PAGE_HEIGHT - 20.0;

        // Title
        layer.set_fill_color(rgb(79, 70, 229));
        layer.use_text(&table.title, 20.0, Mm(MARGIN_LEFT), Mm(y), &bold);
        y -= 8.0;
        layer.set_fill_color(rgb(100, 100, 100));
        layer.use_text(&table.subtitle, 10.0, Mm(MARGIN_LEFT), Mm(y), &font);
        y -= 10.0;

        draw_header(&layer, &table.headers, y, &bold);
        y -= ROW_HEIGHT;

        for row in &table.rows {
            if y < MARGIN_BOTTOM {
                let (page, layer_index) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                layer = doc.get_page(page).get_layer(layer_index);
                y = PAGE_HEIGHT - 20.0;
                draw_header(&layer, &table.headers, y, &bold);
                y -= ROW_HEIGHT;
            }
            layer.set_fill_color(rgb(30, 30, 30));
            for (cell, (x, width)) in row.iter().zip(COLUMNS.iter()) {
                layer.use_text(truncate(cell, *width), 10.0, Mm(*x), Mm(y), &font);
            }
            y -= ROW_HEIGHT;
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| Error::export(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| Error::export(format!("PDF buffer error: {e}")))
    }
}

fn draw_header(layer: &PdfLayerReference, headers: &[String; 4], y: f32, bold: &IndirectFontRef) {
    layer.set_fill_color(rgb(224, 36, 36));
    for (title, (x, _)) in headers.iter().zip(COLUMNS.iter()) {
        layer.use_text(title, 11.0, Mm(*x), Mm(y), bold);
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0, None))
}

/// Cut a cell to `max_chars`, marking the cut with "..."
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
