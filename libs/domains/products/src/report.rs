//! Paginated product reports
//!
//! Layout happens in millimetres on an A4 page with the origin at the top
//! left. A [`ReportDocument`] is a plain value: it can be rendered to text or
//! to PDF bytes, and building it never touches a store.

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use crate::form::ProductForm;
use crate::models::Product;

pub const CATALOG_REPORT_FILENAME: &str = "productos.pdf";
pub const DRAFT_REPORT_FILENAME: &str = "producto.pdf";

pub const CATALOG_TITLE: &str = "Detalles de los Productos";
pub const DRAFT_TITLE: &str = "Detalles del Producto";

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
/// Lowest baseline a line may be placed on
pub const PAGE_BOTTOM_MM: f64 = 287.0;

const TITLE_X: f64 = 10.0;
const TITLE_Y: f64 = 10.0;
const LABEL_X: f64 = 10.0;
const FIELD_X: f64 = 20.0;
const CURSOR_START: f64 = 20.0;
const LINE_STEP: f64 = 10.0;
const BLOCK_GAP: f64 = 10.0;
const BLOCK_HEIGHT: f64 = 30.0;
const BLOCK_ADVANCE: f64 = 40.0;

const FONT_NAME: &[u8] = b"F1";
const FONT_SIZE_PT: f32 = 16.0;
const PT_PER_MM: f64 = 72.0 / 25.4;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

impl ReportLine {
    fn new(x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPage {
    pub lines: Vec<ReportLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub filename: String,
    pub pages: Vec<ReportPage>,
}

impl ReportDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All lines in page order
    pub fn lines(&self) -> impl Iterator<Item = &ReportLine> {
        self.pages.iter().flat_map(|page| page.lines.iter())
    }

    /// One line of text per report line, pages separated by a form feed
    pub fn render_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| {
                page.lines
                    .iter()
                    .map(|line| line.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\x0c\n")
    }

    /// PDF with one content stream per page, Helvetica throughout
    pub fn to_pdf_bytes(&self) -> Vec<u8> {
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let font_id = Ref::new(3);
        let page_count = self.pages.len().max(1);
        // Each page takes two ids: the page object, then its content stream
        let page_ids: Vec<Ref> = (0..page_count)
            .map(|index| Ref::new(4 + 2 * index as i32))
            .collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(page_ids.iter().copied())
            .count(page_count as i32);
        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        let empty = ReportPage::default();
        for (index, page_id) in page_ids.iter().enumerate() {
            let page = self.pages.get(index).unwrap_or(&empty);
            let content_id = Ref::new(page_id.get() + 1);

            {
                let mut writer = pdf.page(*page_id);
                writer
                    .media_box(Rect::new(
                        0.0,
                        0.0,
                        (PAGE_WIDTH_MM * PT_PER_MM) as f32,
                        (PAGE_HEIGHT_MM * PT_PER_MM) as f32,
                    ))
                    .parent(tree_id)
                    .contents(content_id);
                writer.resources().fonts().pair(Name(FONT_NAME), font_id);
            }

            pdf.stream(content_id, &page_content(page));
        }

        pdf.finish()
    }
}

/// Catalog-wide report: a title and one four-line block per product
pub fn catalog_report(products: &[Product]) -> ReportDocument {
    let mut pages = vec![ReportPage {
        lines: vec![ReportLine::new(TITLE_X, TITLE_Y, CATALOG_TITLE)],
    }];
    let mut cursor = CURSOR_START;

    for (index, product) in products.iter().enumerate() {
        let mut top = cursor + BLOCK_GAP;
        if top + BLOCK_HEIGHT > PAGE_BOTTOM_MM {
            pages.push(ReportPage::default());
            cursor = CURSOR_START;
            top = cursor + BLOCK_GAP;
        }

        if let Some(page) = pages.last_mut() {
            page.lines.extend([
                ReportLine::new(LABEL_X, top, format!("Producto {}:", index + 1)),
                ReportLine::new(FIELD_X, top + LINE_STEP, format!("Nombre: {}", product.name)),
                ReportLine::new(
                    FIELD_X,
                    top + 2.0 * LINE_STEP,
                    format!("Precio: {}", product.price),
                ),
                ReportLine::new(
                    FIELD_X,
                    top + 3.0 * LINE_STEP,
                    format!("Unidades Vendidas: {}", product.sold_units),
                ),
            ]);
        }
        cursor = top + BLOCK_ADVANCE;
    }

    ReportDocument {
        filename: CATALOG_REPORT_FILENAME.to_string(),
        pages,
    }
}

/// Single-page report of whatever the form currently holds.
///
/// Missing numeric fields render as an empty value.
pub fn draft_report(form: &ProductForm) -> ReportDocument {
    let number = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();

    let lines = vec![
        ReportLine::new(TITLE_X, TITLE_Y, DRAFT_TITLE),
        ReportLine::new(LABEL_X, 20.0, format!("Nombre: {}", form.name())),
        ReportLine::new(LABEL_X, 30.0, format!("Precio: {}", number(form.price()))),
        ReportLine::new(
            LABEL_X,
            40.0,
            format!("Unidades Vendidas: {}", number(form.sold_units())),
        ),
    ];

    ReportDocument {
        filename: DRAFT_REPORT_FILENAME.to_string(),
        pages: vec![ReportPage { lines }],
    }
}

fn page_content(page: &ReportPage) -> Vec<u8> {
    let mut content = Content::new();
    for line in &page.lines {
        let x = line.x * PT_PER_MM;
        let y = (PAGE_HEIGHT_MM - line.y) * PT_PER_MM;
        let text = win_ansi_bytes(&line.text);
        content
            .begin_text()
            .set_font(Name(FONT_NAME), FONT_SIZE_PT)
            .next_line(x as f32, y as f32)
            .show(Str(&text))
            .end_text();
    }
    content.finish().to_vec()
}

/// Encode for the WinAnsi Helvetica font: Latin-1 characters map to their
/// byte, anything outside it becomes `?`
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match u8::try_from(u32::from(ch)) {
            Ok(byte) if byte >= 0x20 && !(0x7f..0xa0).contains(&byte) => byte,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(index: usize) -> Product {
        Product {
            id: format!("p{index}"),
            name: format!("Product {index}"),
            price: 9.99,
            sold_units: 3.0,
            image: String::new(),
        }
    }

    #[test]
    fn test_empty_catalog_renders_title_only() {
        let report = catalog_report(&[]);

        assert_eq!(report.filename, "productos.pdf");
        assert_eq!(report.page_count(), 1);
        assert_eq!(report.render_text(), "Detalles de los Productos");
    }

    #[test]
    fn test_catalog_block_layout() {
        let report = catalog_report(&[product(0)]);
        let lines: Vec<_> = report.lines().cloned().collect();

        assert_eq!(
            lines,
            vec![
                ReportLine::new(10.0, 10.0, "Detalles de los Productos"),
                ReportLine::new(10.0, 30.0, "Producto 1:"),
                ReportLine::new(20.0, 40.0, "Nombre: Product 0"),
                ReportLine::new(20.0, 50.0, "Precio: 9.99"),
                ReportLine::new(20.0, 60.0, "Unidades Vendidas: 3"),
            ]
        );
    }

    #[test]
    fn test_blocks_are_spaced_fifty_millimetres_apart() {
        let report = catalog_report(&[product(0), product(1)]);
        let labels: Vec<f64> = report
            .lines()
            .filter(|line| line.text.starts_with("Producto "))
            .map(|line| line.y)
            .collect();

        assert_eq!(labels, vec![30.0, 80.0]);
    }

    #[test]
    fn test_overflowing_block_starts_new_page() {
        let products: Vec<_> = (0..6).map(product).collect();
        let report = catalog_report(&products);

        assert_eq!(report.page_count(), 2);
        assert_eq!(report.pages[0].lines.len(), 1 + 5 * 4);
        assert_eq!(report.pages[1].lines[0].text, "Producto 6:");
        assert_eq!(report.pages[1].lines[0].y, 30.0);
        assert!(report.lines().all(|line| line.y <= PAGE_BOTTOM_MM));
    }

    #[test]
    fn test_text_rendering_separates_pages_with_form_feed() {
        let products: Vec<_> = (0..6).map(product).collect();
        let text = catalog_report(&products).render_text();

        assert_eq!(text.matches('\x0c').count(), 1);
        assert!(text.contains("Producto 6:"));
    }

    #[test]
    fn test_draft_report_lists_form_values() {
        let mut form = ProductForm::new();
        form.set_name("Widget");
        form.set_price(9.99);

        let report = draft_report(&form);

        assert_eq!(report.filename, "producto.pdf");
        assert_eq!(
            report.render_text(),
            "Detalles del Producto\nNombre: Widget\nPrecio: 9.99\nUnidades Vendidas: "
        );
    }

    #[test]
    fn test_pdf_bytes_are_well_formed_and_deterministic() {
        let report = catalog_report(&[product(0)]);
        let first = report.to_pdf_bytes();
        let second = report.to_pdf_bytes();
        let text = String::from_utf8_lossy(&first);

        assert_eq!(first, second);
        assert!(first.starts_with(b"%PDF-"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("/BaseFont /Helvetica"));
        assert!(text.contains("(Producto 1:) Tj"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn test_pdf_page_tree_matches_report_pages() {
        let products: Vec<_> = (0..6).map(product).collect();
        let bytes = catalog_report(&products).to_pdf_bytes();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/Count 2"));
        assert!(text.contains("(Producto 6:) Tj"));
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi_bytes("a (b)"), b"a (b)".to_vec());
        assert_eq!(win_ansi_bytes("Café"), vec![b'C', b'a', b'f', 0xe9]);
        assert_eq!(win_ansi_bytes("日本\t"), b"???".to_vec());
    }
}
