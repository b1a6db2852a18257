//! PDF receipts.
//!
//! A minimal PDF 1.4 writer: Letter pages, the built-in Helvetica fonts and one
//! uncompressed content stream per page. Item lines flow onto further pages as
//! needed. Text uses `WinAnsiEncoding`, so Latin-1 characters survive and
//! anything else is replaced with `?`.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use aurelia_core::{CurrencyCode, Price};

use crate::models::Order;

const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const MARGIN: u32 = 56;
const LINE_HEIGHT: u32 = 16;

/// Lines taken by the totals block under the items.
const TOTALS_LINES: u32 = 6;

/// Longest product name printed before truncation.
const MAX_NAME_CHARS: usize = 48;

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

/// Accumulates text operators for one page, top to bottom.
struct Page {
    ops: String,
    y: u32,
}

impl Page {
    fn new() -> Self {
        Self {
            ops: String::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text_at(&mut self, x: u32, font: Font, size: u32, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT /{} {size} Tf {x} {} Td ({}) Tj ET",
            font.resource(),
            self.y,
            escape(text)
        );
    }

    fn line(&mut self, font: Font, size: u32, text: &str) {
        self.text_at(MARGIN, font, size, text);
        self.advance(1);
    }

    /// Left text and a right-hand column on the same baseline.
    fn columns(&mut self, font: Font, left: &str, right: &str) {
        self.text_at(MARGIN, font, 10, left);
        self.text_at(PAGE_WIDTH - MARGIN - 110, font, 10, right);
        self.advance(1);
    }

    fn rule(&mut self) {
        let _ = writeln!(
            self.ops,
            "0.5 w {MARGIN} {y} m {} {y} l S",
            PAGE_WIDTH - MARGIN,
            y = self.y + LINE_HEIGHT / 2
        );
        self.advance(1);
    }

    fn advance(&mut self, lines: u32) {
        self.y = self.y.saturating_sub(LINE_HEIGHT * lines).max(MARGIN);
    }

    /// Whether `lines` more lines fit above the bottom margin.
    const fn has_room(&self, lines: u32) -> bool {
        self.y >= MARGIN + LINE_HEIGHT * lines
    }
}

/// Finished pages plus the one being written.
struct Document {
    done: Vec<String>,
    page: Page,
    continued: String,
}

impl Document {
    /// Start a new page, headed with `continued`, unless `lines` still fit.
    fn reserve(&mut self, lines: u32) {
        if self.page.has_room(lines) {
            return;
        }
        let full = std::mem::replace(&mut self.page, Page::new());
        self.done.push(full.ops);
        self.page.line(Font::Bold, 11, &self.continued);
        self.page.advance(1);
    }

    fn finish(mut self) -> Vec<String> {
        self.done.push(self.page.ops);
        self.done
    }
}

/// Render a receipt for an order.
#[must_use]
pub fn render(order: &Order, store_name: &str, currency: CurrencyCode) -> Vec<u8> {
    let money = |amount: Decimal| Price::new(amount, currency).display();
    let shipping = &order.shipping;
    let mut page = Page::new();

    page.line(Font::Bold, 20, store_name);
    page.line(Font::Regular, 12, "Receipt");
    page.advance(1);

    page.line(Font::Bold, 11, &format!("Order {}", order.number()));
    page.line(
        Font::Regular,
        10,
        &format!("Date: {}", order.created_at.format("%Y-%m-%d %H:%M UTC")),
    );
    page.line(
        Font::Regular,
        10,
        &format!("Payment: {} / Status: {}", order.payment_status, order.status),
    );
    if let Some(reference) = &order.payment_reference {
        page.line(Font::Regular, 10, &format!("Reference: {reference}"));
    }
    page.advance(1);

    page.line(Font::Bold, 11, "Ship to");
    page.line(Font::Regular, 10, &shipping.full_name);
    page.line(Font::Regular, 10, &shipping.address_line1);
    if let Some(line2) = shipping.address_line2.as_deref().filter(|l| !l.is_empty()) {
        page.line(Font::Regular, 10, line2);
    }
    page.line(
        Font::Regular,
        10,
        &format!("{} {}, {}", shipping.city, shipping.postal_code, shipping.country),
    );
    page.line(Font::Regular, 10, &format!("{} / {}", shipping.email, shipping.phone));
    page.advance(1);

    page.columns(Font::Bold, "Item", "Amount");
    page.rule();

    let mut doc = Document {
        done: Vec::new(),
        page,
        continued: format!("Order {} (continued)", order.number()),
    };
    for item in &order.items {
        doc.reserve(1);
        let name: String = item.product_name.chars().take(MAX_NAME_CHARS).collect();
        doc.page.columns(
            Font::Regular,
            &format!("{name} x{} @ {}", item.quantity, money(item.unit_price)),
            &money(item.line_total),
        );
    }

    doc.reserve(TOTALS_LINES);
    let page = &mut doc.page;
    page.rule();
    page.columns(Font::Regular, "Subtotal", &money(order.subtotal));
    page.columns(Font::Regular, "Shipping", &money(order.shipping_fee));
    page.columns(Font::Bold, "Total", &money(order.total));
    page.advance(1);
    page.line(Font::Regular, 9, "Thank you for your purchase.");

    assemble(&doc.finish())
}

/// Wrap page content streams into a complete document with a valid xref table.
///
/// Objects 1 to 4 are the catalog, the page tree and the two fonts; each page
/// then takes two objects, the page and its content stream.
fn assemble(pages: &[String]) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 5 + 2 * i).collect();
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_owned(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_owned(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_owned(),
    ];
    for (content, id) in pages.iter().zip(&page_ids) {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ));
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_start = out.len();
    let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(trailer, "{offset:010} 00000 n ");
    }
    let _ = write!(
        trailer,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(trailer.as_bytes());
    out
}

/// Escape a string for a PDF literal. Latin-1 goes out as octal escapes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '€' => out.push_str("\\200"),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", u32::from(c));
            }
            _ => out.push('?'),
        }
    }
    out
}
