//! Layout → PDF.
//!
//! Rendering happens in two passes. `plan` walks the layout tree and
//! produces positioned text runs and rules per page (pure, testable);
//! `render_pdf` replays that plan through `printpdf`.
//!
//! Coordinates are millimetres with the origin at the bottom-left corner
//! of an A4 portrait page, as PDF expects.

use std::io::BufWriter;

use printpdf::{
    BuiltinFont, Color, Greyscale, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference,
    Point,
};

use super::layout::{Align, Block, Column, DocumentLayout, Table, Text, BODY_SIZE, SMALL_SIZE};
use super::DocumentError;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
/// Space reserved at the bottom of each page for the page footer.
const FOOTER_BAND_MM: f32 = 10.0;

const CONTENT_TOP: f32 = PAGE_HEIGHT_MM - MARGIN_MM;
const CONTENT_BOTTOM: f32 = MARGIN_MM + FOOTER_BAND_MM;
const CONTENT_WIDTH: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.3;
const CELL_PAD_MM: f32 = 1.5;
const COLUMN_GAP_MM: f32 = 6.0;
const BLOCK_GAP_MM: f32 = 2.0;

/// Average Helvetica advance width as a fraction of the em.
/// Deliberately generous so estimated widths err towards wrapping early.
fn glyph_factor(bold: bool) -> f32 {
    if bold {
        0.56
    } else {
        0.52
    }
}

pub fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_SPACING
}

/// Estimated rendered width of `text` in millimetres.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * glyph_factor(bold)
}

fn max_chars(width: f32, size: f32, bold: bool) -> usize {
    ((width / (size * PT_TO_MM * glyph_factor(bold))).floor() as usize).max(1)
}

/// Word-wrap helper. Honours explicit newlines and hard-splits words
/// longer than a full line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if current_len > 0 && current_len + word.len() + 1 > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }
        lines.push(current);
    }

    // Drop trailing blank lines but keep at least one.
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

// ═══════════════════════════════════════════════════════════
// Page plan
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub size: f32,
    pub bold: bool,
}

/// A horizontal rule from `x1` to `x2` at height `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedRule {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub texts: Vec<PlacedText>,
    pub rules: Vec<PlacedRule>,
}

impl PagePlan {
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text.contains(needle))
    }
}

/// Content measured against a top edge. `y` values inside are downward
/// offsets from that edge until the fragment is committed to a page.
#[derive(Debug, Clone, Default)]
struct Fragment {
    texts: Vec<PlacedText>,
    rules: Vec<PlacedRule>,
    height: f32,
}

impl Fragment {
    fn append(&mut self, other: Fragment, dy: f32) {
        self.texts.extend(other.texts.into_iter().map(|mut t| {
            t.y += dy;
            t
        }));
        self.rules.extend(other.rules.into_iter().map(|mut r| {
            r.y += dy;
            r
        }));
    }

    /// Keep the lines that end within `depth` of the top edge and return
    /// the rest, re-based so its first line starts at zero.
    fn split_off(&mut self, depth: f32) -> Fragment {
        let line_top = |t: &PlacedText| t.y - 0.75 * line_height(t.size);
        let line_bottom = |t: &PlacedText| t.y + 0.25 * line_height(t.size);

        let (keep, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.texts).into_iter().partition(|t| line_bottom(t) <= depth);
        let cut = rest.iter().map(line_top).fold(depth, f32::min).max(0.0);
        let (keep_rules, rest_rules): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.rules).into_iter().partition(|r| r.y <= cut);

        let rest = Fragment {
            texts: rest
                .into_iter()
                .map(|mut t| {
                    t.y -= cut;
                    t
                })
                .collect(),
            rules: rest_rules
                .into_iter()
                .map(|mut r| {
                    r.y -= cut;
                    r
                })
                .collect(),
            height: (self.height - cut).max(0.0),
        };
        self.texts = keep;
        self.rules = keep_rules;
        self.height = cut;
        rest
    }

    fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.rules.is_empty()
    }

    fn rule(x: f32, width: f32) -> Self {
        Self {
            texts: Vec::new(),
            rules: vec![PlacedRule { x1: x, x2: x + width, y: 0.0 }],
            height: 0.0,
        }
    }
}

fn aligned_x(line: &str, size: f32, bold: bool, align: Align, x: f32, width: f32) -> f32 {
    let w = text_width(line, size, bold);
    match align {
        Align::Left => x,
        Align::Center => x + ((width - w) / 2.0).max(0.0),
        Align::Right => x + (width - w).max(0.0),
    }
}

fn text_fragment(text: &Text, x: f32, width: f32) -> Fragment {
    let lh = line_height(text.size);
    let lines = wrap_text(&text.content, max_chars(width, text.size, text.bold));
    let mut frag = Fragment {
        height: lh * lines.len() as f32,
        ..Default::default()
    };
    for (i, line) in lines.into_iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        frag.texts.push(PlacedText {
            x: aligned_x(&line, text.size, text.bold, text.align, x, width),
            y: lh * (i as f32 + 1.0) - lh * 0.25,
            size: text.size,
            bold: text.bold,
            text: line,
        });
    }
    frag
}

fn key_values_fragment(pairs: &[(String, String)], x: f32, width: f32) -> Fragment {
    let label_w = (width * 0.35).min(40.0);
    let value_x = x + label_w + 2.0;
    let value_w = width - label_w - 2.0;
    let mut frag = Fragment::default();
    for (label, value) in pairs {
        let label_frag = text_fragment(&Text::bold(label.as_str()), x, label_w);
        let value_frag = text_fragment(&Text::plain(value.as_str()), value_x, value_w);
        let row_h = label_frag.height.max(value_frag.height);
        let dy = frag.height;
        frag.append(label_frag, dy);
        frag.append(value_frag, dy);
        frag.height += row_h;
    }
    frag
}

fn stack_fragment(blocks: &[Block], x: f32, width: f32) -> Fragment {
    let mut frag = Fragment::default();
    for block in blocks {
        let child = block_fragment(block, x, width);
        let dy = frag.height;
        frag.height += child.height;
        frag.append(child, dy);
    }
    frag
}

fn columns_fragment(columns: &[Vec<Block>], x: f32, width: f32) -> Fragment {
    if columns.is_empty() {
        return Fragment::default();
    }
    let n = columns.len() as f32;
    let col_w = (width - COLUMN_GAP_MM * (n - 1.0)) / n;
    let mut frag = Fragment::default();
    for (i, blocks) in columns.iter().enumerate() {
        let child = stack_fragment(blocks, x + i as f32 * (col_w + COLUMN_GAP_MM), col_w);
        frag.height = frag.height.max(child.height);
        frag.append(child, 0.0);
    }
    frag
}

fn column_widths(columns: &[Column], width: f32) -> Vec<f32> {
    let total: f32 = columns.iter().map(|c| c.weight.max(0.0)).sum();
    if total <= 0.0 {
        let even = width / columns.len().max(1) as f32;
        return vec![even; columns.len()];
    }
    columns
        .iter()
        .map(|c| width * c.weight.max(0.0) / total)
        .collect()
}

/// Right-aligned columns hold figures, which are never wrapped.
fn is_figure(column: &Column) -> bool {
    column.align == Align::Right
}

/// Weighted widths, with each figure column widened to fit its widest
/// body or summary value. The room comes from the wrapping columns,
/// which keep at least half of their weighted width.
fn table_widths(table: &Table, width: f32) -> Vec<f32> {
    let mut widths = column_widths(&table.columns, width);
    let needed: Vec<f32> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            if !is_figure(column) {
                return 0.0;
            }
            let body = table.rows.iter().filter_map(|r| r.get(i)).map(|c| text_width(c, BODY_SIZE, false));
            let summary = table.summary.iter().filter_map(|r| r.get(i)).map(|c| text_width(c, BODY_SIZE, true));
            body.chain(summary).fold(0.0, f32::max) + 2.0 * CELL_PAD_MM
        })
        .collect();

    let shortfall: Vec<f32> = widths.iter().zip(&needed).map(|(w, n)| (n - w).max(0.0)).collect();
    let deficit: f32 = shortfall.iter().sum();
    if deficit <= 0.0 {
        return widths;
    }
    let flexible: f32 = widths
        .iter()
        .zip(&table.columns)
        .filter(|(_, c)| !is_figure(c))
        .map(|(w, _)| *w)
        .sum();
    let taken = deficit.min(flexible * 0.5);
    if taken <= 0.0 {
        return widths;
    }
    for ((w, column), short) in widths.iter_mut().zip(&table.columns).zip(&shortfall) {
        if is_figure(column) {
            *w += short * taken / deficit;
        } else {
            *w -= *w * taken / flexible;
        }
    }
    widths
}

/// One line at body height, shrunk until it fits `width`.
fn figure_fragment(content: &str, bold: bool, x: f32, width: f32) -> Fragment {
    let lh = line_height(BODY_SIZE);
    let mut frag = Fragment {
        height: lh,
        ..Default::default()
    };
    if content.is_empty() {
        return frag;
    }
    let natural = text_width(content, BODY_SIZE, bold);
    let size = if natural > width {
        BODY_SIZE * width / natural
    } else {
        BODY_SIZE
    };
    frag.texts.push(PlacedText {
        text: content.to_string(),
        x: aligned_x(content, size, bold, Align::Right, x, width),
        y: lh * 0.75,
        size,
        bold,
    });
    frag
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Header,
    Body,
    Summary,
}

fn row_fragment(cells: &[String], columns: &[Column], widths: &[f32], x: f32, kind: RowKind) -> Fragment {
    let bold = kind != RowKind::Body;
    let mut frag = Fragment::default();
    let mut cell_x = x;
    let mut tallest: f32 = 0.0;
    for (i, width) in widths.iter().enumerate() {
        let content = cells.get(i).map(String::as_str).unwrap_or("");
        let column = columns.get(i);
        let inner_w = (width - 2.0 * CELL_PAD_MM).max(1.0);
        let cell = if kind != RowKind::Header && column.is_some_and(is_figure) {
            figure_fragment(content, bold, cell_x + CELL_PAD_MM, inner_w)
        } else {
            let text = Text {
                content: content.to_string(),
                size: BODY_SIZE,
                bold,
                align: column.map(|c| c.align).unwrap_or_default(),
            };
            text_fragment(&text, cell_x + CELL_PAD_MM, inner_w)
        };
        tallest = tallest.max(cell.height);
        frag.append(cell, CELL_PAD_MM);
        cell_x += width;
    }
    frag.height = tallest + 2.0 * CELL_PAD_MM;
    frag
}

fn header_fragment(table: &Table, widths: &[f32], x: f32, width: f32) -> Fragment {
    let headers: Vec<String> = table.columns.iter().map(|c| c.header.clone()).collect();
    let row = row_fragment(&headers, &table.columns, widths, x, RowKind::Header);
    let mut frag = Fragment::rule(x, width);
    let h = row.height;
    frag.append(row, 0.0);
    frag.append(Fragment::rule(x, width), h);
    frag.height = h;
    frag
}

/// Whole table without page breaks (tables nested inside columns).
fn table_fragment(table: &Table, x: f32, width: f32) -> Fragment {
    let widths = table_widths(table, width);
    let mut frag = header_fragment(table, &widths, x, width);
    for row in &table.rows {
        let r = row_fragment(row, &table.columns, &widths, x, RowKind::Body);
        let dy = frag.height;
        frag.height += r.height;
        frag.append(r, dy);
    }
    let dy = frag.height;
    frag.append(Fragment::rule(x, width), dy);
    for row in &table.summary {
        let r = row_fragment(row, &table.columns, &widths, x, RowKind::Summary);
        let dy = frag.height;
        frag.height += r.height;
        frag.append(r, dy);
    }
    frag
}

fn block_fragment(block: &Block, x: f32, width: f32) -> Fragment {
    match block {
        Block::Text(text) => text_fragment(text, x, width),
        Block::KeyValues(pairs) => key_values_fragment(pairs, x, width),
        Block::Columns(columns) => columns_fragment(columns, x, width),
        Block::Table(table) => table_fragment(table, x, width),
        Block::Rule => {
            let mut frag = Fragment::default();
            frag.append(Fragment::rule(x, width), 1.5);
            frag.height = 3.0;
            frag
        }
        Block::Spacer(h) => Fragment {
            height: h.max(0.0),
            ..Default::default()
        },
    }
}

const PAGE_CAPACITY: f32 = CONTENT_TOP - CONTENT_BOTTOM;

struct Planner {
    done: Vec<PagePlan>,
    current: PagePlan,
    y: f32,
    /// Nothing but a repeated table header has been placed on this page.
    fresh: bool,
}

impl Planner {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: PagePlan::default(),
            y: CONTENT_TOP,
            fresh: true,
        }
    }

    fn remaining(&self) -> f32 {
        self.y - CONTENT_BOTTOM
    }

    fn at_page_top(&self) -> bool {
        self.y >= CONTENT_TOP
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = CONTENT_TOP;
        self.fresh = true;
    }

    /// New page, starting with `header` when a table is being continued.
    fn continue_page(&mut self, header: Option<&Fragment>) {
        self.new_page();
        if let Some(header) = header {
            self.commit(header.clone());
            self.fresh = true;
        }
    }

    fn commit(&mut self, frag: Fragment) {
        let top = self.y;
        if frag.height > 0.0 || !frag.is_empty() {
            self.fresh = false;
        }
        self.current.texts.extend(frag.texts.into_iter().map(|mut t| {
            t.y = top - t.y;
            t
        }));
        self.current.rules.extend(frag.rules.into_iter().map(|mut r| {
            r.y = top - r.y;
            r
        }));
        self.y -= frag.height;
    }

    /// Commit `frag`, carrying the lines that do not fit onto new pages.
    fn flow(&mut self, mut frag: Fragment, header: Option<&Fragment>) {
        while frag.height > self.remaining() {
            let rest = frag.split_off(self.remaining());
            if rest.is_empty() {
                // Only trailing padding overflowed.
                self.commit(frag);
                return;
            }
            if frag.is_empty() && self.fresh {
                // A single line taller than the page; breaking again cannot help.
                self.commit(rest);
                return;
            }
            self.commit(frag);
            self.continue_page(header);
            frag = rest;
        }
        self.commit(frag);
    }

    /// Commit on this page if it fits, otherwise start a new one first.
    /// Blocks taller than a whole page continue across pages.
    fn place(&mut self, frag: Fragment) {
        if frag.height > self.remaining() && frag.height <= PAGE_CAPACITY && !self.at_page_top() {
            self.new_page();
        }
        self.flow(frag, None);
    }

    fn gap(&mut self, mm: f32) {
        // A gap never carries over to the next page.
        self.y = (self.y - mm).max(CONTENT_BOTTOM);
    }

    /// Text paragraphs break between lines.
    fn place_text(&mut self, text: &Text) {
        let lines = wrap_text(&text.content, max_chars(CONTENT_WIDTH, text.size, text.bold));
        for line in lines {
            let single = Text {
                content: line,
                ..text.clone()
            };
            self.place(text_fragment(&single, MARGIN_MM, CONTENT_WIDTH));
        }
    }

    /// Tables break between rows and repeat their header row. A row
    /// taller than a page breaks between its lines.
    fn place_table(&mut self, table: &Table) {
        let x = MARGIN_MM;
        let widths = table_widths(table, CONTENT_WIDTH);
        let header = header_fragment(table, &widths, x, CONTENT_WIDTH);
        let rows: Vec<Fragment> = table
            .rows
            .iter()
            .map(|r| row_fragment(r, &table.columns, &widths, x, RowKind::Body))
            .collect();
        let row_capacity = PAGE_CAPACITY - header.height;

        let first_row = rows.first().map(|r| r.height.min(row_capacity)).unwrap_or(0.0);
        if header.height + first_row > self.remaining() && !self.at_page_top() {
            self.new_page();
        }
        self.commit(header.clone());
        self.fresh = true;

        for row in rows {
            if row.height > self.remaining() && row.height <= row_capacity {
                self.continue_page(Some(&header));
            }
            self.flow(row, Some(&header));
        }
        self.commit(Fragment::rule(x, CONTENT_WIDTH));

        for summary in &table.summary {
            self.place(row_fragment(summary, &table.columns, &widths, x, RowKind::Summary));
        }
    }

    fn finish(mut self) -> Vec<PagePlan> {
        self.done.push(self.current);
        self.done
    }
}

/// Position every element of the layout. Always yields at least one page.
pub fn plan(layout: &DocumentLayout) -> Vec<PagePlan> {
    let mut planner = Planner::new();

    for block in &layout.blocks {
        match block {
            Block::Text(text) => planner.place_text(text),
            Block::Table(table) => {
                planner.place_table(table);
                planner.gap(BLOCK_GAP_MM);
            }
            Block::Rule | Block::Spacer(_) => {
                planner.place(block_fragment(block, MARGIN_MM, CONTENT_WIDTH));
            }
            Block::KeyValues(_) | Block::Columns(_) => {
                planner.place(block_fragment(block, MARGIN_MM, CONTENT_WIDTH));
                planner.gap(BLOCK_GAP_MM);
            }
        }
    }

    let mut pages = planner.finish();
    add_page_footers(&mut pages, layout.footer.as_deref());
    pages
}

fn add_page_footers(pages: &mut [PagePlan], footer: Option<&str>) {
    let total = pages.len();
    let baseline = MARGIN_MM + 2.0;
    for (i, page) in pages.iter_mut().enumerate() {
        page.rules.push(PlacedRule {
            x1: MARGIN_MM,
            x2: PAGE_WIDTH_MM - MARGIN_MM,
            y: MARGIN_MM + 6.0,
        });
        let number = format!("Page {} of {}", i + 1, total);
        page.texts.push(PlacedText {
            x: aligned_x(&number, SMALL_SIZE, false, Align::Right, MARGIN_MM, CONTENT_WIDTH),
            y: baseline,
            size: SMALL_SIZE,
            bold: false,
            text: number,
        });
        if let Some(footer) = footer {
            page.texts.push(PlacedText {
                text: footer.to_string(),
                x: MARGIN_MM,
                y: baseline,
                size: SMALL_SIZE,
                bold: false,
            });
        }
    }
}

// ═══════════════════════════════════════════════════════════
// PDF emission
// ═══════════════════════════════════════════════════════════

fn draw_page(layer: &PdfLayerReference, page: &PagePlan, regular: &IndirectFontRef, bold: &IndirectFontRef) {
    for t in &page.texts {
        let font = if t.bold { bold } else { regular };
        layer.use_text(t.text.as_str(), t.size, Mm(t.x), Mm(t.y), font);
    }
    layer.set_outline_color(Color::Greyscale(Greyscale::new(0.35, None)));
    layer.set_outline_thickness(0.4);
    for r in &page.rules {
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(r.x1), Mm(r.y)), false),
                (Point::new(Mm(r.x2), Mm(r.y)), false),
            ],
            is_closed: false,
        });
    }
}

/// Render a layout to PDF bytes.
pub fn render_pdf(layout: &DocumentLayout) -> Result<Vec<u8>, DocumentError> {
    let pages = plan(layout);

    let (doc, page1, layer1) = PdfDocument::new(
        &layout.title,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| DocumentError::Pdf(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| DocumentError::Pdf(format!("font error: {e}")))?;

    for (i, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (page1, layer1)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        draw_page(&layer, page, &regular, &bold);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| DocumentError::Pdf(format!("save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| DocumentError::Pdf(format!("buffer error: {e}")))?;

    tracing::debug!(title = %layout.title, pages = pages.len(), bytes = bytes.len(), "PDF rendered");
    Ok(bytes)
}
