//! Layout tree consumed by the PDF renderer.
//!
//! Builders describe *what* goes on the page; `render` decides where it
//! lands and where pages break.

use serde::Serialize;

/// Default body text size in points.
pub const BODY_SIZE: f32 = 9.0;
pub const SMALL_SIZE: f32 = 8.0;
pub const HEADING_SIZE: f32 = 11.0;
pub const TITLE_SIZE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub content: String,
    pub size: f32,
    pub bold: bool,
    pub align: Align,
}

impl Text {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            size: BODY_SIZE,
            bold: false,
            align: Align::Left,
        }
    }

    pub fn bold(content: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(content)
        }
    }

    pub fn heading(content: impl Into<String>) -> Self {
        Self {
            size: HEADING_SIZE,
            ..Self::bold(content)
        }
    }

    pub fn title(content: impl Into<String>) -> Self {
        Self {
            size: TITLE_SIZE,
            align: Align::Center,
            ..Self::bold(content)
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub header: String,
    /// Relative width; normalized against the other columns.
    pub weight: f32,
    pub align: Align,
}

impl Column {
    pub fn new(header: impl Into<String>, weight: f32, align: Align) -> Self {
        Self {
            header: header.into(),
            weight,
            align,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    /// Bold rows printed under the body (totals). Cells may be empty.
    pub summary: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            summary: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<String>) -> Self {
        self.rows.push(cells);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text(Text),
    /// Label / value pairs; labels bold, values wrap.
    KeyValues(Vec<(String, String)>),
    /// Equal-width columns laid side by side; split across pages only
    /// when taller than a page.
    Columns(Vec<Vec<Block>>),
    Table(Table),
    Rule,
    Spacer(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLayout {
    pub title: String,
    pub blocks: Vec<Block>,
    /// Printed at the foot of every page beside the page number.
    pub footer: Option<String>,
}

impl DocumentLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
            footer: None,
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn text(&mut self, text: Text) -> &mut Self {
        self.push(Block::Text(text))
    }

    /// Every string in the tree, depth-first. Used to assert content.
    pub fn text_content(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_text(&self.blocks, &mut out);
        if let Some(footer) = &self.footer {
            out.push(footer.clone());
        }
        out
    }

    /// The first table in the tree, if any.
    pub fn first_table(&self) -> Option<&Table> {
        find_table(&self.blocks)
    }
}

fn collect_text(blocks: &[Block], out: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::Text(t) => out.push(t.content.clone()),
            Block::KeyValues(pairs) => {
                for (k, v) in pairs {
                    out.push(k.clone());
                    out.push(v.clone());
                }
            }
            Block::Columns(cols) => {
                for col in cols {
                    collect_text(col, out);
                }
            }
            Block::Table(table) => {
                out.extend(table.columns.iter().map(|c| c.header.clone()));
                for row in table.rows.iter().chain(table.summary.iter()) {
                    out.extend(row.iter().cloned());
                }
            }
            Block::Rule | Block::Spacer(_) => {}
        }
    }
}

fn find_table(blocks: &[Block]) -> Option<&Table> {
    blocks.iter().find_map(|block| match block {
        Block::Table(t) => Some(t),
        Block::Columns(cols) => cols.iter().find_map(|c| find_table(c)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_constructors_set_style() {
        let t = Text::title("PURCHASE ORDER");
        assert!(t.bold);
        assert_eq!(t.align, Align::Center);
        assert_eq!(t.size, TITLE_SIZE);
        assert_eq!(Text::plain("x").align(Align::Right).align, Align::Right);
    }

    #[test]
    fn text_content_walks_nested_blocks() {
        let mut layout = DocumentLayout::new("Doc");
        layout
            .text(Text::plain("top"))
            .push(Block::Columns(vec![
                vec![Block::KeyValues(vec![("PO No.".into(), "PO-1".into())])],
                vec![Block::Table(
                    Table::new(vec![Column::new("Item", 1.0, Align::Left)]).row(vec!["Bolt".into()]),
                )],
            ]));
        layout.footer = Some("footer".into());

        let content = layout.text_content();
        assert_eq!(content, vec!["top", "PO No.", "PO-1", "Item", "Bolt", "footer"]);
        assert_eq!(layout.first_table().unwrap().rows.len(), 1);
    }
}
