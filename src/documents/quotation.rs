//! Quotation: a priced offer from a seller to a prospective customer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::format::format_date;
use super::layout::{Block, DocumentLayout, Text};
use super::model::{require_text, validate_items, LineItem, Party};
use super::{sections, totals, DocumentBuilder, DocumentError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub number: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    pub seller: Party,
    pub customer: Party,
    /// One-line subject, e.g. "Supply of fasteners for plant expansion".
    #[serde(default)]
    pub subject: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Quotation {
    fn validate(&self) -> Result<(), DocumentError> {
        require_text("number", &self.number)?;
        self.seller.validate("seller")?;
        self.customer.validate("customer")?;
        if matches!(self.valid_until, Some(until) if until < self.date) {
            return Err(DocumentError::invalid(
                "valid_until",
                "must not be before the quotation date",
            ));
        }
        validate_items(&self.items)
    }
}

impl DocumentBuilder for Quotation {
    fn file_stem(&self) -> String {
        self.number.clone()
    }

    fn build_layout(&self) -> Result<DocumentLayout, DocumentError> {
        self.validate()?;

        let totals = totals::compute(
            &self.items,
            self.seller.state.as_deref(),
            self.customer.state.as_deref(),
        );

        let mut layout = DocumentLayout::new(format!("Quotation {}", self.number));
        layout
            .text(Text::title("QUOTATION"))
            .push(Block::Rule)
            .push(sections::header_fields(vec![
                ("Quotation No.", Some(self.number.clone())),
                ("Date", Some(format_date(&self.date))),
                ("Valid Until", self.valid_until.as_ref().map(format_date)),
            ]))
            .push(sections::party_columns(&[
                ("From", &self.seller),
                ("To", &self.customer),
            ]));

        if let Some(subject) = self.subject.as_deref().filter(|s| !s.trim().is_empty()) {
            layout.text(Text::bold(format!("Subject: {}", subject.trim())));
        }
        layout.text(Text::plain(
            "We are pleased to quote our best prices for the following items:",
        ));

        let mut table = sections::item_table(&self.items, &totals, true);
        sections::push_totals(&mut table, &totals);
        layout
            .push(Block::Table(table))
            .push(sections::amount_in_words_line(totals.grand_total));

        if let Some(until) = &self.valid_until {
            layout.text(Text::plain(format!(
                "This quotation is valid until {}.",
                format_date(until)
            )));
        }
        layout.blocks.extend(sections::note("Notes", self.notes.as_deref()));
        layout
            .blocks
            .extend(sections::numbered_list("Terms & Conditions", &self.terms));
        layout
            .push(Block::Spacer(6.0))
            .push(sections::signatory(&self.seller.name));
        layout.footer = Some(sections::computer_generated("quotation"));

        tracing::debug!(number = %self.number, items = self.items.len(), "Quotation laid out");
        Ok(layout)
    }
}
