//! GST tax invoice.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::format::format_date;
use super::layout::{Block, DocumentLayout, Text};
use super::model::{require_text, validate_items, BankDetails, LineItem, Party};
use super::{sections, totals, DocumentBuilder, DocumentError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInvoice {
    pub number: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub seller: Party,
    pub buyer: Party,
    /// State where the supply is made. Falls back to the buyer's state.
    #[serde(default)]
    pub place_of_supply: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub bank: Option<BankDetails>,
    #[serde(default)]
    pub terms: Vec<String>,
}

impl TaxInvoice {
    fn validate(&self) -> Result<(), DocumentError> {
        require_text("number", &self.number)?;
        self.seller.validate("seller")?;
        if self.seller.gstin.is_none() {
            return Err(DocumentError::invalid(
                "seller.gstin",
                "is required on a tax invoice",
            ));
        }
        self.buyer.validate("buyer")?;
        if matches!(self.due_date, Some(due) if due < self.date) {
            return Err(DocumentError::invalid(
                "due_date",
                "must not be before the invoice date",
            ));
        }
        if let Some(bank) = &self.bank {
            require_text("bank.account_number", &bank.account_number)?;
            require_text("bank.ifsc", &bank.ifsc)?;
        }
        validate_items(&self.items)
    }

    pub fn place_of_supply(&self) -> Option<&str> {
        self.place_of_supply
            .as_deref()
            .or(self.buyer.state.as_deref())
    }
}

impl DocumentBuilder for TaxInvoice {
    fn file_stem(&self) -> String {
        self.number.clone()
    }

    fn build_layout(&self) -> Result<DocumentLayout, DocumentError> {
        self.validate()?;

        let totals = totals::compute(
            &self.items,
            self.seller.state.as_deref(),
            self.place_of_supply(),
        );

        let mut layout = DocumentLayout::new(format!("Tax Invoice {}", self.number));
        layout
            .text(Text::title("TAX INVOICE"))
            .push(Block::Rule)
            .push(sections::header_fields(vec![
                ("Invoice No.", Some(self.number.clone())),
                ("Invoice Date", Some(format_date(&self.date))),
                ("Due Date", self.due_date.as_ref().map(format_date)),
                ("Place of Supply", self.place_of_supply().map(str::to_string)),
            ]))
            .push(sections::party_columns(&[
                ("Seller", &self.seller),
                ("Bill To", &self.buyer),
            ]));

        let mut table = sections::item_table(&self.items, &totals, true);
        sections::push_totals(&mut table, &totals);
        layout
            .push(Block::Table(table))
            .push(sections::amount_in_words_line(totals.grand_total));

        if totals.tax > 0.0 {
            layout
                .push(Block::Spacer(2.0))
                .text(Text::heading("Tax Summary"))
                .push(Block::Table(sections::tax_summary_table(&totals)));
        }

        if let Some(bank) = &self.bank {
            layout
                .push(Block::Spacer(2.0))
                .text(Text::heading("Bank Details"))
                .push(Block::KeyValues(bank.rows()));
        }
        layout
            .blocks
            .extend(sections::numbered_list("Terms & Conditions", &self.terms));
        layout
            .push(Block::Spacer(6.0))
            .push(sections::signatory(&self.seller.name));
        layout.footer = Some(sections::computer_generated("invoice"));

        tracing::debug!(
            number = %self.number,
            items = self.items.len(),
            grand_total = totals.grand_total,
            "Tax invoice laid out"
        );
        Ok(layout)
    }
}
