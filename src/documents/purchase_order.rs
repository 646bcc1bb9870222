//! Purchase order: issued by a buyer to a supplier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::format::format_date;
use super::layout::{Block, DocumentLayout, Text};
use super::model::{require_text, validate_items, LineItem, Party};
use super::{sections, totals, DocumentBuilder, DocumentError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub number: String,
    pub date: NaiveDate,
    pub buyer: Party,
    pub supplier: Party,
    /// Delivery address when it differs from the buyer's address.
    #[serde(default)]
    pub ship_to: Option<Party>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PurchaseOrder {
    fn validate(&self) -> Result<(), DocumentError> {
        require_text("number", &self.number)?;
        self.buyer.validate("buyer")?;
        self.supplier.validate("supplier")?;
        if let Some(ship_to) = &self.ship_to {
            ship_to.validate("ship_to")?;
        }
        if let Some(delivery) = self.delivery_date {
            if delivery < self.date {
                return Err(DocumentError::invalid(
                    "delivery_date",
                    "must not be before the order date",
                ));
            }
        }
        validate_items(&self.items)
    }
}

impl DocumentBuilder for PurchaseOrder {
    fn file_stem(&self) -> String {
        self.number.clone()
    }

    fn build_layout(&self) -> Result<DocumentLayout, DocumentError> {
        self.validate()?;

        // Tax is charged by the supplier, so the supplier's state decides
        // the split against the place of delivery.
        let destination = self.ship_to.as_ref().unwrap_or(&self.buyer);
        let totals = totals::compute(
            &self.items,
            self.supplier.state.as_deref(),
            destination.state.as_deref(),
        );

        let mut layout = DocumentLayout::new(format!("Purchase Order {}", self.number));
        layout
            .text(Text::title("PURCHASE ORDER"))
            .push(Block::Rule)
            .push(sections::header_fields(vec![
                ("PO No.", Some(self.number.clone())),
                ("PO Date", Some(format_date(&self.date))),
                ("Delivery Date", self.delivery_date.as_ref().map(format_date)),
                ("Payment Terms", self.payment_terms.clone()),
            ]));

        let mut parties = vec![("Buyer", &self.buyer), ("Supplier", &self.supplier)];
        if let Some(ship_to) = &self.ship_to {
            parties.push(("Ship To", ship_to));
        }
        layout.push(sections::party_columns(&parties));

        let mut table = sections::item_table(&self.items, &totals, true);
        sections::push_totals(&mut table, &totals);
        layout
            .push(Block::Table(table))
            .push(sections::amount_in_words_line(totals.grand_total));

        layout.blocks.extend(sections::note("Notes", self.notes.as_deref()));
        layout
            .blocks
            .extend(sections::numbered_list("Terms & Conditions", &self.terms));
        layout
            .push(Block::Spacer(6.0))
            .push(sections::signatory(&self.buyer.name));
        layout.footer = Some(sections::computer_generated("purchase order"));

        tracing::debug!(number = %self.number, items = self.items.len(), "Purchase order laid out");
        Ok(layout)
    }
}
