//! Delivery challan: the note that travels with goods.
//!
//! Goods sent for job work or on a returnable basis usually carry no
//! price, so value columns only appear when some line has a rate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::format::format_date;
use super::layout::{Block, DocumentLayout, Text};
use super::model::{require_text, validate_items, LineItem, Party};
use super::{sections, totals, DocumentBuilder, DocumentError};

/// Why the goods are moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallanPurpose {
    #[default]
    Supply,
    JobWork,
    Returnable,
    SaleOnApproval,
    Other,
}

impl ChallanPurpose {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Supply => "Supply",
            Self::JobWork => "Job Work",
            Self::Returnable => "Returnable",
            Self::SaleOnApproval => "Sale on Approval",
            Self::Other => "Other",
        }
    }

    /// Goods expected to come back to the consignor.
    pub fn is_returnable(&self) -> bool {
        matches!(self, Self::JobWork | Self::Returnable | Self::SaleOnApproval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryChallan {
    pub number: String,
    pub date: NaiveDate,
    pub consignor: Party,
    pub consignee: Party,
    #[serde(default)]
    pub purpose: ChallanPurpose,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub transport_mode: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl DeliveryChallan {
    fn validate(&self) -> Result<(), DocumentError> {
        require_text("number", &self.number)?;
        self.consignor.validate("consignor")?;
        self.consignee.validate("consignee")?;
        validate_items(&self.items)
    }

    fn has_values(&self) -> bool {
        self.items.iter().any(|item| item.rate > 0.0)
    }
}

impl DocumentBuilder for DeliveryChallan {
    fn file_stem(&self) -> String {
        self.number.clone()
    }

    fn build_layout(&self) -> Result<DocumentLayout, DocumentError> {
        self.validate()?;

        let totals = totals::compute(
            &self.items,
            self.consignor.state.as_deref(),
            self.consignee.state.as_deref(),
        );
        let with_values = self.has_values();

        let mut layout = DocumentLayout::new(format!("Delivery Challan {}", self.number));
        layout
            .text(Text::title("DELIVERY CHALLAN"))
            .push(Block::Rule)
            .push(sections::header_fields(vec![
                ("Challan No.", Some(self.number.clone())),
                ("Date", Some(format_date(&self.date))),
                ("Purpose", Some(self.purpose.label().to_string())),
                ("Vehicle No.", self.vehicle_number.clone()),
                ("Transport", self.transport_mode.clone()),
            ]))
            .push(sections::party_columns(&[
                ("Consignor", &self.consignor),
                ("Consignee", &self.consignee),
            ]));

        let mut table = sections::item_table(&self.items, &totals, with_values);
        sections::push_quantity_totals(&mut table, &totals);
        if with_values {
            sections::push_totals(&mut table, &totals);
        }
        layout.push(Block::Table(table));
        if with_values {
            layout.push(sections::amount_in_words_line(totals.grand_total));
        }

        if self.purpose.is_returnable() {
            layout.text(Text::bold(format!(
                "Goods sent for {} are to be returned to the consignor.",
                self.purpose.label().to_lowercase()
            )));
        }
        layout.blocks.extend(sections::note("Remarks", self.remarks.as_deref()));

        layout.push(Block::Spacer(6.0)).push(Block::Columns(vec![
            vec![
                Block::Text(Text::plain(
                    "Received the above goods in good order and condition.",
                )),
                Block::Spacer(12.0),
                Block::Text(Text::plain("Receiver's Signature & Seal")),
            ],
            sections::signature(&self.consignor.name, "Authorised Signatory"),
        ]));
        layout.footer = Some(sections::computer_generated("delivery challan"));

        tracing::debug!(
            number = %self.number,
            purpose = self.purpose.label(),
            with_values,
            "Delivery challan laid out"
        );
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::model::fixtures::{items, party};
    use crate::documents::render_pdf;

    fn challan() -> DeliveryChallan {
        DeliveryChallan {
            number: "DC-0311".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
            consignor: party("Acme Steel Traders", "Maharashtra"),
            consignee: party("Precision Machining Co", "Maharashtra"),
            purpose: ChallanPurpose::JobWork,
            vehicle_number: Some("MH 12 AB 4321".into()),
            transport_mode: Some("Road".into()),
            items: vec![
                LineItem::new("Flange blanks", 40.0, 0.0),
                LineItem {
                    unit: "Kg".into(),
                    ..LineItem::new("Round bar EN8", 125.5, 0.0)
                },
            ],
            remarks: None,
        }
    }

    #[test]
    fn quantity_only_challan() {
        let layout = challan().build_layout().unwrap();
        let table = layout.first_table().unwrap();
        assert_eq!(table.columns.len(), 5);
        assert!(!table.columns.iter().any(|c| c.header == "Amount"));
        assert_eq!(table.summary.len(), 2);
        assert_eq!(table.summary[1][3], "125.5");
        assert_eq!(table.summary[1][4], "Kg");

        let content = layout.text_content();
        for expected in [
            "DELIVERY CHALLAN",
            "Job Work",
            "MH 12 AB 4321",
            "Consignor",
            "Consignee",
            "Goods sent for job work are to be returned to the consignor.",
            "Receiver's Signature & Seal",
            "For Acme Steel Traders",
        ] {
            assert!(content.iter().any(|c| c == expected), "missing {expected:?}");
        }
        assert!(!content.iter().any(|c| c.starts_with("Amount in words")));
    }

    #[test]
    fn priced_challan_shows_values() {
        let mut dc = challan();
        dc.purpose = ChallanPurpose::Supply;
        dc.items = items();
        let layout = dc.build_layout().unwrap();
        let table = layout.first_table().unwrap();
        assert!(table.columns.iter().any(|c| c.header == "Amount"));
        assert_eq!(table.summary[0][1], "Total Quantity");
        assert!(table.summary.iter().any(|r| r[1] == "Grand Total (INR)"));

        let content = layout.text_content();
        assert!(content.iter().any(|c| c.starts_with("Amount in words")));
        assert!(!content.iter().any(|c| c.contains("to be returned")));
    }

    #[test]
    fn purpose_defaults_to_supply() {
        let json = serde_json::json!({
            "number": "DC-1",
            "date": "2025-06-01",
            "consignor": {"name": "A"},
            "consignee": {"name": "B"},
            "items": [{"description": "Crate", "quantity": 3}]
        });
        let dc: DeliveryChallan = serde_json::from_value(json).unwrap();
        assert_eq!(dc.purpose, ChallanPurpose::Supply);

        let json = serde_json::json!("sale_on_approval");
        let purpose: ChallanPurpose = serde_json::from_value(json).unwrap();
        assert_eq!(purpose.label(), "Sale on Approval");
    }

    #[test]
    fn missing_consignee_name_rejected() {
        let mut dc = challan();
        dc.consignee.name = String::new();
        let err = dc.build_layout().unwrap_err();
        assert!(err.to_string().contains("consignee.name"));
    }

    #[test]
    fn renders_pdf() {
        let bytes = render_pdf(&challan().build_layout().unwrap()).unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");
    }
}
