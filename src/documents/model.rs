//! Input records shared by all document builders.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::DocumentError;

/// 2-digit state code, PAN (5 letters, 4 digits, 1 letter), entity
/// number, the literal `Z`, and a check character.
static GSTIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").unwrap()
});

/// A company or person appearing on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    /// State name, used to decide between CGST+SGST and IGST.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Party {
    pub fn validate(&self, field: &str) -> Result<(), DocumentError> {
        require_text(&format!("{field}.name"), &self.name)?;
        if let Some(gstin) = &self.gstin {
            validate_gstin(&format!("{field}.gstin"), gstin)?;
        }
        Ok(())
    }

    /// Address and contact lines, in print order.
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .address_lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .cloned()
            .collect();
        if let Some(state) = &self.state {
            lines.push(format!("State: {state}"));
        }
        if let Some(gstin) = &self.gstin {
            lines.push(format!("GSTIN: {gstin}"));
        }
        if let Some(phone) = &self.phone {
            lines.push(format!("Phone: {phone}"));
        }
        if let Some(email) = &self.email {
            lines.push(format!("Email: {email}"));
        }
        lines
    }
}

fn default_unit() -> String {
    "Nos".to_string()
}

/// One row of an item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default)]
    pub hsn: Option<String>,
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub discount_percent: Option<f64>,
    #[serde(default)]
    pub tax_percent: Option<f64>,
}

impl LineItem {
    pub fn new(description: &str, quantity: f64, rate: f64) -> Self {
        Self {
            description: description.to_string(),
            hsn: None,
            quantity,
            unit: default_unit(),
            rate,
            discount_percent: None,
            tax_percent: None,
        }
    }

    pub fn with_tax(mut self, percent: f64) -> Self {
        self.tax_percent = Some(percent);
        self
    }

    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    pub fn validate(&self, field: &str) -> Result<(), DocumentError> {
        require_text(&format!("{field}.description"), &self.description)?;
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(DocumentError::invalid(
                format!("{field}.quantity"),
                format!("must be greater than zero, got {}", self.quantity),
            ));
        }
        if !fits_print_precision(self.quantity) {
            return Err(DocumentError::invalid(
                format!("{field}.quantity"),
                format!("at most 3 decimal places are printed, got {}", self.quantity),
            ));
        }
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(DocumentError::invalid(
                format!("{field}.rate"),
                format!("must not be negative, got {}", self.rate),
            ));
        }
        validate_percent(&format!("{field}.discount_percent"), self.discount_percent)?;
        validate_percent(&format!("{field}.tax_percent"), self.tax_percent)?;
        Ok(())
    }
}

/// Remittance details printed on invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_name: String,
    pub account_number: String,
    pub bank_name: String,
    pub ifsc: String,
    #[serde(default)]
    pub branch: Option<String>,
}

impl BankDetails {
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Account Name".to_string(), self.account_name.clone()),
            ("Account No.".to_string(), self.account_number.clone()),
            ("Bank".to_string(), self.bank_name.clone()),
            ("IFSC".to_string(), self.ifsc.clone()),
        ];
        if let Some(branch) = &self.branch {
            rows.push(("Branch".to_string(), branch.clone()));
        }
        rows
    }
}

pub fn require_text(field: &str, value: &str) -> Result<(), DocumentError> {
    if value.trim().is_empty() {
        return Err(DocumentError::invalid(field, "is required"));
    }
    Ok(())
}

pub fn validate_gstin(field: &str, value: &str) -> Result<(), DocumentError> {
    if !GSTIN_PATTERN.is_match(value.trim()) {
        return Err(DocumentError::invalid(field, format!("{value} is not a valid GSTIN")));
    }
    Ok(())
}

fn validate_percent(field: &str, value: Option<f64>) -> Result<(), DocumentError> {
    match value {
        Some(p) if !p.is_finite() || !(0.0..=100.0).contains(&p) => Err(DocumentError::invalid(
            field,
            format!("must be between 0 and 100, got {p}"),
        )),
        Some(p) if !fits_print_precision(p) => Err(DocumentError::invalid(
            field,
            format!("at most 3 decimal places are printed, got {p}"),
        )),
        _ => Ok(()),
    }
}

/// Quantities and percentages print with up to 3 decimals.
fn fits_print_precision(value: f64) -> bool {
    let scaled = value * 1000.0;
    (scaled - scaled.round()).abs() <= 1e-6 * scaled.abs().max(1.0)
}

/// Every document needs at least one valid line item.
pub fn validate_items(items: &[LineItem]) -> Result<(), DocumentError> {
    if items.is_empty() {
        return Err(DocumentError::invalid("items", "at least one line item is required"));
    }
    for (i, item) in items.iter().enumerate() {
        item.validate(&format!("items[{i}]"))?;
    }
    Ok(())
}
