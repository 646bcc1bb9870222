//! Line and document totals.
//!
//! Every intermediate value is rounded to paise before it is summed, so
//! printed columns always add up to the printed totals.

use serde::Serialize;

use super::format::round2;
use super::model::LineItem;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTotals {
    pub amount: f64,
    pub discount: f64,
    pub taxable: f64,
    pub tax_percent: f64,
    pub tax: f64,
}

impl LineTotals {
    pub fn for_item(item: &LineItem) -> Self {
        let amount = round2(item.quantity * item.rate);
        let discount = round2(amount * item.discount_percent.unwrap_or(0.0) / 100.0);
        let taxable = round2(amount - discount);
        let tax_percent = item.tax_percent.unwrap_or(0.0);
        let tax = round2(taxable * tax_percent / 100.0);
        Self {
            amount,
            discount,
            taxable,
            tax_percent,
            tax,
        }
    }

    pub fn total(&self) -> f64 {
        round2(self.taxable + self.tax)
    }
}

/// How GST is reported: split between centre and state for intra-state
/// supply, integrated for inter-state supply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxSplit {
    Intra { cgst: f64, sgst: f64 },
    Inter { igst: f64 },
}

/// Taxable value and tax for one GST rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSummary {
    pub tax_percent: f64,
    pub taxable: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentTotals {
    pub lines: Vec<LineTotals>,
    pub subtotal: f64,
    pub discount: f64,
    pub taxable: f64,
    pub tax: f64,
    pub split: TaxSplit,
    pub by_rate: Vec<RateSummary>,
    pub round_off: f64,
    pub grand_total: f64,
    /// Quantity per unit, in first-appearance order.
    pub quantities: Vec<(String, f64)>,
}

/// Intra-state only when both states are known and match.
pub fn is_intra_state(seller_state: Option<&str>, buyer_state: Option<&str>) -> bool {
    match (seller_state, buyer_state) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    }
}

pub fn compute(
    items: &[LineItem],
    seller_state: Option<&str>,
    buyer_state: Option<&str>,
) -> DocumentTotals {
    let lines: Vec<LineTotals> = items.iter().map(LineTotals::for_item).collect();

    let subtotal = round2(lines.iter().map(|l| l.amount).sum());
    let discount = round2(lines.iter().map(|l| l.discount).sum());
    let taxable = round2(lines.iter().map(|l| l.taxable).sum());
    let tax = round2(lines.iter().map(|l| l.tax).sum());

    let split = if is_intra_state(seller_state, buyer_state) {
        let cgst = round2(tax / 2.0);
        TaxSplit::Intra {
            cgst,
            sgst: round2(tax - cgst),
        }
    } else {
        TaxSplit::Inter { igst: tax }
    };

    let mut by_rate: Vec<RateSummary> = Vec::new();
    for line in &lines {
        match by_rate.iter_mut().find(|r| r.tax_percent == line.tax_percent) {
            Some(r) => {
                r.taxable = round2(r.taxable + line.taxable);
                r.tax = round2(r.tax + line.tax);
            }
            None => by_rate.push(RateSummary {
                tax_percent: line.tax_percent,
                taxable: line.taxable,
                tax: line.tax,
            }),
        }
    }

    let mut quantities: Vec<(String, f64)> = Vec::new();
    for item in items {
        match quantities.iter_mut().find(|(unit, _)| unit == &item.unit) {
            Some((_, qty)) => *qty += item.quantity,
            None => quantities.push((item.unit.clone(), item.quantity)),
        }
    }

    let unrounded = round2(taxable + tax);
    let grand_total = unrounded.round();
    let round_off = round2(grand_total - unrounded);

    DocumentTotals {
        lines,
        subtotal,
        discount,
        taxable,
        tax,
        split,
        by_rate,
        round_off,
        grand_total,
        quantities,
    }
}
