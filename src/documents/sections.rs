//! Building blocks shared by the document layouts: headers, party
//! columns, item tables with totals, terms, and signature lines.

use super::format::{amount_in_words, format_inr, format_percent, format_quantity, round2};
use super::layout::{Align, Block, Column, Table, Text, SMALL_SIZE};
use super::model::{LineItem, Party};
use super::totals::{DocumentTotals, TaxSplit};

/// Document number, dates and similar facts, split over two columns.
/// Pairs with an empty value are skipped.
pub fn header_fields(pairs: Vec<(&str, Option<String>)>) -> Block {
    let present: Vec<(String, String)> = pairs
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| (label.to_string(), v))
        })
        .collect();
    let split = present.len().div_ceil(2);
    let (left, right) = present.split_at(split);
    Block::Columns(vec![
        vec![Block::KeyValues(left.to_vec())],
        vec![Block::KeyValues(right.to_vec())],
    ])
}

/// Heading, name, then address and contact lines.
pub fn party_column(heading: &str, party: &Party) -> Vec<Block> {
    let mut blocks = vec![
        Block::Text(Text::plain(heading).size(SMALL_SIZE)),
        Block::Text(Text::bold(party.name.as_str())),
    ];
    blocks.extend(
        party
            .detail_lines()
            .into_iter()
            .map(|line| Block::Text(Text::plain(line))),
    );
    blocks
}

pub fn party_columns(parties: &[(&str, &Party)]) -> Block {
    Block::Columns(
        parties
            .iter()
            .map(|(heading, party)| party_column(heading, party))
            .collect(),
    )
}

const DESCRIPTION: usize = 1;
const QUANTITY: usize = 3;
const UNIT: usize = 4;

fn item_columns(with_values: bool) -> Vec<Column> {
    let mut columns = vec![
        Column::new("#", 0.5, Align::Right),
        Column::new("Description", 4.0, Align::Left),
        Column::new("HSN/SAC", 1.3, Align::Left),
        Column::new("Qty", 1.0, Align::Right),
        Column::new("Unit", 0.9, Align::Left),
    ];
    if with_values {
        columns.extend([
            Column::new("Rate", 1.4, Align::Right),
            Column::new("Disc.", 0.9, Align::Right),
            Column::new("Tax", 0.9, Align::Right),
            Column::new("Amount", 2.0, Align::Right),
        ]);
    }
    columns
}

/// Item table. With values, each row carries rate, discount, tax rate
/// and the taxable amount; totals rows are added by [`push_totals`].
pub fn item_table(items: &[LineItem], totals: &DocumentTotals, with_values: bool) -> Table {
    let mut table = Table::new(item_columns(with_values));
    for (i, (item, line)) in items.iter().zip(&totals.lines).enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            item.description.clone(),
            item.hsn.clone().unwrap_or_default(),
            format_quantity(item.quantity),
            item.unit.clone(),
        ];
        if with_values {
            row.extend([
                format_inr(item.rate),
                item.discount_percent.map(format_percent).unwrap_or_default(),
                item.tax_percent.map(format_percent).unwrap_or_default(),
                format_inr(line.taxable),
            ]);
        }
        table.rows.push(row);
    }
    table
}

fn summary_row(width: usize, label: &str, value: String) -> Vec<String> {
    let mut row = vec![String::new(); width];
    row[DESCRIPTION] = label.to_string();
    if let Some(last) = row.last_mut() {
        *last = value;
    }
    row
}

/// `CGST @ 9%` when every line shares one rate, plain `CGST` otherwise.
fn tax_label(name: &str, totals: &DocumentTotals, share: f64) -> String {
    match totals.by_rate.as_slice() {
        [only] => format!("{name} @ {}", format_percent(only.tax_percent * share)),
        _ => name.to_string(),
    }
}

/// Subtotal, discount, taxable value, GST, round off and grand total.
pub fn push_totals(table: &mut Table, totals: &DocumentTotals) {
    let width = table.columns.len();
    table.summary.push(summary_row(width, "Sub Total", format_inr(totals.subtotal)));
    if totals.discount > 0.0 {
        table
            .summary
            .push(summary_row(width, "Less: Discount", format!("-{}", format_inr(totals.discount))));
        table
            .summary
            .push(summary_row(width, "Taxable Value", format_inr(totals.taxable)));
    }
    match totals.split {
        TaxSplit::Intra { cgst, sgst } if totals.tax > 0.0 => {
            table.summary.push(summary_row(width, &tax_label("CGST", totals, 0.5), format_inr(cgst)));
            table.summary.push(summary_row(width, &tax_label("SGST", totals, 0.5), format_inr(sgst)));
        }
        TaxSplit::Inter { igst } if totals.tax > 0.0 => {
            table.summary.push(summary_row(width, &tax_label("IGST", totals, 1.0), format_inr(igst)));
        }
        _ => {}
    }
    if totals.round_off != 0.0 {
        table
            .summary
            .push(summary_row(width, "Round Off", format_inr(totals.round_off)));
    }
    table
        .summary
        .push(summary_row(width, "Grand Total (INR)", format_inr(totals.grand_total)));
}

/// One `Total Quantity` row per unit, quantity and unit in their columns.
pub fn push_quantity_totals(table: &mut Table, totals: &DocumentTotals) {
    let width = table.columns.len();
    for (unit, quantity) in &totals.quantities {
        let mut row = vec![String::new(); width];
        row[DESCRIPTION] = "Total Quantity".to_string();
        row[QUANTITY] = format_quantity(*quantity);
        row[UNIT] = unit.clone();
        table.summary.push(row);
    }
}

/// GST by rate: taxable value and the tax split for each rate.
pub fn tax_summary_table(totals: &DocumentTotals) -> Table {
    let intra = matches!(totals.split, TaxSplit::Intra { .. });
    let mut columns = vec![
        Column::new("Tax Rate", 1.0, Align::Left),
        Column::new("Taxable Value", 1.5, Align::Right),
    ];
    if intra {
        columns.push(Column::new("CGST", 1.2, Align::Right));
        columns.push(Column::new("SGST", 1.2, Align::Right));
    } else {
        columns.push(Column::new("IGST", 1.2, Align::Right));
    }
    columns.push(Column::new("Total Tax", 1.2, Align::Right));

    let mut table = Table::new(columns);
    for rate in &totals.by_rate {
        let mut row = vec![format_percent(rate.tax_percent), format_inr(rate.taxable)];
        if intra {
            let cgst = round2(rate.tax / 2.0);
            row.push(format_inr(cgst));
            row.push(format_inr(round2(rate.tax - cgst)));
        } else {
            row.push(format_inr(rate.tax));
        }
        row.push(format_inr(rate.tax));
        table.rows.push(row);
    }
    table
}

pub fn amount_in_words_line(amount: f64) -> Block {
    Block::Text(Text::bold(format!("Amount in words: {}", amount_in_words(amount))))
}

/// Numbered list under a heading. Empty when there is nothing to list.
pub fn numbered_list(heading: &str, entries: &[String]) -> Vec<Block> {
    let entries: Vec<&String> = entries.iter().filter(|e| !e.trim().is_empty()).collect();
    if entries.is_empty() {
        return Vec::new();
    }
    let mut blocks = vec![Block::Spacer(2.0), Block::Text(Text::heading(heading))];
    blocks.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| Block::Text(Text::plain(format!("{}. {}", i + 1, entry.trim())))),
    );
    blocks
}

/// Free-text note under a bold label.
pub fn note(label: &str, text: Option<&str>) -> Vec<Block> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => vec![
            Block::Spacer(2.0),
            Block::Text(Text::bold(label)),
            Block::Text(Text::plain(t)),
        ],
        _ => Vec::new(),
    }
}

/// Right-hand signature block: `For <company>`, space to sign, caption.
pub fn signature(company: &str, caption: &str) -> Vec<Block> {
    vec![
        Block::Text(Text::bold(format!("For {company}")).align(Align::Right)),
        Block::Spacer(12.0),
        Block::Text(Text::plain(caption).align(Align::Right)),
    ]
}

pub fn signatory(company: &str) -> Block {
    Block::Columns(vec![Vec::new(), signature(company, "Authorised Signatory")])
}

pub fn computer_generated(kind: &str) -> String {
    format!("This is a computer generated {kind}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::model::fixtures::{items, party};
    use crate::documents::totals::compute;

    #[test]
    fn header_fields_skip_missing_values() {
        let block = header_fields(vec![
            ("PO No.", Some("PO-7".into())),
            ("Date", Some("01-04-2026".into())),
            ("Delivery Date", None),
            ("Payment Terms", Some("  ".into())),
        ]);
        let Block::Columns(cols) = block else {
            panic!("expected columns");
        };
        assert_eq!(cols[0], vec![Block::KeyValues(vec![("PO No.".into(), "PO-7".into())])]);
        assert_eq!(cols[1], vec![Block::KeyValues(vec![("Date".into(), "01-04-2026".into())])]);
    }

    #[test]
    fn item_rows_show_taxable_amount() {
        let list = items();
        let totals = compute(&list, None, None);
        let table = item_table(&list, &totals, true);
        assert_eq!(table.columns.len(), 9);
        assert_eq!(table.rows[1][0], "2");
        assert_eq!(table.rows[1][6], "5%");
        assert_eq!(table.rows[1][8], "3,443.75");
    }

    #[test]
    fn quantity_only_table_has_no_value_columns() {
        let list = items();
        let totals = compute(&list, None, None);
        let mut table = item_table(&list, &totals, false);
        push_quantity_totals(&mut table, &totals);
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.summary, vec![vec![
            String::new(),
            "Total Quantity".to_string(),
            String::new(),
            "620".to_string(),
            "Nos".to_string(),
        ]]);
    }

    #[test]
    fn intra_state_totals_show_cgst_and_sgst() {
        let list = items();
        let totals = compute(&list, Some("Maharashtra"), Some("Maharashtra"));
        let mut table = item_table(&list, &totals, true);
        push_totals(&mut table, &totals);

        let labels: Vec<&str> = table.summary.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Sub Total",
                "Less: Discount",
                "Taxable Value",
                "CGST @ 9%",
                "SGST @ 9%",
                "Round Off",
                "Grand Total (INR)"
            ]
        );
        assert_eq!(table.summary[6][8], "13,763.00");
        assert_eq!(table.summary[5][8], "-0.23");
    }

    #[test]
    fn inter_state_totals_show_igst() {
        let list = items();
        let totals = compute(&list, Some("Maharashtra"), Some("Gujarat"));
        let mut table = item_table(&list, &totals, true);
        push_totals(&mut table, &totals);
        assert!(table.summary.iter().any(|r| r[1] == "IGST @ 18%" && r[8] == "2,099.48"));
        assert!(!table.summary.iter().any(|r| r[1].starts_with("CGST")));
    }

    #[test]
    fn tax_summary_per_rate() {
        let mut list = items();
        list.push(LineItem::new("Paint", 2.0, 450.0).with_tax(28.0));
        let totals = compute(&list, Some("Goa"), Some("Goa"));
        let table = tax_summary_table(&totals);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["28%", "900.00", "126.00", "126.00", "252.00"]);
    }

    #[test]
    fn empty_lists_produce_nothing() {
        assert!(numbered_list("Terms", &[]).is_empty());
        assert!(numbered_list("Terms", &["  ".into()]).is_empty());
        assert!(note("Notes", Some("")).is_empty());
        assert_eq!(numbered_list("Terms", &["Net 30".into()]).len(), 3);
    }

    #[test]
    fn party_column_lists_details() {
        let blocks = party_column("Supplier", &party("Acme Steel", "Gujarat"));
        assert_eq!(blocks[1], Block::Text(Text::bold("Acme Steel")));
        assert!(blocks.contains(&Block::Text(Text::plain("State: Gujarat"))));
    }
}
