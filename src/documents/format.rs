//! Money, quantity, and date formatting for printed documents.
//!
//! Amounts use Indian digit grouping (`12,34,567.89`) and the Indian
//! numbering system for words (thousand, lakh, crore).

use chrono::NaiveDate;

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen",
    "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

/// Round to 2 decimal places, half away from zero.
///
/// The nudge keeps values like `1.005` (stored as 1.00499…) rounding up.
pub fn round2(value: f64) -> f64 {
    let nudge = value.signum() * 1e-9;
    ((value * 100.0) + nudge).round() / 100.0
}

fn to_paise(amount: f64) -> u64 {
    (round2(amount.abs()) * 100.0).round() as u64
}

/// Group digits the Indian way: last three, then pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// `1234567.891` → `12,34,567.89`
pub fn format_inr(amount: f64) -> String {
    let paise_total = to_paise(amount);
    let sign = if amount < 0.0 && paise_total > 0 { "-" } else { "" };
    let rupees = paise_total / 100;
    let paise = paise_total % 100;
    format!("{sign}{}.{paise:02}", group_indian(&rupees.to_string()))
}

/// Quantities print without trailing zeros: `10`, `2.5`, `0.125`.
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        return format!("{quantity:.0}");
    }
    let fixed = format!("{quantity:.3}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Percentages as entered: `18%`, `2.5%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_quantity(value))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

fn two_digit_words(n: u64) -> String {
    debug_assert!(n < 100);
    if n < 20 {
        ONES[n as usize].to_string()
    } else {
        let tens = TENS[(n / 10) as usize];
        match n % 10 {
            0 => tens.to_string(),
            unit => format!("{tens} {}", ONES[unit as usize]),
        }
    }
}

fn three_digit_words(n: u64) -> String {
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, r) => two_digit_words(r),
        (h, 0) => format!("{} Hundred", ONES[h as usize]),
        (h, r) => format!("{} Hundred {}", ONES[h as usize], two_digit_words(r)),
    }
}

/// Whole number in words, Indian system. Amounts beyond 99 crore
/// repeat the crore unit (`One Hundred Crore`).
pub fn number_in_words(n: u64) -> String {
    if n == 0 {
        return "Zero".to_string();
    }
    let crore = n / 10_000_000;
    let rest = n % 10_000_000;
    let lakh = rest / 100_000;
    let thousand = (rest % 100_000) / 1_000;
    let hundreds = rest % 1_000;

    let mut parts = Vec::new();
    if crore > 0 {
        parts.push(format!("{} Crore", number_in_words(crore)));
    }
    if lakh > 0 {
        parts.push(format!("{} Lakh", two_digit_words(lakh)));
    }
    if thousand > 0 {
        parts.push(format!("{} Thousand", two_digit_words(thousand)));
    }
    if hundreds > 0 {
        parts.push(three_digit_words(hundreds));
    }
    parts.join(" ")
}

/// `120000.5` → `Rupees One Lakh Twenty Thousand and Fifty Paise Only`
pub fn amount_in_words(amount: f64) -> String {
    let paise_total = to_paise(amount);
    let rupees = paise_total / 100;
    let paise = paise_total % 100;
    let sign = if amount < 0.0 && paise_total > 0 { "Minus " } else { "" };

    let mut words = format!("{sign}Rupees {}", number_in_words(rupees));
    if paise > 0 {
        words.push_str(&format!(" and {} Paise", two_digit_words(paise)));
    }
    words.push_str(" Only");
    words
}
