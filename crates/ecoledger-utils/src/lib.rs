//! Utility functions and helpers

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let grouped: String = result.chars().rev().collect();
    format!("{}{}", sign, grouped)
}

/// Format an amount with a fixed number of decimals and grouped integer part
pub fn format_amount(amount: Decimal, decimal_places: u32) -> String {
    let rounded = amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", decimal_places as usize, rounded);
    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", format_number(int_part), frac),
        None => format_number(text),
    }
}

/// Format an amount prefixed with a currency symbol
pub fn format_currency(amount: Decimal, symbol: &str, decimal_places: u32) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-{}{}", symbol, format_amount(amount.abs(), decimal_places))
    } else {
        format!("{}{}", symbol, format_amount(amount, decimal_places))
    }
}

/// Escape text for inclusion in HTML
pub fn escape_html(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Generate a record id for local-only storage: millisecond timestamp plus a random suffix
pub fn generate_local_id() -> String {
    let now = Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", now, &suffix[..9])
}
