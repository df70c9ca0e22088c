//! Text helpers for document rendering.

use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::models::Currency;

/// Width, in characters, of the rendered document.
pub const PAGE_WIDTH: usize = 85;

/// Formats an amount with its currency symbol, thousands separators and two
/// decimals, e.g. `₡1,234,567.50` or `-$12.00`.
pub fn format_money(
    amount: Decimal,
    currency: Currency,
) -> String {
    let rounded = round_half_up(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    format!(
        "{sign}{}{}.{frac_part}",
        currency.symbol(),
        group_thousands(int_part)
    )
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a rate without trailing zeros, e.g. `13%` or `0.5%`.
pub fn format_percent(rate: Decimal) -> String {
    format!("{}%", rate.normalize())
}

/// Trims `text` and cuts it to at most `max_chars` characters, ending in
/// `...` when shortened.
pub fn truncate_text(
    text: &str,
    max_chars: usize,
) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Greedy word wrap. Blank input lines are kept as empty lines and words
/// longer than `width` are split.
pub fn wrap_text(
    text: &str,
    width: usize,
) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }

            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }
        if current_len > 0 {
            lines.push(current);
        }
    }

    lines
}

/// Places `left` and `right` on one line of `width` characters.
pub fn justify(
    left: &str,
    right: &str,
    width: usize,
) -> String {
    let used = left.chars().count() + right.chars().count();
    let gap = width.saturating_sub(used).max(1);
    format!("{left}{}{right}", " ".repeat(gap))
}
