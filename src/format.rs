//! Display formatting shared by the rendered views
//!
//! Numbers follow the `es-CO` convention: `.` groups thousands, `,` separates
//! decimals, at most two fraction digits.

use chrono::{DateTime, Utc};

pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let cents = (value.abs() * 100.0).round() as u64;
    let (whole, fraction) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    if value < 0.0 && cents > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }

    if fraction > 0 {
        let fraction = format!("{:02}", fraction);
        out.push(',');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

/// `$` followed by [`format_number`]
pub fn format_money(value: f64) -> String {
    format!("${}", format_number(value))
}

/// `dd/mm/yyyy HH:MM`, or `-` when there is no date
pub fn format_date(value: Option<&DateTime<Utc>>) -> String {
    match value {
        Some(date) => date.format("%d/%m/%Y %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// Text or `-` for missing and blank values
pub fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => escape_html(text),
        _ => "-".to_string(),
    }
}

/// Cuts `text` to `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
