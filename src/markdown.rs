//! Markdown table rendering and number formatting for the report.

/// Render a Markdown pipe table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();

    out.push('|');
    for header in headers {
        out.push_str(&format!(" {} |", header));
    }
    out.push('\n');

    out.push('|');
    for _ in headers {
        out.push_str(" --- |");
    }
    out.push('\n');

    for row in rows {
        out.push('|');
        for i in 0..headers.len() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            out.push_str(&format!(" {} |", cell));
        }
        out.push('\n');
    }

    out
}

/// Format a number for a report cell: integral values lose the decimal
/// point, everything else keeps its natural form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Format a number with exactly two decimals.
pub fn format_fixed2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Format a monetary amount: two decimals, thousands separators.
pub fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
