//! Number formatting for report cells (en-US conventions)

/// Insert thousands separators into a string of digits
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

/// Group the integer part of an already-rounded decimal string
fn group_decimal(rounded: &str) -> String {
    match rounded.split_once('.') {
        Some((int, frac)) => format!("{}.{}", group_thousands(int), frac),
        None => group_thousands(rounded),
    }
}

/// `$#,##0.00`; negatives as `-$#,##0.00`; non-finite as `$0.00`
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }
    let body = group_decimal(&format!("{:.2}", value.abs()));
    if value < 0.0 && body != "0.00" {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

pub fn format_currency_opt(value: Option<f64>) -> String {
    format_currency(value.unwrap_or(0.0))
}

/// Grouped number with at most three fraction digits, trailing zeros dropped
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = format!("{:.3}", value.abs());
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    let body = group_decimal(trimmed);
    if value < 0.0 && body != "0" {
        format!("-{}", body)
    } else {
        body
    }
}

pub fn format_number_opt(value: Option<f64>) -> String {
    format_number(value.unwrap_or(0.0))
}

/// Fixed decimals, `0` for non-finite input
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return format!("{:.*}", decimals, 0.0);
    }
    format!("{:.*}", decimals, value)
}

/// Plain-word quantity for notes: "1 billion", "5 million", else grouped
pub fn describe_quantity(value: f64) -> String {
    const BILLION: f64 = 1e9;
    const MILLION: f64 = 1e6;

    if value >= BILLION && value % BILLION == 0.0 {
        format!("{} billion", format_number(value / BILLION))
    } else if value >= MILLION && value % MILLION == 0.0 {
        format!("{} million", format_number(value / MILLION))
    } else {
        format_number(value)
    }
}

/// Inverse of `format_currency` / `format_number` for cells read back
pub fn parse_formatted(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(5_000_000.0), "$5,000,000.00");
        assert_eq!(format_currency(1234.567), "$1,234.57");
        assert_eq!(format_currency(0.25), "$0.25");
        assert_eq!(format_currency(-16_389_772.0), "-$16,389,772.00");
        assert_eq!(format_currency(f64::NAN), "$0.00");
        assert_eq!(format_currency(f64::INFINITY), "$0.00");
    }

    #[test]
    fn test_number() {
        assert_eq!(format_number(1_000_000_000.0), "1,000,000,000");
        assert_eq!(format_number(483_330.000_000_000_06), "483,330");
        assert_eq!(format_number(333_333.0), "333,333");
        assert_eq!(format_number(12.3456), "12.346");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(f64::NAN), "0");
        assert_eq!(format_number(-4_500.5), "-4,500.5");
    }

    #[test]
    fn test_fixed() {
        assert_eq!(format_fixed(2.0, 4), "2.0000");
        assert_eq!(format_fixed(200.0, 2), "200.00");
        assert_eq!(format_fixed(f64::NAN, 2), "0.00");
    }

    #[test]
    fn test_describe_quantity() {
        assert_eq!(describe_quantity(1e9), "1 billion");
        assert_eq!(describe_quantity(5e6), "5 million");
        assert_eq!(describe_quantity(483_330.0), "483,330");
        assert_eq!(describe_quantity(2.5e9), "2,500 million");
    }

    #[test]
    fn test_parse_formatted() {
        assert_eq!(parse_formatted("$1,234.57"), Some(1234.57));
        assert_eq!(parse_formatted("-$16,389,772.00"), Some(-16_389_772.0));
        assert_eq!(parse_formatted("200.00%"), Some(200.0));
        assert_eq!(parse_formatted("Success"), None);
    }
}
