use crate::error::ScriptError;

/// Decimal places kept when rendering numbers, matching the sheet's fixed-point precision.
pub const NUMBER_PRECISION: i32 = 4;

pub fn round_to_precision(value: f64) -> f64 {
    let scale = 10f64.powi(NUMBER_PRECISION);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = round_to_precision(value);
    if rounded.fract() == 0.0 && rounded.abs() < 9.0e15 {
        return (rounded as i64).to_string();
    }
    let text = format!("{:.*}", NUMBER_PRECISION as usize, rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_signed(value: f64) -> String {
    let text = format_number(value);
    if text.starts_with('-') {
        text
    } else {
        format!("+{}", text)
    }
}

pub fn format_comma(value: f64) -> String {
    let text = format_number(value);
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (whole, fraction) = match rest.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (rest, None),
    };
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, ch) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn format_comma_signed(value: f64) -> String {
    let text = format_comma(value);
    if text.starts_with('-') {
        text
    } else {
        format!("+{}", text)
    }
}

/// Parses a plain decimal literal (`12`, `-3.5`, `+0.25`, `1,000`). Anything else, including
/// exponents and non-finite spellings, is rejected.
pub fn parse_number(text: &str) -> Result<f64, ScriptError> {
    let trimmed = text.trim();
    let cleaned = trimmed.replace(',', "");
    let digits = cleaned
        .strip_prefix('-')
        .or_else(|| cleaned.strip_prefix('+'))
        .unwrap_or(&cleaned);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for ch in digits.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => {
                return Err(ScriptError::parse(format!(
                    "\"{}\" is not a number.",
                    trimmed
                )))
            }
        }
    }
    if !seen_digit {
        return Err(ScriptError::parse(format!(
            "\"{}\" is not a number.",
            trimmed
        )));
    }
    cleaned
        .parse::<f64>()
        .map_err(|error| ScriptError::parse(format!("\"{}\": {}", trimmed, error)))
}

#[cfg(test)]
mod numbers_tests {
    use super::*;

    #[test]
    fn format_number_trims_to_fixed_precision() {
        assert_eq!(format_number(24.0), "24");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333");
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(-7.25), "-7.25");
    }

    #[test]
    fn signed_and_comma_forms() {
        assert_eq!(format_signed(3.0), "+3");
        assert_eq!(format_signed(0.0), "+0");
        assert_eq!(format_signed(-2.5), "-2.5");
        assert_eq!(format_comma(1234567.5), "1,234,567.5");
        assert_eq!(format_comma(-1000.0), "-1,000");
        assert_eq!(format_comma(999.0), "999");
        assert_eq!(format_comma_signed(12000.0), "+12,000");
    }

    #[test]
    fn parse_number_accepts_plain_literals_only() {
        assert_eq!(parse_number(" 42 ").expect("int"), 42.0);
        assert_eq!(parse_number("-3.5").expect("negative"), -3.5);
        assert_eq!(parse_number("+.25").expect("leading dot"), 0.25);
        assert_eq!(parse_number("1,000").expect("commas"), 1000.0);
        assert!(parse_number("").is_err());
        assert!(parse_number("1e5").is_err());
        assert!(parse_number("NaN").is_err());
        assert!(parse_number("$st").is_err());
        assert!(parse_number("1.2.3").is_err());
    }
}
