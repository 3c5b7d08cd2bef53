use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::numbers::{format_number, parse_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "tn")]
    Ton,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "t")]
    MetricTon,
}

impl WeightUnit {
    pub const ALL: [WeightUnit; 6] = [
        WeightUnit::Pound,
        WeightUnit::Ounce,
        WeightUnit::Ton,
        WeightUnit::Kilogram,
        WeightUnit::Gram,
        WeightUnit::MetricTon,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Pound => "lb",
            Self::Ounce => "oz",
            Self::Ton => "tn",
            Self::Kilogram => "kg",
            Self::Gram => "g",
            Self::MetricTon => "t",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        match key.as_str() {
            "#" | "lbs" => Some(Self::Pound),
            _ => Self::ALL.into_iter().find(|unit| unit.key() == key),
        }
    }

    /// Tabletop conversions: 1 kg is 2 lb and both ton kinds are 2,000 lb.
    pub fn to_pounds(self, value: f64) -> f64 {
        match self {
            Self::Pound => value,
            Self::Ounce => value / 16.0,
            Self::Ton | Self::MetricTon => value * 2000.0,
            Self::Kilogram => value * 2.0,
            Self::Gram => value / 500.0,
        }
    }

    pub fn from_pounds(self, pounds: f64) -> f64 {
        match self {
            Self::Pound => pounds,
            Self::Ounce => pounds * 16.0,
            Self::Ton | Self::MetricTon => pounds / 2000.0,
            Self::Kilogram => pounds / 2.0,
            Self::Gram => pounds * 500.0,
        }
    }
}

/// A weight, stored in pounds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(pub f64);

impl Weight {
    pub fn from_pounds(pounds: f64) -> Self {
        Self(pounds)
    }

    pub fn pounds(self) -> f64 {
        self.0
    }

    /// Parses `<number> [unit]`; a missing unit means `default_unit`.
    pub fn parse(text: &str, default_unit: WeightUnit) -> Result<Self, ScriptError> {
        let (number, unit_text) = split_quantity(text);
        let value = parse_number(number)?;
        let unit = if unit_text.is_empty() {
            default_unit
        } else {
            WeightUnit::from_key(unit_text).ok_or_else(|| {
                ScriptError::parse(format!("\"{}\" is not a weight unit.", unit_text))
            })?
        };
        Ok(Self(unit.to_pounds(value)))
    }

    pub fn format(self, unit: WeightUnit) -> String {
        format!("{} {}", format_number(unit.from_pounds(self.0)), unit.key())
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(WeightUnit::Pound))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LengthUnit {
    #[default]
    #[serde(rename = "ft_in")]
    FeetAndInches,
    #[serde(rename = "in")]
    Inch,
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "yd")]
    Yard,
    #[serde(rename = "mi")]
    Mile,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "km")]
    Kilometer,
    #[serde(rename = "m")]
    Meter,
}

impl LengthUnit {
    pub const ALL: [LengthUnit; 8] = [
        LengthUnit::FeetAndInches,
        LengthUnit::Inch,
        LengthUnit::Feet,
        LengthUnit::Yard,
        LengthUnit::Mile,
        LengthUnit::Centimeter,
        LengthUnit::Kilometer,
        LengthUnit::Meter,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::FeetAndInches => "ft_in",
            Self::Inch => "in",
            Self::Feet => "ft",
            Self::Yard => "yd",
            Self::Mile => "mi",
            Self::Centimeter => "cm",
            Self::Kilometer => "km",
            Self::Meter => "m",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|unit| unit.key() == key)
    }

    /// Tabletop conversions: 1 m is 1 yd and 1 in is 2.5 cm.
    pub fn to_inches(self, value: f64) -> f64 {
        match self {
            Self::FeetAndInches | Self::Inch => value,
            Self::Feet => value * 12.0,
            Self::Yard | Self::Meter => value * 36.0,
            Self::Mile => value * 63_360.0,
            Self::Centimeter => value / 2.5,
            Self::Kilometer => value * 36_000.0,
        }
    }

    pub fn from_inches(self, inches: f64) -> f64 {
        match self {
            Self::FeetAndInches | Self::Inch => inches,
            Self::Feet => inches / 12.0,
            Self::Yard | Self::Meter => inches / 36.0,
            Self::Mile => inches / 63_360.0,
            Self::Centimeter => inches * 2.5,
            Self::Kilometer => inches / 36_000.0,
        }
    }
}

/// A length, stored in inches.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(pub f64);

impl Length {
    pub fn from_inches(inches: f64) -> Self {
        Self(inches)
    }

    pub fn inches(self) -> f64 {
        self.0
    }

    /// Parses `5'10"`, `6'`, `10"` or `<number> [unit]`; a missing unit means `default_unit`.
    pub fn parse(text: &str, default_unit: LengthUnit) -> Result<Self, ScriptError> {
        let trimmed = text.trim();
        if trimmed.contains('\'') || trimmed.contains('"') {
            let (feet_text, rest) = match trimmed.split_once('\'') {
                Some((feet, rest)) => (feet, rest),
                None => ("", trimmed),
            };
            let inches_text = rest.trim().trim_end_matches('"');
            let feet = if feet_text.trim().is_empty() {
                0.0
            } else {
                parse_number(feet_text)?
            };
            let inches = if inches_text.trim().is_empty() {
                0.0
            } else {
                parse_number(inches_text)?
            };
            return Ok(Self(feet * 12.0 + inches));
        }
        let (number, unit_text) = split_quantity(trimmed);
        let value = parse_number(number)?;
        let unit = if unit_text.is_empty() {
            default_unit
        } else {
            LengthUnit::from_key(unit_text).ok_or_else(|| {
                ScriptError::parse(format!("\"{}\" is not a length unit.", unit_text))
            })?
        };
        Ok(Self(unit.to_inches(value)))
    }

    pub fn format(self, unit: LengthUnit) -> String {
        match unit {
            LengthUnit::FeetAndInches => {
                let total = self.0;
                let feet = (total / 12.0).trunc();
                let inches = total - feet * 12.0;
                match (feet == 0.0, inches == 0.0) {
                    (true, _) => format!("{}\"", format_number(inches)),
                    (false, true) => format!("{}'", format_number(feet)),
                    (false, false) => format!("{}'{}\"", format_number(feet), format_number(inches)),
                }
            }
            _ => format!("{} {}", format_number(unit.from_inches(self.0)), unit.key()),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(LengthUnit::FeetAndInches))
    }
}

fn split_quantity(text: &str) -> (&str, &str) {
    let trimmed = text.trim();
    let split = trimmed
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || matches!(ch, '.' | ',' | '+' | '-' | ' ')))
        .map(|(index, _)| index)
        .unwrap_or(trimmed.len());
    (trimmed[..split].trim(), trimmed[split..].trim())
}

#[cfg(test)]
mod units_tests {
    use super::*;

    #[test]
    fn weight_parse_uses_default_unit_when_missing() {
        assert_eq!(
            Weight::parse("3", WeightUnit::Kilogram).expect("bare").pounds(),
            6.0
        );
        assert_eq!(
            Weight::parse("3 lb", WeightUnit::Kilogram).expect("lb").pounds(),
            3.0
        );
        assert_eq!(
            Weight::parse("8oz", WeightUnit::Pound).expect("oz").pounds(),
            0.5
        );
        assert_eq!(
            Weight::parse("1 tn", WeightUnit::Pound).expect("ton").pounds(),
            2000.0
        );
        assert!(Weight::parse("3 stone", WeightUnit::Pound).is_err());
        assert!(Weight::parse("heavy", WeightUnit::Pound).is_err());
    }

    #[test]
    fn weight_format_renders_unit_key() {
        assert_eq!(Weight::from_pounds(4.0).format(WeightUnit::Kilogram), "2 kg");
        assert_eq!(Weight::from_pounds(12.5).to_string(), "12.5 lb");
    }

    #[test]
    fn length_parse_handles_feet_and_inches() {
        assert_eq!(
            Length::parse("5'10\"", LengthUnit::Inch).expect("ft_in").inches(),
            70.0
        );
        assert_eq!(
            Length::parse("6'", LengthUnit::Inch).expect("feet only").inches(),
            72.0
        );
        assert_eq!(
            Length::parse("2 yd", LengthUnit::Inch).expect("yards").inches(),
            72.0
        );
        assert_eq!(
            Length::parse("25", LengthUnit::Centimeter).expect("cm").inches(),
            10.0
        );
        assert_eq!(Length::from_inches(70.0).to_string(), "5'10\"");
        assert_eq!(Length::from_inches(72.0).to_string(), "6'");
        assert_eq!(Length::from_inches(36.0).format(LengthUnit::Meter), "1 m");
    }
}
