use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// A dice expression of the form `[count]d[sides][±modifier][x multiplier]`. Six-sided dice
/// omit the side count when rendered (`2d+1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub count: i64,
    pub sides: i64,
    pub modifier: i64,
    pub multiplier: i64,
}

impl Default for Dice {
    fn default() -> Self {
        Self {
            count: 1,
            sides: 6,
            modifier: 0,
            multiplier: 1,
        }
    }
}

impl Dice {
    pub fn new(count: i64, modifier: i64) -> Self {
        Self {
            count,
            modifier,
            ..Self::default()
        }
    }

    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let cleaned: String = text
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if cleaned.is_empty() {
            return Err(ScriptError::parse("Dice expression is empty."));
        }
        let invalid = || ScriptError::parse(format!("\"{}\" is not a dice expression.", text.trim()));

        let (body, multiplier) = match cleaned.find(['x', '*']) {
            Some(index) => {
                let multiplier = cleaned[index + 1..]
                    .parse::<i64>()
                    .map_err(|_| invalid())?;
                (&cleaned[..index], multiplier)
            }
            None => (cleaned.as_str(), 1),
        };

        let Some(d_index) = body.find('d') else {
            let modifier = body.parse::<i64>().map_err(|_| invalid())?;
            return Ok(Self {
                count: 0,
                sides: 6,
                modifier,
                multiplier,
            });
        };

        let count_text = &body[..d_index];
        let count = if count_text.is_empty() {
            1
        } else {
            count_text.parse::<i64>().map_err(|_| invalid())?
        };
        let rest = &body[d_index + 1..];
        let modifier_index = rest.find(['+', '-']).unwrap_or(rest.len());
        let sides_text = &rest[..modifier_index];
        let sides = if sides_text.is_empty() {
            6
        } else {
            sides_text.parse::<i64>().map_err(|_| invalid())?
        };
        let modifier_text = &rest[modifier_index..];
        let modifier = if modifier_text.is_empty() {
            0
        } else {
            modifier_text
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|_| invalid())?
        };
        if count < 0 || sides < 1 {
            return Err(invalid());
        }
        Ok(Self {
            count,
            sides,
            modifier,
            multiplier,
        })
    }

    pub fn minimum(&self) -> i64 {
        (self.count + self.modifier) * self.multiplier
    }

    pub fn maximum(&self) -> i64 {
        (self.count * self.sides + self.modifier) * self.multiplier
    }

    pub fn average(&self) -> f64 {
        (self.count as f64 * (self.sides as f64 + 1.0) / 2.0 + self.modifier as f64)
            * self.multiplier as f64
    }

    /// Rolls the dice; `next` must return a value in `0..bound`.
    pub fn roll(&self, next: &mut dyn FnMut(u32) -> u32) -> i64 {
        let sides = self.sides.clamp(1, u32::MAX as i64) as u32;
        let mut total = 0i64;
        for _ in 0..self.count {
            total += i64::from(next(sides)) + 1;
        }
        (total + self.modifier) * self.multiplier
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count > 0 {
            write!(f, "{}d", self.count)?;
            if self.sides != 6 {
                write!(f, "{}", self.sides)?;
            }
            if self.modifier > 0 {
                write!(f, "+{}", self.modifier)?;
            } else if self.modifier < 0 {
                write!(f, "{}", self.modifier)?;
            }
        } else {
            write!(f, "{}", self.modifier)?;
        }
        if self.multiplier != 1 {
            write!(f, "x{}", self.multiplier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod dice_tests {
    use super::*;

    #[test]
    fn parse_reads_all_parts() {
        let dice = Dice::parse("3d6+2x2").expect("full form");
        assert_eq!(
            dice,
            Dice {
                count: 3,
                sides: 6,
                modifier: 2,
                multiplier: 2
            }
        );
        assert_eq!(Dice::parse("d").expect("bare d"), Dice::default());
        assert_eq!(Dice::parse("2d8-1").expect("d8").sides, 8);
        assert_eq!(Dice::parse("5").expect("flat").minimum(), 5);
        assert!(Dice::parse("").is_err());
        assert!(Dice::parse("xd").is_err());
    }

    #[test]
    fn bounds_and_display() {
        let dice = Dice::parse("2d+1").expect("2d+1");
        assert_eq!(dice.minimum(), 3);
        assert_eq!(dice.maximum(), 13);
        assert_eq!(dice.average(), 8.0);
        assert_eq!(dice.to_string(), "2d+1");
        assert_eq!(Dice::parse("1d8-2x3").expect("d8").to_string(), "1d8-2x3");
    }

    #[test]
    fn roll_uses_supplied_source() {
        let dice = Dice::parse("3d").expect("3d");
        let mut source = |bound: u32| bound - 1;
        assert_eq!(dice.roll(&mut source), 18);
        let mut low = |_bound: u32| 0;
        assert_eq!(dice.roll(&mut low), 3);
    }
}
