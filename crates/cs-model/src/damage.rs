use cs_core::Dice;

/// Thrusting damage for a given strength.
pub fn thrust_for(st: i64) -> Dice {
    if st < 19 {
        return Dice::new(1, -(6 - (st - 1) / 2));
    }
    let mut value = st - 11;
    if st > 50 {
        value -= 1;
        if st > 79 {
            value -= 1 + (st - 80) / 5;
        }
    }
    Dice::new(value / 8 + 1, value % 8 / 2 - 1)
}

/// Swinging damage for a given strength.
pub fn swing_for(st: i64) -> Dice {
    if st < 10 {
        return Dice::new(1, -(5 - (st - 1) / 2));
    }
    if st < 28 {
        let value = st - 9;
        return Dice::new(value / 4 + 1, value % 4 - 1);
    }
    let mut value = st;
    if st > 40 {
        value -= (st - 40) / 5;
    }
    if st > 59 {
        value += 1;
    }
    value += 9;
    Dice::new(value / 8 + 1, value % 8 / 2 - 1)
}

/// Folds every full +4 of adds into an extra die.
pub fn convert_modifiers_to_dice(dice: Dice) -> Dice {
    let mut converted = dice;
    if converted.count > 0 {
        while converted.modifier >= 4 {
            converted.count += 1;
            converted.modifier -= 4;
        }
    }
    converted
}

/// Adds `extra` (dice or bare adds) to `base`.
pub fn combine(base: Dice, extra: Dice) -> Dice {
    Dice {
        count: base.count + extra.count,
        sides: if base.count > 0 { base.sides } else { extra.sides },
        modifier: base.modifier + extra.modifier,
        multiplier: base.multiplier * extra.multiplier,
    }
}

#[cfg(test)]
mod damage_tests {
    use super::*;

    #[test]
    fn thrust_follows_the_strength_table() {
        assert_eq!(thrust_for(10).to_string(), "1d-2");
        assert_eq!(thrust_for(12).to_string(), "1d-1");
        assert_eq!(thrust_for(18).to_string(), "1d+2");
        assert_eq!(thrust_for(19).to_string(), "2d-1");
        assert_eq!(thrust_for(27).to_string(), "3d-1");
        assert_eq!(thrust_for(1).to_string(), "1d-6");
    }

    #[test]
    fn swing_follows_the_strength_table() {
        assert_eq!(swing_for(10).to_string(), "1d");
        assert_eq!(swing_for(12).to_string(), "1d+2");
        assert_eq!(swing_for(13).to_string(), "2d-1");
        assert_eq!(swing_for(9).to_string(), "1d-1");
        assert_eq!(swing_for(27).to_string(), "5d+1");
        assert_eq!(swing_for(28).to_string(), "5d+1");
    }

    #[test]
    fn adds_fold_into_dice() {
        let dice = combine(swing_for(12), Dice::new(0, 3));
        assert_eq!(dice.to_string(), "1d+5");
        assert_eq!(convert_modifiers_to_dice(dice).to_string(), "2d+1");
        assert_eq!(convert_modifiers_to_dice(Dice::new(0, 7)).to_string(), "7");
    }
}
