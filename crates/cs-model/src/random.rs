use cs_runtime::ScriptRng;

/// Build-related traits that shift a random weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildTraits {
    pub skinny: bool,
    pub overweight: bool,
    pub fat: bool,
    pub very_fat: bool,
}

impl BuildTraits {
    fn shift(self) -> i64 {
        if self.skinny {
            -1
        } else if self.very_fat {
            3
        } else if self.fat {
            2
        } else if self.overweight {
            1
        } else {
            0
        }
    }
}

fn below(rng: &ScriptRng, bound: i64) -> i64 {
    if bound <= 0 {
        return 0;
    }
    i64::from(rng.next_bounded(bound.min(i64::from(u32::MAX)) as u32))
}

/// Height from the strength chart: 68" at ST 10, 2" per point, plus 1d-1d.
pub fn random_height_in_inches(st: i64, rng: &ScriptRng) -> i64 {
    let spread = below(rng, 6) - below(rng, 6);
    68i64
        .saturating_add(st.saturating_sub(10).saturating_mul(2))
        .saturating_add(spread)
}

/// Weight from the strength chart. `shift` leans lighter when negative and heavier when
/// positive, on top of any build traits.
pub fn random_weight_in_pounds(st: i64, shift: i64, build: BuildTraits, rng: &ScriptRng) -> i64 {
    let shift = shift.saturating_add(3 + build.shift());
    let mid = 145i64.saturating_add(st.saturating_sub(10).saturating_mul(15));
    let deviation = mid / 5 + 2;
    mid.saturating_add(below(rng, deviation))
        .saturating_sub(below(rng, deviation))
        .saturating_mul(shift)
        / 3
}

#[cfg(test)]
mod random_tests {
    use super::*;

    #[test]
    fn heights_stay_within_the_dice_spread() {
        let rng = ScriptRng::new(Some(5));
        for _ in 0..50 {
            let height = random_height_in_inches(10, &rng);
            assert!((63..=73).contains(&height));
        }
        let tall = random_height_in_inches(14, &rng);
        assert!((71..=81).contains(&tall));
    }

    #[test]
    fn build_traits_shift_weight() {
        let rng = ScriptRng::new(Some(9));
        for _ in 0..50 {
            let average = random_weight_in_pounds(10, 0, BuildTraits::default(), &rng);
            assert!((114..=176).contains(&average));
            let skinny = random_weight_in_pounds(
                10,
                0,
                BuildTraits {
                    skinny: true,
                    ..BuildTraits::default()
                },
                &rng,
            );
            assert!((76..=117).contains(&skinny));
        }
    }

    #[test]
    fn extreme_strength_saturates_instead_of_wrapping() {
        let rng = ScriptRng::new(Some(3));
        assert!(random_height_in_inches(i64::MAX, &rng) > i64::MAX - 10);
        assert!(random_height_in_inches(i64::MIN, &rng) < i64::MIN + 100);
        assert!(random_weight_in_pounds(i64::MAX, 0, BuildTraits::default(), &rng) > 0);
        assert!(random_weight_in_pounds(i64::MIN, 0, BuildTraits::default(), &rng) < 0);
        assert!(random_weight_in_pounds(10, i64::MAX, BuildTraits::default(), &rng) > 0);
    }
}
