//! Speed and betting odds derived from horse condition.
//!
//! Everything here is a pure function of its inputs; randomness comes in
//! through the caller-supplied generator so races can be replayed from a
//! seed.
use rand::Rng;

use crate::constants::{
    AVG_HORSE_SPEED, BETTING_OUTPUT_MAX, BETTING_OUTPUT_MIN, MAX_HORSE_CONDITION,
    MAX_SPEED_CONDITION_COEF, MIN_HORSE_CONDITION, MIN_SPEED_CONDITION_COEF,
    RANDOM_FACTOR_COEF_MAX, RANDOM_FACTOR_COEF_MIN,
};
use crate::horse::Horse;
use crate::numbers::{round_to_hundredths, usize_to_f64};

/// Map a condition onto the speed coefficient range.
///
/// Linear interpolation from `[MIN_HORSE_CONDITION, MAX_HORSE_CONDITION]` onto
/// `[MIN_SPEED_CONDITION_COEF, MAX_SPEED_CONDITION_COEF]`. Not clamped: a
/// condition outside the domain extrapolates along the same line.
#[must_use]
pub fn speed_coef_from_condition(condition: f64) -> f64 {
    let min_condition = f64::from(MIN_HORSE_CONDITION);
    let max_condition = f64::from(MAX_HORSE_CONDITION);
    MIN_SPEED_CONDITION_COEF
        + (condition - min_condition) * (MAX_SPEED_CONDITION_COEF - MIN_SPEED_CONDITION_COEF)
            / (max_condition - min_condition)
}

/// Uniform draw from `[RANDOM_FACTOR_COEF_MIN, RANDOM_FACTOR_COEF_MAX]`.
pub fn random_variance_factor<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(RANDOM_FACTOR_COEF_MIN..=RANDOM_FACTOR_COEF_MAX)
}

/// Decimal odds for a horse of `current_condition` racing against `others`.
///
/// The field's average condition over the current horse's condition gives a
/// relative strength in `[MIN/MAX, MAX/MIN]`, which is remapped onto
/// `[BETTING_OUTPUT_MIN, BETTING_OUTPUT_MAX]` and rounded to two decimals.
/// A horse with no competitors has relative strength 1.
#[must_use]
pub fn win_odds(current_condition: u32, others: impl IntoIterator<Item = u32>) -> f64 {
    let (sum, count) = others
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, count), condition| {
            (sum + f64::from(condition), count + 1)
        });
    let current = f64::from(current_condition);
    let avg_other_condition = if count == 0 {
        current
    } else {
        sum / usize_to_f64(count)
    };

    // Weak horse in a strong field => ratio above 1 => longer odds.
    let relative_strength = avg_other_condition / current;

    let a = f64::from(MIN_HORSE_CONDITION) / f64::from(MAX_HORSE_CONDITION);
    let b = f64::from(MAX_HORSE_CONDITION) / f64::from(MIN_HORSE_CONDITION);
    let c = BETTING_OUTPUT_MIN;
    let d = BETTING_OUTPUT_MAX;

    round_to_hundredths((relative_strength - a) * (d - c) / (b - a) + c)
}

/// Odds for `field[current_index]` against the rest of `field`.
///
/// Returns `None` when `current_index` is out of range.
#[must_use]
pub fn compute_win_odds(field: &[Horse], current_index: usize) -> Option<f64> {
    let current = field.get(current_index)?;
    let others = field
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != current_index)
        .map(|(_, horse)| horse.condition);
    Some(win_odds(current.condition, others))
}

/// Fresh stochastic speed sample in km/h.
pub fn sample_horse_speed_kph<R: Rng + ?Sized>(condition: u32, rng: &mut R) -> f64 {
    AVG_HORSE_SPEED * random_variance_factor(rng) * speed_coef_from_condition(f64::from(condition))
}
