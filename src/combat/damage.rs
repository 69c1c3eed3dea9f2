//! Attack-table resolution for white swings and special abilities.
//!
//! Both resolvers are pure: they take explicit bounds and probabilities plus the trial's
//! random stream and never clamp. Callers guarantee that `miss_chance`, the glancing band
//! and `crit_chance` describe a valid distribution.

use serde::Serialize;

use crate::combat::rng::Rng;

/// Damage multiplier applied to critical strikes (meta gem included).
pub const CRIT_MULTIPLIER: f64 = 2.2;

/// Width of the glancing-blow band in the single-roll white table.
pub const GLANCE_CHANCE: f64 = 0.24;

/// Glancing blows lose between 15% and 35% of their damage.
pub const GLANCE_REDUCTION_MIN: f64 = 0.15;
pub const GLANCE_REDUCTION_SPREAD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttackRoll {
    pub damage: f64,
    pub missed: bool,
    pub crit: bool,
}

impl AttackRoll {
    pub const MISS: AttackRoll = AttackRoll {
        damage: 0.0,
        missed: true,
        crit: false,
    };
}

/// Single-roll table for a melee swing: miss, then glancing, then crit, else a normal hit.
pub fn roll_white(low: f64, high: f64, miss_chance: f64, crit_chance: f64, rng: &mut Rng) -> AttackRoll {
    let outcome_roll = rng.next_f64();
    if outcome_roll < miss_chance {
        return AttackRoll::MISS;
    }

    let base = low + rng.next_f64() * (high - low);

    if outcome_roll < miss_chance + GLANCE_CHANCE {
        let reduction = GLANCE_REDUCTION_MIN + rng.next_f64() * GLANCE_REDUCTION_SPREAD;
        return AttackRoll {
            damage: (1.0 - reduction) * base,
            missed: false,
            crit: false,
        };
    }
    if outcome_roll < miss_chance + GLANCE_CHANCE + crit_chance {
        return AttackRoll {
            damage: CRIT_MULTIPLIER * base,
            missed: false,
            crit: true,
        };
    }
    AttackRoll {
        damage: base,
        missed: false,
        crit: false,
    }
}

/// Two-roll table for a special ability: one roll against miss, a second against crit.
pub fn roll_special(low: f64, high: f64, miss_chance: f64, crit_chance: f64, rng: &mut Rng) -> AttackRoll {
    if rng.next_f64() < miss_chance {
        return AttackRoll::MISS;
    }

    let base = low + rng.next_f64() * (high - low);
    if rng.next_f64() < crit_chance {
        AttackRoll {
            damage: CRIT_MULTIPLIER * base,
            missed: false,
            crit: true,
        }
    } else {
        AttackRoll {
            damage: base,
            missed: false,
            crit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certain_miss_deals_nothing() {
        let mut rng = Rng::new(3);
        for _ in 0..100 {
            assert_eq!(roll_white(100.0, 200.0, 1.0, 0.5, &mut rng), AttackRoll::MISS);
            assert_eq!(roll_special(100.0, 200.0, 1.0, 0.5, &mut rng), AttackRoll::MISS);
        }
    }

    #[test]
    fn special_with_certain_crit_multiplies_within_bounds() {
        let mut rng = Rng::new(11);
        for _ in 0..200 {
            let roll = roll_special(100.0, 200.0, 0.0, 1.0, &mut rng);
            assert!(roll.crit && !roll.missed);
            assert!(roll.damage >= 100.0 * CRIT_MULTIPLIER);
            assert!(roll.damage <= 200.0 * CRIT_MULTIPLIER);
        }
    }

    #[test]
    fn white_table_never_exceeds_its_buckets() {
        let mut rng = Rng::new(5);
        let (low, high) = (100.0, 150.0);
        for _ in 0..5_000 {
            let roll = roll_white(low, high, 0.1, 0.3, &mut rng);
            if roll.missed {
                assert_eq!(roll.damage, 0.0);
            } else if roll.crit {
                assert!(roll.damage >= low * CRIT_MULTIPLIER && roll.damage <= high * CRIT_MULTIPLIER);
            } else {
                let glance_floor = low * (1.0 - GLANCE_REDUCTION_MIN - GLANCE_REDUCTION_SPREAD);
                assert!(roll.damage >= glance_floor && roll.damage <= high);
            }
        }
    }

    #[test]
    fn white_crit_band_fills_everything_after_glances() {
        let mut rng = Rng::new(17);
        let mut crits = 0;
        let n = 10_000;
        for _ in 0..n {
            if roll_white(1.0, 2.0, 0.0, 1.0 - GLANCE_CHANCE, &mut rng).crit {
                crits += 1;
            }
        }
        let rate = crits as f64 / n as f64;
        assert!((rate - (1.0 - GLANCE_CHANCE)).abs() < 0.02, "crit rate {rate}");
    }
}
