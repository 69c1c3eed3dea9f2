//! Closed set of fighter attributes that timed effects may modify, plus the haste
//! conversion between swing timer and rating.

use serde::{Deserialize, Serialize};

/// Haste rating that doubles attack speed.
pub const HASTE_RATING_PER_UNIT: f64 = 1577.0;

/// Rating per 1% of the corresponding chance stat.
pub const HASTE_RATING_PER_PERCENT: f64 = 15.77;
pub const HIT_RATING_PER_PERCENT: f64 = 15.77;
pub const CRIT_RATING_PER_PERCENT: f64 = 22.08;

/// Swing timer in seconds for a given total haste rating.
pub fn swing_timer_for_rating(haste_rating: f64) -> f64 {
    1.0 / (1.0 + haste_rating / HASTE_RATING_PER_UNIT)
}

/// Haste rating consistent with a given swing timer (unrounded).
pub fn haste_rating_for_swing(swing_timer: f64) -> f64 {
    HASTE_RATING_PER_UNIT * (1.0 / swing_timer - 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    AttackPower,
    /// Fraction, e.g. 0.02 for 2%.
    CritChance,
    /// Fraction, e.g. 0.01 for 1%.
    HitChance,
    HasteRating,
    ArmorPenetration,
    WeaponDamage,
}

impl StatKind {
    pub const ALL: [StatKind; 6] = [
        StatKind::AttackPower,
        StatKind::CritChance,
        StatKind::HitChance,
        StatKind::HasteRating,
        StatKind::ArmorPenetration,
        StatKind::WeaponDamage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttackPower => "attack_power",
            Self::CritChance => "crit_chance",
            Self::HitChance => "hit_chance",
            Self::HasteRating => "haste_rating",
            Self::ArmorPenetration => "armor_penetration",
            Self::WeaponDamage => "weapon_damage",
        }
    }

    /// Whether a change to this stat invalidates the cached damage ranges.
    pub fn affects_damage_ranges(self) -> bool {
        matches!(
            self,
            Self::AttackPower | Self::ArmorPenetration | Self::WeaponDamage
        )
    }
}
