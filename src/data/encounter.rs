//! Boss-side encounter parameters: fight length, armor and the debuffs that
//! reduce armor or raise damage taken.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BOSS_ARMOR: f64 = 3731.0;
pub const DEFAULT_FIGHT_LENGTH: f64 = 180.0;

/// Armor constant for a level 70 attacker: 467.5 * 70 - 22167.5.
const ARMOR_CONSTANT: f64 = 10557.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossDebuff {
    GiftOfArthas,
    SunderArmor,
    ImprovedExposeArmor,
    CurseOfRecklessness,
    FaerieFire,
    Annihilator,
    BloodFrenzy,
}

impl BossDebuff {
    pub const ALL: [BossDebuff; 7] = [
        BossDebuff::GiftOfArthas,
        BossDebuff::SunderArmor,
        BossDebuff::ImprovedExposeArmor,
        BossDebuff::CurseOfRecklessness,
        BossDebuff::FaerieFire,
        BossDebuff::Annihilator,
        BossDebuff::BloodFrenzy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GiftOfArthas => "gift_of_arthas",
            Self::SunderArmor => "sunder_armor",
            Self::ImprovedExposeArmor => "improved_expose_armor",
            Self::CurseOfRecklessness => "curse_of_recklessness",
            Self::FaerieFire => "faerie_fire",
            Self::Annihilator => "annihilator",
            Self::BloodFrenzy => "blood_frenzy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|debuff| debuff.as_str() == name)
    }

    pub fn valid_names() -> Vec<String> {
        Self::ALL.iter().map(|d| d.as_str().to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossDebuffs {
    pub gift_of_arthas: bool,
    pub sunder_armor: bool,
    pub improved_expose_armor: bool,
    pub curse_of_recklessness: bool,
    pub faerie_fire: bool,
    pub annihilator: bool,
    pub blood_frenzy: bool,
}

impl Default for BossDebuffs {
    fn default() -> Self {
        Self {
            gift_of_arthas: true,
            sunder_armor: false,
            improved_expose_armor: true,
            curse_of_recklessness: true,
            faerie_fire: true,
            annihilator: false,
            blood_frenzy: false,
        }
    }
}

impl BossDebuffs {
    pub fn none() -> Self {
        Self {
            gift_of_arthas: false,
            sunder_armor: false,
            improved_expose_armor: false,
            curse_of_recklessness: false,
            faerie_fire: false,
            annihilator: false,
            blood_frenzy: false,
        }
    }

    /// Exactly the named debuffs active. Every unknown name is reported at once.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let mut debuffs = Self::none();
        let mut invalid = Vec::new();
        for name in names {
            match BossDebuff::from_name(name.as_ref()) {
                Some(debuff) => debuffs.set(debuff, true),
                None => invalid.push(name.as_ref().to_string()),
            }
        }
        if invalid.is_empty() {
            Ok(debuffs)
        } else {
            Err(ConfigError::UnknownDebuffs {
                invalid,
                valid: BossDebuff::valid_names(),
            })
        }
    }

    pub fn is_active(&self, debuff: BossDebuff) -> bool {
        match debuff {
            BossDebuff::GiftOfArthas => self.gift_of_arthas,
            BossDebuff::SunderArmor => self.sunder_armor,
            BossDebuff::ImprovedExposeArmor => self.improved_expose_armor,
            BossDebuff::CurseOfRecklessness => self.curse_of_recklessness,
            BossDebuff::FaerieFire => self.faerie_fire,
            BossDebuff::Annihilator => self.annihilator,
            BossDebuff::BloodFrenzy => self.blood_frenzy,
        }
    }

    pub fn set(&mut self, debuff: BossDebuff, active: bool) {
        let slot = match debuff {
            BossDebuff::GiftOfArthas => &mut self.gift_of_arthas,
            BossDebuff::SunderArmor => &mut self.sunder_armor,
            BossDebuff::ImprovedExposeArmor => &mut self.improved_expose_armor,
            BossDebuff::CurseOfRecklessness => &mut self.curse_of_recklessness,
            BossDebuff::FaerieFire => &mut self.faerie_fire,
            BossDebuff::Annihilator => &mut self.annihilator,
            BossDebuff::BloodFrenzy => &mut self.blood_frenzy,
        };
        *slot = active;
    }

    pub fn active_names(&self) -> Vec<&'static str> {
        BossDebuff::ALL
            .into_iter()
            .filter(|d| self.is_active(*d))
            .map(BossDebuff::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterParams {
    /// Target fight length in seconds; each trial jitters around it.
    pub fight_length: f64,
    pub boss_armor: f64,
    pub debuffs: BossDebuffs,
}

impl Default for EncounterParams {
    fn default() -> Self {
        Self {
            fight_length: DEFAULT_FIGHT_LENGTH,
            boss_armor: DEFAULT_BOSS_ARMOR,
            debuffs: BossDebuffs::default(),
        }
    }
}

impl EncounterParams {
    pub fn new(fight_length: f64) -> Self {
        Self {
            fight_length,
            ..Self::default()
        }
    }

    /// Replace the active debuff set with exactly `names`.
    pub fn with_debuffs<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, ConfigError> {
        self.debuffs = BossDebuffs::from_names(names)?;
        Ok(self)
    }

    pub fn with_boss_armor(mut self, boss_armor: f64) -> Self {
        self.boss_armor = boss_armor;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fight_length.is_finite() || self.fight_length <= 0.0 {
            return Err(ConfigError::invalid_parameter(
                "fight_length",
                format!("must be a positive number of seconds, got {}", self.fight_length),
            ));
        }
        if !self.boss_armor.is_finite() || self.boss_armor < 0.0 {
            return Err(ConfigError::invalid_parameter(
                "boss_armor",
                format!("must be non-negative, got {}", self.boss_armor),
            ));
        }
        Ok(())
    }

    /// Armor left after debuffs and the attacker's armor penetration, floored at zero.
    pub fn residual_armor(&self, armor_pen: f64) -> f64 {
        let d = &self.debuffs;
        let major = (2600.0 * flag(d.sunder_armor)).max(3075.0 * flag(d.improved_expose_armor));
        (self.boss_armor
            - major
            - 800.0 * flag(d.curse_of_recklessness)
            - 610.0 * flag(d.faerie_fire)
            - 600.0 * flag(d.annihilator)
            - armor_pen)
            .max(0.0)
    }

    /// Fraction of physical damage that gets through armor.
    pub fn armor_multiplier(&self, armor_pen: f64) -> f64 {
        let residual = self.residual_armor(armor_pen);
        1.0 - residual / (residual + ARMOR_CONSTANT)
    }

    /// Damage-taken multiplier from debuffs, independent of armor.
    pub fn damage_taken_multiplier(&self) -> f64 {
        1.0 + 0.04 * flag(self.debuffs.blood_frenzy)
    }

    pub fn bonus_weapon_damage(&self) -> f64 {
        8.0 * flag(self.debuffs.gift_of_arthas)
    }
}

fn flag(active: bool) -> f64 {
    if active {
        1.0
    } else {
        0.0
    }
}
