//! Game constants: tick rate, stack limits, effect names, tooltip keys.
//!
//! Effect names are plain strings so catalog data can refer to them without
//! any engine dependency. The host decides what each name actually does.

/// Standard world tick rate (ticks per simulated second).
pub const TICKS_PER_SECOND: u64 = 20;

/// Stims stack to two per inventory slot.
pub const MAX_STACK_SIZE: u32 = 2;

/// Translation key shown when a stim has no tooltip of its own.
pub const DEFAULT_TOOLTIP: &str = "tooltip.stims.default.tooltip";

pub mod effect_names {
    // Beneficial
    pub const REGENERATION: &str = "regeneration";
    pub const STRENGTH: &str = "strength";
    pub const SATURATION: &str = "saturation";
    pub const CONDUIT_POWER: &str = "conduit_power";
    pub const HASTE: &str = "haste";
    pub const ABSORPTION: &str = "absorption";
    pub const SPEED: &str = "speed";
    pub const RESISTANCE: &str = "resistance";
    pub const NIGHT_VISION: &str = "night_vision";
    pub const HERO_OF_THE_VILLAGE: &str = "hero_of_the_village";
    pub const DOLPHINS_GRACE: &str = "dolphins_grace";
    // Harmful
    pub const BLINDNESS: &str = "blindness";
    pub const SLOWNESS: &str = "slowness";
    pub const POISON: &str = "poison";
    pub const WITHER: &str = "wither";
    pub const NAUSEA: &str = "nausea";
    pub const WEAKNESS: &str = "weakness";
    pub const HUNGER: &str = "hunger";
    pub const MINING_FATIGUE: &str = "mining_fatigue";
    pub const BAD_OMEN: &str = "bad_omen";

    /// Every name the built-in catalog is allowed to use.
    pub const ALL: &[&str] = &[
        REGENERATION,
        STRENGTH,
        SATURATION,
        CONDUIT_POWER,
        HASTE,
        ABSORPTION,
        SPEED,
        RESISTANCE,
        NIGHT_VISION,
        HERO_OF_THE_VILLAGE,
        DOLPHINS_GRACE,
        BLINDNESS,
        SLOWNESS,
        POISON,
        WITHER,
        NAUSEA,
        WEAKNESS,
        HUNGER,
        MINING_FATIGUE,
        BAD_OMEN,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

pub mod stim_kinds {
    pub const PROPITAL: &str = "propital";
    pub const ETG_C: &str = "etg_c";
    pub const MORPHINE: &str = "morphine";
    pub const OBDOLBOS: &str = "obdolbos";
    pub const OBDOLBOS_TWO: &str = "obdolbos_two";
    pub const SJ_SIX: &str = "sj_six";
    pub const XTG_TWELVE: &str = "xtg_twelve";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_names_unique() {
        let mut names: Vec<&str> = effect_names::ALL.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), effect_names::ALL.len());
    }

    #[test]
    fn test_is_known() {
        assert!(effect_names::is_known("regeneration"));
        assert!(!effect_names::is_known("levitation_of_doom"));
    }
}
