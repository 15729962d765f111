//! Effect recipes and their interpretation.
//!
//! A recipe is pure data describing which status effects a stim grants.
//! One routine, [`EffectRecipe::resolve`], turns a recipe into concrete
//! [`StatusEffect`]s; the host receives them through an [`EffectSink`].

use serde::{Deserialize, Serialize};

use crate::items::SubjectId;
use crate::timing::seconds_to_ticks;

/// One status effect entry inside a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSpec {
    /// Effect name understood by the host (see `constants::effect_names`).
    pub effect: String,
    /// Zero-based level; 0 is "level I".
    #[serde(default)]
    pub amplifier: u8,
    /// Fixed duration override. `None` uses the duration the recipe is
    /// applied with (the profile's effect or after-delay duration).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

impl EffectSpec {
    pub fn new(effect: impl Into<String>) -> Self {
        Self {
            effect: effect.into(),
            amplifier: 0,
            duration_seconds: None,
        }
    }

    pub fn amplifier(mut self, amplifier: u8) -> Self {
        self.amplifier = amplifier;
        self
    }

    pub fn lasting(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// What a stim does in one phase (on use, or after the delay).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectRecipe {
    /// No effect in this phase.
    #[default]
    None,
    /// Every listed effect, in order.
    Fixed { effects: Vec<EffectSpec> },
    /// Exactly one branch, chosen at random when the stim is used.
    OneOf { branches: Vec<Vec<EffectSpec>> },
}

impl EffectRecipe {
    pub fn fixed(effects: Vec<EffectSpec>) -> Self {
        EffectRecipe::Fixed { effects }
    }

    pub fn one_of(branches: Vec<Vec<EffectSpec>>) -> Self {
        EffectRecipe::OneOf { branches }
    }

    /// Number of random branches (0 for non-random recipes).
    pub fn branch_count(&self) -> usize {
        match self {
            EffectRecipe::OneOf { branches } => branches.len(),
            _ => 0,
        }
    }

    /// Whether resolving this recipe can never produce an effect.
    pub fn is_empty(&self) -> bool {
        match self {
            EffectRecipe::None => true,
            EffectRecipe::Fixed { effects } => effects.is_empty(),
            EffectRecipe::OneOf { branches } => branches.iter().all(|b| b.is_empty()),
        }
    }

    /// Every effect spec the recipe could ever produce.
    pub fn all_specs(&self) -> Vec<&EffectSpec> {
        match self {
            EffectRecipe::None => Vec::new(),
            EffectRecipe::Fixed { effects } => effects.iter().collect(),
            EffectRecipe::OneOf { branches } => branches.iter().flatten().collect(),
        }
    }

    /// Resolve the recipe into concrete status effects.
    ///
    /// - `branch`: drawn branch for `OneOf` recipes (wraps around; `None`
    ///   picks the first branch)
    /// - `duration_seconds`: default duration for specs without an override
    pub fn resolve(
        &self,
        branch: Option<usize>,
        duration_seconds: u32,
        ticks_per_second: u64,
    ) -> Vec<StatusEffect> {
        let specs: &[EffectSpec] = match self {
            EffectRecipe::None => &[],
            EffectRecipe::Fixed { effects } => effects,
            EffectRecipe::OneOf { branches } => {
                if branches.is_empty() {
                    &[]
                } else {
                    &branches[branch.unwrap_or(0) % branches.len()]
                }
            }
        };

        specs
            .iter()
            .map(|spec| StatusEffect {
                effect: spec.effect.clone(),
                amplifier: spec.amplifier,
                duration_ticks: seconds_to_ticks(
                    spec.duration_seconds.unwrap_or(duration_seconds),
                    ticks_per_second,
                ),
                show_particles: false,
            })
            .collect()
    }
}

/// A resolved effect instance, ready for the host to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub effect: String,
    pub amplifier: u8,
    pub duration_ticks: u64,
    /// Stims apply their effects without particles.
    pub show_particles: bool,
}

/// Receiver of resolved status effects, implemented by the host.
///
/// Applying an effect is a local, infallible call.
pub trait EffectSink {
    fn apply(&mut self, subject: SubjectId, effect: StatusEffect);
}

/// Sink that just records what it was given.
///
/// Hosts that cannot hand out `&mut` access to a subject while the recorder
/// runs collect into a buffer first and drain it afterwards.
#[derive(Debug, Clone, Default)]
pub struct EffectBuffer {
    pub applied: Vec<(SubjectId, StatusEffect)>,
}

impl EffectBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Effects applied to one subject, in order.
    pub fn for_subject(&self, subject: SubjectId) -> Vec<&StatusEffect> {
        self.applied
            .iter()
            .filter(|(s, _)| *s == subject)
            .map(|(_, e)| e)
            .collect()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, (SubjectId, StatusEffect)> {
        self.applied.drain(..)
    }
}

impl EffectSink for EffectBuffer {
    fn apply(&mut self, subject: SubjectId, effect: StatusEffect) {
        self.applied.push((subject, effect));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::effect_names::*;

    #[test]
    fn test_fixed_uses_invocation_duration() {
        let recipe = EffectRecipe::fixed(vec![EffectSpec::new(REGENERATION)]);
        let effects = recipe.resolve(None, 60, 20);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].effect, REGENERATION);
        assert_eq!(effects[0].duration_ticks, 1200);
        assert!(!effects[0].show_particles);
    }

    #[test]
    fn test_spec_duration_override() {
        let recipe = EffectRecipe::fixed(vec![
            EffectSpec::new(STRENGTH).amplifier(1),
            EffectSpec::new(NAUSEA).lasting(5),
        ]);
        let effects = recipe.resolve(None, 30, 20);
        assert_eq!(effects[0].amplifier, 1);
        assert_eq!(effects[0].duration_ticks, 600);
        assert_eq!(effects[1].duration_ticks, 100);
    }

    #[test]
    fn test_one_of_picks_drawn_branch() {
        let recipe = EffectRecipe::one_of(vec![
            vec![EffectSpec::new(SPEED)],
            vec![EffectSpec::new(HASTE)],
            vec![EffectSpec::new(RESISTANCE), EffectSpec::new(NIGHT_VISION)],
        ]);
        assert_eq!(recipe.branch_count(), 3);
        assert_eq!(recipe.resolve(Some(1), 10, 20)[0].effect, HASTE);
        assert_eq!(recipe.resolve(Some(2), 10, 20).len(), 2);
        // Out-of-range branches wrap
        assert_eq!(recipe.resolve(Some(4), 10, 20)[0].effect, HASTE);
        assert_eq!(recipe.resolve(None, 10, 20)[0].effect, SPEED);
    }

    #[test]
    fn test_empty_recipes() {
        assert!(EffectRecipe::None.is_empty());
        assert!(EffectRecipe::fixed(vec![]).is_empty());
        assert!(EffectRecipe::one_of(vec![]).resolve(Some(3), 10, 20).is_empty());
        assert!(!EffectRecipe::fixed(vec![EffectSpec::new(POISON)]).is_empty());
    }

    #[test]
    fn test_recipe_json_shape() {
        let json = r#"{ "type": "one_of", "branches": [[{ "effect": "speed" }], [{ "effect": "haste", "amplifier": 2 }]] }"#;
        let recipe: EffectRecipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.branch_count(), 2);
        assert_eq!(recipe.all_specs()[1].amplifier, 2);

        let none: EffectRecipe = serde_json::from_str(r#"{ "type": "none" }"#).unwrap();
        assert_eq!(none, EffectRecipe::None);
    }

    #[test]
    fn test_buffer_records_per_subject() {
        let mut buffer = EffectBuffer::new();
        let recipe = EffectRecipe::fixed(vec![EffectSpec::new(WITHER)]);
        for effect in recipe.resolve(None, 20, 20) {
            buffer.apply(SubjectId(1), effect);
        }
        for effect in recipe.resolve(None, 20, 20) {
            buffer.apply(SubjectId(2), effect);
        }
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.for_subject(SubjectId(2)).len(), 1);
        assert_eq!(buffer.drain().count(), 2);
        assert!(buffer.is_empty());
    }
}
