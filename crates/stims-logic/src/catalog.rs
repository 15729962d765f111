//! Stim catalog: kinds, timing profiles and effect recipes.
//!
//! The catalog is loaded once at process start (normally from
//! `data/stims.json`) and never changes afterwards. Adding a stim is a data
//! change: a new entry with a profile and two recipes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TOOLTIP, TICKS_PER_SECOND};
use crate::effects::{EffectRecipe, EffectSink};
use crate::error::StimError;
use crate::items::SubjectId;

// ── Built-in content (same JSON the simtest validates) ──────────────────
const BUILTIN_JSON: &str = include_str!("../../../data/stims.json");

/// Names a consumable type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StimKind(String);

impl StimKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StimKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for StimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Timing parameters of one stim kind.
///
/// When `has_after_delay_effect` is false, `delay_seconds` and
/// `after_delay_effect_duration` are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimProfile {
    pub has_after_delay_effect: bool,
    pub delay_seconds: u32,
    /// Seconds, passed to the on-use recipe.
    pub effect_duration: u32,
    /// Seconds, passed to the after-delay recipe.
    pub after_delay_effect_duration: u32,
}

impl StimProfile {
    pub fn new(
        has_after_delay_effect: bool,
        delay_seconds: u32,
        effect_duration: u32,
        after_delay_effect_duration: u32,
    ) -> Self {
        Self {
            has_after_delay_effect,
            delay_seconds,
            effect_duration,
            after_delay_effect_duration,
        }
    }

    /// Profile with an immediate effect only.
    pub fn immediate_only(effect_duration: u32) -> Self {
        Self::new(false, 0, effect_duration, 0)
    }
}

/// Everything the catalog knows about one stim kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimEntry {
    pub kind: StimKind,
    /// Registry name of the item that carries this stim.
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub profile: StimProfile,
    #[serde(default)]
    pub on_use: EffectRecipe,
    #[serde(default)]
    pub after_delay: EffectRecipe,
}

impl StimEntry {
    pub fn new(kind: impl Into<String>, item: impl Into<String>, profile: StimProfile) -> Self {
        Self {
            kind: StimKind::new(kind),
            item: item.into(),
            tooltip: None,
            profile,
            on_use: EffectRecipe::None,
            after_delay: EffectRecipe::None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_on_use(mut self, recipe: EffectRecipe) -> Self {
        self.on_use = recipe;
        self
    }

    pub fn with_after_delay(mut self, recipe: EffectRecipe) -> Self {
        self.after_delay = recipe;
        self
    }

    /// Number of random branches a use of this kind draws from (0 = none).
    pub fn branch_count(&self) -> usize {
        self.on_use
            .branch_count()
            .max(self.after_delay.branch_count())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    stims: Vec<StimEntry>,
}

/// Immutable lookup table from stim kind to profile and recipes.
#[derive(Debug, Clone)]
pub struct StimCatalog {
    entries: Vec<StimEntry>,
    by_kind: HashMap<StimKind, usize>,
    by_item: HashMap<String, usize>,
    ticks_per_second: u64,
}

impl StimCatalog {
    /// Build a catalog from entries. On duplicate kinds or items the first
    /// entry wins; [`StimCatalog::validate`] reports the duplicates.
    pub fn new(entries: Vec<StimEntry>) -> Self {
        let mut by_kind = HashMap::new();
        let mut by_item = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_kind.entry(entry.kind.clone()).or_insert(i);
            by_item.entry(entry.item.clone()).or_insert(i);
        }
        Self {
            entries,
            by_kind,
            by_item,
            ticks_per_second: TICKS_PER_SECOND,
        }
    }

    /// The stims shipped with the mod.
    pub fn builtin() -> Result<Self, StimError> {
        Self::from_json(BUILTIN_JSON)
    }

    /// Parse a catalog from JSON of the form `{ "stims": [ ... ] }`.
    pub fn from_json(json: &str) -> Result<Self, StimError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new(file.stims))
    }

    /// Use a non-standard tick rate. Effect durations resolve at this rate
    /// and a scheduler built on the catalog measures delays with it.
    pub fn with_tick_rate(mut self, ticks_per_second: u64) -> Self {
        self.ticks_per_second = ticks_per_second;
        self
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    pub fn entry(&self, kind: &StimKind) -> Option<&StimEntry> {
        self.by_kind.get(kind).map(|&i| &self.entries[i])
    }

    pub fn profile(&self, kind: &StimKind) -> Option<&StimProfile> {
        self.entry(kind).map(|e| &e.profile)
    }

    pub fn contains(&self, kind: &StimKind) -> bool {
        self.by_kind.contains_key(kind)
    }

    /// Map an item registry name to the stim it carries.
    pub fn kind_for_item(&self, item: &str) -> Option<&StimKind> {
        self.by_item.get(item).map(|&i| &self.entries[i].kind)
    }

    /// All kinds, in catalog order (duplicates skipped).
    pub fn kinds(&self) -> impl Iterator<Item = &StimKind> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, e)| self.by_kind.get(&e.kind) == Some(i))
            .map(|(_, e)| &e.kind)
    }

    /// Tooltip text for a kind, falling back to the default tooltip key.
    pub fn tooltip(&self, kind: &StimKind) -> &str {
        self.entry(kind)
            .and_then(|e| e.tooltip.as_deref())
            .unwrap_or(DEFAULT_TOOLTIP)
    }

    /// Apply the immediate recipe of `kind`. Returns the number of effects
    /// handed to the sink.
    pub fn apply_on_use(
        &self,
        subject: SubjectId,
        kind: &StimKind,
        duration_seconds: u32,
        branch: Option<usize>,
        sink: &mut dyn EffectSink,
    ) -> Result<usize, StimError> {
        let entry = self
            .entry(kind)
            .ok_or_else(|| StimError::UnknownStimKind(kind.clone()))?;
        Ok(self.apply_recipe(&entry.on_use, subject, duration_seconds, branch, sink))
    }

    /// Apply the after-delay (comedown) recipe of `kind`.
    pub fn apply_after_delay(
        &self,
        subject: SubjectId,
        kind: &StimKind,
        duration_seconds: u32,
        branch: Option<usize>,
        sink: &mut dyn EffectSink,
    ) -> Result<usize, StimError> {
        let entry = self
            .entry(kind)
            .ok_or_else(|| StimError::UnknownStimKind(kind.clone()))?;
        Ok(self.apply_recipe(&entry.after_delay, subject, duration_seconds, branch, sink))
    }

    fn apply_recipe(
        &self,
        recipe: &EffectRecipe,
        subject: SubjectId,
        duration_seconds: u32,
        branch: Option<usize>,
        sink: &mut dyn EffectSink,
    ) -> usize {
        let effects = recipe.resolve(branch, duration_seconds, self.ticks_per_second);
        let count = effects.len();
        for effect in effects {
            sink.apply(subject, effect);
        }
        count
    }

    /// Design-time consistency check. An empty result means the catalog is
    /// sound; every issue is reported as [`StimError::StaleConfig`].
    pub fn validate(&self) -> Vec<StimError> {
        let mut issues = Vec::new();
        let stale = |kind: &StimKind, reason: String| StimError::StaleConfig {
            kind: kind.clone(),
            reason,
        };

        for (i, entry) in self.entries.iter().enumerate() {
            if self.by_kind.get(&entry.kind) != Some(&i) {
                issues.push(stale(&entry.kind, "duplicate kind".into()));
                continue;
            }
            if self.by_item.get(&entry.item) != Some(&i) {
                issues.push(stale(
                    &entry.kind,
                    format!("item {} already mapped to another stim", entry.item),
                ));
            }
            if entry.on_use.is_empty() {
                issues.push(stale(&entry.kind, "on-use recipe is empty".into()));
            }
            if entry.profile.has_after_delay_effect && entry.after_delay.is_empty() {
                issues.push(stale(
                    &entry.kind,
                    "after-delay effect enabled but recipe is empty".into(),
                ));
            }
            if !entry.profile.has_after_delay_effect && !entry.after_delay.is_empty() {
                issues.push(stale(
                    &entry.kind,
                    "after-delay recipe present but effect disabled".into(),
                ));
            }
            let (use_branches, delay_branches) = (
                entry.on_use.branch_count(),
                entry.after_delay.branch_count(),
            );
            if use_branches > 0 && delay_branches > 0 && use_branches != delay_branches {
                issues.push(stale(
                    &entry.kind,
                    format!(
                        "branch count mismatch: {} on use, {} after delay",
                        use_branches, delay_branches
                    ),
                ));
            }
        }

        issues
    }
}
