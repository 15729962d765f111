//! Components for subjects in the reference host world.

use serde::{Deserialize, Serialize};
use stims_logic::effects::StatusEffect;
use stims_logic::items::ItemStack;

/// Marks a player-controlled subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Inventory slots. Emptied stacks stay in place so slot indices are stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub slots: Vec<ItemStack>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add items, topping up matching stacks first, then empty slots, then
    /// new slots. Returns how many items did not fit (only when `max_slots`
    /// is reached).
    pub fn give(&mut self, item: &str, mut count: u32, max_stack: u32, max_slots: usize) -> u32 {
        for stack in self.slots.iter_mut().filter(|s| s.item == item) {
            count = stack.grow(count, max_stack);
            if count == 0 {
                return 0;
            }
        }
        for stack in self.slots.iter_mut().filter(|s| s.is_empty()) {
            *stack = ItemStack::new(item, 0);
            count = stack.grow(count, max_stack);
            if count == 0 {
                return 0;
            }
        }
        while count > 0 && self.slots.len() < max_slots {
            let mut stack = ItemStack::new(item, 0);
            count = stack.grow(count, max_stack);
            self.slots.push(stack);
        }
        count
    }

    /// Total items of a kind across all slots
    pub fn count(&self, item: &str) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    /// First slot holding at least one of `item`
    pub fn find(&self, item: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.item == item && !s.is_empty())
    }
}

/// One running status effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub effect: String,
    pub amplifier: u8,
    pub remaining_ticks: u64,
}

/// Status effects currently on a subject
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub effects: Vec<ActiveEffect>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status effect. An already-running effect of the same name is
    /// replaced only by a stronger one, or an equally strong one that lasts
    /// longer. Returns whether anything changed.
    pub fn add(&mut self, effect: StatusEffect) -> bool {
        if effect.duration_ticks == 0 {
            return false;
        }
        match self.effects.iter_mut().find(|e| e.effect == effect.effect) {
            Some(existing) => {
                let stronger = effect.amplifier > existing.amplifier;
                let longer = effect.amplifier == existing.amplifier
                    && effect.duration_ticks > existing.remaining_ticks;
                if stronger || longer {
                    existing.amplifier = effect.amplifier;
                    existing.remaining_ticks = effect.duration_ticks;
                    true
                } else {
                    false
                }
            }
            None => {
                self.effects.push(ActiveEffect {
                    effect: effect.effect,
                    amplifier: effect.amplifier,
                    remaining_ticks: effect.duration_ticks,
                });
                true
            }
        }
    }

    /// Count every effect down by one tick, dropping expired ones.
    /// Returns the names of effects that expired.
    pub fn tick(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.effects.retain_mut(|e| {
            e.remaining_ticks = e.remaining_ticks.saturating_sub(1);
            if e.remaining_ticks == 0 {
                expired.push(e.effect.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn get(&self, effect: &str) -> Option<&ActiveEffect> {
        self.effects.iter().find(|e| e.effect == effect)
    }

    pub fn has(&self, effect: &str) -> bool {
        self.get(effect).is_some()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
