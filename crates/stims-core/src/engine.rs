//! Reference host world - drives the recorder and scheduler from a tick loop

use std::sync::Arc;

use hecs::{Entity, World};
use stims_logic::catalog::{StimCatalog, StimKind};
use stims_logic::config::StimsConfig;
use stims_logic::effects::EffectBuffer;
use stims_logic::error::StimError;
use stims_logic::items::SubjectId;

use crate::components::*;
use crate::recorder::{ConsumeOutcome, ExecutionSide, UseRecorder};
use crate::scheduler::{DelayedEffectScheduler, TickReport};

/// Inventory slots per player
pub const INVENTORY_SLOTS: usize = 36;

/// Map an ECS entity to the subject id the scheduler tracks
pub fn subject_of(entity: Entity) -> SubjectId {
    SubjectId(entity.to_bits().get())
}

/// Minimal game world owning the stims runtime
pub struct StimWorld {
    /// ECS world containing all subjects
    pub world: World,
    /// World time in ticks
    tick: u64,
    config: StimsConfig,
    scheduler: Arc<DelayedEffectScheduler>,
    recorder: UseRecorder,
}

impl StimWorld {
    /// Fails if `config` is unusable (see [`StimsConfig::validate`]).
    pub fn new(catalog: StimCatalog, config: StimsConfig) -> Result<Self, StimError> {
        let scheduler = Arc::new(DelayedEffectScheduler::from_config(
            Arc::new(catalog),
            &config,
        )?);
        let recorder = UseRecorder::new(Arc::clone(&scheduler), &config);
        log::info!(
            "Stim world ready: {} stims, {} ticks/s",
            scheduler.catalog().len(),
            scheduler.ticks_per_second()
        );
        Ok(Self {
            world: World::new(),
            tick: 0,
            config,
            scheduler,
            recorder,
        })
    }

    /// World with the built-in catalog and default config
    pub fn with_builtin() -> Result<Self, StimError> {
        Self::new(StimCatalog::builtin()?, StimsConfig::default())
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &StimsConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<StimCatalog> {
        self.scheduler.catalog()
    }

    pub fn scheduler(&self) -> &Arc<DelayedEffectScheduler> {
        &self.scheduler
    }

    pub fn recorder(&self) -> &UseRecorder {
        &self.recorder
    }

    pub fn spawn_player(&mut self, name: &str) -> Entity {
        let entity = self.world.spawn((
            Player::new(name),
            Inventory::new(),
            ActiveEffects::new(),
        ));
        log::info!("{} joined as {}", name, subject_of(entity));
        entity
    }

    /// Remove a player for good. Pending comedowns are purged, not fired.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let purged = self.scheduler.purge_subject(subject_of(entity));
        match self.world.despawn(entity) {
            Ok(()) => {
                log::info!(
                    "{} left the world ({} pending uses purged)",
                    subject_of(entity),
                    purged
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Put items into a player's inventory. Returns how many did not fit.
    pub fn give(&mut self, entity: Entity, item: &str, count: u32) -> u32 {
        match self.world.get::<&mut Inventory>(entity) {
            Ok(mut inventory) => {
                inventory.give(item, count, self.config.max_stack_size, INVENTORY_SLOTS)
            }
            Err(_) => {
                log::warn!("Cannot give {} to missing {}", item, subject_of(entity));
                count
            }
        }
    }

    /// Use the item in `slot` of a player's inventory.
    pub fn use_item(&mut self, entity: Entity, slot: usize, side: ExecutionSide) -> ConsumeOutcome {
        let subject = subject_of(entity);
        let mut buffer = EffectBuffer::new();

        let outcome = {
            let mut inventory = match self.world.get::<&mut Inventory>(entity) {
                Ok(inventory) => inventory,
                Err(_) => {
                    log::warn!("{} has no inventory", subject);
                    return ConsumeOutcome::Rejected(StimError::UnknownSubject(subject));
                }
            };
            let Some(stack) = inventory.slots.get_mut(slot) else {
                log::warn!("{} used empty slot {}", subject, slot);
                return ConsumeOutcome::Rejected(StimError::EmptyStack);
            };
            let kind = match self.scheduler.catalog().kind_for_item(&stack.item) {
                Some(kind) => kind.clone(),
                None => StimKind::new(stack.item.as_str()),
            };
            self.recorder
                .on_consume(side, subject, stack, &kind, self.tick, &mut buffer)
        };

        self.apply_effects(buffer);
        outcome
    }

    /// Use the first stack of `item` a player holds.
    pub fn use_first(&mut self, entity: Entity, item: &str, side: ExecutionSide) -> ConsumeOutcome {
        let subject = subject_of(entity);
        let slot = match self.world.get::<&Inventory>(entity) {
            Ok(inventory) => inventory.find(item),
            Err(_) => {
                log::warn!("{} has no inventory", subject);
                return ConsumeOutcome::Rejected(StimError::UnknownSubject(subject));
            }
        };
        match slot {
            Some(slot) => self.use_item(entity, slot, side),
            None => {
                log::warn!("{} holds no {}", subject, item);
                ConsumeOutcome::Rejected(StimError::EmptyStack)
            }
        }
    }

    /// Advance the world by one tick.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;

        for (_, effects) in self.world.query_mut::<&mut ActiveEffects>() {
            effects.tick();
        }

        let mut buffer = EffectBuffer::new();
        let report = self.scheduler.on_tick(self.tick, &mut buffer);
        self.apply_effects(buffer);
        report
    }

    /// Advance the world by `ticks` ticks.
    pub fn run(&mut self, ticks: u64) -> TickReport {
        let mut total = TickReport::default();
        for _ in 0..ticks {
            total.merge(self.tick());
        }
        total
    }

    fn apply_effects(&mut self, mut buffer: EffectBuffer) {
        for (subject, effect) in buffer.drain() {
            let Some(entity) = Entity::from_bits(subject.0) else {
                log::warn!("Dropping {} for invalid {}", effect.effect, subject);
                continue;
            };
            match self.world.get::<&mut ActiveEffects>(entity) {
                Ok(mut effects) => {
                    effects.add(effect);
                }
                Err(_) => log::warn!("Dropping {} for missing {}", effect.effect, subject),
            }
        }
    }

    /// Snapshot of a player's running effects
    pub fn effects_of(&self, entity: Entity) -> Vec<ActiveEffect> {
        self.world
            .get::<&ActiveEffects>(entity)
            .map(|effects| effects.effects.clone())
            .unwrap_or_default()
    }

    pub fn has_effect(&self, entity: Entity, effect: &str) -> bool {
        self.world
            .get::<&ActiveEffects>(entity)
            .map(|effects| effects.has(effect))
            .unwrap_or(false)
    }

    pub fn item_count(&self, entity: Entity, item: &str) -> u32 {
        self.world
            .get::<&Inventory>(entity)
            .map(|inventory| inventory.count(item))
            .unwrap_or(0)
    }

    pub fn player_count(&self) -> usize {
        self.world.query::<&Player>().iter().count()
    }
}
