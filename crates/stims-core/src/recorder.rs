//! Use recorder - the entry point for consuming a stim
//!
//! Gates the action to the authoritative side, applies the immediate
//! effect, shrinks the stack and hands the comedown to the scheduler.
//! Every failure is a logged no-op: a bad stim use must never take down a
//! tick that other subjects share.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stims_logic::catalog::{StimCatalog, StimKind};
use stims_logic::config::StimsConfig;
use stims_logic::effects::EffectSink;
use stims_logic::error::StimError;
use stims_logic::items::{ItemStack, SubjectId};

use crate::scheduler::DelayedEffectScheduler;

/// Which execution context an interaction arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionSide {
    /// Owns the world state
    Server,
    /// Presentation-only echo of the interaction
    Client,
}

impl ExecutionSide {
    pub fn is_authoritative(self) -> bool {
        matches!(self, ExecutionSide::Server)
    }
}

/// Result reported back to the interaction layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed {
        kind: StimKind,
        /// Status effects applied immediately
        effects_applied: usize,
        /// Whether a comedown was scheduled
        scheduled: bool,
        branch: Option<usize>,
    },
    Rejected(StimError),
}

impl ConsumeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConsumeOutcome::Consumed { .. })
    }

    pub fn error(&self) -> Option<&StimError> {
        match self {
            ConsumeOutcome::Rejected(e) => Some(e),
            ConsumeOutcome::Consumed { .. } => None,
        }
    }
}

pub struct UseRecorder {
    catalog: Arc<StimCatalog>,
    scheduler: Arc<DelayedEffectScheduler>,
    rng: Mutex<StdRng>,
}

impl UseRecorder {
    /// Shares the scheduler's catalog. `config.rng_seed` makes branch draws
    /// reproducible.
    pub fn new(scheduler: Arc<DelayedEffectScheduler>, config: &StimsConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            catalog: Arc::clone(scheduler.catalog()),
            scheduler,
            rng: Mutex::new(rng),
        }
    }

    pub fn scheduler(&self) -> &Arc<DelayedEffectScheduler> {
        &self.scheduler
    }

    /// Consume one item of `stack` as a use of `kind` by `subject` at `now`.
    pub fn on_consume(
        &self,
        side: ExecutionSide,
        subject: SubjectId,
        stack: &mut ItemStack,
        kind: &StimKind,
        now: u64,
        sink: &mut dyn EffectSink,
    ) -> ConsumeOutcome {
        if !side.is_authoritative() {
            log::debug!("Ignoring {} use by {} on client side", kind, subject);
            return ConsumeOutcome::Rejected(StimError::RejectedContext);
        }

        let Some(entry) = self.catalog.entry(kind) else {
            log::warn!("Unknown stim {} used by {}", kind, subject);
            return ConsumeOutcome::Rejected(StimError::UnknownStimKind(kind.clone()));
        };

        if stack.is_empty() {
            log::warn!("{} tried to use {} from an empty stack", subject, kind);
            return ConsumeOutcome::Rejected(StimError::EmptyStack);
        }

        let branch = self.draw_branch(entry.branch_count());
        let effects_applied = match self.catalog.apply_on_use(
            subject,
            kind,
            entry.profile.effect_duration,
            branch,
            sink,
        ) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("Stim use by {} failed: {}", subject, e);
                return ConsumeOutcome::Rejected(e);
            }
        };

        stack.shrink(1);
        let scheduled = self.scheduler.register(subject, kind.clone(), now, branch);

        log::debug!(
            "{} used {} at tick {} ({} effects, comedown {})",
            subject,
            kind,
            now,
            effects_applied,
            if scheduled { "scheduled" } else { "none" }
        );

        ConsumeOutcome::Consumed {
            kind: kind.clone(),
            effects_applied,
            scheduled,
            branch,
        }
    }

    fn draw_branch(&self, branch_count: usize) -> Option<usize> {
        if branch_count == 0 {
            None
        } else {
            Some(self.rng.lock().gen_range(0..branch_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stims_logic::catalog::{StimEntry, StimProfile};
    use stims_logic::constants::effect_names::*;
    use stims_logic::effects::{EffectBuffer, EffectRecipe, EffectSpec};

    const P: SubjectId = SubjectId(9);

    fn recorder(seed: u64) -> UseRecorder {
        let catalog = Arc::new(StimCatalog::new(vec![
            StimEntry::new("k", "k_injector", StimProfile::new(true, 90, 60, 20))
                .with_on_use(EffectRecipe::fixed(vec![EffectSpec::new(REGENERATION)]))
                .with_after_delay(EffectRecipe::fixed(vec![EffectSpec::new(BLINDNESS)])),
            StimEntry::new("inert", "inert_injector", StimProfile::immediate_only(10))
                .with_on_use(EffectRecipe::fixed(vec![EffectSpec::new(HASTE)])),
            StimEntry::new("dice", "dice_injector", StimProfile::new(true, 1, 5, 5))
                .with_on_use(EffectRecipe::one_of(vec![
                    vec![EffectSpec::new(SPEED)],
                    vec![EffectSpec::new(HASTE)],
                    vec![EffectSpec::new(RESISTANCE)],
                    vec![EffectSpec::new(NIGHT_VISION)],
                ]))
                .with_after_delay(EffectRecipe::one_of(vec![
                    vec![EffectSpec::new(SLOWNESS)],
                    vec![EffectSpec::new(MINING_FATIGUE)],
                    vec![EffectSpec::new(WEAKNESS)],
                    vec![EffectSpec::new(NAUSEA)],
                ])),
        ]));
        let scheduler = Arc::new(DelayedEffectScheduler::new(catalog));
        UseRecorder::new(scheduler, &StimsConfig::default().with_seed(seed))
    }

    #[test]
    fn test_consume_applies_and_schedules() {
        let rec = recorder(1);
        let mut stack = ItemStack::new("k_injector", 2);
        let mut sink = EffectBuffer::new();

        let outcome = rec.on_consume(
            ExecutionSide::Server,
            P,
            &mut stack,
            &StimKind::new("k"),
            40,
            &mut sink,
        );
        assert_eq!(
            outcome,
            ConsumeOutcome::Consumed {
                kind: StimKind::new("k"),
                effects_applied: 1,
                scheduled: true,
                branch: None,
            }
        );
        assert_eq!(stack.count, 1);
        assert_eq!(sink.applied[0].1.effect, REGENERATION);
        assert_eq!(sink.applied[0].1.duration_ticks, 1200);
        assert_eq!(rec.scheduler().snapshot()[0].start_tick, 40);
    }

    #[test]
    fn test_client_side_is_rejected_without_mutation() {
        let rec = recorder(1);
        let mut stack = ItemStack::new("k_injector", 2);
        let mut sink = EffectBuffer::new();

        let outcome = rec.on_consume(
            ExecutionSide::Client,
            P,
            &mut stack,
            &StimKind::new("k"),
            0,
            &mut sink,
        );
        assert_eq!(outcome, ConsumeOutcome::Rejected(StimError::RejectedContext));
        assert!(!outcome.is_success());
        assert_eq!(stack.count, 2);
        assert!(sink.is_empty());
        assert!(rec.scheduler().is_empty());
    }

    #[test]
    fn test_unknown_kind_is_noop() {
        let rec = recorder(1);
        let mut stack = ItemStack::new("needle", 1);
        let mut sink = EffectBuffer::new();
        let outcome = rec.on_consume(
            ExecutionSide::Server,
            P,
            &mut stack,
            &StimKind::new("needle"),
            0,
            &mut sink,
        );
        assert_eq!(
            outcome.error(),
            Some(&StimError::UnknownStimKind(StimKind::new("needle")))
        );
        assert_eq!(stack.count, 1);
        assert!(sink.is_empty());
        assert!(rec.scheduler().is_empty());
    }

    #[test]
    fn test_empty_stack_is_noop() {
        let rec = recorder(1);
        let mut stack = ItemStack::new("k_injector", 0);
        let mut sink = EffectBuffer::new();
        let outcome = rec.on_consume(
            ExecutionSide::Server,
            P,
            &mut stack,
            &StimKind::new("k"),
            0,
            &mut sink,
        );
        assert_eq!(outcome, ConsumeOutcome::Rejected(StimError::EmptyStack));
        assert!(sink.is_empty());
        assert!(rec.scheduler().is_empty());
    }

    #[test]
    fn test_inert_kind_consumed_but_not_scheduled() {
        let rec = recorder(1);
        let mut stack = ItemStack::new("inert_injector", 1);
        let mut sink = EffectBuffer::new();
        let outcome = rec.on_consume(
            ExecutionSide::Server,
            P,
            &mut stack,
            &StimKind::new("inert"),
            0,
            &mut sink,
        );
        assert!(matches!(
            outcome,
            ConsumeOutcome::Consumed { scheduled: false, .. }
        ));
        assert!(stack.is_empty());
        assert_eq!(sink.len(), 1);
        assert!(rec.scheduler().is_empty());
    }

    #[test]
    fn test_branch_drawn_once_and_reused() {
        let rec = recorder(7);
        let dice = StimKind::new("dice");
        let immediate = [SPEED, HASTE, RESISTANCE, NIGHT_VISION];
        let comedown = [SLOWNESS, MINING_FATIGUE, WEAKNESS, NAUSEA];

        for i in 0..20u64 {
            let subject = SubjectId(100 + i);
            let mut stack = ItemStack::new("dice_injector", 1);
            let mut sink = EffectBuffer::new();
            let outcome =
                rec.on_consume(ExecutionSide::Server, subject, &mut stack, &dice, 0, &mut sink);
            let branch = match &outcome {
                ConsumeOutcome::Consumed {
                    branch: Some(branch),
                    ..
                } => *branch,
                other => panic!("expected a drawn branch, got {:?}", other),
            };
            assert!(branch < 4);
            assert_eq!(sink.applied[0].1.effect, immediate[branch]);

            let mut later = EffectBuffer::new();
            rec.scheduler().on_tick(20, &mut later);
            assert_eq!(later.for_subject(subject)[0].effect, comedown[branch]);
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let draws = |seed| {
            let rec = recorder(seed);
            (0..10).map(|_| rec.draw_branch(4)).collect::<Vec<_>>()
        };
        assert_eq!(draws(42), draws(42));
        assert_eq!(recorder(1).draw_branch(0), None);
    }
}
