//! Delayed effect scheduler - fires each stim's comedown exactly once
//!
//! Every consumed stim with an after-delay effect leaves a [`PendingUse`]
//! behind. The host calls [`DelayedEffectScheduler::on_tick`] once per world
//! tick; uses whose delay has run out fire their after-delay recipe and are
//! dropped from the set.
//!
//! The pending set sits behind a single lock so uses can be registered from
//! a network thread while the simulation thread is scanning.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use stims_logic::catalog::{StimCatalog, StimKind};
use stims_logic::config::StimsConfig;
use stims_logic::effects::EffectSink;
use stims_logic::error::StimError;
use stims_logic::items::SubjectId;
use stims_logic::timing::{delay_elapsed, seconds_to_ticks};

/// One outstanding comedown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUse {
    /// Who used the stim
    pub subject: SubjectId,
    /// Which stim
    pub kind: StimKind,
    /// World tick at the moment of use
    pub start_tick: u64,
    /// Random branch drawn at use time, reused for the comedown
    pub branch: Option<usize>,
}

/// What a single [`DelayedEffectScheduler::on_tick`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Uses whose after-delay effect fired
    pub fired: usize,
    /// Status effects handed to the sink
    pub effects_applied: usize,
    /// Uses still pending after this tick
    pub remaining: usize,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.fired += other.fired;
        self.effects_applied += other.effects_applied;
        self.remaining = other.remaining;
    }
}

/// Tracks pending uses across all subjects and stim kinds
///
/// Delays are measured at the catalog's tick rate, the same rate its
/// effect durations resolve at.
pub struct DelayedEffectScheduler {
    catalog: Arc<StimCatalog>,
    pending: Mutex<Vec<PendingUse>>,
}

impl DelayedEffectScheduler {
    pub fn new(catalog: Arc<StimCatalog>) -> Self {
        Self {
            catalog,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Scheduler running at `config.ticks_per_second`. The catalog is
    /// re-rated if it was built for another tick rate.
    pub fn from_config(catalog: Arc<StimCatalog>, config: &StimsConfig) -> Result<Self, StimError> {
        config.validate()?;
        let catalog = if catalog.ticks_per_second() == config.ticks_per_second {
            catalog
        } else {
            Arc::new(
                catalog
                    .as_ref()
                    .clone()
                    .with_tick_rate(config.ticks_per_second),
            )
        };
        Ok(Self::new(catalog))
    }

    pub fn catalog(&self) -> &Arc<StimCatalog> {
        &self.catalog
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.catalog.ticks_per_second()
    }

    /// Record a use. Returns whether it was scheduled.
    ///
    /// Kinds without an after-delay effect (or without a profile) are never
    /// stored, so every stored use is guaranteed to leave the set.
    pub fn register(
        &self,
        subject: SubjectId,
        kind: StimKind,
        start_tick: u64,
        branch: Option<usize>,
    ) -> bool {
        match self.catalog.profile(&kind) {
            None => {
                log::warn!("Not scheduling {} for {}: no profile", kind, subject);
                return false;
            }
            Some(profile) if !profile.has_after_delay_effect => {
                log::debug!("{} has no after-delay effect, nothing to schedule", kind);
                return false;
            }
            Some(_) => {}
        }

        log::debug!(
            "Scheduled {} comedown for {} (started at tick {})",
            kind,
            subject,
            start_tick
        );
        self.pending.lock().push(PendingUse {
            subject,
            kind,
            start_tick,
            branch,
        });
        true
    }

    /// Advance to `current_tick`, firing every use whose delay has elapsed.
    ///
    /// Resolved uses are marked during the scan and removed in one pass
    /// afterwards. Effects are applied once the lock is released, so the
    /// sink may call back into the scheduler.
    pub fn on_tick(&self, current_tick: u64, sink: &mut dyn EffectSink) -> TickReport {
        let ticks_per_second = self.ticks_per_second();
        let mut due = Vec::new();

        let remaining = {
            let mut pending = self.pending.lock();
            let mut resolved = vec![false; pending.len()];

            // register() only admits kinds with a comedown, and the catalog
            // never changes underneath us.
            for (i, pending_use) in pending.iter().enumerate() {
                let Some(profile) = self.catalog.profile(&pending_use.kind) else {
                    continue;
                };
                let delay_ticks = seconds_to_ticks(profile.delay_seconds, ticks_per_second);
                if delay_elapsed(pending_use.start_tick, current_tick, delay_ticks) {
                    due.push((pending_use.clone(), profile.after_delay_effect_duration));
                    resolved[i] = true;
                }
            }

            if !due.is_empty() {
                let mut marks = resolved.into_iter();
                pending.retain(|_| !marks.next().unwrap_or(false));
            }
            pending.len()
        };

        let mut effects_applied = 0;
        for (pending_use, duration) in &due {
            match self.catalog.apply_after_delay(
                pending_use.subject,
                &pending_use.kind,
                *duration,
                pending_use.branch,
                sink,
            ) {
                Ok(n) => {
                    effects_applied += n;
                    log::debug!(
                        "{} comedown fired for {} at tick {}",
                        pending_use.kind,
                        pending_use.subject,
                        current_tick
                    );
                }
                Err(e) => log::warn!("Comedown for {} skipped: {}", pending_use.subject, e),
            }
        }

        TickReport {
            fired: due.len(),
            effects_applied,
            remaining,
        }
    }

    /// Remove every pending use of `subject` without firing anything.
    /// Call when the subject leaves the world for good.
    pub fn purge_subject(&self, subject: SubjectId) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|u| u.subject != subject);
        let purged = before - pending.len();
        if purged > 0 {
            log::info!("Purged {} pending uses of {}", purged, subject);
        }
        purged
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Number of pending uses for one subject
    pub fn pending_for(&self, subject: SubjectId) -> usize {
        self.pending
            .lock()
            .iter()
            .filter(|u| u.subject == subject)
            .count()
    }

    /// Copy of the pending set, in registration order
    pub fn snapshot(&self) -> Vec<PendingUse> {
        self.pending.lock().clone()
    }

    /// Earliest tick at which some pending use will fire
    pub fn next_due_tick(&self) -> Option<u64> {
        let ticks_per_second = self.ticks_per_second();
        self.pending
            .lock()
            .iter()
            .filter_map(|u| {
                let profile = self.catalog.profile(&u.kind)?;
                let delay_ticks = seconds_to_ticks(profile.delay_seconds, ticks_per_second);
                Some(u.start_tick.saturating_add(delay_ticks))
            })
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stims_logic::catalog::{StimEntry, StimProfile};
    use stims_logic::constants::effect_names::*;
    use stims_logic::effects::{EffectBuffer, EffectRecipe, EffectSpec};

    const P: SubjectId = SubjectId(1);
    const Q: SubjectId = SubjectId(2);

    fn catalog() -> Arc<StimCatalog> {
        Arc::new(StimCatalog::new(vec![
            StimEntry::new("k", "k_item", StimProfile::new(true, 90, 60, 20))
                .with_on_use(EffectRecipe::fixed(vec![EffectSpec::new(REGENERATION)]))
                .with_after_delay(EffectRecipe::fixed(vec![EffectSpec::new(BLINDNESS)])),
            StimEntry::new("a", "a_item", StimProfile::new(true, 60, 30, 30))
                .with_on_use(EffectRecipe::fixed(vec![EffectSpec::new(STRENGTH)]))
                .with_after_delay(EffectRecipe::fixed(vec![EffectSpec::new(SLOWNESS)])),
            StimEntry::new("inert", "inert_item", StimProfile::immediate_only(10))
                .with_on_use(EffectRecipe::fixed(vec![EffectSpec::new(HASTE)])),
            StimEntry::new("coin", "coin_item", StimProfile::new(true, 1, 5, 5))
                .with_on_use(EffectRecipe::one_of(vec![
                    vec![EffectSpec::new(SPEED)],
                    vec![EffectSpec::new(HASTE)],
                ]))
                .with_after_delay(EffectRecipe::one_of(vec![
                    vec![EffectSpec::new(SLOWNESS)],
                    vec![EffectSpec::new(MINING_FATIGUE)],
                ])),
            StimEntry::new("instant", "instant_item", StimProfile::new(true, 0, 5, 3))
                .with_on_use(EffectRecipe::fixed(vec![EffectSpec::new(SPEED)]))
                .with_after_delay(EffectRecipe::fixed(vec![EffectSpec::new(WEAKNESS)])),
        ]))
    }

    fn scheduler() -> DelayedEffectScheduler {
        DelayedEffectScheduler::new(catalog())
    }

    #[test]
    fn test_fires_exactly_at_delay() {
        let sched = scheduler();
        assert!(sched.register(P, StimKind::new("k"), 0, None));
        let mut sink = EffectBuffer::new();

        let report = sched.on_tick(1799, &mut sink);
        assert_eq!(report.fired, 0);
        assert_eq!(sched.pending_count(), 1);
        assert!(sink.is_empty());

        let report = sched.on_tick(1800, &mut sink);
        assert_eq!(report.fired, 1);
        assert_eq!(report.remaining, 0);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.applied[0].1.effect, BLINDNESS);
        // after_delay_effect_duration = 20s
        assert_eq!(sink.applied[0].1.duration_ticks, 400);

        let report = sched.on_tick(5000, &mut sink);
        assert_eq!(report.fired, 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_zero_delay_fires_on_first_tick() {
        let sched = scheduler();
        assert!(sched.register(P, StimKind::new("instant"), 40, None));
        assert_eq!(sched.next_due_tick(), Some(40));

        let mut sink = EffectBuffer::new();
        let report = sched.on_tick(40, &mut sink);
        assert_eq!(report.fired, 1);
        assert_eq!(report.remaining, 0);
        assert_eq!(sink.applied[0].1.effect, WEAKNESS);
        assert_eq!(sink.applied[0].1.duration_ticks, 60);

        assert_eq!(sched.on_tick(41, &mut sink).fired, 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_ticks_per_second_follows_catalog() {
        let rated = catalog().as_ref().clone().with_tick_rate(5);
        let sched = DelayedEffectScheduler::new(Arc::new(rated));
        assert_eq!(sched.ticks_per_second(), 5);
        sched.register(P, StimKind::new("k"), 0, None);
        // 90s at 5 tps
        assert_eq!(sched.next_due_tick(), Some(450));

        let mut sink = EffectBuffer::new();
        assert_eq!(sched.on_tick(449, &mut sink).fired, 0);
        assert_eq!(sched.on_tick(450, &mut sink).fired, 1);
        // 20s blindness
        assert_eq!(sink.applied[0].1.duration_ticks, 100);
    }

    #[test]
    fn test_late_tick_still_fires_once() {
        let sched = scheduler();
        sched.register(P, StimKind::new("k"), 100, None);
        let mut sink = EffectBuffer::new();
        assert_eq!(sched.on_tick(10_000, &mut sink).fired, 1);
        assert_eq!(sched.on_tick(10_001, &mut sink).fired, 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_independent_kinds_resolve_separately() {
        let sched = scheduler();
        sched.register(P, StimKind::new("a"), 0, None);
        sched.register(P, StimKind::new("k"), 0, None);
        let mut sink = EffectBuffer::new();

        sched.on_tick(1200, &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.applied[0].1.effect, SLOWNESS);
        assert_eq!(sched.pending_count(), 1);

        sched.on_tick(1800, &mut sink);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.applied[1].1.effect, BLINDNESS);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_duplicate_uses_coexist() {
        let sched = scheduler();
        sched.register(P, StimKind::new("k"), 0, None);
        sched.register(P, StimKind::new("k"), 600, None);
        assert_eq!(sched.pending_for(P), 2);

        let mut sink = EffectBuffer::new();
        assert_eq!(sched.on_tick(1800, &mut sink).fired, 1);
        assert_eq!(sched.pending_for(P), 1);
        assert_eq!(sched.snapshot()[0].start_tick, 600);
        assert_eq!(sched.on_tick(2400, &mut sink).fired, 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_inert_kinds_never_scheduled() {
        let sched = scheduler();
        assert!(!sched.register(P, StimKind::new("inert"), 0, None));
        assert!(!sched.register(P, StimKind::new("unknown"), 0, None));
        assert!(sched.is_empty());

        let mut sink = EffectBuffer::new();
        for tick in [0, 1, 200, 1_000_000] {
            sched.on_tick(tick, &mut sink);
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn test_idle_tick_leaves_set_unchanged() {
        let sched = scheduler();
        sched.register(P, StimKind::new("k"), 0, None);
        sched.register(Q, StimKind::new("a"), 50, Some(1));
        let before = sched.snapshot();

        let mut sink = EffectBuffer::new();
        let report = sched.on_tick(100, &mut sink);
        assert_eq!(
            report,
            TickReport {
                remaining: 2,
                ..TickReport::default()
            }
        );
        assert_eq!(sched.snapshot(), before);
    }

    #[test]
    fn test_branch_carried_to_comedown() {
        let sched = scheduler();
        sched.register(P, StimKind::new("coin"), 0, Some(1));
        sched.register(Q, StimKind::new("coin"), 0, Some(0));
        let mut sink = EffectBuffer::new();
        sched.on_tick(20, &mut sink);
        assert_eq!(sink.for_subject(P)[0].effect, MINING_FATIGUE);
        assert_eq!(sink.for_subject(Q)[0].effect, SLOWNESS);
    }

    #[test]
    fn test_purge_subject() {
        let sched = scheduler();
        sched.register(P, StimKind::new("k"), 0, None);
        sched.register(P, StimKind::new("a"), 0, None);
        sched.register(Q, StimKind::new("k"), 0, None);

        assert_eq!(sched.purge_subject(P), 2);
        assert_eq!(sched.purge_subject(P), 0);

        let mut sink = EffectBuffer::new();
        sched.on_tick(1800, &mut sink);
        assert!(sink.for_subject(P).is_empty());
        assert_eq!(sink.for_subject(Q).len(), 1);
    }

    #[test]
    fn test_next_due_tick() {
        let sched = scheduler();
        assert_eq!(sched.next_due_tick(), None);
        sched.register(P, StimKind::new("k"), 0, None);
        sched.register(Q, StimKind::new("a"), 300, None);
        assert_eq!(sched.next_due_tick(), Some(1500));
    }

    #[test]
    fn test_register_during_scan_from_other_thread() {
        let sched = Arc::new(scheduler());
        std::thread::scope(|s| {
            for t in 0..4u64 {
                let sched = Arc::clone(&sched);
                s.spawn(move || {
                    for i in 0..50u64 {
                        sched.register(SubjectId(t), StimKind::new("a"), i, None);
                    }
                });
            }
            let sched = Arc::clone(&sched);
            s.spawn(move || {
                let mut sink = EffectBuffer::new();
                for tick in 0..100 {
                    sched.on_tick(tick, &mut sink);
                }
                assert!(sink.is_empty());
            });
        });
        assert_eq!(sched.pending_count(), 200);

        let mut sink = EffectBuffer::new();
        assert_eq!(sched.on_tick(10_000, &mut sink).fired, 200);
        assert!(sched.is_empty());
    }

    /// Sink that registers a follow-up use while effects are being applied.
    struct ChainingSink<'a> {
        scheduler: &'a DelayedEffectScheduler,
        applied: usize,
    }

    impl EffectSink for ChainingSink<'_> {
        fn apply(&mut self, subject: SubjectId, _effect: stims_logic::effects::StatusEffect) {
            self.applied += 1;
            self.scheduler.register(subject, StimKind::new("a"), 5000, None);
        }
    }

    #[test]
    fn test_sink_may_reenter_scheduler() {
        let sched = scheduler();
        sched.register(P, StimKind::new("k"), 0, None);
        let mut sink = ChainingSink {
            scheduler: &sched,
            applied: 0,
        };
        sched.on_tick(1800, &mut sink);
        assert_eq!(sink.applied, 1);
        assert_eq!(sched.pending_count(), 1);
    }
}
