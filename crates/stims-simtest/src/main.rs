//! Stims Headless Simulation Harness
//!
//! Validates catalog data and stim timing without a game engine.
//! Runs entirely in-process with no networking and no rendering.
//!
//! Usage:
//!   cargo run -p stims-simtest
//!   cargo run -p stims-simtest -- --verbose
//!
//! Log level comes from `STIMS_LOG` (e.g. `STIMS_LOG=debug`).

use std::sync::Arc;

use log::LevelFilter;
use serde::Deserialize;
use stims_core::engine::{subject_of, StimWorld};
use stims_core::recorder::{ConsumeOutcome, ExecutionSide, UseRecorder};
use stims_core::scheduler::DelayedEffectScheduler;
use stims_logic::catalog::{StimCatalog, StimKind};
use stims_logic::config::StimsConfig;
use stims_logic::constants::{effect_names, stim_kinds, DEFAULT_TOOLTIP};
use stims_logic::effects::EffectBuffer;
use stims_logic::error::StimError;
use stims_logic::items::{ItemStack, SubjectId};
use stims_logic::timing::seconds_to_ticks;

// ── Stim data (same JSON the catalog embeds) ────────────────────────────
const STIMS_JSON: &str = include_str!("../../../data/stims.json");

#[derive(Debug, Deserialize)]
struct RawCatalog {
    stims: Vec<RawStim>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawStim {
    kind: String,
    item: String,
    tooltip: Option<String>,
    profile: serde_json::Value,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn init_logging(verbose: bool) {
    let level = std::env::var("STIMS_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        });
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    init_logging(verbose);
    println!("=== Stims Simulation Harness ===\n");

    let catalog = match StimCatalog::builtin() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            println!("  ✗ catalog_parse: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Catalog data validation
    results.extend(validate_catalog_data(&catalog, verbose));

    // 2. Per-kind comedown timing
    results.extend(validate_comedown_timing(&catalog, verbose));

    // 3. Consume gating
    results.extend(validate_consume_gating(&catalog, verbose));

    // 4. Random branch coupling
    results.extend(validate_branch_coupling(&catalog, verbose));

    // 5. Multi-player world run
    results.extend(validate_world_run(verbose));

    // 6. Concurrent registration
    results.extend(validate_concurrent_registration(&catalog, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Catalog Data ─────────────────────────────────────────────────────

fn validate_catalog_data(catalog: &StimCatalog, verbose: bool) -> Vec<TestResult> {
    println!("--- Catalog Data ---");
    let mut results = Vec::new();

    let raw: RawCatalog = match serde_json::from_str(STIMS_JSON) {
        Ok(r) => r,
        Err(e) => {
            results.push(TestResult {
                name: "catalog_json_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "catalog_not_empty".into(),
        passed: raw.stims.len() == catalog.len() && !catalog.is_empty(),
        detail: format!("{} stims loaded", catalog.len()),
    });

    let issues = catalog.validate();
    results.push(TestResult {
        name: "catalog_consistent".into(),
        passed: issues.is_empty(),
        detail: if issues.is_empty() {
            "no stale config".into()
        } else {
            issues
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    let unknown: Vec<String> = catalog
        .kinds()
        .filter_map(|k| catalog.entry(k))
        .flat_map(|e| {
            e.on_use
                .all_specs()
                .into_iter()
                .chain(e.after_delay.all_specs())
                .filter(|s| !effect_names::is_known(&s.effect))
                .map(move |s| format!("{}:{}", e.kind, s.effect))
        })
        .collect();
    results.push(TestResult {
        name: "catalog_known_effects".into(),
        passed: unknown.is_empty(),
        detail: if unknown.is_empty() {
            "all effect names recognized".into()
        } else {
            format!("unknown effects: {}", unknown.join(", "))
        },
    });

    let untitled: Vec<&str> = raw
        .stims
        .iter()
        .filter(|s| s.tooltip.is_none())
        .map(|s| s.kind.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_tooltips".into(),
        passed: untitled.is_empty()
            && catalog.tooltip(&StimKind::new("injector")) == DEFAULT_TOOLTIP,
        detail: if untitled.is_empty() {
            "every stim has a tooltip, unknown kinds fall back".into()
        } else {
            format!("missing tooltips: {}", untitled.join(", "))
        },
    });

    let items_resolve = raw
        .stims
        .iter()
        .all(|s| catalog.kind_for_item(&s.item).map(|k| k.as_str()) == Some(s.kind.as_str()));
    results.push(TestResult {
        name: "catalog_items_resolve".into(),
        passed: items_resolve,
        detail: "every item maps back to its stim".into(),
    });

    if verbose {
        for kind in catalog.kinds() {
            if let Some(p) = catalog.profile(kind) {
                println!(
                    "  {:<14} delay={:>3}s effect={:>3}s comedown={:>3}s",
                    kind.as_str(),
                    p.delay_seconds,
                    p.effect_duration,
                    p.after_delay_effect_duration
                );
            }
        }
    }

    results
}

// ── 2. Comedown Timing ──────────────────────────────────────────────────

fn validate_comedown_timing(catalog: &Arc<StimCatalog>, verbose: bool) -> Vec<TestResult> {
    println!("--- Comedown Timing ---");
    let mut results = Vec::new();

    for kind in catalog.kinds() {
        let Some(profile) = catalog.profile(kind) else {
            continue;
        };
        if !profile.has_after_delay_effect {
            continue;
        }
        let scheduler = DelayedEffectScheduler::new(Arc::clone(catalog));
        let start = 37;
        scheduler.register(SubjectId(1), kind.clone(), start, Some(0));

        let delay_ticks = seconds_to_ticks(profile.delay_seconds, scheduler.ticks_per_second());
        let expected = start + delay_ticks;
        let mut sink = EffectBuffer::new();
        let mut fired_at = Vec::new();
        for tick in start..=expected + 200 {
            if scheduler.on_tick(tick, &mut sink).fired > 0 {
                fired_at.push(tick);
            }
        }

        results.push(TestResult {
            name: format!("timing_{}", kind),
            passed: fired_at == vec![expected] && !sink.is_empty() && scheduler.is_empty(),
            detail: format!("fired at {:?}, expected [{}]", fired_at, expected),
        });
        if verbose {
            println!("  {} comedown at tick {}", kind, expected);
        }
    }

    results
}

// ── 3. Consume Gating ───────────────────────────────────────────────────

fn validate_consume_gating(catalog: &Arc<StimCatalog>, _verbose: bool) -> Vec<TestResult> {
    println!("--- Consume Gating ---");
    let mut results = Vec::new();
    let config = StimsConfig::default().with_seed(5);
    let scheduler = Arc::new(DelayedEffectScheduler::new(Arc::clone(catalog)));
    let recorder = UseRecorder::new(Arc::clone(&scheduler), &config);
    let propital = StimKind::new(stim_kinds::PROPITAL);

    // Client echo
    let mut stack = ItemStack::new("propital_injector", 2);
    let mut sink = EffectBuffer::new();
    let outcome = recorder.on_consume(
        ExecutionSide::Client,
        SubjectId(1),
        &mut stack,
        &propital,
        0,
        &mut sink,
    );
    results.push(TestResult {
        name: "gating_client_rejected".into(),
        passed: outcome == ConsumeOutcome::Rejected(StimError::RejectedContext)
            && stack.count == 2
            && sink.is_empty()
            && scheduler.is_empty(),
        detail: format!("{:?}", outcome),
    });

    // Unknown kind
    let mut stack = ItemStack::new("rust", 1);
    let outcome = recorder.on_consume(
        ExecutionSide::Server,
        SubjectId(1),
        &mut stack,
        &StimKind::new("rust"),
        0,
        &mut sink,
    );
    results.push(TestResult {
        name: "gating_unknown_kind".into(),
        passed: matches!(outcome, ConsumeOutcome::Rejected(StimError::UnknownStimKind(_)))
            && stack.count == 1
            && scheduler.is_empty(),
        detail: format!("{:?}", outcome),
    });

    // Empty stack
    let mut stack = ItemStack::new("propital_injector", 0);
    let outcome = recorder.on_consume(
        ExecutionSide::Server,
        SubjectId(1),
        &mut stack,
        &propital,
        0,
        &mut sink,
    );
    results.push(TestResult {
        name: "gating_empty_stack".into(),
        passed: outcome == ConsumeOutcome::Rejected(StimError::EmptyStack) && sink.is_empty(),
        detail: format!("{:?}", outcome),
    });

    // Server use
    let mut stack = ItemStack::new("propital_injector", 2);
    let outcome = recorder.on_consume(
        ExecutionSide::Server,
        SubjectId(1),
        &mut stack,
        &propital,
        0,
        &mut sink,
    );
    results.push(TestResult {
        name: "gating_server_consumes".into(),
        passed: outcome.is_success() && stack.count == 1 && scheduler.pending_count() == 1,
        detail: format!("{:?}, {} left", outcome, stack.count),
    });

    results
}

// ── 4. Branch Coupling ──────────────────────────────────────────────────

fn validate_branch_coupling(catalog: &Arc<StimCatalog>, _verbose: bool) -> Vec<TestResult> {
    println!("--- Branch Coupling ---");
    let mut results = Vec::new();
    let kind = StimKind::new(stim_kinds::OBDOLBOS);
    let Some(entry) = catalog.entry(&kind) else {
        results.push(TestResult {
            name: "branch_kind_present".into(),
            passed: false,
            detail: format!("{} missing from catalog", kind),
        });
        return results;
    };

    let config = StimsConfig::default().with_seed(99);
    let scheduler = Arc::new(DelayedEffectScheduler::new(Arc::clone(catalog)));
    let recorder = UseRecorder::new(Arc::clone(&scheduler), &config);

    let mut seen = vec![0u32; entry.branch_count()];
    let mut mismatches = 0;
    for i in 0..200u64 {
        let subject = SubjectId(i);
        let mut stack = ItemStack::new(entry.item.clone(), 1);
        let mut sink = EffectBuffer::new();
        let ConsumeOutcome::Consumed {
            branch: Some(branch),
            ..
        } = recorder.on_consume(ExecutionSide::Server, subject, &mut stack, &kind, 0, &mut sink)
        else {
            mismatches += 1;
            continue;
        };
        seen[branch] += 1;

        let mut expected = EffectBuffer::new();
        let resolved = catalog.apply_after_delay(
            subject,
            &kind,
            entry.profile.after_delay_effect_duration,
            Some(branch),
            &mut expected,
        );
        let mut later = EffectBuffer::new();
        scheduler.on_tick(u64::MAX, &mut later);
        match resolved {
            Ok(n) if n > 0 && later.applied == expected.applied => {}
            _ => mismatches += 1,
        }
    }

    results.push(TestResult {
        name: "branch_comedown_matches_draw".into(),
        passed: mismatches == 0,
        detail: format!("{} mismatches over 200 uses", mismatches),
    });
    results.push(TestResult {
        name: "branch_all_reachable".into(),
        passed: seen.iter().all(|&n| n > 0),
        detail: format!("branch counts {:?}", seen),
    });

    results
}

// ── 5. World Run ────────────────────────────────────────────────────────

fn validate_world_run(verbose: bool) -> Vec<TestResult> {
    println!("--- World Run ---");
    let mut results = Vec::new();

    let catalog = match StimCatalog::builtin() {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "world_catalog".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    let items: Vec<String> = catalog
        .kinds()
        .filter_map(|k| catalog.entry(k).map(|e| e.item.clone()))
        .collect();
    let mut world = match StimWorld::new(catalog, StimsConfig::default().with_seed(2024)) {
        Ok(world) => world,
        Err(e) => {
            results.push(TestResult {
                name: "world_config".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    let players: Vec<_> = (0..12)
        .map(|i| world.spawn_player(&format!("player{}", i)))
        .collect();
    for (i, &p) in players.iter().enumerate() {
        world.give(p, &items[i % items.len()], 2);
        world.give(p, &items[(i + 3) % items.len()], 2);
    }

    // Staggered uses: every player uses something every 10 seconds
    let mut scheduled = 0;
    let mut consumed = 0;
    for round in 0..4 {
        for (i, &p) in players.iter().enumerate() {
            let slot = (round + i) % 2;
            if let ConsumeOutcome::Consumed { scheduled: s, .. } =
                world.use_item(p, slot, ExecutionSide::Server)
            {
                consumed += 1;
                if s {
                    scheduled += 1;
                }
            }
        }
        world.run(200);
    }

    // One player leaves mid-flight
    let leaver = players[0];
    let leaver_pending = world.scheduler().pending_for(subject_of(leaver));
    world.despawn(leaver);
    let expected_fires = scheduled - leaver_pending;

    let mut fired = 0;
    let mut idle = 0;
    while !world.scheduler().is_empty() && idle < 10_000 {
        let report = world.tick();
        fired += report.fired;
        idle += 1;
    }

    results.push(TestResult {
        name: "world_all_uses_consumed".into(),
        passed: consumed == 48,
        detail: format!("{} of 48 uses consumed", consumed),
    });
    results.push(TestResult {
        name: "world_every_comedown_once".into(),
        passed: fired == expected_fires,
        detail: format!(
            "{} fired, {} expected ({} purged with leaver)",
            fired, expected_fires, leaver_pending
        ),
    });
    results.push(TestResult {
        name: "world_pending_drained".into(),
        passed: world.scheduler().is_empty(),
        detail: format!("drained by tick {}", world.current_tick()),
    });
    results.push(TestResult {
        name: "world_inventories_empty".into(),
        passed: players[1..]
            .iter()
            .all(|&p| items.iter().all(|item| world.item_count(p, item) == 0)),
        detail: "all stims used up".into(),
    });

    if verbose {
        for &p in &players[1..4] {
            let names: Vec<String> = world
                .effects_of(p)
                .into_iter()
                .map(|e| format!("{}({}t)", e.effect, e.remaining_ticks))
                .collect();
            println!("  {}: {}", subject_of(p), names.join(", "));
        }
    }

    results
}

// ── 6. Concurrent Registration ──────────────────────────────────────────

fn validate_concurrent_registration(catalog: &Arc<StimCatalog>, _verbose: bool) -> Vec<TestResult> {
    println!("--- Concurrent Registration ---");
    let mut results = Vec::new();
    let scheduler = Arc::new(DelayedEffectScheduler::new(Arc::clone(catalog)));
    let kind = StimKind::new(stim_kinds::ETG_C);

    let total_fired = std::thread::scope(|s| {
        for t in 0..4u64 {
            let scheduler = Arc::clone(&scheduler);
            let kind = kind.clone();
            s.spawn(move || {
                for i in 0..250u64 {
                    scheduler.register(SubjectId(t * 1000 + i), kind.clone(), i, None);
                }
            });
        }
        let ticker = s.spawn({
            let scheduler = Arc::clone(&scheduler);
            move || {
                let mut sink = EffectBuffer::new();
                (0..2000u64)
                    .map(|tick| scheduler.on_tick(tick, &mut sink).fired)
                    .sum::<usize>()
            }
        });
        ticker.join().unwrap_or(0)
    });

    let mut sink = EffectBuffer::new();
    let late = scheduler.on_tick(u64::MAX, &mut sink).fired;
    results.push(TestResult {
        name: "concurrent_no_loss".into(),
        passed: total_fired + late == 1000 && scheduler.is_empty(),
        detail: format!("{} fired during run, {} after", total_fired, late),
    });

    results
}
