//! Pure stim logic for Stims.
//!
//! This crate holds everything about stims that does not depend on a running
//! world: kind identifiers, per-kind timing profiles, effect recipes, the
//! data-driven catalog and tick arithmetic. Functions take plain data and
//! return results, so the scheduler and any host engine can share them.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Stim kinds, profiles, catalog loading and validation |
//! | [`config`] | Runtime tunables (tick rate, stack size, RNG seed) |
//! | [`constants`] | Tick rate, stack size, effect names, tooltip keys |
//! | [`effects`] | Effect recipes, resolved status effects, effect sinks |
//! | [`error`] | Error taxonomy shared by recorder and scheduler |
//! | [`items`] | Item stacks and the subject identifier |
//! | [`timing`] | Seconds/ticks conversion and delay checks |

pub mod catalog;
pub mod config;
pub mod constants;
pub mod effects;
pub mod error;
pub mod items;
pub mod timing;
