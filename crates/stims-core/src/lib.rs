//! Stims Core - delayed two-phase effect runtime
//!
//! Consuming a stim applies its immediate effects right away and leaves a
//! pending use behind; a fixed number of ticks later the scheduler fires the
//! comedown exactly once.
//!
//! # Architecture
//!
//! - **[`UseRecorder`](recorder::UseRecorder)**: gates a consume to the
//!   authoritative side, applies the on-use recipe, registers the use
//! - **[`DelayedEffectScheduler`](scheduler::DelayedEffectScheduler)**: owns
//!   the pending uses, fires due comedowns on each tick
//! - **[`StimWorld`](engine::StimWorld)**: a small `hecs` world standing in
//!   for the host game (players, inventories, running effects)
//!
//! # Example
//!
//! ```rust,no_run
//! use stims_core::prelude::*;
//!
//! let mut world = StimWorld::with_builtin().expect("catalog");
//! let player = world.spawn_player("Alex");
//! world.give(player, "propital_injector", 1);
//! world.use_first(player, "propital_injector", ExecutionSide::Server);
//!
//! // Run the simulation at 20 ticks per second
//! loop {
//!     world.tick();
//! }
//! ```

pub mod components;
pub mod engine;
pub mod recorder;
pub mod scheduler;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::StimWorld;
    pub use crate::recorder::{ConsumeOutcome, ExecutionSide, UseRecorder};
    pub use crate::scheduler::{DelayedEffectScheduler, PendingUse, TickReport};
    pub use stims_logic::catalog::{StimCatalog, StimKind, StimProfile};
    pub use stims_logic::config::StimsConfig;
    pub use stims_logic::items::SubjectId;
}
