//! Household task accountability engine.
//!
//! Tasks move through a fixed lifecycle (claim, verification, dispute
//! vote, completion), swaps between members are rate-capped and credited
//! by lateness, and recurring tasks float their next deadline from the
//! completion timestamp. The [`engine::Engine`] facade is the only write
//! surface; everything else is a collaborator it reads from or emits to.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod jury;
pub mod notify;
pub mod recurrence;
pub mod roster;
pub mod scheduler;
pub mod state_machine;
pub mod store;
pub mod swap;
pub mod verification;
