//! # Dance Live
//!
//! Progression engine for live dance-competition events.
//!
//! Registered competitors are partitioned into brackets (modality × category ×
//! gender group). Each bracket runs through its phases as a sequence of heats,
//! and every heat is split into blocks of competitors performing at the same
//! time in front of an assigned judge panel.
//!
//! ## Lifecycle
//!
//! - **Event**: `pending → active → completed`
//! - **Bracket**: `pending → active → completed`, one active bracket per event
//! - **Heat**: `pending → active → completed`; only completion is driven here
//!
//! All state lives in a [`db::CompetitionStore`]. Every multi-document change
//! is written as one atomic [`db::WriteBatch`], and heat completion is
//! idempotent, so concurrent organizer and judge clients may retry freely.
//!
//! ## Core Modules
//!
//! - [`competition`]: Partitioning, bracket lifecycle, heat generation and progression
//! - [`db`]: Store and collaborator traits, PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use dance_live::competition::{Bracket, Phase};
//!
//! // 10 participants in heats of 2 blocks × 3 tracks
//! assert_eq!(Bracket::total_heats_for(10, 2, 3), 2);
//! assert_eq!(Phase::first(), Phase::Eliminatoria);
//! ```

/// Competition progression engine.
pub mod competition;
pub use competition::{
    Actor, CompetitionError, CompetitionManager, CompetitionResult, EventProgress, HeatPlan,
};

/// Durable store and collaborator interfaces.
pub mod db;
