//! Competition progression engine.
//!
//! This module turns an event's registrations into brackets and runs them:
//! - Bracket partitioning by modality, category and gender group
//! - Bracket creation and event start as one atomic batch
//! - Heat generation with a preview/confirm split
//! - Idempotent heat completion bookkeeping
//! - Activation of the next bracket and event completion
//!
//! ## Example
//!
//! ```no_run
//! use dance_live::competition::{Actor, CompetitionManager};
//! use dance_live::db::InMemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let manager = CompetitionManager::in_memory(store);
//!     let organizer = Actor::new("organizer-1");
//!
//!     let brackets = manager.start_event(&organizer, "spring-open").await?;
//!     let plan = manager
//!         .plan_heats(&organizer, "spring-open", &brackets[0].id)
//!         .await?;
//!     println!("Heat sizes: {:?}", plan.heat_sizes());
//!     manager.confirm_heats(&organizer, plan).await?;
//!
//!     manager
//!         .finalize_heat(&organizer, "spring-open", &brackets[0].id, 0)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod heats;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod partition;
pub mod progress;

pub use errors::{CompetitionError, CompetitionResult};
pub use heats::{HeatPlan, HeatPlanner};
pub use lifecycle::build_brackets;
pub use manager::CompetitionManager;
pub use models::{
    Actor, Block, BlockEntry, Bracket, BracketId, BracketStatus, Event, EventId, EventProgress,
    EventStatus, GenderGroup, Heat, HeatStatus, JudgeScore, ModalityConfig, Participant,
    ParticipantId, Phase, StaffMember, StaffPermissions, UserId, bracket_key, heat_id,
};
pub use partition::{BracketBucket, BracketPartition, normalize_gender, partition_participants};
