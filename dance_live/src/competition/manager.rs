//! Competition manager: entry point for every engine operation.

use log::{debug, info};
use std::sync::Arc;

use super::errors::{CompetitionError, CompetitionResult};
use super::heats::{HeatPlan, HeatPlanner};
use super::models::{Actor, Bracket, BracketStatus, Event, EventStatus, Participant};
use super::partition::partition_participants;
use crate::db::{
    CompetitionStore, InMemoryStore, ParticipantRepository, ProfileDirectory, WriteBatch,
};

/// Competition manager
///
/// Holds no competition state of its own; every call re-reads what it needs
/// from the store, so any number of managers may share one store.
#[derive(Clone)]
pub struct CompetitionManager {
    pub(super) store: Arc<dyn CompetitionStore>,
    pub(super) participants: Arc<dyn ParticipantRepository>,
    pub(super) profiles: Arc<dyn ProfileDirectory>,
}

impl CompetitionManager {
    /// Create a new competition manager
    ///
    /// # Arguments
    ///
    /// * `store` - Durable store for events, brackets and heats
    /// * `participants` - Registration subsystem
    /// * `profiles` - Competitor profile lookups
    pub fn new(
        store: Arc<dyn CompetitionStore>,
        participants: Arc<dyn ParticipantRepository>,
        profiles: Arc<dyn ProfileDirectory>,
    ) -> Self {
        Self {
            store,
            participants,
            profiles,
        }
    }

    /// Manager whose store and collaborators are all one in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn store(&self) -> &Arc<dyn CompetitionStore> {
        &self.store
    }

    pub(super) async fn load_event(&self, event_id: &str) -> CompetitionResult<Event> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| CompetitionError::EventNotFound(event_id.to_string()))
    }

    pub(super) async fn load_bracket(
        &self,
        event_id: &str,
        bracket_id: &str,
    ) -> CompetitionResult<Bracket> {
        self.store
            .get_bracket(event_id, bracket_id)
            .await?
            .ok_or_else(|| CompetitionError::BracketNotFound(bracket_id.to_string()))
    }

    pub(super) fn authorize_manage(event: &Event, actor: &Actor) -> CompetitionResult<()> {
        if event.can_manage(actor) {
            Ok(())
        } else {
            Err(CompetitionError::Forbidden {
                user_id: actor.user_id.clone(),
                action: "manage this event",
            })
        }
    }

    pub(super) fn authorize_close_heats(event: &Event, actor: &Actor) -> CompetitionResult<()> {
        if event.can_close_heats(actor) {
            Ok(())
        } else {
            Err(CompetitionError::Forbidden {
                user_id: actor.user_id.clone(),
                action: "close heats",
            })
        }
    }

    /// Participants of the bracket's bucket, re-derived from registrations
    async fn bracket_participants(&self, bracket: &Bracket) -> CompetitionResult<Vec<Participant>> {
        let candidates: Vec<Participant> = self
            .participants
            .list_by_event(&bracket.event_id)
            .await?
            .into_iter()
            .filter(|p| p.modality == bracket.modality && p.category == bracket.category)
            .collect();

        let partition = partition_participants(candidates, self.profiles.as_ref()).await;
        Ok(partition
            .into_buckets()
            .into_iter()
            .find(|b| b.key() == bracket.id)
            .map(|b| b.participants)
            .unwrap_or_default())
    }

    async fn ensure_no_heats(&self, bracket: &Bracket) -> CompetitionResult<()> {
        let existing = self.store.list_heats(&bracket.event_id, &bracket.id).await?;
        if existing.is_empty() {
            Ok(())
        } else {
            Err(CompetitionError::AlreadyGenerated(bracket.id.clone()))
        }
    }

    /// Preview the heats of a bracket without persisting anything.
    ///
    /// Calling this again yields a fresh shuffle; a discarded preview needs no cleanup.
    ///
    /// # Errors
    ///
    /// * `CompetitionError::AlreadyGenerated` - The bracket already has heats
    /// * `CompetitionError::PreconditionFailed` - Registrations no longer match the bracket
    pub async fn plan_heats(
        &self,
        actor: &Actor,
        event_id: &str,
        bracket_id: &str,
    ) -> CompetitionResult<HeatPlan> {
        let event = self.load_event(event_id).await?;
        Self::authorize_manage(&event, actor)?;

        if event.status != EventStatus::Active {
            return Err(CompetitionError::invalid_state(
                "Event",
                EventStatus::Active,
                event.status,
            ));
        }

        let bracket = self.load_bracket(event_id, bracket_id).await?;
        if bracket.status == BracketStatus::Completed {
            return Err(CompetitionError::invalid_state(
                "Bracket",
                BracketStatus::Active,
                bracket.status,
            ));
        }

        self.ensure_no_heats(&bracket).await?;

        let participants = self.bracket_participants(&bracket).await?;
        if participants.len() != bracket.total_participants as usize {
            return Err(CompetitionError::PreconditionFailed(format!(
                "bracket {} was created with {} participants but {} are registered now",
                bracket.id,
                bracket.total_participants,
                participants.len()
            )));
        }

        let plan = plan_with_thread_rng(&bracket, &participants, &event.opening_judges())?;
        debug!(
            "Planned {} heat(s) for bracket {} of event {}",
            plan.heats.len(),
            bracket.id,
            event_id
        );
        Ok(plan)
    }

    /// Persist a previously produced plan as one atomic batch
    ///
    /// # Errors
    ///
    /// * `CompetitionError::AlreadyGenerated` - Heats were confirmed in the meantime
    /// * `CompetitionError::PreconditionFailed` - The plan does not fit the bracket
    pub async fn confirm_heats(&self, actor: &Actor, plan: HeatPlan) -> CompetitionResult<()> {
        let event = self.load_event(&plan.event_id).await?;
        Self::authorize_manage(&event, actor)?;

        let bracket = self.load_bracket(&plan.event_id, &plan.bracket_id).await?;
        self.ensure_no_heats(&bracket).await?;

        if plan.heats.len() != bracket.total_heats as usize
            || plan.participant_count() != bracket.total_participants as usize
        {
            return Err(CompetitionError::PreconditionFailed(format!(
                "plan has {} heat(s) with {} participants, bracket {} expects {} with {}",
                plan.heats.len(),
                plan.participant_count(),
                bracket.id,
                bracket.total_heats,
                bracket.total_participants
            )));
        }

        let heat_count = plan.heats.len();
        let mut batch = WriteBatch::new();
        for heat in plan.heats {
            batch.put_heat(&plan.event_id, &plan.bracket_id, heat);
        }
        self.store.commit(batch).await?;

        info!(
            "Generated {} heat(s) for bracket {} of event {}",
            heat_count, plan.bracket_id, plan.event_id
        );
        Ok(())
    }
}

// ThreadRng is !Send, so it must never live across an await point
fn plan_with_thread_rng(
    bracket: &Bracket,
    participants: &[Participant],
    judges: &[String],
) -> CompetitionResult<HeatPlan> {
    HeatPlanner::new().plan(bracket, participants, judges)
}
