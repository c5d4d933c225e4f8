//! Event start: materialize brackets from registrations and put the event in motion.

use chrono::{DateTime, Utc};
use log::{error, info, warn};

use super::errors::{CompetitionError, CompetitionResult};
use super::manager::CompetitionManager;
use super::models::{Actor, Bracket, BracketStatus, Event, EventStatus, Phase};
use super::partition::{BracketPartition, partition_participants};
use crate::db::WriteBatch;

/// One pending bracket per nonempty bucket, in bucket order
pub fn build_brackets(event: &Event, partition: &BracketPartition, now: DateTime<Utc>) -> Vec<Bracket> {
    partition
        .buckets()
        .iter()
        .filter(|bucket| !bucket.participants.is_empty())
        .map(|bucket| {
            let config = event.modality_config(&bucket.modality);
            let total_participants = bucket.participants.len() as u32;
            let current_phase = if config.single_phase {
                Phase::terminal()
            } else {
                Phase::first()
            };

            Bracket {
                id: bucket.key(),
                event_id: event.id.clone(),
                modality: bucket.modality.clone(),
                category: bucket.category.clone(),
                gender_group: bucket.gender_group,
                current_phase,
                total_participants,
                blocks_per_heat: config.blocks_per_heat,
                tracks_per_block: config.tracks_per_block,
                total_heats: Bracket::total_heats_for(
                    total_participants,
                    config.blocks_per_heat,
                    config.tracks_per_block,
                ),
                completed_heats: 0,
                current_heat_index: 0,
                status: BracketStatus::Pending,
                created_at: now,
                updated_at: now,
                real_start_time: None,
                real_end_time: None,
            }
        })
        .collect()
}

impl CompetitionManager {
    /// Start a pending event.
    ///
    /// Creates one bracket per nonempty (modality, category, gender group)
    /// bucket, activates the first of them and flips the event to `Active`,
    /// all in a single batch.
    ///
    /// # Errors
    ///
    /// * `CompetitionError::InvalidState` - Event is not `Pending`
    /// * `CompetitionError::NoParticipants` - Nobody is registered; event untouched
    /// * `CompetitionError::PreconditionFailed` - Two buckets map to one bracket key
    ///   (names containing `_`); event untouched
    pub async fn start_event(&self, actor: &Actor, event_id: &str) -> CompetitionResult<Vec<Bracket>> {
        let mut event = self.load_event(event_id).await?;
        Self::authorize_manage(&event, actor)?;

        if event.status != EventStatus::Pending {
            return Err(CompetitionError::invalid_state(
                "Event",
                EventStatus::Pending,
                event.status,
            ));
        }

        let participants = self.participants.list_by_event(event_id).await?;
        if participants.is_empty() {
            return Err(CompetitionError::NoParticipants(event_id.to_string()));
        }

        let partition = partition_participants(participants, self.profiles.as_ref()).await;
        if let Some(key) = partition.colliding_key() {
            return Err(CompetitionError::PreconditionFailed(format!(
                "Two brackets of event {} share the key {}; rename the modality or category",
                event_id, key
            )));
        }
        let now = Utc::now();
        let mut brackets = build_brackets(&event, &partition, now);

        if let Some(first) = brackets.first_mut() {
            first.status = BracketStatus::Active;
            first.real_start_time = Some(now);
        }

        event.status = EventStatus::Active;
        event.current_bracket_id = brackets.first().map(|b| b.id.clone());
        event.real_start_time = Some(now);
        event.updated_at = now;

        let mut batch = WriteBatch::new();
        for bracket in &brackets {
            batch.put_bracket(bracket.clone());
        }
        batch.put_event(event);

        if let Err(e) = self.store.commit(batch).await {
            error!("Failed to start event {}: {}", event_id, e);
            self.revert_event_start(event_id).await;
            return Err(e);
        }

        info!(
            "Started event {} with {} bracket(s), first bracket {}",
            event_id,
            brackets.len(),
            brackets.first().map(|b| b.id.as_str()).unwrap_or("-")
        );
        Ok(brackets)
    }

    /// Put the event back to `Pending` after a failed start. Single attempt, never retried.
    async fn revert_event_start(&self, event_id: &str) {
        let event = match self.store.get_event(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                error!("Cannot revert start of event {}: event vanished", event_id);
                return;
            }
            Err(e) => {
                error!("Cannot revert start of event {}: {}", event_id, e);
                return;
            }
        };

        if event.status == EventStatus::Pending {
            warn!("Event {} still pending after failed start, nothing to revert", event_id);
            return;
        }

        let mut reverted = event;
        reverted.status = EventStatus::Pending;
        reverted.current_bracket_id = None;
        reverted.real_start_time = None;
        reverted.updated_at = Utc::now();

        let mut batch = WriteBatch::new();
        batch.put_event(reverted);
        match self.store.commit(batch).await {
            Ok(()) => warn!("Reverted event {} to pending after failed start", event_id),
            Err(e) => error!(
                "Revert of event {} failed, manual inspection required: {}",
                event_id, e
            ),
        }
    }
}
