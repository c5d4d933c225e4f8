//! Heat completion bookkeeping, cross-bracket progression and the read side for dashboards.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::errors::{CompetitionError, CompetitionResult};
use super::manager::CompetitionManager;
use super::models::{
    Actor, Bracket, BracketStatus, Event, EventProgress, EventStatus, Heat, HeatStatus,
};
use crate::db::WriteBatch;

impl CompetitionManager {
    /// Record that heat `heat_index` of a bracket has finished.
    ///
    /// `completed_heats` only ever grows: repeating the call, or calling it
    /// for an earlier heat, leaves it unchanged. `current_heat_index` follows
    /// the heat just closed. Closing the last heat completes the bracket and
    /// moves the event on in the same batch.
    ///
    /// A completed bracket whose event still points at it is progressed
    /// again on retry.
    ///
    /// # Errors
    ///
    /// * `CompetitionError::PreconditionFailed` - `heat_index` is out of range
    /// * `CompetitionError::InvalidState` - Bracket has not been activated yet
    pub async fn finalize_heat(
        &self,
        actor: &Actor,
        event_id: &str,
        bracket_id: &str,
        heat_index: u32,
    ) -> CompetitionResult<Bracket> {
        let event = self.load_event(event_id).await?;
        Self::authorize_close_heats(&event, actor)?;

        let mut bracket = self.load_bracket(event_id, bracket_id).await?;
        if heat_index >= bracket.total_heats {
            return Err(CompetitionError::PreconditionFailed(format!(
                "heat {} out of range, bracket {} has {} heat(s)",
                heat_index, bracket.id, bracket.total_heats
            )));
        }

        match bracket.status {
            BracketStatus::Completed => {
                if event_awaits_progression(&event, bracket_id) {
                    warn!(
                        "Bracket {} is completed but event {} never moved on, resuming",
                        bracket.id, event_id
                    );
                    self.on_bracket_completed(event_id, bracket_id).await?;
                } else {
                    debug!(
                        "Bracket {} already completed, ignoring heat {}",
                        bracket.id, heat_index
                    );
                }
                return Ok(bracket);
            }
            BracketStatus::Pending => {
                return Err(CompetitionError::invalid_state(
                    "Bracket",
                    BracketStatus::Active,
                    bracket.status,
                ));
            }
            BracketStatus::Active => {}
        }

        let now = Utc::now();
        let new_completed = bracket.completed_heats.max(heat_index + 1);
        bracket.completed_heats = new_completed;
        bracket.updated_at = now;

        let mut batch = WriteBatch::new();
        if let Some(mut heat) = self.store.get_heat(event_id, bracket_id, heat_index).await? {
            if heat.status != HeatStatus::Completed {
                heat.status = HeatStatus::Completed;
                batch.put_heat(event_id, bracket_id, heat);
            }
        }

        if new_completed < bracket.total_heats {
            bracket.current_heat_index = heat_index + 1;
            batch.advance_bracket(bracket.clone());
            self.store.commit(batch).await?;

            debug!(
                "Bracket {} progressed to {}/{} heats",
                bracket.id, new_completed, bracket.total_heats
            );
            return Ok(bracket);
        }

        bracket.status = BracketStatus::Completed;
        bracket.real_end_time = Some(now);
        batch.advance_bracket(bracket.clone());

        let brackets = self.store.list_brackets(event_id).await?;
        advance_event(event, &brackets, bracket_id, now, &mut batch);
        self.store.commit(batch).await?;

        info!(
            "Bracket {} of event {} completed after {} heat(s)",
            bracket.id, event_id, bracket.total_heats
        );
        Ok(bracket)
    }

    /// Activate the next open bracket, or complete the event when none is left.
    ///
    /// Brackets activate in creation order. Safe to repeat for the same bracket.
    ///
    /// # Errors
    ///
    /// * `CompetitionError::InvalidState` - The bracket is not completed yet
    pub async fn on_bracket_completed(
        &self,
        event_id: &str,
        bracket_id: &str,
    ) -> CompetitionResult<Event> {
        let event = self.load_event(event_id).await?;
        let brackets = self.store.list_brackets(event_id).await?;

        let bracket = brackets
            .iter()
            .find(|b| b.id == bracket_id)
            .ok_or_else(|| CompetitionError::BracketNotFound(bracket_id.to_string()))?;
        if bracket.status != BracketStatus::Completed {
            return Err(CompetitionError::invalid_state(
                "Bracket",
                BracketStatus::Completed,
                bracket.status,
            ));
        }

        if event.status == EventStatus::Completed {
            return Ok(event);
        }

        let mut batch = WriteBatch::new();
        let event = advance_event(event, &brackets, bracket_id, Utc::now(), &mut batch);
        self.store.commit(batch).await?;
        Ok(event)
    }

    /// Dashboard summary of an event
    pub async fn event_progress(&self, event_id: &str) -> CompetitionResult<EventProgress> {
        let event = self.load_event(event_id).await?;
        let brackets = self.store.list_brackets(event_id).await?;

        let current_bracket = event
            .current_bracket_id
            .as_deref()
            .and_then(|id| brackets.iter().find(|b| b.id == id))
            .cloned();

        Ok(EventProgress {
            total_brackets: brackets.len(),
            completed_brackets_count: event.completed_bracket_ids.len(),
            current_bracket,
            is_event_completed: event.status == EventStatus::Completed,
        })
    }

    /// Heat `index` of a bracket
    ///
    /// # Errors
    ///
    /// * `CompetitionError::HeatNotFound` - No heat with that index was generated
    pub async fn current_heat(
        &self,
        event_id: &str,
        bracket_id: &str,
        index: u32,
    ) -> CompetitionResult<Heat> {
        self.store
            .get_heat(event_id, bracket_id, index)
            .await?
            .ok_or_else(|| CompetitionError::HeatNotFound {
                bracket_id: bracket_id.to_string(),
                index,
            })
    }

    pub async fn get_event(&self, event_id: &str) -> CompetitionResult<Event> {
        self.load_event(event_id).await
    }

    /// Brackets of an event in creation (activation) order
    pub async fn list_brackets(&self, event_id: &str) -> CompetitionResult<Vec<Bracket>> {
        self.load_event(event_id).await?;
        self.store.list_brackets(event_id).await
    }

    pub async fn get_bracket(&self, event_id: &str, bracket_id: &str) -> CompetitionResult<Bracket> {
        self.load_bracket(event_id, bracket_id).await
    }

    pub async fn list_heats(&self, event_id: &str, bracket_id: &str) -> CompetitionResult<Vec<Heat>> {
        self.load_bracket(event_id, bracket_id).await?;
        self.store.list_heats(event_id, bracket_id).await
    }
}

/// Completed bracket not yet reflected on its event
fn event_awaits_progression(event: &Event, bracket_id: &str) -> bool {
    event.status != EventStatus::Completed
        && (!event.completed_bracket_ids.iter().any(|id| id == bracket_id)
            || event.current_bracket_id.as_deref() == Some(bracket_id))
}

/// Record `completed_id` on the event and hand over to the next open bracket.
///
/// Queues the event and any newly activated bracket on `batch`.
fn advance_event(
    mut event: Event,
    brackets: &[Bracket],
    completed_id: &str,
    now: DateTime<Utc>,
    batch: &mut WriteBatch,
) -> Event {
    if !event.completed_bracket_ids.iter().any(|id| id == completed_id) {
        event.completed_bracket_ids.push(completed_id.to_string());
    }

    match brackets
        .iter()
        .find(|b| b.id != completed_id && b.is_open())
    {
        Some(next) => {
            if next.status == BracketStatus::Pending {
                let mut next = next.clone();
                next.status = BracketStatus::Active;
                next.real_start_time = Some(now);
                next.updated_at = now;
                batch.put_bracket(next);
            }
            info!("Event {} moves on to bracket {}", event.id, next.id);
            event.current_bracket_id = Some(next.id.clone());
        }
        None => {
            event.status = EventStatus::Completed;
            event.current_bracket_id = None;
            event.real_end_time = Some(now);
            info!(
                "Event {} completed with {} bracket(s)",
                event.id,
                event.completed_bracket_ids.len()
            );
        }
    }

    event.updated_at = now;
    batch.put_event(event.clone());
    event
}
