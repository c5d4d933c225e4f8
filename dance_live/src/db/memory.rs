//! In-memory implementation of the store and collaborator traits.
//!
//! Used by tests and by the server when no database URL is configured.
//! A single mutex guards all documents, so a batch commit is trivially atomic.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::repository::{
    CompetitionStore, ParticipantRepository, ProfileDirectory, WriteBatch, WriteOp,
};
use crate::competition::{
    Bracket, BracketId, CompetitionError, CompetitionResult, Event, EventId, Heat, Participant,
    UserId,
};

/// Injected outcome for an upcoming commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitFailure {
    /// Nothing is written
    Reject,
    /// Every write lands but the caller still sees an error, like a lost acknowledgement
    AfterApply,
}

#[derive(Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    /// Creation order per event
    brackets: HashMap<EventId, Vec<Bracket>>,
    heats: HashMap<(EventId, BracketId), BTreeMap<u32, Heat>>,
    participants: Vec<Participant>,
    genders: HashMap<UserId, String>,
    failing_lookups: HashSet<UserId>,
    commit_failures: VecDeque<CommitFailure>,
    commits: usize,
}

/// Document store held entirely in memory
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_event(self, event: Event) -> Self {
        self.insert_event(event);
        self
    }

    pub fn with_participant(self, participant: Participant) -> Self {
        self.insert_participant(participant);
        self
    }

    /// Register a competitor's raw gender field
    pub fn with_gender(self, user_id: &str, gender: &str) -> Self {
        self.inner()
            .genders
            .insert(user_id.to_string(), gender.to_string());
        self
    }

    /// Make profile lookups for this user fail
    pub fn with_failing_lookup(self, user_id: &str) -> Self {
        self.inner().failing_lookups.insert(user_id.to_string());
        self
    }

    pub fn insert_event(&self, event: Event) {
        self.inner().events.insert(event.id.clone(), event);
    }

    pub fn insert_participant(&self, participant: Participant) {
        self.inner().participants.push(participant);
    }

    /// Seed a bracket directly, bypassing the lifecycle manager
    pub fn insert_bracket(&self, bracket: Bracket) {
        Self::upsert_bracket(&mut self.inner(), bracket);
    }

    /// Reject the next commit without applying any of its writes.
    ///
    /// Injected failures queue up and are consumed one per commit.
    pub fn fail_next_commit(&self) {
        self.inner().commit_failures.push_back(CommitFailure::Reject);
    }

    /// Apply the next commit in full but report it as failed
    pub fn fail_next_commit_after_apply(&self) {
        self.inner()
            .commit_failures
            .push_back(CommitFailure::AfterApply);
    }

    /// Number of successfully applied batches
    pub fn commit_count(&self) -> usize {
        self.inner().commits
    }

    fn upsert_bracket(inner: &mut Inner, bracket: Bracket) {
        let brackets = inner.brackets.entry(bracket.event_id.clone()).or_default();
        match brackets.iter_mut().find(|b| b.id == bracket.id) {
            Some(existing) => *existing = bracket,
            None => brackets.push(bracket),
        }
    }
}

#[async_trait]
impl CompetitionStore for InMemoryStore {
    async fn get_event(&self, event_id: &str) -> CompetitionResult<Option<Event>> {
        Ok(self.inner().events.get(event_id).cloned())
    }

    async fn get_bracket(
        &self,
        event_id: &str,
        bracket_id: &str,
    ) -> CompetitionResult<Option<Bracket>> {
        Ok(self
            .inner()
            .brackets
            .get(event_id)
            .and_then(|bs| bs.iter().find(|b| b.id == bracket_id))
            .cloned())
    }

    async fn list_brackets(&self, event_id: &str) -> CompetitionResult<Vec<Bracket>> {
        Ok(self
            .inner()
            .brackets
            .get(event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_heats(&self, event_id: &str, bracket_id: &str) -> CompetitionResult<Vec<Heat>> {
        let key = (event_id.to_string(), bracket_id.to_string());
        Ok(self
            .inner()
            .heats
            .get(&key)
            .map(|hs| hs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_heat(
        &self,
        event_id: &str,
        bracket_id: &str,
        index: u32,
    ) -> CompetitionResult<Option<Heat>> {
        let key = (event_id.to_string(), bracket_id.to_string());
        Ok(self
            .inner()
            .heats
            .get(&key)
            .and_then(|hs| hs.get(&index))
            .cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> CompetitionResult<()> {
        let mut inner = self.inner();
        let failure = inner.commit_failures.pop_front();
        if failure == Some(CommitFailure::Reject) {
            return Err(CompetitionError::Storage(
                "injected commit failure".to_string(),
            ));
        }

        for op in batch.into_ops() {
            match op {
                WriteOp::PutEvent(event) => {
                    inner.events.insert(event.id.clone(), event);
                }
                WriteOp::PutBracket(bracket) => Self::upsert_bracket(&mut inner, bracket),
                WriteOp::AdvanceBracket(bracket) => {
                    let stored_completed = inner
                        .brackets
                        .get(&bracket.event_id)
                        .and_then(|bs| bs.iter().find(|b| b.id == bracket.id))
                        .map(|b| b.completed_heats);
                    if stored_completed.is_none_or(|c| c <= bracket.completed_heats) {
                        Self::upsert_bracket(&mut inner, bracket);
                    }
                }
                WriteOp::PutHeat {
                    event_id,
                    bracket_id,
                    heat,
                } => {
                    inner
                        .heats
                        .entry((event_id, bracket_id))
                        .or_default()
                        .insert(heat.index, heat);
                }
            }
        }
        inner.commits += 1;

        if failure == Some(CommitFailure::AfterApply) {
            return Err(CompetitionError::Storage(
                "injected failure after apply".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryStore {
    async fn list_by_event(&self, event_id: &str) -> CompetitionResult<Vec<Participant>> {
        Ok(self
            .inner()
            .participants
            .iter()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryStore {
    async fn gender_of(&self, user_id: &str) -> CompetitionResult<Option<String>> {
        let inner = self.inner();
        if inner.failing_lookups.contains(user_id) {
            return Err(CompetitionError::Storage(format!(
                "profile lookup failed for {}",
                user_id
            )));
        }
        Ok(inner.genders.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::{EventStatus, GenderGroup, Phase};

    fn bracket(event_id: &str, id: &str) -> Bracket {
        let now = chrono::Utc::now();
        Bracket {
            id: id.to_string(),
            event_id: event_id.to_string(),
            modality: "Salsa".to_string(),
            category: "Adult".to_string(),
            gender_group: GenderGroup::Mixed,
            current_phase: Phase::Eliminatoria,
            total_participants: 1,
            blocks_per_heat: 1,
            tracks_per_block: 1,
            total_heats: 1,
            completed_heats: 0,
            current_heat_index: 0,
            status: crate::competition::BracketStatus::Pending,
            created_at: now,
            updated_at: now,
            real_start_time: None,
            real_end_time: None,
        }
    }

    #[tokio::test]
    async fn test_brackets_keep_creation_order_on_update() {
        let store = InMemoryStore::new();
        store.insert_bracket(bracket("ev1", "b"));
        store.insert_bracket(bracket("ev1", "a"));

        let mut updated = bracket("ev1", "b");
        updated.completed_heats = 1;
        let mut batch = WriteBatch::new();
        batch.put_bracket(updated);
        store.commit(batch).await.unwrap();

        let ids: Vec<_> = store
            .list_brackets("ev1")
            .await
            .unwrap()
            .into_iter()
            .map(|b| (b.id, b.completed_heats))
            .collect();
        assert_eq!(ids, vec![("b".to_string(), 1), ("a".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = InMemoryStore::new().with_event(Event::new("ev1", "Open", "org"));
        store.fail_next_commit();

        let mut event = Event::new("ev1", "Open", "org");
        event.status = EventStatus::Active;
        let mut batch = WriteBatch::new();
        batch.put_event(event).put_bracket(bracket("ev1", "b"));

        assert!(store.commit(batch).await.is_err());
        let stored = store.get_event("ev1").await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Pending);
        assert!(store.list_brackets("ev1").await.unwrap().is_empty());
        assert_eq!(store.commit_count(), 0);

        // Failure hook is one-shot
        assert!(store.commit(WriteBatch::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_advance_never_lowers_completed_heats() {
        let store = InMemoryStore::new();
        store.insert_bracket(bracket("ev1", "b"));

        let mut ahead = bracket("ev1", "b");
        ahead.completed_heats = 2;
        let mut stale = bracket("ev1", "b");
        stale.completed_heats = 1;

        let mut batch = WriteBatch::new();
        batch.advance_bracket(ahead);
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.advance_bracket(stale);
        store.commit(batch).await.unwrap();

        let stored = store.get_bracket("ev1", "b").await.unwrap().unwrap();
        assert_eq!(stored.completed_heats, 2);
    }

    #[tokio::test]
    async fn test_failure_after_apply_keeps_writes() {
        let store = InMemoryStore::new().with_event(Event::new("ev1", "Open", "org"));
        store.fail_next_commit_after_apply();
        store.fail_next_commit();

        let mut event = Event::new("ev1", "Open", "org");
        event.status = EventStatus::Active;
        let mut batch = WriteBatch::new();
        batch.put_event(event);
        assert!(store.commit(batch).await.is_err());

        let stored = store.get_event("ev1").await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Active);

        // Second queued failure rejects outright, then the queue is empty
        assert!(store.commit(WriteBatch::new()).await.is_err());
        assert!(store.commit(WriteBatch::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_lookup() {
        let store = InMemoryStore::new()
            .with_gender("u1", "F")
            .with_failing_lookup("u2");

        assert_eq!(store.gender_of("u1").await.unwrap(), Some("F".to_string()));
        assert_eq!(store.gender_of("u3").await.unwrap(), None);
        assert!(store.gender_of("u2").await.is_err());
    }
}
