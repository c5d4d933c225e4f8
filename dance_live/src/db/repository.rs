//! Repository trait definitions for the competition store and its collaborators.
//!
//! The engine never talks to a database directly: it reads documents through
//! [`CompetitionStore`] and writes them back as one [`WriteBatch`], which every
//! implementation must apply all-or-nothing.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::competition::{
    Bracket, BracketId, CompetitionResult, Event, EventId, Heat, Participant,
};

/// A single document write inside a batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    PutEvent(Event),
    PutBracket(Bracket),
    /// Heat bookkeeping on a bracket. Skipped when the stored bracket already
    /// has more completed heats, so concurrent closes never lower the count.
    AdvanceBracket(Bracket),
    /// Heat keyed under its bracket
    PutHeat {
        event_id: EventId,
        bracket_id: BracketId,
        heat: Heat,
    },
}

/// Ordered set of writes committed atomically
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_event(&mut self, event: Event) -> &mut Self {
        self.ops.push(WriteOp::PutEvent(event));
        self
    }

    pub fn put_bracket(&mut self, bracket: Bracket) -> &mut Self {
        self.ops.push(WriteOp::PutBracket(bracket));
        self
    }

    pub fn advance_bracket(&mut self, bracket: Bracket) -> &mut Self {
        self.ops.push(WriteOp::AdvanceBracket(bracket));
        self
    }

    pub fn put_heat(&mut self, event_id: &str, bracket_id: &str, heat: Heat) -> &mut Self {
        self.ops.push(WriteOp::PutHeat {
            event_id: event_id.to_string(),
            bracket_id: bracket_id.to_string(),
            heat,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Durable store for events, brackets and heats
#[async_trait]
pub trait CompetitionStore: Send + Sync {
    /// Find event by ID
    async fn get_event(&self, event_id: &str) -> CompetitionResult<Option<Event>>;

    /// Find bracket by ID within an event
    async fn get_bracket(&self, event_id: &str, bracket_id: &str)
    -> CompetitionResult<Option<Bracket>>;

    /// All brackets of an event in creation order
    async fn list_brackets(&self, event_id: &str) -> CompetitionResult<Vec<Bracket>>;

    /// All heats of a bracket ordered by index
    async fn list_heats(&self, event_id: &str, bracket_id: &str) -> CompetitionResult<Vec<Heat>>;

    /// Find heat by index within a bracket
    async fn get_heat(
        &self,
        event_id: &str,
        bracket_id: &str,
        index: u32,
    ) -> CompetitionResult<Option<Heat>>;

    /// Apply every write in the batch, or none of them
    async fn commit(&self, batch: WriteBatch) -> CompetitionResult<()>;

    /// Check the store is reachable
    async fn ping(&self) -> CompetitionResult<()> {
        Ok(())
    }
}

/// Registration subsystem: participant list by event
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Participants of an event in registration order
    async fn list_by_event(&self, event_id: &str) -> CompetitionResult<Vec<Participant>>;
}

/// Profile subsystem: raw gender field lookup
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Stored gender field of a competitor, `None` when unset or unknown
    async fn gender_of(&self, user_id: &str) -> CompetitionResult<Option<String>>;
}

fn decode<T: DeserializeOwned>(row: &sqlx::postgres::PgRow) -> CompetitionResult<T> {
    let doc: serde_json::Value = row.try_get("doc")?;
    Ok(serde_json::from_value(doc)?)
}

/// PostgreSQL implementation storing each document as JSONB
pub struct PgCompetitionStore {
    pool: PgPool,
}

impl PgCompetitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> CompetitionResult<()> {
        match op {
            WriteOp::PutEvent(event) => {
                let doc = serde_json::to_value(&event)?;
                sqlx::query(
                    r#"
                    INSERT INTO events (id, status, doc, updated_at)
                    VALUES ($1, $2, $3, NOW())
                    ON CONFLICT (id) DO UPDATE
                    SET status = EXCLUDED.status, doc = EXCLUDED.doc, updated_at = NOW()
                    "#,
                )
                .bind(&event.id)
                .bind(event.status.as_str())
                .bind(doc)
                .execute(&mut **tx)
                .await?;
            }
            WriteOp::PutBracket(bracket) => {
                let doc = serde_json::to_value(&bracket)?;
                sqlx::query(
                    r#"
                    INSERT INTO brackets (event_id, id, status, doc, updated_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    ON CONFLICT (event_id, id) DO UPDATE
                    SET status = EXCLUDED.status, doc = EXCLUDED.doc, updated_at = NOW()
                    "#,
                )
                .bind(&bracket.event_id)
                .bind(&bracket.id)
                .bind(bracket.status.as_str())
                .bind(doc)
                .execute(&mut **tx)
                .await?;
            }
            WriteOp::AdvanceBracket(bracket) => {
                let doc = serde_json::to_value(&bracket)?;
                // Row lock taken by ON CONFLICT makes the comparison race-free
                sqlx::query(
                    r#"
                    INSERT INTO brackets (event_id, id, status, doc, updated_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    ON CONFLICT (event_id, id) DO UPDATE
                    SET status = EXCLUDED.status, doc = EXCLUDED.doc, updated_at = NOW()
                    WHERE (brackets.doc->>'completed_heats')::int
                        <= (EXCLUDED.doc->>'completed_heats')::int
                    "#,
                )
                .bind(&bracket.event_id)
                .bind(&bracket.id)
                .bind(bracket.status.as_str())
                .bind(doc)
                .execute(&mut **tx)
                .await?;
            }
            WriteOp::PutHeat {
                event_id,
                bracket_id,
                heat,
            } => {
                let doc = serde_json::to_value(&heat)?;
                sqlx::query(
                    r#"
                    INSERT INTO heats (event_id, bracket_id, idx, doc)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (event_id, bracket_id, idx) DO UPDATE
                    SET doc = EXCLUDED.doc
                    "#,
                )
                .bind(&event_id)
                .bind(&bracket_id)
                .bind(heat.index as i32)
                .bind(doc)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CompetitionStore for PgCompetitionStore {
    async fn get_event(&self, event_id: &str) -> CompetitionResult<Option<Event>> {
        let row = sqlx::query("SELECT doc FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode).transpose()
    }

    async fn get_bracket(
        &self,
        event_id: &str,
        bracket_id: &str,
    ) -> CompetitionResult<Option<Bracket>> {
        let row = sqlx::query("SELECT doc FROM brackets WHERE event_id = $1 AND id = $2")
            .bind(event_id)
            .bind(bracket_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode).transpose()
    }

    async fn list_brackets(&self, event_id: &str) -> CompetitionResult<Vec<Bracket>> {
        let rows = sqlx::query("SELECT doc FROM brackets WHERE event_id = $1 ORDER BY seq")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode).collect()
    }

    async fn list_heats(&self, event_id: &str, bracket_id: &str) -> CompetitionResult<Vec<Heat>> {
        let rows = sqlx::query(
            "SELECT doc FROM heats WHERE event_id = $1 AND bracket_id = $2 ORDER BY idx",
        )
        .bind(event_id)
        .bind(bracket_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode).collect()
    }

    async fn get_heat(
        &self,
        event_id: &str,
        bracket_id: &str,
        index: u32,
    ) -> CompetitionResult<Option<Heat>> {
        let row = sqlx::query(
            "SELECT doc FROM heats WHERE event_id = $1 AND bracket_id = $2 AND idx = $3",
        )
        .bind(event_id)
        .bind(bracket_id)
        .bind(index as i32)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode).transpose()
    }

    async fn commit(&self, batch: WriteBatch) -> CompetitionResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on error rolls every write back
        let mut tx = self.pool.begin().await?;
        for op in batch.into_ops() {
            Self::apply(&mut tx, op).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> CompetitionResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// PostgreSQL implementation of `ParticipantRepository`
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn list_by_event(&self, event_id: &str) -> CompetitionResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT doc FROM participants WHERE event_id = $1 ORDER BY registered_at, id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode).collect()
    }
}

/// PostgreSQL implementation of `ProfileDirectory`
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn gender_of(&self, user_id: &str) -> CompetitionResult<Option<String>> {
        let row = sqlx::query("SELECT gender FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(r.try_get::<Option<String>, _>("gender")?),
            None => Ok(None),
        }
    }
}
