//! Competition data models: events, brackets, heats and blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event ID type
pub type EventId = String;

/// Bracket ID type (`modality_category_genderGroup`)
pub type BracketId = String;

/// User ID type (competitors, judges, organizers)
pub type UserId = String;

/// Participant (registration) ID type
pub type ParticipantId = String;

/// Gender grouping used only for bracket partitioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenderGroup {
    Women,
    Men,
    Mixed,
}

impl GenderGroup {
    /// Fragment used when building bracket keys
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderGroup::Women => "Women",
            GenderGroup::Men => "Men",
            GenderGroup::Mixed => "Mixed",
        }
    }
}

/// Competitive stage within a bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Eliminatoria,
    Semifinal,
    Final,
}

impl Phase {
    /// Phases in the order a multi-phase bracket runs through them
    pub const ORDER: [Phase; 3] = [Phase::Eliminatoria, Phase::Semifinal, Phase::Final];

    pub fn first() -> Self {
        Self::ORDER[0]
    }

    pub fn terminal() -> Self {
        Phase::Final
    }

    /// Next phase, or `None` once the final has been reached
    pub fn next(&self) -> Option<Phase> {
        let pos = Self::ORDER.iter().position(|p| p == self)?;
        Self::ORDER.get(pos + 1).copied()
    }
}

/// Event state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Registrations open, nothing generated yet
    Pending,
    /// Brackets created, competition running
    Active,
    /// Every bracket completed
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Active => "active",
            EventStatus::Completed => "completed",
        }
    }
}

/// Bracket state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketStatus {
    Pending,
    Active,
    Completed,
}

impl BracketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketStatus::Pending => "pending",
            BracketStatus::Active => "active",
            BracketStatus::Completed => "completed",
        }
    }
}

/// Heat state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatStatus {
    Pending,
    Active,
    Completed,
}

/// Registered competitor entry (individual or couple).
///
/// Owned by the registration subsystem; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// One reference for an individual, two for a couple
    pub competitors: Vec<UserId>,
    pub category: String,
    /// Dance modality (registration field "level")
    pub modality: String,
    pub event_id: EventId,
    pub phase: Option<Phase>,
    pub status: String,
}

impl Participant {
    pub fn is_couple(&self) -> bool {
        self.competitors.len() >= 2
    }
}

/// Per-modality heat layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityConfig {
    /// Blocks performed one after another within a heat
    pub blocks_per_heat: u32,
    /// Competitors performing simultaneously within a block
    pub tracks_per_block: u32,
    /// Modalities run as a single final ("Seriado"-style)
    pub single_phase: bool,
}

impl Default for ModalityConfig {
    fn default() -> Self {
        Self {
            blocks_per_heat: 1,
            tracks_per_block: 1,
            single_phase: false,
        }
    }
}

impl ModalityConfig {
    /// Maximum number of participants in one heat
    pub fn heat_capacity(&self) -> u32 {
        self.blocks_per_heat.saturating_mul(self.tracks_per_block)
    }
}

/// Staff permission flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPermissions {
    pub judge: bool,
    /// Judges in the opening panel of every heat
    pub starts_judging: bool,
    /// May start the event, generate and close heats
    pub manage: bool,
}

/// Event staff roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub user_id: UserId,
    pub name: String,
    pub permissions: StaffPermissions,
}

/// Competition event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub organizer_id: UserId,
    pub status: EventStatus,
    pub current_bracket_id: Option<BracketId>,
    /// Append-only, in completion order
    pub completed_bracket_ids: Vec<BracketId>,
    pub staff: Vec<StaffMember>,
    /// Heat layout keyed by modality name
    pub modalities: BTreeMap<String, ModalityConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub real_start_time: Option<DateTime<Utc>>,
    pub real_end_time: Option<DateTime<Utc>>,
}

impl Event {
    /// Create a pending event with no staff and no modality configuration
    pub fn new(id: impl Into<EventId>, name: impl Into<String>, organizer_id: impl Into<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            organizer_id: organizer_id.into(),
            status: EventStatus::Pending,
            current_bracket_id: None,
            completed_bracket_ids: Vec::new(),
            staff: Vec::new(),
            modalities: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            real_start_time: None,
            real_end_time: None,
        }
    }

    pub fn with_staff(mut self, member: StaffMember) -> Self {
        self.staff.push(member);
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>, config: ModalityConfig) -> Self {
        self.modalities.insert(modality.into(), config);
        self
    }

    /// Heat layout for a modality, 1 block × 1 track when unconfigured
    pub fn modality_config(&self, modality: &str) -> ModalityConfig {
        self.modalities.get(modality).copied().unwrap_or_default()
    }

    /// Judges assigned to every block at heat creation time, in roster order
    pub fn opening_judges(&self) -> Vec<UserId> {
        self.staff
            .iter()
            .filter(|m| m.permissions.judge && m.permissions.starts_judging)
            .map(|m| m.user_id.clone())
            .collect()
    }

    fn staff_member(&self, user_id: &str) -> Option<&StaffMember> {
        self.staff.iter().find(|m| m.user_id == user_id)
    }

    /// Organizer or staff flagged `manage`
    pub fn can_manage(&self, actor: &Actor) -> bool {
        actor.user_id == self.organizer_id
            || self
                .staff_member(&actor.user_id)
                .is_some_and(|m| m.permissions.manage)
    }

    /// Managers plus any judge on the roster
    pub fn can_close_heats(&self, actor: &Actor) -> bool {
        self.can_manage(actor)
            || self
                .staff_member(&actor.user_id)
                .is_some_and(|m| m.permissions.judge)
    }
}

/// Build the bracket key `modality_category_genderGroup`
pub fn bracket_key(modality: &str, category: &str, group: GenderGroup) -> BracketId {
    format!("{}_{}_{}", modality, category, group.as_str())
}

/// One modality × category × gender-group unit within an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: BracketId,
    pub event_id: EventId,
    pub modality: String,
    pub category: String,
    pub gender_group: GenderGroup,
    pub current_phase: Phase,
    pub total_participants: u32,
    pub blocks_per_heat: u32,
    pub tracks_per_block: u32,
    pub total_heats: u32,
    pub completed_heats: u32,
    pub current_heat_index: u32,
    pub status: BracketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub real_start_time: Option<DateTime<Utc>>,
    pub real_end_time: Option<DateTime<Utc>>,
}

impl Bracket {
    /// `ceil(participants / (blocks × tracks))`
    pub fn total_heats_for(participants: u32, blocks_per_heat: u32, tracks_per_block: u32) -> u32 {
        let capacity = blocks_per_heat.saturating_mul(tracks_per_block).max(1);
        participants.div_ceil(capacity)
    }

    pub fn heat_capacity(&self) -> u32 {
        self.blocks_per_heat.saturating_mul(self.tracks_per_block)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, BracketStatus::Pending | BracketStatus::Active)
    }
}

/// Build the heat ID `heat_<index>`
pub fn heat_id(index: u32) -> String {
    format!("heat_{}", index)
}

/// A judge's score for one performer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeScore {
    pub judge_id: UserId,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A performer slot in a block with its accumulating scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub participant_id: ParticipantId,
    pub scores: Vec<JudgeScore>,
}

/// Competitors performing simultaneously, judged by an assigned panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u32,
    pub entries: Vec<BlockEntry>,
    pub judges: Vec<UserId>,
}

/// A heat ("tanda") of a bracket's phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heat {
    pub id: String,
    pub index: u32,
    pub phase: Phase,
    pub status: HeatStatus,
    pub blocks: Vec<Block>,
}

impl Heat {
    /// Participants of every block, in performance order
    pub fn participant_ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.blocks
            .iter()
            .flat_map(|b| b.entries.iter().map(|e| &e.participant_id))
    }

    pub fn participant_count(&self) -> usize {
        self.blocks.iter().map(|b| b.entries.len()).sum()
    }
}

/// Dashboard summary of an event's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProgress {
    pub total_brackets: usize,
    pub completed_brackets_count: usize,
    pub current_bracket: Option<Bracket>,
    pub is_event_completed: bool,
}

/// Caller identity supplied with every mutating call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
}

impl Actor {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
