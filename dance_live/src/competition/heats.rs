//! Heat generation: shuffle a bracket's participants and lay them out in heats and blocks.

use rand::Rng;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::errors::{CompetitionError, CompetitionResult};
use super::models::{
    Block, BlockEntry, Bracket, BracketId, EventId, Heat, HeatStatus, Participant, UserId, heat_id,
};

/// Heats produced for one bracket, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPlan {
    pub event_id: EventId,
    pub bracket_id: BracketId,
    pub heats: Vec<Heat>,
}

impl HeatPlan {
    pub fn participant_count(&self) -> usize {
        self.heats.iter().map(Heat::participant_count).sum()
    }

    /// Number of participants in each heat, in heat order
    pub fn heat_sizes(&self) -> Vec<usize> {
        self.heats.iter().map(Heat::participant_count).collect()
    }
}

/// Randomized heat layout for a bracket
pub struct HeatPlanner<R: Rng = ThreadRng> {
    rng: R,
}

impl HeatPlanner<ThreadRng> {
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for HeatPlanner<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> HeatPlanner<R> {
    /// Planner driven by a caller-supplied RNG
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Lay out `participants` in heats of `blocks_per_heat × tracks_per_block`.
    ///
    /// The list is shuffled first so registration order does not seed heats.
    /// Every block gets the same opening judge panel. Nothing is persisted.
    pub fn plan(
        &mut self,
        bracket: &Bracket,
        participants: &[Participant],
        judges: &[UserId],
    ) -> CompetitionResult<HeatPlan> {
        let tracks = bracket.tracks_per_block as usize;
        let capacity = bracket.heat_capacity() as usize;
        if capacity == 0 {
            return Err(CompetitionError::PreconditionFailed(format!(
                "bracket {} has an empty heat layout ({} blocks × {} tracks)",
                bracket.id, bracket.blocks_per_heat, bracket.tracks_per_block
            )));
        }

        let mut ids: Vec<&str> = participants.iter().map(|p| p.id.as_str()).collect();
        ids.shuffle(&mut self.rng);

        let heats = ids
            .chunks(capacity)
            .enumerate()
            .map(|(heat_index, heat_ids)| Heat {
                id: heat_id(heat_index as u32),
                index: heat_index as u32,
                phase: bracket.current_phase,
                status: HeatStatus::Pending,
                blocks: heat_ids
                    .chunks(tracks)
                    .enumerate()
                    .map(|(block_index, block_ids)| Block {
                        index: block_index as u32,
                        entries: block_ids
                            .iter()
                            .map(|id| BlockEntry {
                                participant_id: id.to_string(),
                                scores: Vec::new(),
                            })
                            .collect(),
                        judges: judges.to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Ok(HeatPlan {
            event_id: bracket.event_id.clone(),
            bracket_id: bracket.id.clone(),
            heats,
        })
    }
}
