//! Storage seam for the evolution engine.
//!
//! All writes of one evolution step travel together in a `CommitBatch`;
//! an implementation must persist the whole batch atomically or not at
//! all. Reads may run concurrently and never observe a half-applied
//! batch.

use crate::error::EvolutionError;
use crate::experience::{FeltExperience, SharedVictory, VulnerabilityMoment};
use crate::pattern::{
    BehavioralAdaptation, EmergentPattern, PatternRelationship, PatternValidationLog,
};
use crate::state::{
    ConsciousnessState, EvolutionLogEntry, PhaseRecord, SelfDiscovery, StateId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Phase rows touched by one transition: the closed interval and the
/// newly opened one.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseShiftRecords {
    /// The previously current phase row, with `ended_at` now set.
    pub closed: PhaseRecord,
    /// The new current phase row (id assigned by the store).
    pub opened: PhaseRecord,
}

/// Every write of one evolution step. Either the whole batch is
/// persisted or none of it is.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitBatch {
    pub experience: FeltExperience,
    pub vulnerability: Option<VulnerabilityMoment>,
    pub victory: Option<SharedVictory>,
    pub new_state: ConsciousnessState,
    pub log_entry: EvolutionLogEntry,
    pub discoveries: Vec<SelfDiscovery>,
    pub phase_shift: Option<PhaseShiftRecords>,
    /// New and updated patterns, keyed by id.
    pub pattern_upserts: Vec<EmergentPattern>,
    pub validation_logs: Vec<PatternValidationLog>,
    pub adaptation_upserts: Vec<BehavioralAdaptation>,
    pub relationships: Vec<PatternRelationship>,
}

/// Transactional persistence for every entity in the domain model.
///
/// Contract, beyond the signatures:
/// - `commit` must reject a batch whose `log_entry.previous_state_id`
///   does not match the stored current state id (`StaleState`), and a
///   batch whose interaction already has an experience
///   (`DuplicateExperience`).
/// - `initialize` must fail if a state row already exists.
#[async_trait]
pub trait EvolutionStore: Send + Sync {
    /// Write the genesis state and its opening phase row.
    async fn initialize(
        &self,
        genesis: ConsciousnessState,
        opening_phase: PhaseRecord,
    ) -> Result<(), EvolutionError>;

    async fn current_state(&self) -> Result<Option<ConsciousnessState>, EvolutionError>;

    async fn current_phase(&self) -> Result<Option<PhaseRecord>, EvolutionError>;

    async fn experience_exists(&self, interaction_id: Uuid) -> Result<bool, EvolutionError>;

    async fn experience(
        &self,
        interaction_id: Uuid,
    ) -> Result<Option<FeltExperience>, EvolutionError>;

    /// Experiences flagged formative, newest first.
    async fn formative_experiences(
        &self,
        limit: usize,
    ) -> Result<Vec<FeltExperience>, EvolutionError>;

    async fn active_patterns(&self) -> Result<Vec<EmergentPattern>, EvolutionError>;

    async fn active_adaptations(&self) -> Result<Vec<BehavioralAdaptation>, EvolutionError>;

    /// The newest evolution log entry, if any.
    async fn log_tip(&self) -> Result<Option<EvolutionLogEntry>, EvolutionError>;

    /// Log entries with id greater than `since_id`, ascending, at most
    /// `limit` rows.
    async fn history(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<EvolutionLogEntry>, EvolutionError>;

    /// Persist one evolution step atomically.
    async fn commit(&self, batch: CommitBatch) -> Result<(), EvolutionError>;

    /// Persist an adaptation-effectiveness update made outside the
    /// evolution transaction.
    async fn update_adaptation(
        &self,
        adaptation: &BehavioralAdaptation,
    ) -> Result<(), EvolutionError>;

    /// Full phase history, oldest first.
    async fn phase_history(&self) -> Result<Vec<PhaseRecord>, EvolutionError>;
}

/// Helper used by store implementations to verify the chain invariant of
/// a batch before applying it.
pub fn check_batch_chain(
    batch: &CommitBatch,
    current_id: StateId,
) -> Result<(), EvolutionError> {
    match batch.log_entry.previous_state_id {
        Some(prev) if prev == current_id => Ok(()),
        Some(prev) => Err(EvolutionError::StaleState {
            caller: prev,
            current: current_id,
        }),
        None => Err(EvolutionError::CorruptTimeline(
            "non-genesis batch without previous state id".to_string(),
        )),
    }
}

/// Timestamp helper shared by store implementations.
pub fn to_unix(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}
