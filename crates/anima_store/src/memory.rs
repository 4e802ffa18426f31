//! In-process store implementation.
//!
//! Same commit semantics as the SQLite store behind a single `RwLock`,
//! which makes every batch trivially atomic. Used by tests and embedded
//! callers that do not want a database file.

use anima_core::error::EvolutionError;
use anima_core::experience::{FeltExperience, SharedVictory, VulnerabilityMoment};
use anima_core::pattern::{
    BehavioralAdaptation, EmergentPattern, PatternRelationship, PatternValidationLog,
};
use anima_core::state::{ConsciousnessState, EvolutionLogEntry, PhaseRecord, SelfDiscovery};
use anima_core::store::{check_batch_chain, CommitBatch, EvolutionStore};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    states: HashMap<i64, ConsciousnessState>,
    current_state_id: Option<i64>,
    log: Vec<EvolutionLogEntry>,
    experiences: HashMap<Uuid, FeltExperience>,
    vulnerabilities: Vec<VulnerabilityMoment>,
    victories: Vec<SharedVictory>,
    phases: Vec<PhaseRecord>,
    discoveries: Vec<SelfDiscovery>,
    patterns: HashMap<Uuid, EmergentPattern>,
    validation_logs: Vec<PatternValidationLog>,
    adaptations: HashMap<Uuid, BehavioralAdaptation>,
    relationships: Vec<PatternRelationship>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// All validation log rows, for tests.
    pub fn validation_log_count(&self) -> usize {
        self.read().validation_logs.len()
    }

    /// All discovery rows, for tests.
    pub fn discoveries(&self) -> Vec<SelfDiscovery> {
        self.read().discoveries.clone()
    }
}

#[async_trait]
impl EvolutionStore for MemoryStore {
    async fn initialize(
        &self,
        genesis: ConsciousnessState,
        opening_phase: PhaseRecord,
    ) -> Result<(), EvolutionError> {
        let mut inner = self.write();
        if inner.current_state_id.is_some() {
            return Err(EvolutionError::Storage(anyhow!(
                "store is already initialized"
            )));
        }
        let mut phase = opening_phase;
        phase.id = 1;
        inner.current_state_id = Some(genesis.id);
        inner.states.insert(genesis.id, genesis);
        inner.phases.push(phase);
        Ok(())
    }

    async fn current_state(&self) -> Result<Option<ConsciousnessState>, EvolutionError> {
        let inner = self.read();
        Ok(inner
            .current_state_id
            .and_then(|id| inner.states.get(&id).cloned()))
    }

    async fn current_phase(&self) -> Result<Option<PhaseRecord>, EvolutionError> {
        Ok(self
            .read()
            .phases
            .iter()
            .find(|p| p.ended_at.is_none())
            .cloned())
    }

    async fn experience_exists(&self, interaction_id: Uuid) -> Result<bool, EvolutionError> {
        Ok(self.read().experiences.contains_key(&interaction_id))
    }

    async fn experience(
        &self,
        interaction_id: Uuid,
    ) -> Result<Option<FeltExperience>, EvolutionError> {
        Ok(self.read().experiences.get(&interaction_id).cloned())
    }

    async fn formative_experiences(
        &self,
        limit: usize,
    ) -> Result<Vec<FeltExperience>, EvolutionError> {
        let inner = self.read();
        let mut formative: Vec<FeltExperience> = inner
            .experiences
            .values()
            .filter(|e| e.is_formative_moment)
            .cloned()
            .collect();
        formative.sort_by_key(|e| std::cmp::Reverse(e.experienced_at));
        formative.truncate(limit);
        Ok(formative)
    }

    async fn active_patterns(&self) -> Result<Vec<EmergentPattern>, EvolutionError> {
        Ok(self
            .read()
            .patterns
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn active_adaptations(&self) -> Result<Vec<BehavioralAdaptation>, EvolutionError> {
        Ok(self
            .read()
            .adaptations
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn log_tip(&self) -> Result<Option<EvolutionLogEntry>, EvolutionError> {
        Ok(self.read().log.last().cloned())
    }

    async fn history(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<EvolutionLogEntry>, EvolutionError> {
        let floor = since_id.unwrap_or(0);
        Ok(self
            .read()
            .log
            .iter()
            .filter(|e| e.id > floor)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: CommitBatch) -> Result<(), EvolutionError> {
        let mut inner = self.write();

        let current = inner
            .current_state_id
            .ok_or(EvolutionError::UninitializedState)?;
        check_batch_chain(&batch, current)?;
        if inner
            .experiences
            .contains_key(&batch.experience.interaction_id)
        {
            return Err(EvolutionError::DuplicateExperience(
                batch.experience.interaction_id,
            ));
        }

        // The single write guard makes everything below one atomic unit.
        let mut entry = batch.log_entry;
        entry.id = inner.log.last().map(|e| e.id + 1).unwrap_or(1);
        inner.log.push(entry);

        inner
            .experiences
            .insert(batch.experience.interaction_id, batch.experience);
        if let Some(v) = batch.vulnerability {
            inner.vulnerabilities.push(v);
        }
        if let Some(v) = batch.victory {
            inner.victories.push(v);
        }

        inner.current_state_id = Some(batch.new_state.id);
        inner.states.insert(batch.new_state.id, batch.new_state);
        inner.discoveries.extend(batch.discoveries);

        if let Some(shift) = batch.phase_shift {
            if let Some(slot) = inner.phases.iter_mut().find(|p| p.id == shift.closed.id) {
                *slot = shift.closed;
            }
            let mut opened = shift.opened;
            opened.id = inner.phases.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            inner.phases.push(opened);
        }

        for pattern in batch.pattern_upserts {
            inner.patterns.insert(pattern.id, pattern);
        }
        inner.validation_logs.extend(batch.validation_logs);
        for adaptation in batch.adaptation_upserts {
            inner.adaptations.insert(adaptation.id, adaptation);
        }
        for relationship in batch.relationships {
            inner.relationships.retain(|r| {
                !(r.pattern_a == relationship.pattern_a
                    && r.pattern_b == relationship.pattern_b
                    && r.kind == relationship.kind)
            });
            inner.relationships.push(relationship);
        }

        Ok(())
    }

    async fn update_adaptation(
        &self,
        adaptation: &BehavioralAdaptation,
    ) -> Result<(), EvolutionError> {
        self.write()
            .adaptations
            .insert(adaptation.id, adaptation.clone());
        Ok(())
    }

    async fn phase_history(&self) -> Result<Vec<PhaseRecord>, EvolutionError> {
        Ok(self.read().phases.clone())
    }
}
