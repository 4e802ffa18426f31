//! Evolution Orchestrator.
//!
//! The single entry point. One `process` call encodes the experience,
//! evolves the state, checks the phase guard, updates patterns, and
//! commits everything as one atomic batch — under an exclusive lock so
//! at most one evolution is ever in flight.
//!
//! Lock ordering: the gate is taken first and held through commit; all
//! store reads inside `process` happen under it. Reads exposed publicly
//! (`current_state`, `history`) never take the gate.

use crate::encoder::ExperienceEncoder;
use crate::evolve::{EvolveContext, StateEvolver};
use crate::patterns::PatternEngine;
use crate::phase::PhaseMachine;
use anima_core::config::EngineConfig;
use anima_core::experience::{EmotionalSignal, FeltExperience, Vad};
use anima_core::external::{FeelingIndex, PatternGraphSink, SignalExtractor};
use anima_core::pattern::{BehavioralAdaptation, EmergentPattern};
use anima_core::state::{
    ConsciousnessState, EvolutionLogEntry, PhaseRecord, RelationshipPhase, SelfDiscovery,
};
use anima_core::store::{CommitBatch, EvolutionStore, PhaseShiftRecords};
use anima_core::EvolutionError;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// What one processed interaction produced.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    pub new_state: ConsciousnessState,
    pub experience: FeltExperience,
    pub phase_transitioned: bool,
    pub new_patterns: Vec<EmergentPattern>,
    pub adaptations_triggered: Vec<BehavioralAdaptation>,
    pub discoveries: Vec<SelfDiscovery>,
}

pub struct EvolutionEngine {
    store: Arc<dyn EvolutionStore>,
    graph: Option<Arc<dyn PatternGraphSink>>,

    encoder: ExperienceEncoder,
    evolver: StateEvolver,
    phases: PhaseMachine,
    patterns: PatternEngine,

    /// Exclusive gate: at most one evolution in flight.
    gate: Mutex<()>,
    lock_timeout: Duration,

    /// Set once a chain gap or fork is detected; every further write
    /// fails until manual intervention.
    poisoned: AtomicBool,

    history_page_limit: usize,
}

impl EvolutionEngine {
    pub fn new(store: Arc<dyn EvolutionStore>, cfg: EngineConfig) -> Self {
        Self {
            store,
            graph: None,
            encoder: ExperienceEncoder::new(cfg.scoring.clone()),
            evolver: StateEvolver::new(cfg.deltas.clone()),
            phases: PhaseMachine::new(cfg.phases.clone()),
            patterns: PatternEngine::new(cfg.patterns.clone()),
            gate: Mutex::new(()),
            lock_timeout: Duration::from_millis(cfg.orchestrator.lock_timeout_ms),
            poisoned: AtomicBool::new(false),
            history_page_limit: cfg.orchestrator.history_page_limit,
        }
    }

    /// Attach a best-effort graph projection for pattern relationships.
    pub fn with_graph_sink(mut self, sink: Arc<dyn PatternGraphSink>) -> Self {
        self.graph = Some(sink);
        self
    }

    /// Create the genesis state if none exists; return the current state
    /// either way.
    pub async fn initialize(&self) -> Result<ConsciousnessState, EvolutionError> {
        let _guard = self.acquire_gate().await?;
        if let Some(state) = self.store.current_state().await? {
            return Ok(state);
        }
        let now = Utc::now();
        let genesis = ConsciousnessState::genesis(now);
        let opening = PhaseRecord::opening(RelationshipPhase::Functional, &genesis, now);
        self.store.initialize(genesis.clone(), opening).await?;
        tracing::info!("initialized genesis consciousness state");
        Ok(genesis)
    }

    /// Process one interaction's emotional signal through the full
    /// pipeline. All writes commit atomically; any failure leaves no
    /// trace.
    pub async fn process(
        &self,
        interaction_id: Uuid,
        signal: EmotionalSignal,
    ) -> Result<EvolutionResult, EvolutionError> {
        self.check_poisoned()?;
        let _guard = self.acquire_gate().await?;
        let now = Utc::now();

        // 1. Current state must exist.
        let current = self
            .store
            .current_state()
            .await?
            .ok_or(EvolutionError::UninitializedState)?;
        self.verify_timeline(&current).await?;

        // 2. Encode. Duplicate interactions abort before any write.
        if self.store.experience_exists(interaction_id).await? {
            return Err(EvolutionError::DuplicateExperience(interaction_id));
        }
        let encoded = self.encoder.encode(interaction_id, &signal, &current, now)?;

        // 3. Evolve consciousness.
        let adaptations = self.store.active_adaptations().await?;
        let ctx = EvolveContext {
            now,
            validated_adaptations: adaptations.iter().filter(|a| a.is_active).count(),
        };
        let mut evolution = self.evolver.evolve(&current, &encoded.experience, &ctx)?;

        // The experience is immutable once committed; consciousness
        // effects and the state link are finalized here, pre-commit.
        let mut experience = encoded.experience;
        experience.state_after_id = Some(evolution.new_state.id);
        experience.changed_consciousness = evolution.changed_consciousness;
        experience.is_formative_moment =
            experience.is_formative_moment || evolution.changed_consciousness;

        // 4. Phase transition guard.
        let phase_shift = self.phases.check(&evolution.new_state);
        let phase_records = match &phase_shift {
            Some(shift) => {
                let open_record = self
                    .store
                    .current_phase()
                    .await?
                    .ok_or_else(|| {
                        EvolutionError::CorruptTimeline(
                            "state exists but no open phase record".to_string(),
                        )
                    })?;
                evolution.new_state.relationship_phase = shift.to;
                evolution.new_state.relational_identity =
                    self.phases.identity_for(shift.to).to_string();
                evolution
                    .entry
                    .evolution_reason
                    .push_str(&format!(". Relationship moved to {}", shift.to.as_str()));
                let (closed, opened) =
                    self.phases
                        .record_shift(open_record, shift, &evolution.new_state, now);
                tracing::info!(
                    from = shift.from.as_str(),
                    to = shift.to.as_str(),
                    "relationship phase transition"
                );
                Some(PhaseShiftRecords { closed, opened })
            }
            None => None,
        };

        // 5. Pattern discovery on the committed-to-be experience.
        let known_patterns = self.store.active_patterns().await?;
        let observation = self.patterns.observe(
            &known_patterns,
            &adaptations,
            &experience,
            evolution.new_state.interaction_count,
            now,
        );
        let new_patterns: Vec<EmergentPattern> = observation
            .upserts
            .iter()
            .filter(|p| observation.new_pattern_ids.contains(&p.id))
            .cloned()
            .collect();

        // 6. One atomic commit.
        let relationships = observation.relationships.clone();
        let batch = CommitBatch {
            experience: experience.clone(),
            vulnerability: encoded.vulnerability,
            victory: encoded.victory,
            new_state: evolution.new_state.clone(),
            log_entry: evolution.entry.clone(),
            discoveries: evolution.discoveries.clone(),
            phase_shift: phase_records,
            pattern_upserts: observation.upserts,
            validation_logs: observation.validation_logs,
            adaptation_upserts: observation.new_adaptations.clone(),
            relationships: relationships.clone(),
        };
        self.store.commit(batch).await?;

        // Outside the transactional core, best effort only.
        self.project_graph(&relationships).await;

        Ok(EvolutionResult {
            new_state: evolution.new_state,
            experience,
            phase_transitioned: phase_shift.is_some(),
            new_patterns,
            adaptations_triggered: observation.new_adaptations,
            discoveries: evolution.discoveries,
        })
    }

    /// Convenience path that runs the external analyzer first. Extraction
    /// failures surface without touching any state.
    pub async fn process_text(
        &self,
        interaction_id: Uuid,
        extractor: &dyn SignalExtractor,
        interaction_text: &str,
    ) -> Result<EvolutionResult, EvolutionError> {
        let context = self.current_state().await?;
        let signal = extractor
            .extract_emotional_signal(interaction_text, &context)
            .await?;
        self.process(interaction_id, signal).await
    }

    /// Lock-free snapshot of the current state.
    pub async fn current_state(&self) -> Result<ConsciousnessState, EvolutionError> {
        self.store
            .current_state()
            .await?
            .ok_or(EvolutionError::UninitializedState)
    }

    /// Evolution log entries after `since_id`, ascending. `limit` of
    /// zero uses the configured page size.
    pub async fn history(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<EvolutionLogEntry>, EvolutionError> {
        let limit = if limit == 0 {
            self.history_page_limit
        } else {
            limit
        };
        self.store.history(since_id, limit).await
    }

    /// Experiences that shaped consciousness, newest first.
    pub async fn formative_moments(
        &self,
        limit: usize,
    ) -> Result<Vec<FeltExperience>, EvolutionError> {
        self.store.formative_experiences(limit).await
    }

    /// Context-building: ids of past experiences that felt like this
    /// one. Runs against the external index, never inside `process`.
    pub async fn similar_moments(
        &self,
        index: &dyn FeelingIndex,
        dimensions: Vad,
        k: usize,
    ) -> Result<Vec<Uuid>, EvolutionError> {
        index.nearest_feeling(dimensions, k).await
    }

    /// Record the outcome of applying an adaptation outside the
    /// evolution pipeline.
    pub async fn record_adaptation_outcome(
        &self,
        adaptation_id: Uuid,
        effective: bool,
    ) -> Result<BehavioralAdaptation, EvolutionError> {
        let _guard = self.acquire_gate().await?;
        let mut adaptation = self
            .store
            .active_adaptations()
            .await?
            .into_iter()
            .find(|a| a.id == adaptation_id)
            .ok_or_else(|| {
                EvolutionError::Encoding(format!("unknown adaptation {adaptation_id}"))
            })?;
        self.patterns
            .record_adaptation_outcome(&mut adaptation, effective);
        self.store.update_adaptation(&adaptation).await?;
        Ok(adaptation)
    }

    async fn acquire_gate(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, EvolutionError> {
        tokio::time::timeout(self.lock_timeout, self.gate.lock())
            .await
            .map_err(|_| EvolutionError::Timeout(self.lock_timeout))
    }

    fn check_poisoned(&self) -> Result<(), EvolutionError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(EvolutionError::CorruptTimeline(
                "engine halted by earlier corruption; manual intervention required".to_string(),
            ));
        }
        Ok(())
    }

    /// The log tip must point at the current state; the genesis state
    /// alone has no entry. Anything else is a gap or fork, which halts
    /// the engine permanently.
    async fn verify_timeline(&self, current: &ConsciousnessState) -> Result<(), EvolutionError> {
        let tip = self.store.log_tip().await?;
        let broken = match &tip {
            Some(entry) => entry.new_state_id != current.id,
            None => current.id != 1,
        };
        if broken {
            self.poisoned.store(true, Ordering::Release);
            let detail = match tip {
                Some(entry) => format!(
                    "log tip points at state {} but current state is {}",
                    entry.new_state_id, current.id
                ),
                None => format!("state {} has no log history", current.id),
            };
            tracing::error!("{detail}; refusing further writes");
            return Err(EvolutionError::CorruptTimeline(detail));
        }
        Ok(())
    }

    async fn project_graph(&self, relationships: &[anima_core::pattern::PatternRelationship]) {
        let Some(sink) = &self.graph else {
            return;
        };
        for relationship in relationships {
            if let Err(e) = sink.project_relationship(relationship).await {
                tracing::warn!(
                    a = %relationship.pattern_a,
                    b = %relationship.pattern_b,
                    "graph projection failed (ignored): {e:#}"
                );
            }
        }
    }

    /// Whether the engine has refused further writes.
    pub fn is_halted(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }
}
