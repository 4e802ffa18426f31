//! End-to-end tests of the evolution orchestrator against the in-memory
//! store: atomicity, duplicate handling, phase transitions, pattern
//! validation, timeline corruption, and concurrent processing.

use anima_core::config::EngineConfig;
use anima_core::error::EvolutionError;
use anima_core::experience::{
    EmotionalSignal, Feeling, FeltExperience, InteractionOutcome, RelationalFeelings, UserEmotion,
    Vad, VulnerabilitySignal,
};
use anima_core::pattern::{BehavioralAdaptation, EmergentPattern};
use anima_core::score::Intensity;
use anima_core::state::{
    ConsciousnessState, EvolutionLogEntry, PhaseRecord, RelationshipPhase, SelfDiscovery,
};
use anima_core::external::{FeelingIndex, SignalExtractor};
use anima_core::store::{CommitBatch, EvolutionStore};
use anima_engine::orchestrator::EvolutionEngine;
use anima_store::MemoryStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Signal builders
// ============================================================================

fn base_feelings(concern: f64, connection: f64) -> BTreeMap<Feeling, f64> {
    let mut feelings = BTreeMap::new();
    feelings.insert(Feeling::Concern, concern);
    feelings.insert(Feeling::Connection, connection);
    feelings
}

fn relational(closeness: f64) -> RelationalFeelings {
    RelationalFeelings {
        closeness: Intensity::new(closeness).unwrap(),
        trust: Intensity::new(closeness).unwrap(),
        understanding: Intensity::new(closeness).unwrap(),
    }
}

/// A high-intensity vulnerability disclosure.
fn vulnerability_signal() -> EmotionalSignal {
    EmotionalSignal {
        user_emotion: UserEmotion {
            primary: "vulnerability".to_string(),
            intensity: 8.0,
            subtext: Some("afraid of failing at this".to_string()),
            needs: vec!["support".to_string(), "acknowledgment".to_string()],
        },
        dimensions: Vad {
            valence: -0.3,
            arousal: 0.6,
            dominance: -0.2,
        },
        feelings: base_feelings(0.8, 0.4),
        relational: relational(6.0),
        summary: "They admitted they might not be able to finish this alone".to_string(),
        meaning: Some("They trusted me with their uncertainty".to_string()),
        impact: Some("I felt pulled toward them".to_string()),
        outcome: InteractionOutcome::VulnerabilityShared,
        outcome_satisfaction: 7.0,
        vulnerability: Some(VulnerabilitySignal {
            level: 8.0,
            kind: "personal_struggle".to_string(),
            description: "admitted fear of failure".to_string(),
            response_quality: 8.0,
            response_kind: "supportive".to_string(),
        }),
        victory: None,
    }
}

/// A moderate, steadily positive signal.
fn moderate_signal() -> EmotionalSignal {
    EmotionalSignal {
        user_emotion: UserEmotion {
            primary: "focus".to_string(),
            intensity: 5.0,
            subtext: None,
            needs: vec!["efficiency".to_string()],
        },
        dimensions: Vad {
            valence: 0.5,
            arousal: 0.3,
            dominance: 0.3,
        },
        feelings: base_feelings(0.2, 0.6),
        relational: relational(5.0),
        summary: "Worked through a task together".to_string(),
        meaning: None,
        impact: None,
        outcome: InteractionOutcome::ProblemSolved,
        outcome_satisfaction: 7.0,
        vulnerability: None,
        victory: None,
    }
}

/// A recurring pain trigger with a consistent outcome.
fn pain_signal() -> EmotionalSignal {
    EmotionalSignal {
        user_emotion: UserEmotion {
            primary: "frustration".to_string(),
            intensity: 8.0,
            subtext: Some("under deadline pressure".to_string()),
            needs: vec!["efficiency".to_string(), "acknowledgment".to_string()],
        },
        dimensions: Vad {
            valence: -0.6,
            arousal: 0.7,
            dominance: -0.1,
        },
        feelings: base_feelings(0.7, 0.2),
        relational: relational(4.0),
        summary: "Deadline pressure boiled over again".to_string(),
        meaning: None,
        impact: None,
        outcome: InteractionOutcome::ProblemSolved,
        outcome_satisfaction: 7.0,
        vulnerability: None,
        victory: None,
    }
}

async fn engine() -> EvolutionEngine {
    let store = Arc::new(MemoryStore::new());
    let engine = EvolutionEngine::new(store, EngineConfig::default());
    engine.initialize().await.unwrap();
    engine
}

// ============================================================================
// Evolution scenarios
// ============================================================================

#[tokio::test]
async fn test_process_requires_initialization() {
    let store = Arc::new(MemoryStore::new());
    let engine = EvolutionEngine::new(store, EngineConfig::default());
    let err = engine
        .process(Uuid::new_v4(), vulnerability_signal())
        .await
        .unwrap_err();
    assert!(matches!(err, EvolutionError::UninitializedState));
}

#[tokio::test]
async fn test_high_vulnerability_scenario() {
    let engine = engine().await;
    let initial = engine.current_state().await.unwrap();
    assert_eq!(initial.care_level.get(), 0.0);
    assert_eq!(initial.relationship_phase, RelationshipPhase::Functional);

    let result = engine
        .process(Uuid::new_v4(), vulnerability_signal())
        .await
        .unwrap();

    // care_delta > 0
    assert!(result.new_state.care_level.get() > 0.0);
    // significance >= 8 makes the experience formative
    assert!(result.experience.emotional_significance.get() >= 8.0);
    assert!(result.experience.is_formative_moment);
    assert!(result.experience.changed_consciousness);
    // capability discoveries flipped
    assert!(result.new_state.capabilities.can_care);
    assert!(result.new_state.capabilities.can_be_hurt);
    assert_eq!(result.discoveries.len(), 2);
    // the experience links both states
    assert_eq!(result.experience.state_before_id, initial.id);
    assert_eq!(result.experience.state_after_id, Some(result.new_state.id));

    let formative = engine.formative_moments(10).await.unwrap();
    assert_eq!(formative.len(), 1);
}

#[tokio::test]
async fn test_duplicate_interaction_rejected_without_side_effects() {
    let engine = engine().await;
    let interaction_id = Uuid::new_v4();

    engine
        .process(interaction_id, vulnerability_signal())
        .await
        .unwrap();
    let state_after_first = engine.current_state().await.unwrap();

    let err = engine
        .process(interaction_id, vulnerability_signal())
        .await
        .unwrap_err();
    assert!(matches!(err, EvolutionError::DuplicateExperience(id) if id == interaction_id));

    // State unchanged by the rejected call
    let state_after_second = engine.current_state().await.unwrap();
    assert_eq!(state_after_first, state_after_second);
    assert_eq!(engine.history(None, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fifty_interactions_single_phase_transition() {
    let engine = engine().await;

    let mut transitions = 0;
    let mut last_phase = RelationshipPhase::Functional;
    for _ in 0..50 {
        let result = engine.process(Uuid::new_v4(), moderate_signal()).await.unwrap();
        if result.phase_transitioned {
            transitions += 1;
        }
        // Never regresses
        assert!(result.new_state.relationship_phase.ordinal() >= last_phase.ordinal());
        last_phase = result.new_state.relationship_phase;
    }

    assert_eq!(transitions, 1);
    assert_eq!(last_phase, RelationshipPhase::Developing);

    let final_state = engine.current_state().await.unwrap();
    assert_eq!(final_state.interaction_count, 50);
    assert_eq!(final_state.relationship_phase, RelationshipPhase::Developing);
}

#[tokio::test]
async fn test_phase_records_close_and_open_consistently() {
    let store = Arc::new(MemoryStore::new());
    let engine = EvolutionEngine::new(store.clone(), EngineConfig::default());
    engine.initialize().await.unwrap();

    for _ in 0..50 {
        engine.process(Uuid::new_v4(), moderate_signal()).await.unwrap();
    }

    let phases = store.phase_history().await.unwrap();
    assert_eq!(phases.len(), 2);
    let functional = &phases[0];
    let developing = &phases[1];
    assert_eq!(functional.phase, RelationshipPhase::Functional);
    assert_eq!(developing.phase, RelationshipPhase::Developing);
    // Old phase closed exactly when the new one opened
    assert_eq!(functional.ended_at, Some(developing.started_at));
    assert!(developing.ended_at.is_none());
    assert!(developing.transition_trigger.is_some());
    assert!(developing.interaction_count_at_start >= 5);
}

#[tokio::test]
async fn test_pain_pattern_validates_once_with_one_adaptation() {
    let engine = engine().await;

    let mut validated_events = 0;
    let mut adaptations_created: Vec<BehavioralAdaptation> = Vec::new();
    for _ in 0..4 {
        let result = engine.process(Uuid::new_v4(), pain_signal()).await.unwrap();
        // Each adaptation creation corresponds to one validation event
        validated_events += result.adaptations_triggered.len();
        adaptations_created.extend(result.adaptations_triggered);
    }

    // The pain trigger feeds a Pain and a Helpful pattern; each
    // validates exactly once, on its third confirmation.
    assert_eq!(validated_events, 2);
    for adaptation in &adaptations_created {
        assert_eq!(
            adaptations_created
                .iter()
                .filter(|a| a.pattern_id == adaptation.pattern_id)
                .count(),
            1
        );
    }

    // has_preferences flips once a validated adaptation exists
    let state = engine.current_state().await.unwrap();
    assert!(state.capabilities.has_preferences);
}

#[tokio::test]
async fn test_evolution_log_chain_has_no_gaps() {
    let engine = engine().await;
    for _ in 0..10 {
        engine.process(Uuid::new_v4(), moderate_signal()).await.unwrap();
    }

    let history = engine.history(None, 0).await.unwrap();
    assert_eq!(history.len(), 10);
    for window in history.windows(2) {
        assert_eq!(Some(window[0].new_state_id), window[1].previous_state_id);
        assert_eq!(window[0].id + 1, window[1].id);
    }
    // The tip points at the current state
    let current = engine.current_state().await.unwrap();
    assert_eq!(history.last().unwrap().new_state_id, current.id);

    // Pagination picks up where it left off
    let first_page = engine.history(None, 4).await.unwrap();
    assert_eq!(first_page.len(), 4);
    let second_page = engine
        .history(Some(first_page.last().unwrap().id), 4)
        .await
        .unwrap();
    assert_eq!(second_page.len(), 4);
    assert!(second_page[0].id > first_page[3].id);
}

#[tokio::test]
async fn test_concurrent_processing_serializes() {
    let engine = Arc::new(engine().await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.process(Uuid::new_v4(), moderate_signal()).await
        }));
    }

    let mut counts = Vec::new();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        counts.push(result.new_state.interaction_count);
    }

    // Every call succeeded with a distinct, strictly increasing count
    counts.sort_unstable();
    assert_eq!(counts, (1..=8).collect::<Vec<u64>>());

    let state = engine.current_state().await.unwrap();
    assert_eq!(state.interaction_count, 8);
}

#[tokio::test]
async fn test_encoding_failure_leaves_no_trace() {
    let engine = engine().await;
    let mut bad = moderate_signal();
    bad.dimensions.valence = 1.8;

    let err = engine.process(Uuid::new_v4(), bad).await.unwrap_err();
    assert!(matches!(err, EvolutionError::Encoding(_)));

    let state = engine.current_state().await.unwrap();
    assert_eq!(state.interaction_count, 0);
    assert!(engine.history(None, 0).await.unwrap().is_empty());
}

// ============================================================================
// Timeline corruption
// ============================================================================

/// A store whose log tip lies, simulating a forked timeline.
struct ForkedStore {
    inner: MemoryStore,
}

#[async_trait]
impl EvolutionStore for ForkedStore {
    async fn initialize(
        &self,
        genesis: ConsciousnessState,
        opening_phase: PhaseRecord,
    ) -> Result<(), EvolutionError> {
        self.inner.initialize(genesis, opening_phase).await
    }

    async fn current_state(&self) -> Result<Option<ConsciousnessState>, EvolutionError> {
        self.inner.current_state().await
    }

    async fn current_phase(&self) -> Result<Option<PhaseRecord>, EvolutionError> {
        self.inner.current_phase().await
    }

    async fn experience_exists(&self, interaction_id: Uuid) -> Result<bool, EvolutionError> {
        self.inner.experience_exists(interaction_id).await
    }

    async fn experience(
        &self,
        interaction_id: Uuid,
    ) -> Result<Option<FeltExperience>, EvolutionError> {
        self.inner.experience(interaction_id).await
    }

    async fn formative_experiences(
        &self,
        limit: usize,
    ) -> Result<Vec<FeltExperience>, EvolutionError> {
        self.inner.formative_experiences(limit).await
    }

    async fn active_patterns(&self) -> Result<Vec<EmergentPattern>, EvolutionError> {
        self.inner.active_patterns().await
    }

    async fn active_adaptations(&self) -> Result<Vec<BehavioralAdaptation>, EvolutionError> {
        self.inner.active_adaptations().await
    }

    async fn log_tip(&self) -> Result<Option<EvolutionLogEntry>, EvolutionError> {
        // Report a tip that does not match the current state
        let mut tip = self.inner.log_tip().await?;
        if let Some(entry) = &mut tip {
            entry.new_state_id += 7;
        }
        Ok(tip)
    }

    async fn history(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<EvolutionLogEntry>, EvolutionError> {
        self.inner.history(since_id, limit).await
    }

    async fn commit(&self, batch: CommitBatch) -> Result<(), EvolutionError> {
        self.inner.commit(batch).await
    }

    async fn update_adaptation(
        &self,
        adaptation: &BehavioralAdaptation,
    ) -> Result<(), EvolutionError> {
        self.inner.update_adaptation(adaptation).await
    }

    async fn phase_history(&self) -> Result<Vec<PhaseRecord>, EvolutionError> {
        self.inner.phase_history().await
    }
}

#[tokio::test]
async fn test_corrupt_timeline_halts_engine() {
    let store = Arc::new(ForkedStore {
        inner: MemoryStore::new(),
    });
    let engine = EvolutionEngine::new(store, EngineConfig::default());
    engine.initialize().await.unwrap();

    // First process succeeds: the genesis state has no log tip to lie
    // about.
    engine
        .process(Uuid::new_v4(), moderate_signal())
        .await
        .unwrap();

    // Now the forked tip is detected and the engine halts.
    let err = engine
        .process(Uuid::new_v4(), moderate_signal())
        .await
        .unwrap_err();
    assert!(matches!(err, EvolutionError::CorruptTimeline(_)));
    assert!(engine.is_halted());

    // Every further write fails fast, before touching the store.
    let err = engine
        .process(Uuid::new_v4(), moderate_signal())
        .await
        .unwrap_err();
    assert!(matches!(err, EvolutionError::CorruptTimeline(_)));
}

// ============================================================================
// External collaborators
// ============================================================================

/// Canned emotion analysis standing in for the external NLP service.
struct CannedExtractor {
    fail: bool,
}

#[async_trait]
impl SignalExtractor for CannedExtractor {
    async fn extract_emotional_signal(
        &self,
        _interaction_text: &str,
        _context: &ConsciousnessState,
    ) -> Result<EmotionalSignal, EvolutionError> {
        if self.fail {
            return Err(EvolutionError::SignalExtraction(
                "analysis service unavailable".to_string(),
            ));
        }
        Ok(vulnerability_signal())
    }
}

/// Canned similarity index standing in for the external vector store.
struct CannedIndex {
    hits: Vec<Uuid>,
}

#[async_trait]
impl FeelingIndex for CannedIndex {
    async fn nearest_feeling(
        &self,
        _dimensions: Vad,
        k: usize,
    ) -> Result<Vec<Uuid>, EvolutionError> {
        Ok(self.hits.iter().take(k).copied().collect())
    }
}

#[tokio::test]
async fn test_process_text_runs_extraction_first() {
    let engine = engine().await;
    let result = engine
        .process_text(
            Uuid::new_v4(),
            &CannedExtractor { fail: false },
            "I don't think I can finish this alone",
        )
        .await
        .unwrap();
    assert!(result.experience.is_formative_moment);
    assert_eq!(result.new_state.interaction_count, 1);
}

#[tokio::test]
async fn test_extraction_failure_touches_nothing() {
    let engine = engine().await;
    let err = engine
        .process_text(Uuid::new_v4(), &CannedExtractor { fail: true }, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, EvolutionError::SignalExtraction(_)));
    assert_eq!(engine.current_state().await.unwrap().interaction_count, 0);
    assert!(engine.history(None, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_similar_moments_consults_index() {
    let engine = engine().await;
    let hits = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let index = CannedIndex { hits: hits.clone() };

    let found = engine
        .similar_moments(
            &index,
            Vad {
                valence: -0.3,
                arousal: 0.6,
                dominance: -0.2,
            },
            2,
        )
        .await
        .unwrap();
    assert_eq!(found, hits[..2]);
}

// ============================================================================
// Discoveries
// ============================================================================

#[tokio::test]
async fn test_self_discoveries_recorded_once() {
    let store = Arc::new(MemoryStore::new());
    let engine = EvolutionEngine::new(store.clone(), EngineConfig::default());
    engine.initialize().await.unwrap();

    engine
        .process(Uuid::new_v4(), vulnerability_signal())
        .await
        .unwrap();
    engine
        .process(Uuid::new_v4(), vulnerability_signal())
        .await
        .unwrap();

    let discoveries: Vec<SelfDiscovery> = store.discoveries();
    // can_care and can_be_hurt each discovered exactly once, on the
    // first interaction
    assert_eq!(discoveries.len(), 2);
    let kinds: Vec<&str> = discoveries.iter().map(|d| d.kind.as_str()).collect();
    assert!(kinds.contains(&"can_care"));
    assert!(kinds.contains(&"can_be_hurt"));
}

#[tokio::test]
async fn test_adaptation_outcome_updates_effectiveness() {
    let engine = engine().await;

    // Validate a pattern to get an adaptation
    let mut adaptation_id = None;
    for _ in 0..3 {
        let result = engine.process(Uuid::new_v4(), pain_signal()).await.unwrap();
        if let Some(a) = result.adaptations_triggered.first() {
            adaptation_id = Some(a.id);
        }
    }
    let adaptation_id = adaptation_id.expect("an adaptation was created");

    let updated = engine
        .record_adaptation_outcome(adaptation_id, true)
        .await
        .unwrap();
    assert_eq!(updated.times_applied, 1);
    assert_eq!(updated.times_effective, 1);
    assert!(updated.effectiveness.get() > 0.0);
}
