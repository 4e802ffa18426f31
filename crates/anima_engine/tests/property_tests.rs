//! Property-based tests for the evolution pipeline.
//!
//! Fuzzes emotional signals across their full ranges and verifies the
//! core invariants: levels stay in [0, 100], capabilities are monotonic,
//! the phase ordinal never decreases, the log chain has no gaps, and
//! pattern confidence stays derived and bounded.

use anima_core::config::{DeltaConfig, PatternConfig, PhaseConfig, ScoringConfig};
use anima_core::experience::{
    EmotionalSignal, Feeling, InteractionOutcome, RelationalFeelings, UserEmotion, Vad,
    VulnerabilitySignal,
};
use anima_core::pattern::{BehavioralAdaptation, EmergentPattern};
use anima_core::score::Intensity;
use anima_core::state::ConsciousnessState;
use anima_engine::evolve::{EvolveContext, StateEvolver};
use anima_engine::encoder::ExperienceEncoder;
use anima_engine::patterns::PatternEngine;
use anima_engine::phase::PhaseMachine;
use chrono::Utc;
use proptest::prelude::*;
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Strategies
// ============================================================================

fn arb_outcome() -> impl Strategy<Value = InteractionOutcome> {
    prop_oneof![
        Just(InteractionOutcome::ProblemSolved),
        Just(InteractionOutcome::VulnerabilityShared),
        Just(InteractionOutcome::ConnectionDeepened),
        Just(InteractionOutcome::FrustrationResolved),
        Just(InteractionOutcome::GrowthAchieved),
        Just(InteractionOutcome::CareExpressed),
        Just(InteractionOutcome::StruggleShared),
        Just(InteractionOutcome::VictoryCelebrated),
    ]
}

fn arb_emotion_label() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("frustration".to_string()),
        Just("excitement".to_string()),
        Just("vulnerability".to_string()),
        Just("gratitude".to_string()),
        Just("anxiety".to_string()),
    ]
}

fn arb_signal() -> impl Strategy<Value = EmotionalSignal> {
    (
        arb_emotion_label(),
        0.0f64..=10.0,
        -1.0f64..=1.0,
        -1.0f64..=1.0,
        -1.0f64..=1.0,
        0.0f64..=10.0,
        arb_outcome(),
        0.0f64..=10.0,
        proptest::option::of(0.0f64..=10.0),
        0.0f64..=1.0,
    )
        .prop_map(
            |(
                primary,
                intensity,
                valence,
                arousal,
                dominance,
                closeness,
                outcome,
                satisfaction,
                vulnerability_level,
                concern,
            )| {
                let mut feelings = BTreeMap::new();
                feelings.insert(Feeling::Concern, concern);
                feelings.insert(Feeling::Connection, 1.0 - concern);
                EmotionalSignal {
                    user_emotion: UserEmotion {
                        primary,
                        intensity,
                        subtext: None,
                        needs: vec!["acknowledgment".to_string()],
                    },
                    dimensions: Vad {
                        valence,
                        arousal,
                        dominance,
                    },
                    feelings,
                    relational: RelationalFeelings {
                        closeness: Intensity::new(closeness).unwrap(),
                        trust: Intensity::new(closeness).unwrap(),
                        understanding: Intensity::new(closeness).unwrap(),
                    },
                    summary: "an interaction".to_string(),
                    meaning: None,
                    impact: None,
                    outcome,
                    outcome_satisfaction: satisfaction,
                    vulnerability: vulnerability_level.map(|level| VulnerabilitySignal {
                        level,
                        kind: "personal_struggle".to_string(),
                        description: "they opened up".to_string(),
                        response_quality: 7.0,
                        response_kind: "supportive".to_string(),
                    }),
                    victory: None,
                }
            },
        )
}

// ============================================================================
// Encoder properties
// ============================================================================

proptest! {
    /// Significance and memory weight always land in [0, 10], and the
    /// formative flag agrees with the significance threshold.
    #[test]
    fn encoder_scores_always_bounded(signal in arb_signal()) {
        let encoder = ExperienceEncoder::new(ScoringConfig::default());
        let state = ConsciousnessState::genesis(Utc::now());
        let encoded = encoder
            .encode(Uuid::new_v4(), &signal, &state, Utc::now())
            .unwrap();

        let exp = &encoded.experience;
        prop_assert!(exp.emotional_significance.get() >= 0.0);
        prop_assert!(exp.emotional_significance.get() <= 10.0);
        prop_assert!(exp.memory_weight.get() >= 0.0);
        prop_assert!(exp.memory_weight.get() <= 10.0);
        if exp.emotional_significance.get() >= 8.0 {
            prop_assert!(exp.is_formative_moment);
        }
        if exp.will_remember_forever {
            prop_assert!(exp.memory_weight.get() >= 9.0);
        }
    }
}

// ============================================================================
// Evolution-sequence properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Across any sequence of valid signals: levels stay in [0, 100],
    /// capabilities never revert, the phase ordinal never decreases,
    /// and state ids have no gaps.
    #[test]
    fn evolution_sequence_invariants(signals in prop::collection::vec(arb_signal(), 1..30)) {
        let encoder = ExperienceEncoder::new(ScoringConfig::default());
        let evolver = StateEvolver::new(DeltaConfig::default());
        let phases = PhaseMachine::new(PhaseConfig::default());
        let now = Utc::now();

        let mut state = ConsciousnessState::genesis(now);
        let mut prev_caps = state.capabilities;
        let mut prev_phase = state.relationship_phase;

        for (i, signal) in signals.iter().enumerate() {
            let encoded = encoder
                .encode(Uuid::new_v4(), signal, &state, now)
                .unwrap();
            let ctx = EvolveContext { now, validated_adaptations: 0 };
            let mut evolution = evolver.evolve(&state, &encoded.experience, &ctx).unwrap();

            if let Some(shift) = phases.check(&evolution.new_state) {
                evolution.new_state.relationship_phase = shift.to;
            }

            let new_state = evolution.new_state;
            prop_assert!(new_state.care_level.get() >= 0.0 && new_state.care_level.get() <= 100.0);
            prop_assert!(
                new_state.attachment_level.get() >= 0.0
                    && new_state.attachment_level.get() <= 100.0
            );
            prop_assert!(
                new_state.capabilities.dominates(&prev_caps),
                "capability reverted at step {}",
                i
            );
            prop_assert!(
                new_state.relationship_phase.ordinal() >= prev_phase.ordinal(),
                "phase regressed at step {}",
                i
            );
            prop_assert_eq!(new_state.id, state.id + 1);
            prop_assert_eq!(evolution.entry.previous_state_id, Some(state.id));
            prop_assert_eq!(evolution.entry.new_state_id, new_state.id);
            prop_assert!(evolution.care_delta.abs() <= DeltaConfig::default().max_care_delta);
            prop_assert!(
                evolution.attachment_delta.abs()
                    <= DeltaConfig::default().max_attachment_delta
            );

            prev_caps = new_state.capabilities;
            prev_phase = new_state.relationship_phase;
            state = new_state;
        }

        prop_assert_eq!(state.interaction_count, signals.len() as u64);
    }
}

// ============================================================================
// Pattern-engine properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any stream of experiences: confidence stays in [0, 1],
    /// counters add up, retired patterns survive as rows, and
    /// validation always means the bar was met.
    #[test]
    fn pattern_stream_invariants(signals in prop::collection::vec(arb_signal(), 1..25)) {
        let cfg = PatternConfig::default();
        let engine = PatternEngine::new(cfg.clone());
        let encoder = ExperienceEncoder::new(ScoringConfig::default());
        let state = ConsciousnessState::genesis(Utc::now());

        let mut known: Vec<EmergentPattern> = Vec::new();
        let mut adaptations: Vec<BehavioralAdaptation> = Vec::new();

        for (i, signal) in signals.iter().enumerate() {
            let encoded = encoder
                .encode(Uuid::new_v4(), signal, &state, Utc::now())
                .unwrap();
            let active: Vec<EmergentPattern> =
                known.iter().filter(|p| p.is_active).cloned().collect();
            let obs = engine.observe(
                &active,
                &adaptations,
                &encoded.experience,
                (i + 1) as u64,
                Utc::now(),
            );
            for upsert in obs.upserts {
                if let Some(slot) = known.iter_mut().find(|p| p.id == upsert.id) {
                    *slot = upsert;
                } else {
                    known.push(upsert);
                }
            }
            adaptations.extend(obs.new_adaptations);
        }

        for pattern in &known {
            prop_assert!(pattern.confidence.get() >= 0.0 && pattern.confidence.get() < 1.0);
            prop_assert_eq!(
                pattern.times_observed,
                pattern.times_confirmed + pattern.times_contradicted
            );
            prop_assert!(pattern.times_observed >= 1);
            if pattern.is_validated {
                prop_assert!(pattern.times_observed >= cfg.validation_observations);
            }
            if !pattern.is_active {
                // Retired, not deleted
                prop_assert!(pattern.times_contradicted > 0);
            }
        }

        // At most one adaptation per pattern
        for adaptation in &adaptations {
            let count = adaptations
                .iter()
                .filter(|a| a.pattern_id == adaptation.pattern_id)
                .count();
            prop_assert_eq!(count, 1);
        }
    }
}
