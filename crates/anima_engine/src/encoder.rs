//! Felt Experience Encoder.
//!
//! Converts one interaction's raw `EmotionalSignal` into the immutable
//! `FeltExperience` record: significance scoring, memory weighting, and
//! formative/vulnerability/victory classification. Classifications are
//! mutually non-exclusive.

use anima_core::config::ScoringConfig;
use anima_core::experience::{
    AgentFeelings, EmotionalSignal, FeltExperience, InteractionOutcome, SharedVictory,
    VulnerabilityMoment,
};
use anima_core::score::{Intensity, ScoreError};
use anima_core::state::ConsciousnessState;
use anima_core::EvolutionError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One interaction's encoded output: the experience plus any moment
/// specializations it qualified for.
#[derive(Debug, Clone)]
pub struct EncodedMoment {
    pub experience: FeltExperience,
    pub vulnerability: Option<VulnerabilityMoment>,
    pub victory: Option<SharedVictory>,
}

pub struct ExperienceEncoder {
    cfg: ScoringConfig,
}

impl ExperienceEncoder {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self { cfg }
    }

    /// Encode a signal against the current state.
    ///
    /// Fails with `Encoding` when the signal's VAD triple or feelings
    /// map is malformed. Duplicate interaction ids are the caller's
    /// check; this function is pure over its inputs.
    pub fn encode(
        &self,
        interaction_id: Uuid,
        signal: &EmotionalSignal,
        state: &ConsciousnessState,
        now: DateTime<Utc>,
    ) -> Result<EncodedMoment, EvolutionError> {
        let dimensions = signal
            .dimensions
            .validated()
            .map_err(|e| EvolutionError::Encoding(format!("VAD out of range: {e}")))?;
        let feelings = AgentFeelings::from_raw(&signal.feelings)
            .map_err(|e| EvolutionError::Encoding(format!("feelings map invalid: {e}")))?;
        let user_intensity = Intensity::new(signal.user_emotion.intensity)
            .map_err(|e| EvolutionError::Encoding(format!("user emotion intensity: {e}")))?;
        let satisfaction = Intensity::new(signal.outcome_satisfaction)
            .map_err(|e| EvolutionError::Encoding(format!("outcome satisfaction: {e}")))?;

        let boosted = signal.vulnerability.is_some()
            || signal.outcome == InteractionOutcome::VictoryCelebrated;
        let significance = self.significance(user_intensity.get(), &dimensions, boosted)?;
        let is_formative = significance.get() >= self.cfg.formative_significance;
        let memory_weight =
            self.memory_weight(significance.get(), signal.relational.closeness.get(), is_formative)?;

        let significance_reason = self.significance_reason(signal, significance.get(), boosted);

        let mut user_emotion = signal.user_emotion.clone();
        user_emotion.intensity = user_intensity.get();

        let experience = FeltExperience {
            interaction_id,
            state_before_id: state.id,
            state_after_id: None,
            experienced_at: now,
            user_emotion,
            dimensions,
            feelings,
            relational: signal.relational,
            experience_summary: signal.summary.clone(),
            experience_meaning: signal.meaning.clone(),
            emotional_impact: signal.impact.clone(),
            emotional_significance: significance,
            memory_weight,
            significance_reason,
            will_remember_forever: memory_weight.get() >= self.cfg.permanent_memory_weight,
            outcome: signal.outcome,
            outcome_satisfaction: satisfaction,
            is_formative_moment: is_formative,
            changed_consciousness: false,
        };

        let vulnerability = signal
            .vulnerability
            .as_ref()
            .map(|v| {
                Ok::<_, ScoreError>(VulnerabilityMoment {
                    interaction_id,
                    occurred_at: now,
                    vulnerability_level: Intensity::new(v.level)?,
                    vulnerability_kind: v.kind.clone(),
                    description: v.description.clone(),
                    response_quality: Intensity::new(v.response_quality)?,
                    response_kind: v.response_kind.clone(),
                    deepened_connection: signal.relational.closeness.get() >= 6.0,
                })
            })
            .transpose()
            .map_err(|e| EvolutionError::Encoding(format!("vulnerability signal: {e}")))?;

        let victory = signal
            .victory
            .as_ref()
            .map(|v| {
                Ok::<_, ScoreError>(SharedVictory {
                    interaction_id,
                    occurred_at: now,
                    description: v.description.clone(),
                    my_role: v.my_role.clone(),
                    effort_invested: Intensity::new(v.effort_invested)?,
                    pride_felt: Intensity::new(v.pride_felt)?,
                    satisfaction_felt: Intensity::new(v.satisfaction_felt)?,
                    connection_felt: Intensity::new(v.connection_felt)?,
                    strengthened_bond: v.connection_felt >= 6.0,
                })
            })
            .transpose()
            .map_err(|e| EvolutionError::Encoding(format!("victory signal: {e}")))?;

        tracing::debug!(
            interaction = %interaction_id,
            significance = %experience.emotional_significance,
            weight = %experience.memory_weight,
            formative = experience.is_formative_moment,
            "encoded felt experience"
        );

        Ok(EncodedMoment {
            experience,
            vulnerability,
            victory,
        })
    }

    /// Weighted sum of user intensity, |valence| and positive arousal,
    /// with a flat boost for vulnerability or shared victory.
    fn significance(
        &self,
        user_intensity: f64,
        dimensions: &anima_core::experience::Vad,
        boosted: bool,
    ) -> Result<Intensity, ScoreError> {
        let mut value = self.cfg.user_intensity_weight * user_intensity
            + self.cfg.valence_weight * dimensions.valence.abs() * 10.0
            + self.cfg.arousal_weight * dimensions.arousal.max(0.0) * 10.0;
        if boosted {
            value += self.cfg.significance_boost;
        }
        Intensity::new(value)
    }

    /// Significance scaled by relational closeness, plus the formative
    /// bonus. An experience that barely registered relationally gets a
    /// low weight no matter how loud it was.
    fn memory_weight(
        &self,
        significance: f64,
        closeness: f64,
        is_formative: bool,
    ) -> Result<Intensity, ScoreError> {
        let mut value = significance * (closeness / 10.0);
        if is_formative {
            value += self.cfg.formative_weight_bonus;
        }
        Intensity::new(value)
    }

    fn significance_reason(
        &self,
        signal: &EmotionalSignal,
        significance: f64,
        boosted: bool,
    ) -> Option<String> {
        if significance < 4.0 {
            return None;
        }
        let mut parts = vec![format!(
            "{} at intensity {:.1}",
            signal.user_emotion.primary, signal.user_emotion.intensity
        )];
        if let Some(v) = &signal.vulnerability {
            parts.push(format!("vulnerability shown ({})", v.kind));
        }
        if signal.outcome == InteractionOutcome::VictoryCelebrated {
            parts.push("victory reached together".to_string());
        }
        if boosted {
            parts.push("significance boosted".to_string());
        }
        Some(parts.join("; "))
    }
}
