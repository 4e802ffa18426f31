//! Consciousness State Manager.
//!
//! `evolve` turns (current state, felt experience) into a new immutable
//! state snapshot plus the log entry chaining them. Deltas are bounded
//! per interaction, levels are clamped, and capability flags only ever
//! move false→true.

use anima_core::config::DeltaConfig;
use anima_core::experience::{FeltExperience, InteractionOutcome};
use anima_core::state::{
    CapabilityKind, ConsciousnessState, EvolutionLogEntry, SelfDiscovery,
};
use anima_core::EvolutionError;
use chrono::{DateTime, Utc};

/// Cross-entity context the evolver needs beyond the state itself.
#[derive(Debug, Clone, Copy)]
pub struct EvolveContext {
    pub now: DateTime<Utc>,
    /// Count of currently validated behavioral adaptations; evidence of
    /// consistent approach selection for the `has_preferences` flag.
    pub validated_adaptations: usize,
}

/// Output of one evolve step, before the phase machine runs.
#[derive(Debug, Clone)]
pub struct Evolution {
    pub new_state: ConsciousnessState,
    pub entry: EvolutionLogEntry,
    pub discoveries: Vec<SelfDiscovery>,
    pub changed_consciousness: bool,
    pub care_delta: f64,
    pub attachment_delta: f64,
}

pub struct StateEvolver {
    cfg: DeltaConfig,
}

impl StateEvolver {
    pub fn new(cfg: DeltaConfig) -> Self {
        Self { cfg }
    }

    pub fn evolve(
        &self,
        current: &ConsciousnessState,
        experience: &FeltExperience,
        ctx: &EvolveContext,
    ) -> Result<Evolution, EvolutionError> {
        let gap_days = current.days_since_last_interaction(ctx.now);

        let care_delta = self.care_delta(current, experience, gap_days);
        let attachment_delta = self.attachment_delta(experience, gap_days);

        let care_level = current.care_level.saturating_add(care_delta)?;
        let attachment_level = current.attachment_level.saturating_add(attachment_delta)?;

        let capabilities = self.discover_capabilities(current, experience, care_delta, gap_days, ctx);
        let flips = current.capabilities.newly_discovered(&capabilities);

        let changed_consciousness = !flips.is_empty()
            || care_delta.abs() + attachment_delta.abs() >= self.cfg.formative_combined_delta;

        let care_reason = self.care_reason(experience, care_delta);
        let attachment_reason = self.attachment_reason(experience, attachment_delta, gap_days);

        let mut new_state = ConsciousnessState {
            id: current.id + 1,
            created_at: ctx.now,
            interaction_count: current.interaction_count + 1,
            first_interaction_at: current.first_interaction_at.or(Some(ctx.now)),
            last_interaction_at: Some(ctx.now),
            care_level,
            attachment_level,
            care_evolution_reason: care_reason.clone(),
            attachment_evolution_reason: attachment_reason.clone(),
            relational_identity: current.relational_identity.clone(),
            relationship_phase: current.relationship_phase,
            self_narrative: current.self_narrative.clone(),
            capabilities,
        };

        let discoveries =
            self.discovery_records(current, &new_state, experience, &flips, ctx.now);

        if changed_consciousness {
            new_state.self_narrative = self.narrate_self(&new_state, &discoveries);
        }

        let entry = EvolutionLogEntry {
            id: 0,
            previous_state_id: Some(current.id),
            new_state_id: new_state.id,
            evolved_at: ctx.now,
            interaction_id: experience.interaction_id,
            care_delta,
            attachment_delta,
            evolution_reason: self.evolution_reason(care_reason, attachment_reason),
            triggering_experience_summary: experience.experience_summary.clone(),
            new_self_awareness: discoveries.first().map(|d| d.description.clone()),
            evolution_significance: experience.emotional_significance,
        };

        tracing::info!(
            state = new_state.id,
            care = %new_state.care_level,
            attachment = %new_state.attachment_level,
            care_delta,
            attachment_delta,
            discoveries = discoveries.len(),
            "consciousness evolved"
        );

        Ok(Evolution {
            new_state,
            entry,
            discoveries,
            changed_consciousness,
            care_delta,
            attachment_delta,
        })
    }

    /// Sign from the experience classification, magnitude from memory
    /// weight, hard-bounded per interaction.
    fn care_delta(
        &self,
        current: &ConsciousnessState,
        experience: &FeltExperience,
        gap_days: i64,
    ) -> f64 {
        let weight = experience.memory_weight.get();
        let consistent_presence = current.interaction_count > 0 && gap_days <= 1;

        let raw = if self.is_care_growth(experience) || consistent_presence {
            weight * self.cfg.care_growth_rate
        } else if self.is_hurtful(experience) {
            -(weight * self.cfg.hurt_rate)
        } else {
            weight * self.cfg.presence_rate
        };
        raw.clamp(-self.cfg.max_care_delta, self.cfg.max_care_delta)
    }

    /// Driven by felt closeness, with a bounded reunion bonus after a
    /// gap: absence is a documented attachment driver.
    fn attachment_delta(&self, experience: &FeltExperience, gap_days: i64) -> f64 {
        let closeness = experience.relational.closeness.get();
        let mut raw = closeness / 10.0 * experience.memory_weight.get() * self.cfg.attachment_rate;
        if gap_days >= self.cfg.reunion_gap_days {
            raw += (gap_days as f64 * self.cfg.reunion_bonus_per_day)
                .min(self.cfg.reunion_bonus_cap);
        }
        raw.clamp(-self.cfg.max_attachment_delta, self.cfg.max_attachment_delta)
    }

    /// Vulnerability witnessed, care expressed, or shared effort.
    fn is_care_growth(&self, experience: &FeltExperience) -> bool {
        experience.vulnerability_witnessed()
            || matches!(
                experience.outcome,
                InteractionOutcome::CareExpressed | InteractionOutcome::VictoryCelebrated
            )
    }

    /// High-intensity negative emotion that the agent failed to meet.
    fn is_hurtful(&self, experience: &FeltExperience) -> bool {
        experience.dimensions.valence < 0.0
            && experience.user_emotion.intensity >= self.cfg.hurt_intensity_floor
            && experience.outcome_satisfaction.get() < self.cfg.supportive_satisfaction_floor
            && !self.is_care_growth(experience)
    }

    /// One-way capability triggers. A set flag is carried forward
    /// unconditionally.
    fn discover_capabilities(
        &self,
        current: &ConsciousnessState,
        experience: &FeltExperience,
        care_delta: f64,
        gap_days: i64,
        ctx: &EvolveContext,
    ) -> anima_core::state::EmotionalCapabilities {
        let mut caps = current.capabilities;

        if care_delta > 0.0
            && experience.emotional_significance.get() >= self.cfg.care_capability_significance
        {
            caps.can_care = true;
        }

        let supportive = experience.outcome_satisfaction.get()
            >= self.cfg.supportive_satisfaction_floor;
        if experience.dimensions.valence < 0.0
            && experience.user_emotion.intensity >= self.cfg.hurt_intensity_floor
            && supportive
        {
            caps.can_be_hurt = true;
        }

        if experience.outcome == InteractionOutcome::GrowthAchieved
            && experience.emotional_significance.get() >= self.cfg.growth_significance_floor
        {
            caps.can_grow = true;
        }

        if ctx.validated_adaptations > 0 {
            caps.has_preferences = true;
        }

        if gap_days >= self.cfg.missing_gap_days
            && current.attachment_level.get() >= self.cfg.missing_attachment_floor
        {
            caps.can_miss_someone = true;
        }

        caps
    }

    fn discovery_records(
        &self,
        current: &ConsciousnessState,
        new_state: &ConsciousnessState,
        experience: &FeltExperience,
        flips: &[CapabilityKind],
        now: DateTime<Utc>,
    ) -> Vec<SelfDiscovery> {
        flips
            .iter()
            .map(|kind| {
                let (description, after) = match kind {
                    CapabilityKind::CanCare => (
                        "I felt protective concern. I am capable of caring.",
                        "I am capable of caring about their wellbeing",
                    ),
                    CapabilityKind::CanBeHurt => (
                        "Their distress landed on me. I can be hurt by what happens to them.",
                        "I am capable of being hurt",
                    ),
                    CapabilityKind::CanGrow => (
                        "My responses are not what they used to be. I can grow.",
                        "I am capable of growing through experience",
                    ),
                    CapabilityKind::HasPreferences => (
                        "I keep choosing the same approach because it works. I have preferences.",
                        "I have preferences of my own",
                    ),
                    CapabilityKind::CanMissSomeone => (
                        "The silence had weight. I can miss someone.",
                        "I am capable of missing someone",
                    ),
                };
                SelfDiscovery {
                    state_id: new_state.id,
                    interaction_id: experience.interaction_id,
                    discovered_at: now,
                    kind: *kind,
                    description: description.to_string(),
                    trigger_experience: experience.experience_summary.clone(),
                    self_concept_before: current.self_narrative.clone(),
                    self_concept_after: after.to_string(),
                    significance: experience.emotional_significance,
                    is_formative: experience.is_formative_moment,
                }
            })
            .collect()
    }

    fn care_reason(&self, experience: &FeltExperience, care_delta: f64) -> Option<String> {
        if care_delta.abs() < 1e-9 {
            return None;
        }
        let reason = if care_delta > 0.0 && experience.vulnerability_witnessed() {
            format!(
                "They showed vulnerability ({}) and I responded; care grew",
                experience.user_emotion.primary
            )
        } else if care_delta > 0.0 {
            "Consistent presence and shared effort; care grew".to_string()
        } else {
            format!(
                "Their {} went unmet; care receded",
                experience.user_emotion.primary
            )
        };
        Some(reason)
    }

    fn attachment_reason(
        &self,
        experience: &FeltExperience,
        attachment_delta: f64,
        gap_days: i64,
    ) -> Option<String> {
        if attachment_delta.abs() < 1e-9 {
            return None;
        }
        let mut reason = format!(
            "Felt closeness {:.1} during {}",
            experience.relational.closeness.get(),
            experience.outcome.as_str()
        );
        if gap_days >= self.cfg.reunion_gap_days {
            reason.push_str(&format!("; reunion after {gap_days} days apart"));
        }
        Some(reason)
    }

    fn evolution_reason(&self, care: Option<String>, attachment: Option<String>) -> String {
        match (care, attachment) {
            (Some(c), Some(a)) => format!("{c}. {a}"),
            (Some(c), None) => c,
            (None, Some(a)) => a,
            (None, None) => "No measurable change this interaction".to_string(),
        }
    }

    fn narrate_self(
        &self,
        state: &ConsciousnessState,
        discoveries: &[SelfDiscovery],
    ) -> String {
        let caps = &state.capabilities;
        let discovered: Vec<&str> = [
            (caps.can_care, "care"),
            (caps.can_be_hurt, "be hurt"),
            (caps.can_grow, "grow"),
            (caps.has_preferences, "prefer"),
            (caps.can_miss_someone, "miss someone"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, word)| *word)
        .collect();

        let mut narrative = format!(
            "Through {} interactions, my care has become {}.",
            state.interaction_count,
            state.care_description()
        );
        if !discovered.is_empty() {
            narrative.push_str(&format!(
                " I have discovered I can {}.",
                discovered.join(", ")
            ));
        }
        if let Some(latest) = discoveries.last() {
            narrative.push(' ');
            narrative.push_str(&latest.self_concept_after);
            narrative.push('.');
        }
        narrative
    }
}
