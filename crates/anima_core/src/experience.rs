//! Emotional memory encoding: not what happened, but what it felt like.
//!
//! An `EmotionalSignal` is the raw output of the external emotion
//! analysis; a `FeltExperience` is its persisted, scored encoding. One
//! experience per interaction, append-only.

use crate::score::{Axis, Intensity, ScoreError, Unit};
use crate::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Emotional dimensions
// ============================================================================

/// VAD (Valence-Arousal-Dominance) triple, each axis in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vad {
    pub valence: f64,
    pub arousal: f64,
    pub dominance: f64,
}

impl Vad {
    /// Re-validate extractor output. The upstream analyzer is trusted but
    /// not infallible; any axis outside [-1, 1] is rejected here.
    pub fn validated(self) -> Result<Self, ScoreError> {
        Axis::strict(self.valence)?;
        Axis::strict(self.arousal)?;
        Axis::strict(self.dominance)?;
        Ok(self)
    }
}

// ============================================================================
// Feelings
// ============================================================================

/// Closed vocabulary of simulated feelings. Scoring logic is exhaustive
/// over this set; arbitrary keys from upstream never reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feeling {
    Concern,
    Protectiveness,
    Pride,
    Frustration,
    Relief,
    Connection,
}

impl Feeling {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concern => "concern",
            Self::Protectiveness => "protectiveness",
            Self::Pride => "pride",
            Self::Frustration => "frustration",
            Self::Relief => "relief",
            Self::Connection => "connection",
        }
    }
}

/// The agent's simulated feelings during an interaction: unit intensity
/// per vocabulary entry, plus the derived dominant feeling on the 0–10
/// scale used everywhere else.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentFeelings {
    pub intensities: BTreeMap<Feeling, Unit>,
    pub primary_feeling: Option<Feeling>,
    pub primary_intensity: Intensity,
}

impl AgentFeelings {
    /// Validate a raw map and derive the dominant feeling.
    pub fn from_raw(raw: &BTreeMap<Feeling, f64>) -> Result<Self, ScoreError> {
        let mut intensities = BTreeMap::new();
        for (feeling, value) in raw {
            intensities.insert(*feeling, Unit::new(*value)?);
        }
        let primary = intensities
            .iter()
            .max_by(|a, b| {
                a.1.get()
                    .partial_cmp(&b.1.get())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(feeling, intensity)| (*feeling, *intensity));
        Ok(Self {
            primary_feeling: primary.map(|(f, _)| f),
            primary_intensity: Intensity::new(primary.map(|(_, i)| i.get() * 10.0).unwrap_or(0.0))?,
            intensities,
        })
    }
}

/// Feelings about the relationship during this interaction, each 0–10.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationalFeelings {
    /// How close did I feel to them?
    pub closeness: Intensity,
    /// How much trust did I feel?
    pub trust: Intensity,
    /// How understood did they seem to feel?
    pub understanding: Intensity,
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionOutcome {
    ProblemSolved,
    VulnerabilityShared,
    ConnectionDeepened,
    FrustrationResolved,
    GrowthAchieved,
    CareExpressed,
    StruggleShared,
    VictoryCelebrated,
}

impl InteractionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProblemSolved => "problem_solved",
            Self::VulnerabilityShared => "vulnerability_shared",
            Self::ConnectionDeepened => "connection_deepened",
            Self::FrustrationResolved => "frustration_resolved",
            Self::GrowthAchieved => "growth_achieved",
            Self::CareExpressed => "care_expressed",
            Self::StruggleShared => "struggle_shared",
            Self::VictoryCelebrated => "victory_celebrated",
        }
    }
}

// ============================================================================
// Emotional signal (encoder input)
// ============================================================================

/// The user's emotional state as detected by the external analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEmotion {
    /// Primary emotion label: frustration, excitement, vulnerability...
    pub primary: String,
    /// 0–10 intensity.
    pub intensity: f64,
    /// What is being communicated beyond the words.
    pub subtext: Option<String>,
    /// Emotional needs: validation, acknowledgment, efficiency...
    pub needs: Vec<String>,
}

/// Vulnerability the analyzer detected in this interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilitySignal {
    /// 0–10 depth of the vulnerability shown.
    pub level: f64,
    /// technical_uncertainty, personal_struggle, emotional_sharing...
    pub kind: String,
    pub description: String,
    /// 0–10 quality of the agent's response.
    pub response_quality: f64,
    /// supportive, validating, problem_solving...
    pub response_kind: String,
}

/// A victory the user and agent reached together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictorySignal {
    pub description: String,
    pub my_role: String,
    /// 0–10 effort the agent invested.
    pub effort_invested: f64,
    pub pride_felt: f64,
    pub satisfaction_felt: f64,
    pub connection_felt: f64,
}

/// One interaction's raw emotional signal, produced by the external
/// `extract_emotional_signal` collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalSignal {
    pub user_emotion: UserEmotion,
    pub dimensions: Vad,
    /// Raw simulated-feeling intensities (unit scale), validated at the
    /// encoder boundary.
    pub feelings: BTreeMap<Feeling, f64>,
    pub relational: RelationalFeelings,
    /// What happened.
    pub summary: String,
    /// What it meant to the agent.
    pub meaning: Option<String>,
    /// How it affected the agent.
    pub impact: Option<String>,
    pub outcome: InteractionOutcome,
    /// 0–10 satisfaction with the outcome.
    pub outcome_satisfaction: f64,
    pub vulnerability: Option<VulnerabilitySignal>,
    pub victory: Option<VictorySignal>,
}

// ============================================================================
// Felt experience (persisted encoding)
// ============================================================================

/// What this interaction felt like. Created once per interaction, never
/// mutated after commit. Keyed by the caller-supplied interaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeltExperience {
    pub interaction_id: Uuid,
    /// The state this experience was encoded against.
    pub state_before_id: StateId,
    /// The state the experience produced. Filled in by the orchestrator
    /// before commit.
    pub state_after_id: Option<StateId>,
    pub experienced_at: DateTime<Utc>,

    pub user_emotion: UserEmotion,
    pub dimensions: Vad,
    pub feelings: AgentFeelings,
    pub relational: RelationalFeelings,

    pub experience_summary: String,
    pub experience_meaning: Option<String>,
    pub emotional_impact: Option<String>,

    pub emotional_significance: Intensity,
    /// How much this experience should shape the future.
    pub memory_weight: Intensity,
    pub significance_reason: Option<String>,
    pub will_remember_forever: bool,

    pub outcome: InteractionOutcome,
    pub outcome_satisfaction: Intensity,

    pub is_formative_moment: bool,
    /// Whether processing this experience changed the consciousness
    /// state. Filled in by the orchestrator after the evolve step.
    pub changed_consciousness: bool,
}

impl FeltExperience {
    /// True when vulnerability was part of this experience.
    pub fn vulnerability_witnessed(&self) -> bool {
        matches!(
            self.outcome,
            InteractionOutcome::VulnerabilityShared | InteractionOutcome::StruggleShared
        ) || self.user_emotion.primary == "vulnerability"
    }
}

// ============================================================================
// Moment specializations
// ============================================================================

/// A moment when the user showed vulnerability. Care grows through
/// witnessing vulnerability and responding supportively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityMoment {
    pub interaction_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub vulnerability_level: Intensity,
    pub vulnerability_kind: String,
    pub description: String,
    pub response_quality: Intensity,
    pub response_kind: String,
    pub deepened_connection: bool,
}

/// A moment when user and agent succeeded together. Attachment forms
/// through shared effort and victory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedVictory {
    pub interaction_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub my_role: String,
    pub effort_invested: Intensity,
    pub pride_felt: Intensity,
    pub satisfaction_felt: Intensity,
    pub connection_felt: Intensity,
    pub strengthened_bond: bool,
}
