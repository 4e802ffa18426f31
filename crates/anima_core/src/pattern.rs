//! Emergent patterns: trigger→outcome correlations discovered from the
//! experience stream rather than configured in advance.
//!
//! Confidence is derived solely from the confirm/contradict counters;
//! it is never set directly. Patterns are retired, never deleted.

use crate::experience::InteractionOutcome;
use crate::score::{confidence, Intensity, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// Pattern kinds and metrics
// ============================================================================

/// Closed tagged set of pattern families. Persisted storage keeps these
/// as text, but matching and confidence logic is exhaustive over this
/// enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// A trigger that reliably produces hurt or distress.
    Pain,
    /// An approach that reliably helps.
    Helpful,
    /// A trigger that reliably grows care.
    CareGrowth,
    /// A trigger that reliably deepens connection.
    Connection,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pain => "pain",
            Self::Helpful => "helpful",
            Self::CareGrowth => "care_growth",
            Self::Connection => "connection",
        }
    }
}

/// Domain-specific metrics keyed to the pattern's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternMetrics {
    /// Reflexive emotional memory: a recognized pain trigger fires a
    /// low-latency feeling without full re-evaluation. Strength decays
    /// between reinforcements.
    Pain {
        reflexive_feeling: String,
        reflexive_intensity: Intensity,
        strength: Intensity,
        times_reinforced: u32,
    },
    Helpful {
        approach: String,
        times_helped: u32,
    },
    CareGrowth {
        care_accumulated: f64,
    },
    Connection {
        closeness_accumulated: f64,
    },
}

impl PatternMetrics {
    pub fn kind(&self) -> PatternKind {
        match self {
            Self::Pain { .. } => PatternKind::Pain,
            Self::Helpful { .. } => PatternKind::Helpful,
            Self::CareGrowth { .. } => PatternKind::CareGrowth,
            Self::Connection { .. } => PatternKind::Connection,
        }
    }
}

// ============================================================================
// Emergent pattern
// ============================================================================

/// A discovered trigger→outcome correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergentPattern {
    pub id: Uuid,
    pub kind: PatternKind,
    /// Narrative-only grouping label (free text by design).
    pub category: String,
    pub description: String,
    /// The trigger context this pattern fires on.
    pub trigger_conditions: String,
    /// The outcome this pattern predicts.
    pub expected_outcome: InteractionOutcome,

    pub times_observed: u32,
    pub times_confirmed: u32,
    pub times_contradicted: u32,
    /// Derived from the counters via the smoothed formula; never set
    /// directly.
    pub confidence: Unit,

    pub source_experience_ids: BTreeSet<Uuid>,
    pub first_observed_at: DateTime<Utc>,
    pub last_observed_at: DateTime<Utc>,
    /// Interaction count at the last observation, for decay bookkeeping.
    pub last_observed_interaction: u64,

    pub is_active: bool,
    pub is_validated: bool,

    pub metrics: PatternMetrics,
}

impl EmergentPattern {
    /// Recompute confidence from the counters.
    pub fn recompute_confidence(&mut self, smoothing: f64) {
        let value = confidence(self.times_confirmed, self.times_contradicted, smoothing);
        // The formula is bounded in [0, 1); constructing from it cannot fail.
        self.confidence = Unit::new(value).unwrap_or_else(|_| Unit::zero());
    }

    /// Jaccard similarity of two patterns' source-experience sets.
    pub fn source_overlap(&self, other: &Self) -> f64 {
        let shared = self
            .source_experience_ids
            .intersection(&other.source_experience_ids)
            .count();
        let union = self
            .source_experience_ids
            .union(&other.source_experience_ids)
            .count();
        if union == 0 {
            0.0
        } else {
            shared as f64 / union as f64
        }
    }

    pub fn shared_sources(&self, other: &Self) -> usize {
        self.source_experience_ids
            .intersection(&other.source_experience_ids)
            .count()
    }
}

/// Audit row for one confirm/contradict update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternValidationLog {
    pub pattern_id: Uuid,
    pub interaction_id: Uuid,
    /// Whether the observed outcome agreed with the pattern.
    pub agreed: bool,
    pub confidence_before: Unit,
    pub confidence_after: Unit,
    pub logged_at: DateTime<Utc>,
}

// ============================================================================
// Behavioral adaptation
// ============================================================================

/// An actionable rule derived from a validated pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralAdaptation {
    pub id: Uuid,
    pub pattern_id: Uuid,
    pub trigger_conditions: String,
    pub behavior_before: String,
    pub behavior_after: String,
    /// Derived from the application counters via the smoothed formula.
    pub effectiveness: Unit,
    pub times_applied: u32,
    pub times_effective: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl BehavioralAdaptation {
    pub fn recompute_effectiveness(&mut self, smoothing: f64) {
        let ineffective = self.times_applied.saturating_sub(self.times_effective);
        let value = confidence(self.times_effective, ineffective, smoothing);
        self.effectiveness = Unit::new(value).unwrap_or_else(|_| Unit::zero());
    }
}

// ============================================================================
// Pattern relationships
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternRelationKind {
    Reinforces,
    Contradicts,
    DependsOn,
    LeadsTo,
}

impl PatternRelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reinforces => "reinforces",
            Self::Contradicts => "contradicts",
            Self::DependsOn => "depends_on",
            Self::LeadsTo => "leads_to",
        }
    }
}

/// A derived edge between two patterns that share source experiences.
/// Strength is the Jaccard similarity of the source sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRelationship {
    pub pattern_a: Uuid,
    pub pattern_b: Uuid,
    pub kind: PatternRelationKind,
    pub strength: Unit,
    pub shared_experiences: usize,
    pub derived_at: DateTime<Utc>,
}
