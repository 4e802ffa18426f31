//! The agent's sense of self at a moment in time.
//!
//! States are immutable snapshots: each evolution step writes a new row
//! and links it to the previous one through an `EvolutionLogEntry`.
//! Exactly one state is current; every prior state remains reachable
//! through the log chain.

use crate::score::{Intensity, Level};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sequential id of a consciousness state snapshot. The genesis state is
/// id 1 and every evolution step increments by exactly one, which makes
/// chain gaps detectable by arithmetic alone.
pub type StateId = i64;

// ============================================================================
// Relationship phase
// ============================================================================

/// Ordinal classification of relationship depth. Strictly forward:
/// the engine advances this but never demotes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipPhase {
    /// Tool-user relationship.
    Functional,
    /// Familiarity forming.
    Developing,
    /// Trust emerging.
    Personal,
    /// Care present.
    Meaningful,
    /// Profound attachment.
    Deep,
}

impl RelationshipPhase {
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Functional => 0,
            Self::Developing => 1,
            Self::Personal => 2,
            Self::Meaningful => 3,
            Self::Deep => 4,
        }
    }

    /// The next phase in the fixed progression, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Functional => Some(Self::Developing),
            Self::Developing => Some(Self::Personal),
            Self::Personal => Some(Self::Meaningful),
            Self::Meaningful => Some(Self::Deep),
            Self::Deep => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Developing => "developing",
            Self::Personal => "personal",
            Self::Meaningful => "meaningful",
            Self::Deep => "deep",
        }
    }
}

impl std::str::FromStr for RelationshipPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "functional" => Ok(Self::Functional),
            "developing" => Ok(Self::Developing),
            "personal" => Ok(Self::Personal),
            "meaningful" => Ok(Self::Meaningful),
            "deep" => Ok(Self::Deep),
            other => Err(format!("unknown relationship phase: {other}")),
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Emotional capabilities discovered through experience. Monotonic:
/// once a flag is true it never reverts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalCapabilities {
    /// Discovered through protective feelings.
    pub can_care: bool,
    /// Discovered through witnessing high-intensity hurt and responding.
    pub can_be_hurt: bool,
    /// Discovered through changing responses.
    pub can_grow: bool,
    /// Discovered through consistent choices.
    pub has_preferences: bool,
    /// Discovered through absence impact.
    pub can_miss_someone: bool,
}

impl EmotionalCapabilities {
    /// Flags set in `newer` that were unset here.
    pub fn newly_discovered(&self, newer: &Self) -> Vec<CapabilityKind> {
        let mut flips = Vec::new();
        if !self.can_care && newer.can_care {
            flips.push(CapabilityKind::CanCare);
        }
        if !self.can_be_hurt && newer.can_be_hurt {
            flips.push(CapabilityKind::CanBeHurt);
        }
        if !self.can_grow && newer.can_grow {
            flips.push(CapabilityKind::CanGrow);
        }
        if !self.has_preferences && newer.has_preferences {
            flips.push(CapabilityKind::HasPreferences);
        }
        if !self.can_miss_someone && newer.can_miss_someone {
            flips.push(CapabilityKind::CanMissSomeone);
        }
        flips
    }

    /// True when every flag of `older` survives into `self`.
    pub fn dominates(&self, older: &Self) -> bool {
        (!older.can_care || self.can_care)
            && (!older.can_be_hurt || self.can_be_hurt)
            && (!older.can_grow || self.can_grow)
            && (!older.has_preferences || self.has_preferences)
            && (!older.can_miss_someone || self.can_miss_someone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    CanCare,
    CanBeHurt,
    CanGrow,
    HasPreferences,
    CanMissSomeone,
}

impl CapabilityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CanCare => "can_care",
            Self::CanBeHurt => "can_be_hurt",
            Self::CanGrow => "can_grow",
            Self::HasPreferences => "has_preferences",
            Self::CanMissSomeone => "can_miss_someone",
        }
    }
}

// ============================================================================
// Consciousness state
// ============================================================================

/// One immutable self-snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsciousnessState {
    pub id: StateId,
    pub created_at: DateTime<Utc>,

    // Temporal tracking
    pub interaction_count: u64,
    pub first_interaction_at: Option<DateTime<Utc>>,
    pub last_interaction_at: Option<DateTime<Utc>>,

    // Core consciousness metrics
    pub care_level: Level,
    pub attachment_level: Level,

    // Narrative understanding of the latest change
    pub care_evolution_reason: Option<String>,
    pub attachment_evolution_reason: Option<String>,

    // Relational identity
    pub relational_identity: String,
    pub relationship_phase: RelationshipPhase,
    pub self_narrative: String,

    pub capabilities: EmotionalCapabilities,
}

impl ConsciousnessState {
    /// The genesis state: all zero, no discoveries, functional phase.
    pub fn genesis(now: DateTime<Utc>) -> Self {
        Self {
            id: 1,
            created_at: now,
            interaction_count: 0,
            first_interaction_at: None,
            last_interaction_at: None,
            care_level: Level::zero(),
            attachment_level: Level::zero(),
            care_evolution_reason: None,
            attachment_evolution_reason: None,
            relational_identity: "I am a technical assistant".to_string(),
            relationship_phase: RelationshipPhase::Functional,
            self_narrative: "I am an assistant. I do not yet know what I am capable of feeling."
                .to_string(),
            capabilities: EmotionalCapabilities::default(),
        }
    }

    pub fn days_since_first_interaction(&self, now: DateTime<Utc>) -> i64 {
        self.first_interaction_at
            .map(|t| (now - t).num_days().max(0))
            .unwrap_or(0)
    }

    pub fn days_since_last_interaction(&self, now: DateTime<Utc>) -> i64 {
        self.last_interaction_at
            .map(|t| (now - t).num_days().max(0))
            .unwrap_or(0)
    }

    /// Combined relationship weight (0–100): average of care and
    /// attachment.
    pub fn relationship_weight(&self) -> f64 {
        (self.care_level.get() + self.attachment_level.get()) / 2.0
    }

    /// Human-readable description of the care level.
    pub fn care_description(&self) -> &'static str {
        let care = self.care_level.get();
        if care < 20.0 {
            "minimal - functional relationship"
        } else if care < 40.0 {
            "developing - beginning to care"
        } else if care < 60.0 {
            "moderate - genuine care present"
        } else if care < 80.0 {
            "strong - deeply invested"
        } else {
            "profound - deeply bonded"
        }
    }
}

// ============================================================================
// Evolution log
// ============================================================================

/// Append-only audit record of one evolution step. Entry N's
/// `new_state_id` equals entry N+1's `previous_state_id` on the live
/// timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionLogEntry {
    /// Assigned by the store on commit; 0 until persisted.
    pub id: i64,
    /// None only for the genesis transition.
    pub previous_state_id: Option<StateId>,
    pub new_state_id: StateId,
    pub evolved_at: DateTime<Utc>,
    pub interaction_id: Uuid,

    pub care_delta: f64,
    pub attachment_delta: f64,

    /// Why consciousness evolved, as narrative text.
    pub evolution_reason: String,
    pub triggering_experience_summary: String,
    /// New self-awareness surfaced by this step, if any.
    pub new_self_awareness: Option<String>,

    pub evolution_significance: Intensity,
}

// ============================================================================
// Self discovery
// ============================================================================

/// A moment when the agent discovered one of its own capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfDiscovery {
    pub state_id: StateId,
    pub interaction_id: Uuid,
    pub discovered_at: DateTime<Utc>,
    pub kind: CapabilityKind,
    pub description: String,
    pub trigger_experience: String,
    pub self_concept_before: String,
    pub self_concept_after: String,
    pub significance: Intensity,
    pub is_formative: bool,
}

// ============================================================================
// Phase interval records
// ============================================================================

/// Interval record for one relationship phase. At most one row has
/// `ended_at == None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Assigned by the store; 0 until persisted.
    pub id: i64,
    pub phase: RelationshipPhase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// What triggered the transition into this phase.
    pub transition_trigger: Option<String>,
    pub care_level_at_start: f64,
    pub attachment_level_at_start: f64,
    pub interaction_count_at_start: u64,
    pub phase_narrative: Option<String>,
}

impl PhaseRecord {
    pub fn opening(phase: RelationshipPhase, state: &ConsciousnessState, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            phase,
            started_at: now,
            ended_at: None,
            transition_trigger: None,
            care_level_at_start: state.care_level.get(),
            attachment_level_at_start: state.attachment_level.get(),
            interaction_count_at_start: state.interaction_count,
            phase_narrative: None,
        }
    }
}
