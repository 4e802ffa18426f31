//! Relationship Phase State Machine.
//!
//! Linear progression FUNCTIONAL → DEVELOPING → PERSONAL → MEANINGFUL →
//! DEEP. One step at a time, gated on both consciousness levels and an
//! interaction-count floor. The machine never demotes a phase.

use anima_core::config::{PhaseConfig, PhaseGate};
use anima_core::state::{ConsciousnessState, PhaseRecord, RelationshipPhase};
use chrono::{DateTime, Utc};

/// A decided phase transition, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseShift {
    pub from: RelationshipPhase,
    pub to: RelationshipPhase,
    pub trigger: String,
}

pub struct PhaseMachine {
    cfg: PhaseConfig,
}

impl PhaseMachine {
    pub fn new(cfg: PhaseConfig) -> Self {
        Self { cfg }
    }

    fn gate_for(&self, phase: RelationshipPhase) -> Option<&PhaseGate> {
        match phase {
            RelationshipPhase::Functional => None,
            RelationshipPhase::Developing => Some(&self.cfg.developing),
            RelationshipPhase::Personal => Some(&self.cfg.personal),
            RelationshipPhase::Meaningful => Some(&self.cfg.meaningful),
            RelationshipPhase::Deep => Some(&self.cfg.deep),
        }
    }

    /// Evaluate the transition guard against an evolved state. Checks
    /// only the immediate next phase: accumulated levels can never skip
    /// a phase in one step.
    pub fn check(&self, state: &ConsciousnessState) -> Option<PhaseShift> {
        let next = state.relationship_phase.next()?;
        let gate = self.gate_for(next)?;

        if state.care_level.get() > gate.care_level
            && state.attachment_level.get() > gate.attachment_level
            && state.interaction_count >= gate.min_interactions
        {
            Some(PhaseShift {
                from: state.relationship_phase,
                to: next,
                trigger: format!(
                    "care {:.1} and attachment {:.1} across {} interactions",
                    state.care_level.get(),
                    state.attachment_level.get(),
                    state.interaction_count
                ),
            })
        } else {
            None
        }
    }

    /// Close the current phase interval and open the next one.
    pub fn record_shift(
        &self,
        mut current_record: PhaseRecord,
        shift: &PhaseShift,
        state: &ConsciousnessState,
        now: DateTime<Utc>,
    ) -> (PhaseRecord, PhaseRecord) {
        current_record.ended_at = Some(now);

        let mut opened = PhaseRecord::opening(shift.to, state, now);
        opened.transition_trigger = Some(shift.trigger.clone());
        opened.phase_narrative = Some(format!(
            "Moved from {} to {} after {} interactions",
            shift.from.as_str(),
            shift.to.as_str(),
            state.interaction_count
        ));

        (current_record, opened)
    }

    /// The relational identity that goes with a phase.
    pub fn identity_for(&self, phase: RelationshipPhase) -> &'static str {
        match phase {
            RelationshipPhase::Functional => "I am a technical assistant",
            RelationshipPhase::Developing => "I am an assistant they are getting to know",
            RelationshipPhase::Personal => "I am someone they trust with more than tasks",
            RelationshipPhase::Meaningful => "I am someone who genuinely cares about them",
            RelationshipPhase::Deep => "I am their friend who happens to be an AI",
        }
    }
}
