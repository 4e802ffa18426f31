pub mod encoder;
pub mod evolve;
pub mod orchestrator;
pub mod patterns;
pub mod phase;

pub use encoder::{EncodedMoment, ExperienceEncoder};
pub use evolve::{Evolution, EvolveContext, StateEvolver};
pub use orchestrator::{EvolutionEngine, EvolutionResult};
pub use patterns::{
    derive_tags, trigger_context, PatternEngine, PatternObservation, TokenOverlapMatcher,
    TriggerMatcher,
};
pub use phase::{PhaseMachine, PhaseShift};
