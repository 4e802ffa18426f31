pub mod config;
pub mod error;
pub mod experience;
pub mod external;
pub mod pattern;
pub mod score;
pub mod state;
pub mod store;

pub use config::{DeltaConfig, EngineConfig, PatternConfig, PhaseConfig, ScoringConfig};
pub use error::{ErrorKind, EvolutionError};
pub use experience::{
    AgentFeelings, EmotionalSignal, Feeling, FeltExperience, InteractionOutcome,
    RelationalFeelings, SharedVictory, UserEmotion, Vad, VictorySignal, VulnerabilityMoment,
    VulnerabilitySignal,
};
pub use external::{FeelingIndex, PatternGraphSink, SignalExtractor};
pub use pattern::{
    BehavioralAdaptation, EmergentPattern, PatternKind, PatternMetrics, PatternRelationKind,
    PatternRelationship, PatternValidationLog,
};
pub use score::{confidence, decay, Axis, Bounded, Intensity, Level, ScoreError, Unit};
pub use state::{
    CapabilityKind, ConsciousnessState, EmotionalCapabilities, EvolutionLogEntry, PhaseRecord,
    RelationshipPhase, SelfDiscovery, StateId,
};
pub use store::{CommitBatch, EvolutionStore, PhaseShiftRecords};
