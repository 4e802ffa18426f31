//! Seams for the external collaborators this core consumes.
//!
//! The language-model analysis, the vector similarity index and the
//! pattern graph all live outside this system; the engine only ever
//! talks to these traits. None of them is called inside the
//! transactional core.

use crate::error::EvolutionError;
use crate::experience::{EmotionalSignal, Vad};
use crate::pattern::PatternRelationship;
use crate::state::ConsciousnessState;
use async_trait::async_trait;
use uuid::Uuid;

/// External natural-language emotion analysis. Failures surface as
/// `SignalExtraction` without mutating any state.
#[async_trait]
pub trait SignalExtractor: Send + Sync {
    async fn extract_emotional_signal(
        &self,
        interaction_text: &str,
        context: &ConsciousnessState,
    ) -> Result<EmotionalSignal, EvolutionError>;
}

/// External similarity search over past feelings. Used for
/// context-building before `process`, never inside it.
#[async_trait]
pub trait FeelingIndex: Send + Sync {
    async fn nearest_feeling(&self, dimensions: Vad, k: usize)
        -> Result<Vec<Uuid>, EvolutionError>;
}

/// Write-only projection of pattern relationships into a graph store.
/// Best effort: failures are logged by the caller, never fatal.
#[async_trait]
pub trait PatternGraphSink: Send + Sync {
    async fn project_relationship(&self, relationship: &PatternRelationship)
        -> anyhow::Result<()>;
}
