//! Error taxonomy for the evolution engine.
//!
//! Four recoverable families (validation, consistency, dependency,
//! timeout) and one fatal condition (a corrupt evolution-log chain,
//! which halts further writes entirely).

use crate::score::ScoreError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Malformed emotional signal rejected before any write.
    #[error("emotional signal failed validation: {0}")]
    Encoding(String),

    /// Out-of-range or non-finite score.
    #[error(transparent)]
    Score(#[from] ScoreError),

    /// The interaction already has an encoded experience. Processing the
    /// same interaction twice is a replay bug, not a retryable condition.
    #[error("interaction {0} already has an encoded felt experience")]
    DuplicateExperience(Uuid),

    /// The caller evolved from a state that is no longer current.
    #[error("stale consciousness state: caller holds {caller}, current is {current}")]
    StaleState { caller: i64, current: i64 },

    /// No consciousness state row exists yet.
    #[error("no consciousness state exists; call initialize() before process()")]
    UninitializedState,

    /// Could not acquire the evolution lock within the configured bound.
    #[error("timed out after {0:?} waiting for the evolution lock")]
    Timeout(Duration),

    /// A gap or fork in the evolution-log chain. The engine refuses all
    /// further writes until manual intervention.
    #[error("evolution timeline is corrupt: {0}")]
    CorruptTimeline(String),

    /// The external emotion-analysis collaborator failed. No state was
    /// touched.
    #[error("emotional signal extraction failed: {0}")]
    SignalExtraction(String),

    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

/// Coarse classification used by callers to decide retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller must correct the input before retrying.
    Validation,
    /// Concurrency or replay bug; the whole call aborted with no writes.
    Consistency,
    /// An external collaborator failed; no compensating action needed.
    Dependency,
    /// Lock acquisition timed out; safe to retry as-is.
    Timeout,
    /// Unrecoverable without manual intervention.
    Fatal,
}

impl EvolutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding(_) | Self::Score(_) => ErrorKind::Validation,
            Self::DuplicateExperience(_) | Self::StaleState { .. } | Self::UninitializedState => {
                ErrorKind::Consistency
            }
            Self::SignalExtraction(_) | Self::Storage(_) => ErrorKind::Dependency,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::CorruptTimeline(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}
