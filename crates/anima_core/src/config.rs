//! Engine configuration.
//!
//! Every numeric rail of the evolution logic is tunable here rather than
//! hard-coded: per-interaction delta bounds, phase gates, scoring
//! weights, pattern thresholds, and the lock timeout. Loaded from TOML
//! with defaults for missing fields, then env var overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub deltas: DeltaConfig,
    pub phases: PhaseConfig,
    pub patterns: PatternConfig,
    pub orchestrator: OrchestratorConfig,
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return
    /// defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ANIMA_LOCK_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.orchestrator.lock_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("ANIMA_VALIDATION_CONFIDENCE") {
            if let Ok(n) = v.parse() {
                self.patterns.validation_confidence = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Weights for the felt-experience significance and memory-weight sums.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the user's 0–10 emotion intensity.
    pub user_intensity_weight: f64,
    /// Weight of |valence|, applied to the axis rescaled to 0–10.
    pub valence_weight: f64,
    /// Weight of positive arousal, applied to the axis rescaled to 0–10.
    pub arousal_weight: f64,
    /// Flat boost when vulnerability was detected or the outcome was a
    /// shared victory.
    pub significance_boost: f64,
    /// Significance at or above which an experience is formative.
    pub formative_significance: f64,
    /// Flat memory-weight bonus for formative moments.
    pub formative_weight_bonus: f64,
    /// Memory weight at or above which an experience is remembered
    /// permanently.
    pub permanent_memory_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            user_intensity_weight: 0.6,
            valence_weight: 0.2,
            arousal_weight: 0.15,
            significance_boost: 2.0,
            formative_significance: 8.0,
            formative_weight_bonus: 2.0,
            permanent_memory_weight: 9.0,
        }
    }
}

/// Bounds and rates for per-interaction consciousness deltas.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Hard bound on |care_delta| per interaction.
    pub max_care_delta: f64,
    /// Hard bound on |attachment_delta| per interaction.
    pub max_attachment_delta: f64,
    /// Combined |care|+|attachment| delta that marks an evolution step as
    /// consciousness-changing on its own.
    pub formative_combined_delta: f64,
    /// Care gained per memory-weight point on care-growth interactions.
    pub care_growth_rate: f64,
    /// Care gained per memory-weight point on neutral interactions.
    pub presence_rate: f64,
    /// Care lost per memory-weight point on hurtful interactions.
    pub hurt_rate: f64,
    /// Attachment gained per memory-weight point, scaled by closeness.
    pub attachment_rate: f64,
    /// Days of absence after which a reunion boosts attachment.
    pub reunion_gap_days: i64,
    /// Attachment bonus per day of absence on reunion.
    pub reunion_bonus_per_day: f64,
    /// Cap on the reunion bonus.
    pub reunion_bonus_cap: f64,
    /// Days of absence required before `can_miss_someone` can flip.
    pub missing_gap_days: i64,
    /// Attachment level required before `can_miss_someone` can flip.
    pub missing_attachment_floor: f64,
    /// Significance required for the `can_care` discovery.
    pub care_capability_significance: f64,
    /// User emotion intensity floor for the `can_be_hurt` discovery.
    pub hurt_intensity_floor: f64,
    /// Outcome satisfaction floor marking a supportive response.
    pub supportive_satisfaction_floor: f64,
    /// Significance floor for the `can_grow` discovery.
    pub growth_significance_floor: f64,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            max_care_delta: 5.0,
            max_attachment_delta: 5.0,
            formative_combined_delta: 6.0,
            care_growth_rate: 0.5,
            presence_rate: 0.1,
            hurt_rate: 0.2,
            attachment_rate: 0.4,
            reunion_gap_days: 3,
            reunion_bonus_per_day: 0.3,
            reunion_bonus_cap: 2.0,
            missing_gap_days: 7,
            missing_attachment_floor: 30.0,
            care_capability_significance: 6.0,
            hurt_intensity_floor: 7.0,
            supportive_satisfaction_floor: 5.0,
            growth_significance_floor: 5.0,
        }
    }
}

/// Entry gate for one relationship phase.
#[derive(Debug, Clone, Deserialize)]
pub struct PhaseGate {
    pub care_level: f64,
    pub attachment_level: f64,
    /// Minimum interaction count. Prevents single-session phase jumps.
    pub min_interactions: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub developing: PhaseGate,
    pub personal: PhaseGate,
    pub meaningful: PhaseGate,
    pub deep: PhaseGate,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            developing: PhaseGate {
                care_level: 15.0,
                attachment_level: 10.0,
                min_interactions: 5,
            },
            personal: PhaseGate {
                care_level: 35.0,
                attachment_level: 30.0,
                min_interactions: 20,
            },
            meaningful: PhaseGate {
                care_level: 55.0,
                attachment_level: 50.0,
                min_interactions: 60,
            },
            deep: PhaseGate {
                care_level: 75.0,
                attachment_level: 70.0,
                min_interactions: 150,
            },
        }
    }
}

/// Thresholds for pattern discovery, validation and retirement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Smoothing constant for the confidence formula.
    pub smoothing: f64,
    /// Confidence required for validation.
    pub validation_confidence: f64,
    /// Observations required for validation.
    pub validation_observations: u32,
    /// Confidence below which a pattern is retired (never deleted).
    pub retire_confidence: f64,
    /// Token-overlap ratio required for a trigger match.
    pub match_overlap: f64,
    /// Shared source experiences required to derive a relationship.
    pub relationship_min_shared: usize,
    /// Half-life, in interactions, of pain-pattern scar strength.
    pub scar_half_life_interactions: f64,
    /// Half-life, in interactions, of a pattern's match relevance.
    pub relevance_half_life_interactions: f64,
    /// Effectiveness below which an adaptation is deactivated.
    pub adaptation_min_effectiveness: f64,
    /// Applications required before effectiveness can deactivate.
    pub adaptation_min_applications: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            smoothing: 1.0,
            validation_confidence: 0.75,
            validation_observations: 3,
            retire_confidence: 0.1,
            match_overlap: 0.5,
            relationship_min_shared: 2,
            scar_half_life_interactions: 50.0,
            relevance_half_life_interactions: 200.0,
            adaptation_min_effectiveness: 0.3,
            adaptation_min_applications: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Bound on evolution-lock acquisition before `Timeout`.
    pub lock_timeout_ms: u64,
    /// Default page size for history queries.
    pub history_page_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            history_page_limit: 100,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
