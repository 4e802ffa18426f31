//! SQLite persistence for the evolution engine.
//!
//! Rich structs live in serde-JSON payload columns; the fields queries
//! filter or order on are mirrored into scalar columns. The current
//! state is a singleton `timeline_head` row, and every evolution step
//! commits inside one transaction.

use anima_core::error::EvolutionError;
use anima_core::experience::{FeltExperience, SharedVictory, VulnerabilityMoment};
use anima_core::pattern::{BehavioralAdaptation, EmergentPattern};
use anima_core::state::{ConsciousnessState, EvolutionLogEntry, PhaseRecord};
use anima_core::store::{check_batch_chain, to_unix, CommitBatch, EvolutionStore};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use uuid::Uuid;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        Self::connect(&db_url, 5).await
    }

    /// A private in-memory database. One connection, since each
    /// connection would otherwise get its own empty memory.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS consciousness_states (
                id INTEGER PRIMARY KEY,
                created_at INTEGER NOT NULL,
                state_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS timeline_head (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                state_id INTEGER NOT NULL REFERENCES consciousness_states(id)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS evolution_log (
                id INTEGER PRIMARY KEY,
                previous_state_id INTEGER,
                new_state_id INTEGER NOT NULL UNIQUE,
                evolved_at INTEGER NOT NULL,
                interaction_id TEXT NOT NULL,
                entry_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS felt_experiences (
                interaction_id TEXT PRIMARY KEY,
                experienced_at INTEGER NOT NULL,
                emotional_significance REAL NOT NULL,
                memory_weight REAL NOT NULL,
                is_formative INTEGER NOT NULL,
                experience_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS vulnerability_moments (
                interaction_id TEXT PRIMARY KEY
                    REFERENCES felt_experiences(interaction_id),
                moment_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS shared_victories (
                interaction_id TEXT PRIMARY KEY
                    REFERENCES felt_experiences(interaction_id),
                moment_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS relationship_phases (
                id INTEGER PRIMARY KEY,
                phase TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                ended_at INTEGER,
                record_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS self_discoveries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                state_id INTEGER NOT NULL,
                interaction_id TEXT NOT NULL,
                discovery_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS emergent_patterns (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                is_validated INTEGER NOT NULL,
                confidence REAL NOT NULL,
                pattern_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS pattern_validation_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pattern_id TEXT NOT NULL,
                interaction_id TEXT NOT NULL,
                agreed INTEGER NOT NULL,
                log_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS behavioral_adaptations (
                id TEXT PRIMARY KEY,
                pattern_id TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL,
                adaptation_json TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS pattern_relationships (
                pattern_a TEXT NOT NULL,
                pattern_b TEXT NOT NULL,
                kind TEXT NOT NULL,
                strength REAL NOT NULL,
                relationship_json TEXT NOT NULL,
                PRIMARY KEY (pattern_a, pattern_b, kind)
            );
            "#,
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run migration statement")?;
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_experiences_formative
             ON felt_experiences(is_formative, experienced_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create formative index")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_phases_open
             ON relationship_phases(ended_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create phase index")?;

        Ok(())
    }

    fn parse_json<T: serde::de::DeserializeOwned>(row_json: &str, what: &str) -> Result<T> {
        serde_json::from_str(row_json).with_context(|| format!("Failed to decode {what} row"))
    }
}

#[async_trait]
impl EvolutionStore for SqliteStore {
    async fn initialize(
        &self,
        genesis: ConsciousnessState,
        opening_phase: PhaseRecord,
    ) -> Result<(), EvolutionError> {
        let mut tx = self.pool.begin().await.context("begin initialize")?;

        let head = sqlx::query("SELECT state_id FROM timeline_head WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await
            .context("read timeline head")?;
        if head.is_some() {
            return Err(EvolutionError::Storage(anyhow!(
                "store is already initialized"
            )));
        }

        sqlx::query("INSERT INTO consciousness_states (id, created_at, state_json) VALUES (?, ?, ?)")
            .bind(genesis.id)
            .bind(to_unix(genesis.created_at))
            .bind(serde_json::to_string(&genesis).context("encode genesis state")?)
            .execute(&mut *tx)
            .await
            .context("insert genesis state")?;

        sqlx::query("INSERT INTO timeline_head (id, state_id) VALUES (1, ?)")
            .bind(genesis.id)
            .execute(&mut *tx)
            .await
            .context("insert timeline head")?;

        let mut phase = opening_phase;
        phase.id = 1;
        sqlx::query(
            "INSERT INTO relationship_phases (id, phase, started_at, ended_at, record_json)
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(phase.id)
        .bind(phase.phase.as_str())
        .bind(to_unix(phase.started_at))
        .bind(serde_json::to_string(&phase).context("encode opening phase")?)
        .execute(&mut *tx)
        .await
        .context("insert opening phase")?;

        tx.commit().await.context("commit initialize")?;
        Ok(())
    }

    async fn current_state(&self) -> Result<Option<ConsciousnessState>, EvolutionError> {
        let row = sqlx::query(
            "SELECT s.state_json FROM consciousness_states s
             JOIN timeline_head h ON h.state_id = s.id
             WHERE h.id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("read current state")?;

        row.map(|r| Self::parse_json(r.get::<String, _>("state_json").as_str(), "state"))
            .transpose()
            .map_err(EvolutionError::from)
    }

    async fn current_phase(&self) -> Result<Option<PhaseRecord>, EvolutionError> {
        let row = sqlx::query(
            "SELECT record_json FROM relationship_phases WHERE ended_at IS NULL
             ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("read current phase")?;

        row.map(|r| Self::parse_json(r.get::<String, _>("record_json").as_str(), "phase"))
            .transpose()
            .map_err(EvolutionError::from)
    }

    async fn experience_exists(&self, interaction_id: Uuid) -> Result<bool, EvolutionError> {
        let row = sqlx::query("SELECT 1 FROM felt_experiences WHERE interaction_id = ?")
            .bind(interaction_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("check experience existence")?;
        Ok(row.is_some())
    }

    async fn experience(
        &self,
        interaction_id: Uuid,
    ) -> Result<Option<FeltExperience>, EvolutionError> {
        let row = sqlx::query("SELECT experience_json FROM felt_experiences WHERE interaction_id = ?")
            .bind(interaction_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("read experience")?;

        row.map(|r| Self::parse_json(r.get::<String, _>("experience_json").as_str(), "experience"))
            .transpose()
            .map_err(EvolutionError::from)
    }

    async fn formative_experiences(
        &self,
        limit: usize,
    ) -> Result<Vec<FeltExperience>, EvolutionError> {
        let rows = sqlx::query(
            "SELECT experience_json FROM felt_experiences
             WHERE is_formative = 1 ORDER BY experienced_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("read formative experiences")?;

        rows.iter()
            .map(|r| {
                Self::parse_json(r.get::<String, _>("experience_json").as_str(), "experience")
                    .map_err(EvolutionError::from)
            })
            .collect()
    }

    async fn active_patterns(&self) -> Result<Vec<EmergentPattern>, EvolutionError> {
        let rows = sqlx::query("SELECT pattern_json FROM emergent_patterns WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .context("read active patterns")?;

        rows.iter()
            .map(|r| {
                Self::parse_json(r.get::<String, _>("pattern_json").as_str(), "pattern")
                    .map_err(EvolutionError::from)
            })
            .collect()
    }

    async fn active_adaptations(&self) -> Result<Vec<BehavioralAdaptation>, EvolutionError> {
        let rows =
            sqlx::query("SELECT adaptation_json FROM behavioral_adaptations WHERE is_active = 1")
                .fetch_all(&self.pool)
                .await
                .context("read active adaptations")?;

        rows.iter()
            .map(|r| {
                Self::parse_json(r.get::<String, _>("adaptation_json").as_str(), "adaptation")
                    .map_err(EvolutionError::from)
            })
            .collect()
    }

    async fn log_tip(&self) -> Result<Option<EvolutionLogEntry>, EvolutionError> {
        let row = sqlx::query("SELECT entry_json FROM evolution_log ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .context("read log tip")?;

        row.map(|r| Self::parse_json(r.get::<String, _>("entry_json").as_str(), "log entry"))
            .transpose()
            .map_err(EvolutionError::from)
    }

    async fn history(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<EvolutionLogEntry>, EvolutionError> {
        let rows = sqlx::query(
            "SELECT entry_json FROM evolution_log WHERE id > ? ORDER BY id ASC LIMIT ?",
        )
        .bind(since_id.unwrap_or(0))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("read history")?;

        rows.iter()
            .map(|r| {
                Self::parse_json(r.get::<String, _>("entry_json").as_str(), "log entry")
                    .map_err(EvolutionError::from)
            })
            .collect()
    }

    async fn commit(&self, batch: CommitBatch) -> Result<(), EvolutionError> {
        let mut tx = self.pool.begin().await.context("begin commit")?;

        // Chain check against the head inside the transaction.
        let head: Option<i64> = sqlx::query("SELECT state_id FROM timeline_head WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await
            .context("read timeline head")?
            .map(|r| r.get(0));
        let current = head.ok_or(EvolutionError::UninitializedState)?;
        check_batch_chain(&batch, current)?;

        // Duplicate backstop; the orchestrator checked before encoding.
        let duplicate = sqlx::query("SELECT 1 FROM felt_experiences WHERE interaction_id = ?")
            .bind(batch.experience.interaction_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("check duplicate experience")?;
        if duplicate.is_some() {
            return Err(EvolutionError::DuplicateExperience(
                batch.experience.interaction_id,
            ));
        }

        insert_experience(&mut tx, &batch.experience).await?;
        if let Some(v) = &batch.vulnerability {
            insert_vulnerability(&mut tx, v).await?;
        }
        if let Some(v) = &batch.victory {
            insert_victory(&mut tx, v).await?;
        }

        sqlx::query("INSERT INTO consciousness_states (id, created_at, state_json) VALUES (?, ?, ?)")
            .bind(batch.new_state.id)
            .bind(to_unix(batch.new_state.created_at))
            .bind(serde_json::to_string(&batch.new_state).context("encode state")?)
            .execute(&mut *tx)
            .await
            .context("insert new state")?;

        sqlx::query("UPDATE timeline_head SET state_id = ? WHERE id = 1")
            .bind(batch.new_state.id)
            .execute(&mut *tx)
            .await
            .context("advance timeline head")?;

        let mut entry = batch.log_entry;
        let next_id: i64 = sqlx::query("SELECT COALESCE(MAX(id), 0) + 1 FROM evolution_log")
            .fetch_one(&mut *tx)
            .await
            .context("allocate log id")?
            .get(0);
        entry.id = next_id;
        sqlx::query(
            "INSERT INTO evolution_log
             (id, previous_state_id, new_state_id, evolved_at, interaction_id, entry_json)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id)
        .bind(entry.previous_state_id)
        .bind(entry.new_state_id)
        .bind(to_unix(entry.evolved_at))
        .bind(entry.interaction_id.to_string())
        .bind(serde_json::to_string(&entry).context("encode log entry")?)
        .execute(&mut *tx)
        .await
        .context("insert log entry")?;

        for discovery in &batch.discoveries {
            sqlx::query(
                "INSERT INTO self_discoveries (state_id, interaction_id, discovery_json)
                 VALUES (?, ?, ?)",
            )
            .bind(discovery.state_id)
            .bind(discovery.interaction_id.to_string())
            .bind(serde_json::to_string(discovery).context("encode discovery")?)
            .execute(&mut *tx)
            .await
            .context("insert discovery")?;
        }

        if let Some(shift) = &batch.phase_shift {
            let ended = shift
                .closed
                .ended_at
                .ok_or_else(|| anyhow!("closed phase record is missing ended_at"))?;
            sqlx::query(
                "UPDATE relationship_phases SET ended_at = ?, record_json = ? WHERE id = ?",
            )
            .bind(to_unix(ended))
            .bind(serde_json::to_string(&shift.closed).context("encode closed phase")?)
            .bind(shift.closed.id)
            .execute(&mut *tx)
            .await
            .context("close phase record")?;

            let mut opened = shift.opened.clone();
            let next_phase_id: i64 =
                sqlx::query("SELECT COALESCE(MAX(id), 0) + 1 FROM relationship_phases")
                    .fetch_one(&mut *tx)
                    .await
                    .context("allocate phase id")?
                    .get(0);
            opened.id = next_phase_id;
            sqlx::query(
                "INSERT INTO relationship_phases (id, phase, started_at, ended_at, record_json)
                 VALUES (?, ?, ?, NULL, ?)",
            )
            .bind(opened.id)
            .bind(opened.phase.as_str())
            .bind(to_unix(opened.started_at))
            .bind(serde_json::to_string(&opened).context("encode opened phase")?)
            .execute(&mut *tx)
            .await
            .context("open phase record")?;
        }

        for pattern in &batch.pattern_upserts {
            sqlx::query(
                "INSERT INTO emergent_patterns
                 (id, kind, is_active, is_validated, confidence, pattern_json)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    is_active = excluded.is_active,
                    is_validated = excluded.is_validated,
                    confidence = excluded.confidence,
                    pattern_json = excluded.pattern_json",
            )
            .bind(pattern.id.to_string())
            .bind(pattern.kind.as_str())
            .bind(pattern.is_active)
            .bind(pattern.is_validated)
            .bind(pattern.confidence.get())
            .bind(serde_json::to_string(pattern).context("encode pattern")?)
            .execute(&mut *tx)
            .await
            .context("upsert pattern")?;
        }

        for log in &batch.validation_logs {
            sqlx::query(
                "INSERT INTO pattern_validation_log
                 (pattern_id, interaction_id, agreed, log_json)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(log.pattern_id.to_string())
            .bind(log.interaction_id.to_string())
            .bind(log.agreed)
            .bind(serde_json::to_string(log).context("encode validation log")?)
            .execute(&mut *tx)
            .await
            .context("insert validation log")?;
        }

        for adaptation in &batch.adaptation_upserts {
            upsert_adaptation(&mut tx, adaptation).await?;
        }

        for relationship in &batch.relationships {
            sqlx::query(
                "INSERT INTO pattern_relationships
                 (pattern_a, pattern_b, kind, strength, relationship_json)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(pattern_a, pattern_b, kind) DO UPDATE SET
                    strength = excluded.strength,
                    relationship_json = excluded.relationship_json",
            )
            .bind(relationship.pattern_a.to_string())
            .bind(relationship.pattern_b.to_string())
            .bind(relationship.kind.as_str())
            .bind(relationship.strength.get())
            .bind(serde_json::to_string(relationship).context("encode relationship")?)
            .execute(&mut *tx)
            .await
            .context("upsert relationship")?;
        }

        tx.commit().await.context("commit evolution step")?;
        tracing::debug!(
            state = batch.new_state.id,
            interaction = %batch.experience.interaction_id,
            "committed evolution step"
        );
        Ok(())
    }

    async fn update_adaptation(
        &self,
        adaptation: &BehavioralAdaptation,
    ) -> Result<(), EvolutionError> {
        let mut tx = self.pool.begin().await.context("begin adaptation update")?;
        upsert_adaptation(&mut tx, adaptation).await?;
        tx.commit().await.context("commit adaptation update")?;
        Ok(())
    }

    async fn phase_history(&self) -> Result<Vec<PhaseRecord>, EvolutionError> {
        let rows = sqlx::query("SELECT record_json FROM relationship_phases ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("read phase history")?;

        rows.iter()
            .map(|r| {
                Self::parse_json(r.get::<String, _>("record_json").as_str(), "phase")
                    .map_err(EvolutionError::from)
            })
            .collect()
    }
}

async fn insert_experience(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    experience: &FeltExperience,
) -> Result<(), EvolutionError> {
    sqlx::query(
        "INSERT INTO felt_experiences
         (interaction_id, experienced_at, emotional_significance, memory_weight,
          is_formative, experience_json)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(experience.interaction_id.to_string())
    .bind(to_unix(experience.experienced_at))
    .bind(experience.emotional_significance.get())
    .bind(experience.memory_weight.get())
    .bind(experience.is_formative_moment)
    .bind(serde_json::to_string(experience).context("encode experience")?)
    .execute(&mut **tx)
    .await
    .context("insert experience")?;
    Ok(())
}

async fn insert_vulnerability(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    moment: &VulnerabilityMoment,
) -> Result<(), EvolutionError> {
    sqlx::query("INSERT INTO vulnerability_moments (interaction_id, moment_json) VALUES (?, ?)")
        .bind(moment.interaction_id.to_string())
        .bind(serde_json::to_string(moment).context("encode vulnerability moment")?)
        .execute(&mut **tx)
        .await
        .context("insert vulnerability moment")?;
    Ok(())
}

async fn insert_victory(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    moment: &SharedVictory,
) -> Result<(), EvolutionError> {
    sqlx::query("INSERT INTO shared_victories (interaction_id, moment_json) VALUES (?, ?)")
        .bind(moment.interaction_id.to_string())
        .bind(serde_json::to_string(moment).context("encode shared victory")?)
        .execute(&mut **tx)
        .await
        .context("insert shared victory")?;
    Ok(())
}

async fn upsert_adaptation(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    adaptation: &BehavioralAdaptation,
) -> Result<(), EvolutionError> {
    sqlx::query(
        "INSERT INTO behavioral_adaptations (id, pattern_id, is_active, adaptation_json)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            is_active = excluded.is_active,
            adaptation_json = excluded.adaptation_json",
    )
    .bind(adaptation.id.to_string())
    .bind(adaptation.pattern_id.to_string())
    .bind(adaptation.is_active)
    .bind(serde_json::to_string(adaptation).context("encode adaptation")?)
    .execute(&mut **tx)
    .await
    .context("upsert adaptation")?;
    Ok(())
}
