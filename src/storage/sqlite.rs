//! SQLite-backed learning store

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DocumentRecord, LearningEvent, PredictionRecord, SessionRecord, StoreStats};
use crate::error::EngineResult;
use crate::prediction::{FeatureVector, ModelSnapshot, TrainingSample};
use crate::strategy::{FailureCategory, FixAttempt, StrategyImprovement, StrategyProfile, Technique};
use crate::types::Violation;

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn from_json<T: DeserializeOwned>(idx: usize, value: String) -> rusqlite::Result<T> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Store for everything the engine learns
#[derive(Clone)]
pub struct EngineStore {
    conn: Arc<Mutex<Connection>>,
}

impl EngineStore {
    /// Open (or create) the store at the given path
    pub async fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init_schema(&conn)?;
        info!("Opened learning store at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory store, used by tests and dry runs
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> EngineResult<()> {
        conn.execute_batch(
            r#"
            -- Feature snapshots, one per remediated document run
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                features TEXT NOT NULL,
                violation_count INTEGER NOT NULL,
                has_violations INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS violations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                severity TEXT NOT NULL,
                location TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                violation_type TEXT NOT NULL,
                probability REAL NOT NULL,
                predicted_at TEXT NOT NULL,
                correct INTEGER,
                resolved_at TEXT
            );

            -- Current model, single row
            CREATE TABLE IF NOT EXISTS classifier_model (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                weights TEXT NOT NULL,
                bias REAL NOT NULL,
                accuracy REAL NOT NULL,
                trained_at TEXT
            );

            CREATE TABLE IF NOT EXISTS model_training (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                samples INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                trained_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS fix_attempts (
                id TEXT PRIMARY KEY,
                technique TEXT NOT NULL,
                violation_type TEXT NOT NULL,
                success INTEGER NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                error TEXT,
                attempted_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS strategy_performance (
                technique TEXT PRIMARY KEY,
                success_rate REAL NOT NULL,
                avg_time_ms REAL NOT NULL,
                confidence REAL NOT NULL,
                attempts INTEGER NOT NULL,
                improvements TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS learning_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fixes_analyzed INTEGER NOT NULL,
                strategies_improved INTEGER NOT NULL,
                accuracy_gain REAL NOT NULL,
                insights TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS strategy_improvements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                technique TEXT NOT NULL,
                category TEXT NOT NULL,
                suggestion TEXT NOT NULL,
                estimated_impact REAL NOT NULL,
                error TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_doc ON documents(document_id);
            CREATE INDEX IF NOT EXISTS idx_violations_doc ON violations(document_id);
            CREATE INDEX IF NOT EXISTS idx_predictions_doc ON predictions(document_id, correct);
            CREATE INDEX IF NOT EXISTS idx_fix_attempts_technique ON fix_attempts(technique);
        "#,
        )?;

        Ok(())
    }

    // --- classifier ---------------------------------------------------------

    /// Current model, or `None` when nothing has been trained yet
    pub async fn load_model(&self) -> EngineResult<Option<ModelSnapshot>> {
        let conn = self.conn.lock().await;
        let snapshot = conn
            .query_row(
                "SELECT weights, bias, accuracy, trained_at FROM classifier_model WHERE id = 1",
                [],
                |row| {
                    let trained_at: Option<String> = row.get(3)?;
                    Ok(ModelSnapshot {
                        weights: from_json(0, row.get(0)?)?,
                        bias: row.get(1)?,
                        accuracy: row.get(2)?,
                        trained_at: trained_at.map(|s| parse_ts(3, s)).transpose()?,
                    })
                },
            )
            .optional()?;
        Ok(snapshot)
    }

    /// Replace the current model and append to the training history
    pub async fn save_trained_model(&self, snapshot: &ModelSnapshot, samples: usize) -> EngineResult<()> {
        let weights = serde_json::to_string(&snapshot.weights)?;
        let trained_at = snapshot.trained_at.unwrap_or_else(Utc::now).to_rfc3339();

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT OR REPLACE INTO classifier_model (id, weights, bias, accuracy, trained_at)
               VALUES (1, ?1, ?2, ?3, ?4)"#,
            params![weights, snapshot.bias, snapshot.accuracy, trained_at],
        )?;
        tx.execute(
            "INSERT INTO model_training (samples, accuracy, trained_at) VALUES (?1, ?2, ?3)",
            params![samples as i64, snapshot.accuracy, trained_at],
        )?;
        tx.commit()?;

        debug!("Saved classifier model trained on {} samples", samples);
        Ok(())
    }

    /// Training corpus derived from recorded documents, oldest first
    pub async fn training_samples(&self) -> EngineResult<Vec<TrainingSample>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached("SELECT features, has_violations FROM documents ORDER BY id")?;
        let samples = stmt
            .query_map([], |row| {
                let features: FeatureVector = from_json(0, row.get(0)?)?;
                Ok(TrainingSample::new(features, row.get::<_, bool>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(samples)
    }

    // --- predictions --------------------------------------------------------

    pub async fn record_predictions(&self, predictions: &[PredictionRecord]) -> EngineResult<()> {
        if predictions.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        insert_predictions(&tx, predictions)?;
        tx.commit()?;
        debug!("Recorded {} predictions", predictions.len());
        Ok(())
    }

    /// Open predictions for a document
    pub async fn open_predictions(&self, document_id: &str) -> EngineResult<Vec<PredictionRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT id, document_id, violation_type, probability, predicted_at, correct
               FROM predictions WHERE document_id = ?1 AND correct IS NULL ORDER BY rowid"#,
        )?;
        let rows = stmt
            .query_map(params![document_id], |row| {
                Ok(PredictionRecord {
                    id: row.get(0)?,
                    document_id: row.get(1)?,
                    violation_type: row.get(2)?,
                    probability: row.get(3)?,
                    predicted_at: parse_ts(4, row.get(4)?)?,
                    correct: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- fix attempts and strategies ---------------------------------------

    /// Most recent attempts for a technique, newest first
    pub async fn recent_attempts(&self, technique: &Technique, limit: usize) -> EngineResult<Vec<FixAttempt>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT id, technique, violation_type, success, elapsed_ms, error, attempted_at
               FROM fix_attempts WHERE technique = ?1 ORDER BY rowid DESC LIMIT ?2"#,
        )?;
        let attempts = stmt
            .query_map(params![technique.as_str(), limit as i64], |row| {
                Ok(FixAttempt {
                    id: row.get(0)?,
                    technique: Technique::from(row.get::<_, String>(1)?),
                    violation_type: row.get(2)?,
                    success: row.get(3)?,
                    elapsed_ms: row.get::<_, i64>(4)?.max(0) as u64,
                    error: row.get(5)?,
                    attempted_at: parse_ts(6, row.get(6)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attempts)
    }

    pub async fn load_profiles(&self) -> EngineResult<Vec<StrategyProfile>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT technique, success_rate, avg_time_ms, confidence, attempts, improvements, updated_at
               FROM strategy_performance ORDER BY technique"#,
        )?;
        let profiles = stmt
            .query_map([], |row| {
                Ok(StrategyProfile {
                    technique: Technique::from(row.get::<_, String>(0)?),
                    success_rate: row.get(1)?,
                    avg_time_ms: row.get(2)?,
                    confidence: row.get(3)?,
                    attempts: row.get::<_, i64>(4)?.max(0) as u64,
                    improvements: from_json(5, row.get(5)?)?,
                    updated_at: parse_ts(6, row.get(6)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// Most recent advisory improvements, newest first
    pub async fn recent_improvements(&self, limit: usize) -> EngineResult<Vec<StrategyImprovement>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT technique, category, suggestion, estimated_impact, error, created_at
               FROM strategy_improvements ORDER BY id DESC LIMIT ?1"#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StrategyImprovement {
                    technique: Technique::from(row.get::<_, String>(0)?),
                    category: FailureCategory::parse(&row.get::<_, String>(1)?),
                    suggestion: row.get(2)?,
                    estimated_impact: row.get(3)?,
                    error: row.get(4)?,
                    created_at: parse_ts(5, row.get(5)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most recent learning events, newest first
    pub async fn recent_learning_events(&self, limit: usize) -> EngineResult<Vec<LearningEvent>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            r#"SELECT fixes_analyzed, strategies_improved, accuracy_gain, insights, created_at
               FROM learning_events ORDER BY id DESC LIMIT ?1"#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(LearningEvent {
                    fixes_analyzed: row.get::<_, i64>(0)?.max(0) as usize,
                    strategies_improved: row.get::<_, i64>(1)?.max(0) as usize,
                    accuracy_gain: row.get(2)?,
                    insights: from_json(3, row.get(3)?)?,
                    created_at: parse_ts(4, row.get(4)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- learn phase --------------------------------------------------------

    /// Commit one learning session, plus the run's corpus entry when present.
    ///
    /// All rows land in a single transaction; on error nothing is written.
    pub async fn commit_learning(
        &self,
        session: &SessionRecord,
        document: Option<&DocumentRecord>,
    ) -> EngineResult<()> {
        let insights = serde_json::to_string(&session.event.insights)?;
        let profile_logs = session
            .profiles
            .iter()
            .map(|p| serde_json::to_string(&p.improvements))
            .collect::<Result<Vec<_>, _>>()?;
        let features = document.map(|d| serde_json::to_string(&d.features)).transpose()?;

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        if let (Some(doc), Some(features)) = (document, features) {
            insert_document(&tx, doc, &features)?;
        }

        {
            let mut stmt = tx.prepare_cached(
                r#"INSERT INTO fix_attempts
                   (id, technique, violation_type, success, elapsed_ms, error, attempted_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )?;
            for attempt in &session.attempts {
                stmt.execute(params![
                    attempt.id,
                    attempt.technique.as_str(),
                    attempt.violation_type,
                    attempt.success,
                    attempt.elapsed_ms as i64,
                    attempt.error,
                    attempt.attempted_at.to_rfc3339(),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                r#"INSERT INTO strategy_performance
                   (technique, success_rate, avg_time_ms, confidence, attempts, improvements, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                   ON CONFLICT(technique) DO UPDATE SET
                     success_rate = excluded.success_rate,
                     avg_time_ms = excluded.avg_time_ms,
                     confidence = excluded.confidence,
                     attempts = excluded.attempts,
                     improvements = excluded.improvements,
                     updated_at = excluded.updated_at"#,
            )?;
            for (profile, log) in session.profiles.iter().zip(&profile_logs) {
                stmt.execute(params![
                    profile.technique.as_str(),
                    profile.success_rate,
                    profile.avg_time_ms,
                    profile.confidence,
                    profile.attempts as i64,
                    log,
                    profile.updated_at.to_rfc3339(),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                r#"INSERT INTO strategy_improvements
                   (technique, category, suggestion, estimated_impact, error, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )?;
            for imp in &session.improvements {
                stmt.execute(params![
                    imp.technique.as_str(),
                    imp.category.as_str(),
                    imp.suggestion,
                    imp.estimated_impact,
                    imp.error,
                    imp.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.execute(
            r#"INSERT INTO learning_events
               (fixes_analyzed, strategies_improved, accuracy_gain, insights, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                session.event.fixes_analyzed as i64,
                session.event.strategies_improved as i64,
                session.event.accuracy_gain,
                insights,
                session.event.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        debug!(
            "Committed learning session: {} attempts, {} profiles, {} improvements",
            session.attempts.len(),
            session.profiles.len(),
            session.improvements.len()
        );
        Ok(())
    }

    // --- diagnostics --------------------------------------------------------

    pub async fn stats(&self) -> EngineResult<StoreStats> {
        let conn = self.conn.lock().await;
        let count = |sql: &str| -> rusqlite::Result<usize> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n.max(0) as usize)
        };

        Ok(StoreStats {
            documents: count("SELECT COUNT(*) FROM documents")?,
            violations: count("SELECT COUNT(*) FROM violations")?,
            training_runs: count("SELECT COUNT(*) FROM model_training")?,
            predictions_total: count("SELECT COUNT(*) FROM predictions")?,
            predictions_resolved: count("SELECT COUNT(*) FROM predictions WHERE correct IS NOT NULL")?,
            predictions_correct: count("SELECT COUNT(*) FROM predictions WHERE correct = 1")?,
            fix_attempts: count("SELECT COUNT(*) FROM fix_attempts")?,
            fix_successes: count("SELECT COUNT(*) FROM fix_attempts WHERE success = 1")?,
            learning_events: count("SELECT COUNT(*) FROM learning_events")?,
            strategy_improvements: count("SELECT COUNT(*) FROM strategy_improvements")?,
        })
    }
}

fn insert_predictions(tx: &Transaction<'_>, predictions: &[PredictionRecord]) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        r#"INSERT INTO predictions (id, document_id, violation_type, probability, predicted_at, correct)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
    )?;
    for p in predictions {
        stmt.execute(params![
            p.id,
            p.document_id,
            p.violation_type,
            p.probability,
            p.predicted_at.to_rfc3339(),
            p.correct,
        ])?;
    }
    Ok(())
}

fn insert_violations(
    tx: &Transaction<'_>,
    document_id: &str,
    snapshot: &str,
    violations: &[Violation],
    recorded_at: &str,
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        r#"INSERT INTO violations (document_id, snapshot, type, category, severity, location, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
    )?;
    for v in violations {
        stmt.execute(params![
            document_id,
            snapshot,
            v.violation_type,
            v.category,
            v.severity.as_str(),
            v.location,
            recorded_at,
        ])?;
    }
    Ok(())
}

/// Corpus row, violation snapshots, this run's predictions, and resolution
/// of every open prediction for the document against the detected types
fn insert_document(tx: &Transaction<'_>, doc: &DocumentRecord, features: &str) -> rusqlite::Result<()> {
    let recorded_at = doc.recorded_at.to_rfc3339();

    tx.execute(
        r#"INSERT INTO documents (document_id, features, violation_count, has_violations, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
        params![
            doc.document_id,
            features,
            doc.verified.len() as i64,
            !doc.verified.is_empty(),
            recorded_at,
        ],
    )?;
    insert_violations(tx, &doc.document_id, "detect", &doc.detected, &recorded_at)?;
    insert_violations(tx, &doc.document_id, "verify", &doc.verified, &recorded_at)?;
    insert_predictions(tx, &doc.predictions)?;

    let detected: HashSet<&str> = doc.detected.iter().map(|v| v.violation_type.as_str()).collect();
    let open: Vec<(String, String)> = {
        let mut stmt = tx.prepare_cached(
            "SELECT id, violation_type FROM predictions WHERE document_id = ?1 AND correct IS NULL",
        )?;
        let rows = stmt
            .query_map(params![doc.document_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    let mut stmt = tx.prepare_cached("UPDATE predictions SET correct = ?1, resolved_at = ?2 WHERE id = ?3")?;
    for (id, violation_type) in &open {
        stmt.execute(params![detected.contains(violation_type.as_str()), recorded_at, id])?;
    }
    if !open.is_empty() {
        debug!("Resolved {} predictions for {}", open.len(), doc.document_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use tempfile::tempdir;

    fn session(attempts: Vec<FixAttempt>) -> SessionRecord {
        SessionRecord {
            attempts,
            profiles: vec![StrategyProfile::with_defaults(Technique::ColorReplace, Utc::now())],
            improvements: vec![StrategyImprovement::for_failure(
                Technique::ColorReplace,
                Some("timed out"),
                Utc::now(),
            )],
            event: LearningEvent {
                fixes_analyzed: 1,
                strategies_improved: 1,
                accuracy_gain: 0.01,
                insights: Vec::new(),
                created_at: Utc::now(),
            },
        }
    }

    fn prediction(doc: &str, vtype: &str) -> PredictionRecord {
        PredictionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: doc.to_string(),
            violation_type: vtype.to_string(),
            probability: 0.5,
            predicted_at: Utc::now(),
            correct: None,
        }
    }

    #[tokio::test]
    async fn test_missing_model_is_none() {
        let store = EngineStore::open_in_memory().unwrap();
        assert!(store.load_model().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_model_roundtrip_and_history() {
        let dir = tempdir().unwrap();
        let store = EngineStore::open(dir.path().join("nested/learning.db")).await.unwrap();
        let snapshot = ModelSnapshot {
            weights: vec![0.25, -1.5, 3.0],
            bias: 0.1,
            accuracy: 87.5,
            trained_at: Some(Utc::now()),
        };
        store.save_trained_model(&snapshot, 12).await.unwrap();
        store.save_trained_model(&snapshot, 14).await.unwrap();

        assert_eq!(store.load_model().await.unwrap(), Some(snapshot));
        assert_eq!(store.stats().await.unwrap().training_runs, 2);
    }

    #[tokio::test]
    async fn test_recent_attempts_newest_first_with_limit() {
        let store = EngineStore::open_in_memory().unwrap();
        let attempts: Vec<FixAttempt> = (0..6)
            .map(|i| FixAttempt::new(Technique::GridSnap, "grid", i % 2 == 0, i as u64))
            .chain(std::iter::once(FixAttempt::new(Technique::TextReflow, "overflow", true, 1)))
            .collect();
        store.commit_learning(&session(attempts), None).await.unwrap();

        let recent = store.recent_attempts(&Technique::GridSnap, 4).await.unwrap();
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0].elapsed_ms, 5);
        assert_eq!(recent[3].elapsed_ms, 2);
        assert!(recent.iter().all(|a| a.technique == Technique::GridSnap));
    }

    #[tokio::test]
    async fn test_commit_learning_persists_session() {
        let store = EngineStore::open_in_memory().unwrap();
        let attempt = FixAttempt::new(Technique::ColorReplace, "color_violation", false, 10).with_error("timed out");
        store.commit_learning(&session(vec![attempt]), None).await.unwrap();

        let profiles = store.load_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].technique, Technique::ColorReplace);

        let improvements = store.recent_improvements(10).await.unwrap();
        assert_eq!(improvements[0].category, FailureCategory::Timeout);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.fix_attempts, 1);
        assert_eq!(stats.fix_successes, 0);
        assert_eq!(stats.learning_events, 1);
        assert_eq!(store.recent_learning_events(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_upsert_replaces_row() {
        let store = EngineStore::open_in_memory().unwrap();
        let mut record = session(Vec::new());
        store.commit_learning(&record, None).await.unwrap();
        record.profiles[0].success_rate = 0.33;
        store.commit_learning(&record, None).await.unwrap();

        let profiles = store.load_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].success_rate, 0.33);
    }

    #[tokio::test]
    async fn test_document_record_resolves_predictions_and_feeds_corpus() {
        let store = EngineStore::open_in_memory().unwrap();
        store
            .record_predictions(&[prediction("doc-1", "color_violation"), prediction("doc-1", "text_overflow")])
            .await
            .unwrap();
        assert_eq!(store.open_predictions("doc-1").await.unwrap().len(), 2);

        let doc = DocumentRecord {
            document_id: "doc-1".to_string(),
            features: FeatureVector(vec![1.0; 10]),
            detected: vec![Violation::new("color_violation", "color", Severity::Major, "p1")],
            verified: Vec::new(),
            predictions: vec![prediction("doc-1", "typography_violation")],
            recorded_at: Utc::now(),
        };
        store.commit_learning(&session(Vec::new()), Some(&doc)).await.unwrap();

        assert!(store.open_predictions("doc-1").await.unwrap().is_empty());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.predictions_total, 3);
        assert_eq!(stats.predictions_resolved, 3);
        assert_eq!(stats.predictions_correct, 1);
        assert_eq!(stats.violations, 1);

        let samples = store.training_samples().await.unwrap();
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].label);
        assert_eq!(samples[0].features.len(), 10);
    }
}
