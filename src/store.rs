use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::filter::EvaluationFilter;
use crate::models::{CallEvaluation, NewCallEvaluation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for call evaluations.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Inserts the record, or overwrites every mutable field of the row with
    /// the same `call_id` and refreshes `updated_at`.
    async fn upsert(&self, record: &NewCallEvaluation) -> Result<(), StoreError>;

    async fn list(&self, filter: &EvaluationFilter) -> Result<Vec<CallEvaluation>, StoreError>;

    /// Every stored row, in insertion order.
    async fn all(&self) -> Result<Vec<CallEvaluation>, StoreError>;

    async fn by_id(&self, id: i64) -> Result<Option<CallEvaluation>, StoreError>;

    /// Deletes every row and returns how many were removed.
    async fn clear(&self) -> Result<u64, StoreError>;
}

/// In-process store with the same upsert and ordering behavior as Postgres.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    rows: Vec<CallEvaluation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<CallEvaluation>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            inner: Mutex::new(MemoryInner { next_id, rows }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn upsert(&self, record: &NewCallEvaluation) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let now = Utc::now();

        if let Some(existing) = inner.rows.iter_mut().find(|r| r.call_id == record.call_id) {
            let id = existing.id;
            let created_at = existing.created_at;
            *existing = materialize(record, id, created_at);
            existing.updated_at = now;
            return Ok(());
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(materialize(record, id, now));
        Ok(())
    }

    async fn list(&self, filter: &EvaluationFilter) -> Result<Vec<CallEvaluation>, StoreError> {
        let mut rows = self.lock()?.rows.clone();
        filter.apply(&mut rows);
        Ok(rows)
    }

    async fn all(&self) -> Result<Vec<CallEvaluation>, StoreError> {
        Ok(self.lock()?.rows.clone())
    }

    async fn by_id(&self, id: i64) -> Result<Option<CallEvaluation>, StoreError> {
        Ok(self.lock()?.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let removed = inner.rows.len() as u64;
        inner.rows.clear();
        Ok(removed)
    }
}

fn materialize(
    record: &NewCallEvaluation,
    id: i64,
    created_at: chrono::DateTime<Utc>,
) -> CallEvaluation {
    let record = record.clone();
    CallEvaluation {
        id,
        call_id: record.call_id,
        proceso: record.proceso,
        priority: record.priority,
        status: record.status,
        adherence_score: record.adherence_score,
        sentiment_score: record.sentiment_score,
        correctness_score: record.correctness_score,
        speed_score: record.speed_score,
        average_score: record.average_score,
        feedback: record.feedback,
        areas_for_improvement: record.areas_for_improvement,
        strengths: record.strengths,
        critical_issues: record.critical_issues,
        expected_wrap_up: record.expected_wrap_up,
        expected_steps: record.expected_steps,
        raw_response: record.raw_response,
        operator_id: record.operator_id,
        operator_name: record.operator_name,
        scenario_id: record.scenario_id,
        scenario_name: record.scenario_name,
        duration_seconds: record.duration_seconds,
        evaluated_at: record.evaluated_at,
        airtable_record_id: record.airtable_record_id,
        created_at,
        updated_at: created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Proceso;

    fn record(call_id: &str, average: f64) -> NewCallEvaluation {
        NewCallEvaluation {
            call_id: call_id.to_string(),
            average_score: Some(average),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_by_call_id() {
        let store = MemoryStore::new();
        store.upsert(&record("CALL-1", 60.0)).await.unwrap();
        store.upsert(&record("CALL-2", 70.0)).await.unwrap();

        let mut changed = record("CALL-1", 88.0);
        changed.proceso = Proceso::Atencion;
        store.upsert(&changed).await.unwrap();

        let rows = store.all().await.unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows.iter().find(|r| r.call_id == "CALL-1").unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.average_score, Some(88.0));
        assert_eq!(first.proceso, Proceso::Atencion);
        assert!(first.updated_at >= first.created_at);
    }

    #[tokio::test]
    async fn by_id_and_clear() {
        let store = MemoryStore::new();
        store.upsert(&record("CALL-1", 60.0)).await.unwrap();
        assert_eq!(store.by_id(1).await.unwrap().unwrap().call_id, "CALL-1");
        assert!(store.by_id(99).await.unwrap().is_none());

        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.all().await.unwrap().is_empty());
    }
}
