//! Boundary operations served to dashboard clients.
//!
//! Read paths degrade when storage is down (empty listing, no stats); write
//! paths surface the failure.

use tracing::{info, warn};

use crate::aggregate::{build_trends, summarize};
use crate::airtable::RecordSource;
use crate::auth::{authorize, AccessPolicy, User};
use crate::error::DashboardError;
use crate::filter::EvaluationFilter;
use crate::importer;
use crate::models::{CallEvaluation, SummaryStats, SyncResult, TrendQuery, Trends};
use crate::store::EvaluationStore;

pub struct Dashboard<S> {
    store: S,
    policy: AccessPolicy,
}

impl<S: EvaluationStore> Dashboard<S> {
    pub fn new(store: S, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list(&self, filter: &EvaluationFilter) -> Vec<CallEvaluation> {
        match self.store.list(filter).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "listing evaluations failed; returning empty result");
                Vec::new()
            }
        }
    }

    pub async fn stats(&self) -> Option<SummaryStats> {
        match self.store.all().await {
            Ok(rows) => Some(summarize(&rows)),
            Err(e) => {
                warn!(error = %e, "loading evaluations for stats failed");
                None
            }
        }
    }

    pub async fn by_id(&self, id: i64) -> Option<CallEvaluation> {
        match self.store.by_id(id).await {
            Ok(row) => row,
            Err(e) => {
                warn!(id, error = %e, "loading evaluation failed");
                None
            }
        }
    }

    pub async fn trends(&self, query: &TrendQuery) -> Trends {
        match self.store.all().await {
            Ok(rows) => build_trends(&rows, query),
            Err(e) => {
                warn!(error = %e, "loading evaluations for trends failed");
                Trends::default()
            }
        }
    }

    pub async fn sync_from_airtable<R>(
        &self,
        caller: Option<&User>,
        source: &R,
        api_key: &str,
    ) -> Result<SyncResult, DashboardError>
    where
        R: RecordSource + ?Sized,
    {
        self.check_access(caller)?;
        let records_imported = importer::sync_from_airtable(source, &self.store, api_key).await?;
        Ok(SyncResult { records_imported })
    }

    pub async fn clear_all(&self, caller: Option<&User>) -> Result<u64, DashboardError> {
        self.check_access(caller)?;
        let removed = self.store.clear().await?;
        info!(removed, "cleared all evaluations");
        Ok(removed)
    }

    fn check_access(&self, caller: Option<&User>) -> Result<(), DashboardError> {
        if authorize(self.policy, caller) {
            Ok(())
        } else {
            Err(DashboardError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airtable::{AirtableFields, FieldValue};
    use crate::auth::Role;
    use crate::error::ImportError;
    use crate::importer::tests::{airtable_record, page, BrokenStore, ScriptedSource};
    use crate::models::NewCallEvaluation;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn caller() -> User {
        let now = Utc::now();
        User {
            id: 7,
            open_id: "open-7".into(),
            name: Some("Supervisor".into()),
            email: None,
            login_method: None,
            role: Role::Admin,
            created_at: now,
            updated_at: now,
            last_signed_in: now,
        }
    }

    async fn seeded(averages: &[f64]) -> Dashboard<MemoryStore> {
        let store = MemoryStore::new();
        for (i, avg) in averages.iter().enumerate() {
            store
                .upsert(&NewCallEvaluation {
                    call_id: format!("C{i}"),
                    average_score: Some(*avg),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        Dashboard::new(store, AccessPolicy::default())
    }

    #[tokio::test]
    async fn stats_total_matches_row_count() {
        let dashboard = seeded(&[40.0, 55.0, 60.0]).await;
        let stats = dashboard.stats().await.unwrap();
        assert_eq!(stats.total_calls, dashboard.store().all().await.unwrap().len());
    }

    #[tokio::test]
    async fn list_applies_score_window() {
        let dashboard = seeded(&[40.0, 55.0, 60.0, 80.0, 95.0]).await;
        let filter = EvaluationFilter {
            min_score: Some(50.0),
            max_score: Some(80.0),
            ..Default::default()
        };
        let mut scores: Vec<f64> = dashboard
            .list(&filter)
            .await
            .into_iter()
            .filter_map(|r| r.average_score)
            .collect();
        scores.sort_by(f64::total_cmp);
        assert_eq!(scores, vec![55.0, 60.0, 80.0]);
    }

    #[tokio::test]
    async fn reads_degrade_when_storage_is_down() {
        let dashboard = Dashboard::new(BrokenStore, AccessPolicy::default());
        assert!(dashboard.list(&EvaluationFilter::default()).await.is_empty());
        assert!(dashboard.stats().await.is_none());
        assert!(dashboard.by_id(1).await.is_none());
        assert_eq!(dashboard.trends(&TrendQuery::default()).await, Trends::default());
    }

    #[tokio::test]
    async fn writes_fail_hard_when_storage_is_down() {
        let dashboard = Dashboard::new(BrokenStore, AccessPolicy::default());
        assert!(matches!(
            dashboard.clear_all(None).await,
            Err(DashboardError::Storage(_))
        ));

        let source = ScriptedSource::new(vec![page(
            vec![airtable_record("rec1", AirtableFields::default())],
            None,
        )]);
        let err = dashboard
            .sync_from_airtable(None, &source, "key")
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Import(ImportError::Storage(_))));
    }

    #[tokio::test]
    async fn by_id_not_found_is_none() {
        let dashboard = seeded(&[70.0]).await;
        assert!(dashboard.by_id(1).await.is_some());
        assert!(dashboard.by_id(42).await.is_none());
    }

    #[tokio::test]
    async fn mutations_require_a_caller_when_auth_is_on() {
        let store = MemoryStore::new();
        let dashboard = Dashboard::new(store, AccessPolicy { require_auth: true });
        let source = ScriptedSource::new(vec![page(
            vec![airtable_record(
                "rec1",
                AirtableFields {
                    average_score: Some(FieldValue::Number(66.0)),
                    ..Default::default()
                },
            )],
            None,
        )]);

        assert!(matches!(
            dashboard.sync_from_airtable(None, &source, "key").await,
            Err(DashboardError::Unauthorized)
        ));
        assert!(source.requested.lock().unwrap().is_empty());
        assert!(matches!(
            dashboard.clear_all(None).await,
            Err(DashboardError::Unauthorized)
        ));

        let user = caller();
        let result = dashboard
            .sync_from_airtable(Some(&user), &source, "key")
            .await
            .unwrap();
        assert_eq!(result.records_imported, 1);
        assert_eq!(dashboard.clear_all(Some(&user)).await.unwrap(), 1);
        assert_eq!(dashboard.stats().await.unwrap().total_calls, 0);
    }
}
