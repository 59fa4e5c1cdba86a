use async_trait::async_trait;
use chrono::NaiveDate;

use call_quality_dashboard::airtable::{
    AirtableFields, AirtableRecord, FieldValue, RecordPage, RecordSource, SourceError,
};
use call_quality_dashboard::auth::AccessPolicy;
use call_quality_dashboard::dashboard::Dashboard;
use call_quality_dashboard::filter::{EvaluationFilter, SortColumn, SortOrder};
use call_quality_dashboard::models::{Priority, Proceso, TrendQuery};
use call_quality_dashboard::store::MemoryStore;

struct Snapshot(Vec<RecordPage>);

#[async_trait]
impl RecordSource for Snapshot {
    async fn fetch_page(
        &self,
        _api_key: &str,
        offset: Option<&str>,
    ) -> Result<RecordPage, SourceError> {
        let index = offset.map_or(0, |o| o.parse::<usize>().unwrap_or(0));
        self.0
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::Decode(format!("no page {index}")))
    }
}

fn text(s: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(s.to_string()))
}

fn evaluation(
    id: &str,
    call_id: &str,
    operator: &str,
    proceso: &str,
    average: f64,
    evaluated_at: &str,
) -> AirtableRecord {
    AirtableRecord {
        id: id.to_string(),
        created_time: None,
        fields: AirtableFields {
            call_id: text(call_id),
            operator_name: text(operator),
            proceso: text(proceso),
            priority: text("P1"),
            average_score: Some(FieldValue::Number(average)),
            adherence_score: Some(FieldValue::Number(average)),
            evaluated_at: text(evaluated_at),
            ..Default::default()
        },
    }
}

fn snapshot() -> Snapshot {
    Snapshot(vec![
        RecordPage {
            records: vec![
                evaluation("rec1", "C-100", "Ana", "cobros", 82.0, "2024-06-03T10:00:00Z"),
                evaluation("rec2", "C-101", "Luis", "Atencion", 64.0, "2024-06-03T15:30:00Z"),
            ],
            offset: Some("1".to_string()),
        },
        RecordPage {
            records: vec![evaluation(
                "rec3",
                "C-102",
                "Ana",
                "soporte",
                90.0,
                "2024-06-04T09:15:00Z",
            )],
            offset: None,
        },
    ])
}

#[tokio::test]
async fn sync_then_query_end_to_end() {
    let dashboard = Dashboard::new(MemoryStore::new(), AccessPolicy::default());
    let source = snapshot();

    let first = dashboard
        .sync_from_airtable(None, &source, "key")
        .await
        .unwrap();
    assert_eq!(first.records_imported, 3);
    let again = dashboard
        .sync_from_airtable(None, &source, "key")
        .await
        .unwrap();
    assert_eq!(again.records_imported, 3);

    let stats = dashboard.stats().await.unwrap();
    assert_eq!(stats.total_calls, 3);
    assert_eq!(stats.top_operators[0].name, "Ana");
    assert_eq!(stats.top_operators[0].call_count, 2);
    assert!((stats.top_operators[0].average_score - 86.0).abs() < 1e-9);

    let rows = dashboard
        .list(&EvaluationFilter {
            sort_by: Some(SortColumn::AverageScore),
            sort_order: SortOrder::Desc,
            ..Default::default()
        })
        .await;
    let ids: Vec<&str> = rows.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, vec!["C-102", "C-100", "C-101"]);
    assert_eq!(rows[0].proceso, Proceso::Desconocido);
    assert_eq!(rows[1].proceso, Proceso::Cobros);
    assert_eq!(rows[2].proceso, Proceso::Atencion);
    assert!(rows.iter().all(|r| r.priority == Priority::P1));

    let trends = dashboard.trends(&TrendQuery::default()).await;
    let dates: Vec<NaiveDate> = trends.overall.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
        ]
    );
    assert!((trends.overall[0].average_score - 73.0).abs() < 1e-9);
    assert_eq!(trends.by_operator.len(), 2);

    let empty = dashboard
        .trends(&TrendQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 2, 1),
            operator_name: None,
        })
        .await;
    assert!(empty.overall.is_empty());
    assert!(empty.by_operator.is_empty());

    assert_eq!(dashboard.clear_all(None).await.unwrap(), 3);
    assert_eq!(dashboard.stats().await.unwrap().total_calls, 0);
}
