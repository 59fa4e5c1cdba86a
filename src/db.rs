use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::auth::{Role, User};
use crate::filter::EvaluationFilter;
use crate::models::{CallEvaluation, NewCallEvaluation, Priority, Proceso};
use crate::store::{EvaluationStore, StoreError};

const SELECT_EVALUATIONS: &str = r#"
    SELECT id, call_id, proceso, priority, status,
           adherence_score::float8 AS adherence_score,
           sentiment_score::float8 AS sentiment_score,
           correctness_score::float8 AS correctness_score,
           speed_score::float8 AS speed_score,
           average_score::float8 AS average_score,
           feedback, areas_for_improvement, strengths, critical_issues,
           expected_wrap_up, expected_steps, raw_response,
           operator_id, operator_name, scenario_id, scenario_name,
           duration_seconds, evaluated_at, airtable_record_id,
           created_at, updated_at
    FROM call_quality.call_evaluations"#;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed [`EvaluationStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_user_by_open_id(&self, open_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, open_id, name, email, login_method, role,
                   created_at, updated_at, last_signed_in
            FROM call_quality.users
            WHERE open_id = $1
            "#,
        )
        .bind(open_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<User, StoreError> {
            let role: String = row.try_get("role")?;
            Ok(User {
                id: row.try_get("id")?,
                open_id: row.try_get("open_id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                login_method: row.try_get("login_method")?,
                role: Role::from_label(&role)
                    .ok_or_else(|| StoreError::InvalidRow(format!("unknown role {role}")))?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
                last_signed_in: row.try_get("last_signed_in")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl EvaluationStore for PgStore {
    async fn upsert(&self, record: &NewCallEvaluation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO call_quality.call_evaluations
            (call_id, proceso, priority, status,
             adherence_score, sentiment_score, correctness_score, speed_score, average_score,
             feedback, areas_for_improvement, strengths, critical_issues,
             expected_wrap_up, expected_steps, raw_response,
             operator_id, operator_name, scenario_id, scenario_name,
             duration_seconds, evaluated_at, airtable_record_id)
            VALUES ($1, $2, $3, $4,
                    $5::numeric(5,2), $6::numeric(5,2), $7::numeric(5,2), $8::numeric(5,2), $9::numeric(5,2),
                    $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
            ON CONFLICT (call_id) DO UPDATE
            SET proceso = EXCLUDED.proceso,
                priority = EXCLUDED.priority,
                status = EXCLUDED.status,
                adherence_score = EXCLUDED.adherence_score,
                sentiment_score = EXCLUDED.sentiment_score,
                correctness_score = EXCLUDED.correctness_score,
                speed_score = EXCLUDED.speed_score,
                average_score = EXCLUDED.average_score,
                feedback = EXCLUDED.feedback,
                areas_for_improvement = EXCLUDED.areas_for_improvement,
                strengths = EXCLUDED.strengths,
                critical_issues = EXCLUDED.critical_issues,
                expected_wrap_up = EXCLUDED.expected_wrap_up,
                expected_steps = EXCLUDED.expected_steps,
                raw_response = EXCLUDED.raw_response,
                operator_id = EXCLUDED.operator_id,
                operator_name = EXCLUDED.operator_name,
                scenario_id = EXCLUDED.scenario_id,
                scenario_name = EXCLUDED.scenario_name,
                duration_seconds = EXCLUDED.duration_seconds,
                evaluated_at = EXCLUDED.evaluated_at,
                airtable_record_id = EXCLUDED.airtable_record_id,
                updated_at = now()
            "#,
        )
        .bind(&record.call_id)
        .bind(record.proceso.as_str())
        .bind(record.priority.as_str())
        .bind(&record.status)
        .bind(record.adherence_score)
        .bind(record.sentiment_score)
        .bind(record.correctness_score)
        .bind(record.speed_score)
        .bind(record.average_score)
        .bind(&record.feedback)
        .bind(&record.areas_for_improvement)
        .bind(&record.strengths)
        .bind(&record.critical_issues)
        .bind(&record.expected_wrap_up)
        .bind(&record.expected_steps)
        .bind(&record.raw_response)
        .bind(&record.operator_id)
        .bind(&record.operator_name)
        .bind(&record.scenario_id)
        .bind(&record.scenario_name)
        .bind(record.duration_seconds)
        .bind(record.evaluated_at)
        .bind(&record.airtable_record_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &EvaluationFilter) -> Result<Vec<CallEvaluation>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EVALUATIONS);
        filter.push_where(&mut qb);
        filter.push_order_by(&mut qb);
        debug!(sql = qb.sql(), "listing evaluations");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(evaluation_from_row).collect()
    }

    async fn all(&self) -> Result<Vec<CallEvaluation>, StoreError> {
        let query = format!("{SELECT_EVALUATIONS} ORDER BY id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(evaluation_from_row).collect()
    }

    async fn by_id(&self, id: i64) -> Result<Option<CallEvaluation>, StoreError> {
        let query = format!("{SELECT_EVALUATIONS} WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(evaluation_from_row).transpose()
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM call_quality.call_evaluations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn evaluation_from_row(row: &PgRow) -> Result<CallEvaluation, StoreError> {
    let proceso: String = row.try_get("proceso")?;
    let priority: String = row.try_get("priority")?;

    Ok(CallEvaluation {
        id: row.try_get("id")?,
        call_id: row.try_get("call_id")?,
        proceso: Proceso::from_label(&proceso)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown proceso {proceso}")))?,
        priority: Priority::from_label(&priority)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown priority {priority}")))?,
        status: row.try_get("status")?,
        adherence_score: row.try_get("adherence_score")?,
        sentiment_score: row.try_get("sentiment_score")?,
        correctness_score: row.try_get("correctness_score")?,
        speed_score: row.try_get("speed_score")?,
        average_score: row.try_get("average_score")?,
        feedback: row.try_get("feedback")?,
        areas_for_improvement: row.try_get("areas_for_improvement")?,
        strengths: row.try_get("strengths")?,
        critical_issues: row.try_get("critical_issues")?,
        expected_wrap_up: row.try_get("expected_wrap_up")?,
        expected_steps: row.try_get("expected_steps")?,
        raw_response: row.try_get("raw_response")?,
        operator_id: row.try_get("operator_id")?,
        operator_name: row.try_get("operator_name")?,
        scenario_id: row.try_get("scenario_id")?,
        scenario_name: row.try_get("scenario_name")?,
        duration_seconds: row.try_get("duration_seconds")?,
        evaluated_at: row.try_get("evaluated_at")?,
        airtable_record_id: row.try_get("airtable_record_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
