//! Filter and sort requests for the evaluation listing.
//!
//! The same [`EvaluationFilter`] renders to SQL for [`crate::db::PgStore`] and
//! evaluates in memory for [`crate::store::MemoryStore`]; both follow
//! Postgres semantics (case-insensitive `ILIKE` search, nulls sorting as the
//! largest value).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::models::{CallEvaluation, Priority, Proceso};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    OperatorName,
    Proceso,
    Priority,
    AverageScore,
    AdherenceScore,
    SentimentScore,
    CorrectnessScore,
    SpeedScore,
    DurationSeconds,
    EvaluatedAt,
}

impl SortColumn {
    pub const ALL: [SortColumn; 10] = [
        SortColumn::OperatorName,
        SortColumn::Proceso,
        SortColumn::Priority,
        SortColumn::AverageScore,
        SortColumn::AdherenceScore,
        SortColumn::SentimentScore,
        SortColumn::CorrectnessScore,
        SortColumn::SpeedScore,
        SortColumn::DurationSeconds,
        SortColumn::EvaluatedAt,
    ];

    /// Parses the camelCase column name used by clients. Unknown names are
    /// `None`, which sorts by recency.
    pub fn parse(name: &str) -> Option<SortColumn> {
        SortColumn::ALL.into_iter().find(|c| c.api_name() == name)
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            SortColumn::OperatorName => "operatorName",
            SortColumn::Proceso => "proceso",
            SortColumn::Priority => "priority",
            SortColumn::AverageScore => "averageScore",
            SortColumn::AdherenceScore => "adherenceScore",
            SortColumn::SentimentScore => "sentimentScore",
            SortColumn::CorrectnessScore => "correctnessScore",
            SortColumn::SpeedScore => "speedScore",
            SortColumn::DurationSeconds => "durationSeconds",
            SortColumn::EvaluatedAt => "evaluatedAt",
        }
    }

    pub fn sql_column(&self) -> &'static str {
        match self {
            SortColumn::OperatorName => "operator_name",
            SortColumn::Proceso => "proceso",
            SortColumn::Priority => "priority",
            SortColumn::AverageScore => "average_score",
            SortColumn::AdherenceScore => "adherence_score",
            SortColumn::SentimentScore => "sentiment_score",
            SortColumn::CorrectnessScore => "correctness_score",
            SortColumn::SpeedScore => "speed_score",
            SortColumn::DurationSeconds => "duration_seconds",
            SortColumn::EvaluatedAt => "evaluated_at",
        }
    }

    fn compare(&self, a: &CallEvaluation, b: &CallEvaluation) -> Ordering {
        match self {
            SortColumn::OperatorName => nulls_last(&a.operator_name, &b.operator_name, Ord::cmp),
            SortColumn::Proceso => a.proceso.as_str().cmp(b.proceso.as_str()),
            SortColumn::Priority => a.priority.as_str().cmp(b.priority.as_str()),
            SortColumn::AverageScore => nulls_last(&a.average_score, &b.average_score, f64::total_cmp),
            SortColumn::AdherenceScore => {
                nulls_last(&a.adherence_score, &b.adherence_score, f64::total_cmp)
            }
            SortColumn::SentimentScore => {
                nulls_last(&a.sentiment_score, &b.sentiment_score, f64::total_cmp)
            }
            SortColumn::CorrectnessScore => {
                nulls_last(&a.correctness_score, &b.correctness_score, f64::total_cmp)
            }
            SortColumn::SpeedScore => nulls_last(&a.speed_score, &b.speed_score, f64::total_cmp),
            SortColumn::DurationSeconds => {
                nulls_last(&a.duration_seconds, &b.duration_seconds, Ord::cmp)
            }
            SortColumn::EvaluatedAt => nulls_last(&a.evaluated_at, &b.evaluated_at, Ord::cmp),
        }
    }
}

fn nulls_last<T, F>(a: &Option<T>, b: &Option<T>, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` (any case) is ascending; everything else is the descending
    /// default.
    pub fn parse(raw: &str) -> SortOrder {
        if raw.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationFilter {
    pub search: Option<String>,
    pub operator_name: Option<String>,
    pub proceso: Option<Proceso>,
    pub priority: Option<Priority>,
    pub scenario_id: Option<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub sort_by: Option<SortColumn>,
    pub sort_order: SortOrder,
}

impl EvaluationFilter {
    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    pub fn matches(&self, row: &CallEvaluation) -> bool {
        if let Some(term) = self.search_term() {
            let needle = term.to_lowercase();
            let hit = [
                Some(row.call_id.as_str()),
                row.operator_name.as_deref(),
                row.scenario_name.as_deref(),
                row.feedback.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(name) = &self.operator_name {
            if row.operator_name.as_ref() != Some(name) {
                return false;
            }
        }
        if let Some(proceso) = self.proceso {
            if row.proceso != proceso {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if row.priority != priority {
                return false;
            }
        }
        if let Some(scenario) = &self.scenario_id {
            if row.scenario_id.as_ref() != Some(scenario) {
                return false;
            }
        }

        if let Some(min) = self.min_score {
            if !row.average_score.is_some_and(|score| score >= min) {
                return false;
            }
        }
        if let Some(max) = self.max_score {
            if !row.average_score.is_some_and(|score| score <= max) {
                return false;
            }
        }

        if let Some(start) = self.start_date {
            if !row.evaluated_at.is_some_and(|at| at >= start) {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if !row.evaluated_at.is_some_and(|at| at <= end) {
                return false;
            }
        }

        true
    }

    /// Ordering between two rows under this filter's sort settings.
    pub fn compare(&self, a: &CallEvaluation, b: &CallEvaluation) -> Ordering {
        match self.sort_by {
            Some(column) => {
                let ordering = column.compare(a, b);
                match self.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            }
            None => b.created_at.cmp(&a.created_at),
        }
    }

    /// Filters and sorts `rows` in place. The sort is stable, so ties keep
    /// their incoming order.
    pub fn apply(&self, rows: &mut Vec<CallEvaluation>) {
        rows.retain(|row| self.matches(row));
        rows.sort_by(|a, b| self.compare(a, b));
    }

    /// Appends ` WHERE ...` for every supplied condition.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(term) = self.search_term() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (call_id ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR operator_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR scenario_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR feedback ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(name) = &self.operator_name {
            qb.push(" AND operator_name = ");
            qb.push_bind(name.clone());
        }
        if let Some(proceso) = self.proceso {
            qb.push(" AND proceso = ");
            qb.push_bind(proceso.as_str());
        }
        if let Some(priority) = self.priority {
            qb.push(" AND priority = ");
            qb.push_bind(priority.as_str());
        }
        if let Some(scenario) = &self.scenario_id {
            qb.push(" AND scenario_id = ");
            qb.push_bind(scenario.clone());
        }
        if let Some(min) = self.min_score {
            qb.push(" AND average_score >= ");
            qb.push_bind(min);
        }
        if let Some(max) = self.max_score {
            qb.push(" AND average_score <= ");
            qb.push_bind(max);
        }
        if let Some(start) = self.start_date {
            qb.push(" AND evaluated_at >= ");
            qb.push_bind(start);
        }
        if let Some(end) = self.end_date {
            qb.push(" AND evaluated_at <= ");
            qb.push_bind(end);
        }
    }

    pub fn push_order_by(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self.sort_by {
            Some(column) => {
                qb.push(" ORDER BY ");
                qb.push(column.sql_column());
                qb.push(" ");
                qb.push(self.sort_order.sql());
            }
            None => {
                qb.push(" ORDER BY created_at DESC");
            }
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
