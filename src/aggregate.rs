use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::{
    CallEvaluation, OperatorScore, OperatorTrend, PriorityCount, ProcesoCount, SummaryStats,
    TrendPoint, TrendQuery, Trends,
};

pub const TOP_OPERATOR_LIMIT: usize = 5;
pub const UNKNOWN_OPERATOR: &str = "Unknown";

pub fn summarize(rows: &[CallEvaluation]) -> SummaryStats {
    let scored: Vec<f64> = rows.iter().filter_map(|r| r.average_score).collect();
    let overall_average_score = mean(&scored);

    let mut by_proceso: HashMap<_, usize> = HashMap::new();
    let mut by_priority: HashMap<_, usize> = HashMap::new();
    let mut by_operator: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut operators = BTreeSet::new();
    let mut scenarios = BTreeSet::new();

    for row in rows {
        *by_proceso.entry(row.proceso).or_insert(0) += 1;
        *by_priority.entry(row.priority).or_insert(0) += 1;

        if let Some(name) = row.operator_name.as_deref() {
            operators.insert(name.to_string());
            if let Some(score) = row.average_score {
                let entry = by_operator.entry(name).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        if let Some(scenario) = row.scenario_id.as_deref() {
            scenarios.insert(scenario.to_string());
        }
    }

    let mut proceso_distribution: Vec<ProcesoCount> = by_proceso
        .into_iter()
        .map(|(proceso, count)| ProcesoCount { proceso, count })
        .collect();
    proceso_distribution.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.proceso.as_str().cmp(b.proceso.as_str()))
    });

    let mut priority_distribution: Vec<PriorityCount> = by_priority
        .into_iter()
        .map(|(priority, count)| PriorityCount { priority, count })
        .collect();
    priority_distribution.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.priority.cmp(&b.priority))
    });

    let mut top_operators: Vec<OperatorScore> = by_operator
        .into_iter()
        .map(|(name, (total, count))| OperatorScore {
            name: name.to_string(),
            average_score: total / count as f64,
            call_count: count,
        })
        .collect();
    top_operators.sort_by(|a, b| {
        b.average_score
            .total_cmp(&a.average_score)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_operators.truncate(TOP_OPERATOR_LIMIT);

    SummaryStats {
        total_calls: rows.len(),
        overall_average_score,
        proceso_distribution,
        priority_distribution,
        top_operators,
        operators: operators.into_iter().collect(),
        scenarios: scenarios.into_iter().collect(),
    }
}

/// Daily score trends, overall and per operator.
///
/// A row's day is the UTC date of `evaluated_at`, or of `created_at` when the
/// call has no evaluation time. Missing scores count as 0 in the daily means.
pub fn build_trends(rows: &[CallEvaluation], query: &TrendQuery) -> Trends {
    let start = query.start_date.map(start_of_day);
    let end = query.end_date.map(end_of_day);

    let in_window: Vec<(&CallEvaluation, NaiveDate)> = rows
        .iter()
        .filter_map(|row| {
            let at = trend_timestamp(row)?;
            if start.is_some_and(|s| at < s) || end.is_some_and(|e| at > e) {
                return None;
            }
            Some((row, at.date_naive()))
        })
        .collect();

    let overall = daily_points(in_window.iter().copied());

    let mut per_operator: BTreeMap<&str, Vec<(&CallEvaluation, NaiveDate)>> = BTreeMap::new();
    for (row, date) in &in_window {
        let name = row.operator_name.as_deref().unwrap_or(UNKNOWN_OPERATOR);
        per_operator.entry(name).or_default().push((*row, *date));
    }

    let by_operator = per_operator
        .into_iter()
        .map(|(name, entries)| OperatorTrend {
            operator_name: name.to_string(),
            points: daily_points(entries.into_iter()),
        })
        .filter(|series| !series.points.is_empty())
        .filter(|series| {
            query
                .operator_name
                .as_deref()
                .map_or(true, |wanted| series.operator_name == wanted)
        })
        .collect();

    Trends {
        overall,
        by_operator,
    }
}

fn trend_timestamp(row: &CallEvaluation) -> Option<DateTime<Utc>> {
    row.evaluated_at.or(Some(row.created_at))
}

#[derive(Default)]
struct DayTotals {
    average: f64,
    adherence: f64,
    sentiment: f64,
    correctness: f64,
    speed: f64,
    count: usize,
}

fn daily_points<'a, I>(entries: I) -> Vec<TrendPoint>
where
    I: Iterator<Item = (&'a CallEvaluation, NaiveDate)>,
{
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for (row, date) in entries {
        let totals = days.entry(date).or_default();
        totals.average += row.average_score.unwrap_or(0.0);
        totals.adherence += row.adherence_score.unwrap_or(0.0);
        totals.sentiment += row.sentiment_score.unwrap_or(0.0);
        totals.correctness += row.correctness_score.unwrap_or(0.0);
        totals.speed += row.speed_score.unwrap_or(0.0);
        totals.count += 1;
    }

    days.into_iter()
        .map(|(date, t)| {
            let n = t.count as f64;
            TrendPoint {
                date,
                average_score: t.average / n,
                adherence_score: t.adherence / n,
                sentiment_score: t.sentiment / n,
                correctness_score: t.correctness / n,
                speed_score: t.speed / n,
                count: t.count,
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(last))
}
