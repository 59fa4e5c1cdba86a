use std::io::Write;

use serde::Serialize;

use crate::models::CallEvaluation;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    id: i64,
    call_id: &'a str,
    evaluated_at: Option<String>,
    operator_name: Option<&'a str>,
    scenario_id: Option<&'a str>,
    scenario_name: Option<&'a str>,
    proceso: &'static str,
    priority: &'static str,
    status: Option<&'a str>,
    average_score: Option<f64>,
    adherence_score: Option<f64>,
    sentiment_score: Option<f64>,
    correctness_score: Option<f64>,
    speed_score: Option<f64>,
    duration_seconds: Option<i32>,
    feedback: Option<&'a str>,
    strengths: Option<&'a str>,
    areas_for_improvement: Option<&'a str>,
    critical_issues: Option<&'a str>,
}

/// Writes `rows` as CSV with a camelCase header line. Nulls become empty
/// cells.
pub fn write_csv<W: Write>(writer: W, rows: &[CallEvaluation]) -> anyhow::Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(CsvRow {
            id: row.id,
            call_id: &row.call_id,
            evaluated_at: row.evaluated_at.map(|at| at.to_rfc3339()),
            operator_name: row.operator_name.as_deref(),
            scenario_id: row.scenario_id.as_deref(),
            scenario_name: row.scenario_name.as_deref(),
            proceso: row.proceso.as_str(),
            priority: row.priority.as_str(),
            status: row.status.as_deref(),
            average_score: row.average_score,
            adherence_score: row.adherence_score,
            sentiment_score: row.sentiment_score,
            correctness_score: row.correctness_score,
            speed_score: row.speed_score,
            duration_seconds: row.duration_seconds,
            feedback: row.feedback.as_deref(),
            strengths: row.strengths.as_deref(),
            areas_for_improvement: row.areas_for_improvement.as_deref(),
            critical_issues: row.critical_issues.as_deref(),
        })?;
    }
    csv.flush()?;
    Ok(rows.len())
}
