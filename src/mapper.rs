use chrono::{DateTime, NaiveDate, Utc};

use crate::airtable::{AirtableRecord, FieldValue};
use crate::models::{NewCallEvaluation, Priority, Proceso};

/// Maps one Airtable record onto the insert shape. Never fails: anything
/// missing or malformed degrades to `None` or the enum default.
pub fn map_record(record: &AirtableRecord) -> NewCallEvaluation {
    let fields = &record.fields;

    let call_id = text(&fields.call_id).unwrap_or_else(|| record.id.clone());

    NewCallEvaluation {
        call_id,
        proceso: normalize_proceso(text(&fields.proceso).as_deref()),
        priority: normalize_priority(text(&fields.priority).as_deref()),
        status: text(&fields.status),
        adherence_score: number(&fields.adherence_score),
        sentiment_score: number(&fields.sentiment_score),
        correctness_score: number(&fields.correctness_score),
        speed_score: number(&fields.speed_score),
        average_score: number(&fields.average_score),
        feedback: text(&fields.feedback),
        areas_for_improvement: text(&fields.areas_for_improvement),
        strengths: text(&fields.strengths),
        critical_issues: text(&fields.critical_issues),
        expected_wrap_up: text(&fields.expected_wrap_up),
        expected_steps: text(&fields.expected_steps),
        raw_response: text(&fields.raw_response),
        operator_id: text(&fields.operator_id),
        operator_name: text(&fields.operator_name),
        scenario_id: text(&fields.scenario_id),
        scenario_name: text(&fields.scenario_name),
        duration_seconds: duration(&fields.duration_seconds),
        evaluated_at: text(&fields.evaluated_at).and_then(|raw| parse_timestamp(&raw)),
        airtable_record_id: Some(record.id.clone()),
    }
}

pub fn normalize_proceso(raw: Option<&str>) -> Proceso {
    raw.and_then(|value| Proceso::from_label(&value.trim().to_uppercase()))
        .unwrap_or_default()
}

/// Only the literal `"P1"` is P1; `"p1"`, `" P1"` and everything else is P0.
pub fn normalize_priority(raw: Option<&str>) -> Priority {
    match raw {
        Some("P1") => Priority::P1,
        _ => Priority::P0,
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn text(value: &Option<FieldValue>) -> Option<String> {
    value
        .as_ref()
        .and_then(FieldValue::as_text)
        .filter(|s| !s.trim().is_empty())
}

fn number(value: &Option<FieldValue>) -> Option<f64> {
    value.as_ref().and_then(FieldValue::as_number)
}

fn duration(value: &Option<FieldValue>) -> Option<i32> {
    number(value)
        .map(f64::round)
        .filter(|secs| *secs >= 0.0 && *secs <= i32::MAX as f64)
        .map(|secs| secs as i32)
}
