use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Business process a call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Proceso {
    #[serde(rename = "COBROS")]
    Cobros,
    #[serde(rename = "ATENCION")]
    Atencion,
    #[serde(rename = "RECLAMACIONES")]
    Reclamaciones,
    #[serde(rename = "GESTION SINGULAR")]
    GestionSingular,
    #[serde(rename = "FACTURACION")]
    Facturacion,
    #[serde(rename = "CONTRATACION")]
    Contratacion,
    #[default]
    #[serde(rename = "DESCONOCIDO")]
    Desconocido,
}

impl Proceso {
    pub const ALL: [Proceso; 7] = [
        Proceso::Cobros,
        Proceso::Atencion,
        Proceso::Reclamaciones,
        Proceso::GestionSingular,
        Proceso::Facturacion,
        Proceso::Contratacion,
        Proceso::Desconocido,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Proceso::Cobros => "COBROS",
            Proceso::Atencion => "ATENCION",
            Proceso::Reclamaciones => "RECLAMACIONES",
            Proceso::GestionSingular => "GESTION SINGULAR",
            Proceso::Facturacion => "FACTURACION",
            Proceso::Contratacion => "CONTRATACION",
            Proceso::Desconocido => "DESCONOCIDO",
        }
    }

    /// Exact lookup by stored label. Anything else is `None`.
    pub fn from_label(label: &str) -> Option<Proceso> {
        Proceso::ALL.into_iter().find(|p| p.as_str() == label)
    }
}

impl fmt::Display for Proceso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    P0,
    P1,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
        }
    }

    pub fn from_label(label: &str) -> Option<Priority> {
        match label {
            "P0" => Some(Priority::P0),
            "P1" => Some(Priority::P1),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored, evaluated call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvaluation {
    pub id: i64,
    pub call_id: String,
    pub proceso: Proceso,
    pub priority: Priority,
    pub status: Option<String>,
    pub adherence_score: Option<f64>,
    pub sentiment_score: Option<f64>,
    pub correctness_score: Option<f64>,
    pub speed_score: Option<f64>,
    pub average_score: Option<f64>,
    pub feedback: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub strengths: Option<String>,
    pub critical_issues: Option<String>,
    pub expected_wrap_up: Option<String>,
    pub expected_steps: Option<String>,
    pub raw_response: Option<String>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub scenario_id: Option<String>,
    pub scenario_name: Option<String>,
    pub duration_seconds: Option<i32>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub airtable_record_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape produced by the record mapper. Storage fills in `id` and the
/// timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewCallEvaluation {
    pub call_id: String,
    pub proceso: Proceso,
    pub priority: Priority,
    pub status: Option<String>,
    pub adherence_score: Option<f64>,
    pub sentiment_score: Option<f64>,
    pub correctness_score: Option<f64>,
    pub speed_score: Option<f64>,
    pub average_score: Option<f64>,
    pub feedback: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub strengths: Option<String>,
    pub critical_issues: Option<String>,
    pub expected_wrap_up: Option<String>,
    pub expected_steps: Option<String>,
    pub raw_response: Option<String>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub scenario_id: Option<String>,
    pub scenario_name: Option<String>,
    pub duration_seconds: Option<i32>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub airtable_record_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcesoCount {
    pub proceso: Proceso,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorScore {
    pub name: String,
    pub average_score: f64,
    pub call_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_calls: usize,
    pub overall_average_score: f64,
    pub proceso_distribution: Vec<ProcesoCount>,
    pub priority_distribution: Vec<PriorityCount>,
    pub top_operators: Vec<OperatorScore>,
    pub operators: Vec<String>,
    pub scenarios: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub average_score: f64,
    pub adherence_score: f64,
    pub sentiment_score: f64,
    pub correctness_score: f64,
    pub speed_score: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorTrend {
    pub operator_name: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub overall: Vec<TrendPoint>,
    pub by_operator: Vec<OperatorTrend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendQuery {
    pub operator_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub records_imported: usize,
}
