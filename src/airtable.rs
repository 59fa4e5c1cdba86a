//! Airtable list-records client.
//!
//! The importer only depends on [`RecordSource`]; [`AirtableClient`] is the
//! production implementation that talks to `GET /v0/{base}/{table}`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::AirtableSettings;

/// One page of the list-records response. `offset` is present while more
/// pages remain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<AirtableRecord>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default, rename = "createdTime")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: AirtableFields,
}

/// Loosely typed cell value. Airtable returns numbers, strings, booleans and
/// lookup arrays depending on the column type; none of them fail to decode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Other(Value),
}

impl FieldValue {
    /// Text rendering of the cell. Lookup arrays yield their first scalar.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Other(Value::Array(items)) => items.iter().find_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => n.as_f64().map(format_number),
                _ => None,
            }),
            FieldValue::Other(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Other(Value::Array(items)) => items.iter().find_map(|item| match item {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Columns read from the evaluations table. Unknown columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AirtableFields {
    pub call_id: Option<FieldValue>,
    pub proceso: Option<FieldValue>,
    pub priority: Option<FieldValue>,
    pub status: Option<FieldValue>,
    pub adherence_score: Option<FieldValue>,
    pub sentiment_score: Option<FieldValue>,
    pub correctness_score: Option<FieldValue>,
    pub speed_score: Option<FieldValue>,
    pub average_score: Option<FieldValue>,
    pub feedback: Option<FieldValue>,
    pub areas_for_improvement: Option<FieldValue>,
    pub strengths: Option<FieldValue>,
    pub critical_issues: Option<FieldValue>,
    pub expected_wrap_up: Option<FieldValue>,
    pub expected_steps: Option<FieldValue>,
    pub raw_response: Option<FieldValue>,
    pub operator_id: Option<FieldValue>,
    pub operator_name: Option<FieldValue>,
    pub scenario_id: Option<FieldValue>,
    pub scenario_name: Option<FieldValue>,
    pub duration_seconds: Option<FieldValue>,
    pub evaluated_at: Option<FieldValue>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Airtable returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to Airtable failed: {0}")]
    Transport(String),

    #[error("could not decode Airtable response: {0}")]
    Decode(String),

    #[error("invalid Airtable configuration: {0}")]
    Config(String),
}

/// A paginated source of evaluation records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_page(
        &self,
        api_key: &str,
        offset: Option<&str>,
    ) -> Result<RecordPage, SourceError>;
}

pub struct AirtableClient {
    http: Client,
    endpoint: Url,
}

impl AirtableClient {
    pub fn new(settings: &AirtableSettings) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {e}")))?;
        let endpoint = table_endpoint(settings)?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `{api_url}/{base_id}/{table_name}` with each segment percent-encoded.
pub fn table_endpoint(settings: &AirtableSettings) -> Result<Url, SourceError> {
    let mut url = Url::parse(&settings.api_url)
        .map_err(|e| SourceError::Config(format!("bad API URL {}: {e}", settings.api_url)))?;
    url.path_segments_mut()
        .map_err(|_| SourceError::Config(format!("API URL {} cannot be a base", settings.api_url)))?
        .pop_if_empty()
        .push(&settings.base_id)
        .push(&settings.table_name);
    Ok(url)
}

#[async_trait]
impl RecordSource for AirtableClient {
    async fn fetch_page(
        &self,
        api_key: &str,
        offset: Option<&str>,
    ) -> Result<RecordPage, SourceError> {
        let mut request = self.http.get(self.endpoint.clone()).bearer_auth(api_key);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        debug!(url = %self.endpoint, offset = ?offset, "fetching Airtable page");

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<RecordPage>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(api_url: &str, table: &str) -> AirtableSettings {
        AirtableSettings {
            api_url: api_url.to_string(),
            base_id: "appXYZ".to_string(),
            table_name: table.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoint_encodes_table_name() {
        let url = table_endpoint(&settings("https://api.airtable.com/v0", "Call Evaluations"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.airtable.com/v0/appXYZ/Call%20Evaluations"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let url = table_endpoint(&settings("https://api.airtable.com/v0/", "Evaluations")).unwrap();
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/appXYZ/Evaluations");
    }

    #[test]
    fn endpoint_rejects_garbage_url() {
        assert!(matches!(
            table_endpoint(&settings("not a url", "Evaluations")),
            Err(SourceError::Config(_))
        ));
    }

    #[test]
    fn decodes_mixed_field_types() {
        let body = r#"{
            "records": [
                {
                    "id": "rec1",
                    "createdTime": "2024-03-01T10:00:00.000Z",
                    "fields": {
                        "call_id": "CALL-1",
                        "average_score": 71.5,
                        "speed_score": "64",
                        "operator_name": ["Lucia"],
                        "status": true,
                        "some_other_column": {"nested": 1}
                    }
                }
            ],
            "offset": "itrNext/rec1"
        }"#;
        let page: RecordPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.offset.as_deref(), Some("itrNext/rec1"));
        let fields = &page.records[0].fields;
        assert_eq!(fields.average_score, Some(FieldValue::Number(71.5)));
        assert_eq!(fields.speed_score.as_ref().and_then(FieldValue::as_number), Some(64.0));
        assert_eq!(
            fields.operator_name.as_ref().and_then(FieldValue::as_text).as_deref(),
            Some("Lucia")
        );
        assert_eq!(
            fields.status.as_ref().and_then(FieldValue::as_text).as_deref(),
            Some("true")
        );
    }

    #[test]
    fn last_page_has_no_offset() {
        let page: RecordPage = serde_json::from_str(r#"{"records": []}"#).unwrap();
        assert!(page.offset.is_none());
        assert!(page.records.is_empty());
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(FieldValue::Number(42.0).as_text().as_deref(), Some("42"));
        assert_eq!(FieldValue::Number(4.25).as_text().as_deref(), Some("4.25"));
        assert_eq!(FieldValue::Text("abc".into()).as_number(), None);
    }
}
