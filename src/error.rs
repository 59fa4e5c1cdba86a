use thiserror::Error;

use crate::store::StoreError;

/// Upper bound on any message handed back to a caller.
pub const MAX_ERROR_MESSAGE_LEN: usize = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("{0}")]
    Source(String),

    #[error("Airtable returned no records; check that the base and table are configured and not empty")]
    EmptySource,

    #[error("{0}")]
    Storage(String),
}

impl ImportError {
    pub fn source_failure(detail: impl std::fmt::Display) -> Self {
        ImportError::Source(truncate_message(&format!(
            "Airtable request failed, check the API key and its permissions: {detail}"
        )))
    }

    pub fn storage_failure(detail: &StoreError) -> Self {
        ImportError::Storage(truncate_message(&format!(
            "database unreachable or misconfigured: {detail}"
        )))
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("authentication required")]
    Unauthorized,

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("{0}")]
    Storage(String),
}

impl From<StoreError> for DashboardError {
    fn from(err: StoreError) -> Self {
        DashboardError::Storage(truncate_message(&err.to_string()))
    }
}

/// Cuts `message` to [`MAX_ERROR_MESSAGE_LEN`] characters, marking the cut
/// with `...`.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(MAX_ERROR_MESSAGE_LEN - 3).collect();
    cut.push_str("...");
    cut
}
