use tracing::{debug, info, warn};

use crate::airtable::{AirtableRecord, RecordSource};
use crate::error::ImportError;
use crate::mapper::map_record;
use crate::store::EvaluationStore;

/// Pulls every page from `source` and upserts each record into `store`.
///
/// Pages are fetched one at a time, following the continuation offset until
/// the source stops returning one. Upserts run one record at a time in page
/// order with no surrounding transaction, so a storage failure leaves the
/// earlier records committed. Returns the number of records pulled.
pub async fn sync_from_airtable<S, R>(
    source: &R,
    store: &S,
    api_key: &str,
) -> Result<usize, ImportError>
where
    S: EvaluationStore + ?Sized,
    R: RecordSource + ?Sized,
{
    let records = fetch_all(source, api_key).await?;
    if records.is_empty() {
        warn!("Airtable returned no records");
        return Err(ImportError::EmptySource);
    }

    for record in &records {
        let mapped = map_record(record);
        store.upsert(&mapped).await.map_err(|e| {
            warn!(call_id = %mapped.call_id, error = %e, "upsert failed");
            ImportError::storage_failure(&e)
        })?;
    }

    info!(records = records.len(), "imported evaluations from Airtable");
    Ok(records.len())
}

async fn fetch_all<R>(source: &R, api_key: &str) -> Result<Vec<AirtableRecord>, ImportError>
where
    R: RecordSource + ?Sized,
{
    let mut records = Vec::new();
    let mut offset: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source
            .fetch_page(api_key, offset.as_deref())
            .await
            .map_err(|e| {
                warn!(error = %e, "Airtable page request failed");
                ImportError::source_failure(e)
            })?;
        pages += 1;
        debug!(page = pages, records = page.records.len(), "received Airtable page");

        records.extend(page.records);
        match page.offset {
            Some(next) => offset = Some(next),
            None => break,
        }
    }

    Ok(records)
}
