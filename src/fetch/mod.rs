// src/fetch/mod.rs

use arrow::record_batch::RecordBatch;
use tracing::{info, instrument, warn};

use crate::{
    error::{FetchError, ProviderError, WeightAugmentationError},
    provider::{OnMissing, SurveyProvider},
    request::DatasetRequest,
    table::ensure_year_column,
};

/// Load one table for one year from `provider`, ready to be written.
///
/// - downloads through the provider when the table is not cached
/// - adds sampling weights to `household_information` when requested; a
///   failure there is logged and the unweighted table is kept
/// - appends a `Year` column if the provider did not supply one
#[instrument(level = "info", skip(provider, request), fields(table = %request.table(), year = request.year))]
pub fn fetch_table<P>(provider: &P, request: &DatasetRequest) -> Result<RecordBatch, FetchError>
where
    P: SurveyProvider + ?Sized,
{
    let table = request.table();
    let year = request.year;
    let fetch_err = |source: ProviderError| FetchError {
        table: table.to_string(),
        year,
        source,
    };

    let mut batch = provider
        .load_table(table, year, OnMissing::Download)
        .map_err(fetch_err)?;

    if request.wants_weights() {
        match provider.add_weight(&batch, year) {
            Ok(weighted) => {
                info!("added sampling weights");
                batch = weighted;
            }
            Err(source) => {
                let err = WeightAugmentationError {
                    table: table.to_string(),
                    year,
                    source,
                };
                warn!(error = %err, "could not add weights, keeping unweighted table");
            }
        }
    }

    let batch = ensure_year_column(batch, year).map_err(|e| fetch_err(e.into()))?;
    info!(rows = batch.num_rows(), "loaded records");
    Ok(batch)
}
