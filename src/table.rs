use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Int64Array},
    datatypes::{DataType, Field, FieldRef, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};

/// Name of the survey year column every written table carries.
pub const YEAR_COLUMN: &str = "Year";

/// Return a copy of `batch` with `column` added under `field`, replacing any
/// existing column of the same name in place.
pub fn append_column(
    batch: &RecordBatch,
    field: Field,
    column: ArrayRef,
) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();

    match schema.index_of(field.name()) {
        Ok(i) => {
            fields[i] = Arc::new(field);
            columns[i] = column;
        }
        Err(_) => {
            fields.push(Arc::new(field));
            columns.push(column);
        }
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    RecordBatch::try_new(Arc::new(schema), columns)
}

pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema().column_with_name(name).is_some()
}

/// Append a `Year` column holding `year` in every row, unless one exists.
pub fn ensure_year_column(batch: RecordBatch, year: i32) -> Result<RecordBatch, ArrowError> {
    if has_column(&batch, YEAR_COLUMN) {
        return Ok(batch);
    }
    let years = Int64Array::from_value(i64::from(year), batch.num_rows());
    append_column(
        &batch,
        Field::new(YEAR_COLUMN, DataType::Int64, false),
        Arc::new(years),
    )
}
