// src/provider/weights.rs

use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{ArrayRef, AsArray, Float64Array},
    compute::cast,
    datatypes::{DataType, Field, Float64Type},
    record_batch::RecordBatch,
};

use crate::{error::ProviderError, table::append_column};

/// Table holding per-household sampling weights for one year.
pub const WEIGHT_TABLE: &str = "weights";
/// Household identifier shared by the weights table and household tables.
pub const ID_COLUMN: &str = "ID";
/// Column appended by [`attach_weights`].
pub const WEIGHT_COLUMN: &str = "Weight";

fn column_as(
    batch: &RecordBatch,
    name: &str,
    ty: &DataType,
) -> Result<ArrayRef, ProviderError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| ProviderError::MissingColumn(name.to_string()))?;
    Ok(cast(col, ty)?)
}

/// Left-join `weights` onto `table` by household `ID`.
///
/// IDs are compared as strings so an integer ID on one side still matches a
/// text ID on the other. Households without a weight get a null.
pub fn attach_weights(
    table: &RecordBatch,
    weights: &RecordBatch,
) -> Result<RecordBatch, ProviderError> {
    let ids = column_as(table, ID_COLUMN, &DataType::Utf8)?;
    let ids = ids.as_string::<i32>();
    let weight_ids = column_as(weights, ID_COLUMN, &DataType::Utf8)?;
    let weight_ids = weight_ids.as_string::<i32>();
    let values = column_as(weights, WEIGHT_COLUMN, &DataType::Float64)?;
    let values = values.as_primitive::<Float64Type>();

    let lookup: HashMap<&str, f64> = weight_ids
        .iter()
        .zip(values.iter())
        .filter_map(|(id, w)| Some((id?, w?)))
        .collect();

    let joined: Float64Array = ids
        .iter()
        .map(|id| id.and_then(|id| lookup.get(id).copied()))
        .collect();

    Ok(append_column(
        table,
        Field::new(WEIGHT_COLUMN, DataType::Float64, true),
        Arc::new(joined) as ArrayRef,
    )?)
}
