use std::fmt;

/// Which survey a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Household expenditure and income survey; one file per table per year.
    Expenditure { table: String },
    /// Labor force survey; a single table per year.
    LaborForce,
}

/// Fixed table name the labor force provider serves.
pub const LABOR_FORCE_TABLE: &str = "data";

/// Table that carries sampling weights in the expenditure survey.
pub const HOUSEHOLD_INFORMATION: &str = "household_information";

/// One unit of batch work: a single table for a single Persian-calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRequest {
    pub kind: DatasetKind,
    pub year: i32,
    pub add_weights: bool,
    /// Passed through untouched to the parquet writer; `None` means uncompressed.
    pub compression: Option<String>,
}

impl DatasetRequest {
    pub fn expenditure(
        table: impl Into<String>,
        year: i32,
        add_weights: bool,
        compression: Option<String>,
    ) -> Self {
        Self {
            kind: DatasetKind::Expenditure {
                table: table.into(),
            },
            year,
            add_weights,
            compression,
        }
    }

    pub fn labor_force(year: i32, compression: Option<String>) -> Self {
        Self {
            kind: DatasetKind::LaborForce,
            year,
            add_weights: false,
            compression,
        }
    }

    /// Table name handed to the provider.
    pub fn table(&self) -> &str {
        match &self.kind {
            DatasetKind::Expenditure { table } => table,
            DatasetKind::LaborForce => LABOR_FORCE_TABLE,
        }
    }

    /// Weights only exist for the household information table.
    pub fn wants_weights(&self) -> bool {
        self.add_weights
            && matches!(&self.kind, DatasetKind::Expenditure { table } if table == HOUSEHOLD_INFORMATION)
    }
}

impl fmt::Display for DatasetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DatasetKind::Expenditure { table } => write!(f, "{} {}", table, self.year),
            DatasetKind::LaborForce => write!(f, "lfs {}", self.year),
        }
    }
}

/// Inclusive year range, as written in the config.
pub fn year_range(start: i32, end: i32) -> Vec<i32> {
    (start..=end).collect()
}

/// Tables outer, years inner.
pub fn plan_expenditure(
    tables: &[String],
    years: &[i32],
    add_weights: bool,
    compression: Option<&str>,
) -> Vec<DatasetRequest> {
    tables
        .iter()
        .flat_map(|table| {
            years.iter().map(move |&year| {
                DatasetRequest::expenditure(
                    table.clone(),
                    year,
                    add_weights,
                    compression.map(str::to_string),
                )
            })
        })
        .collect()
}

pub fn plan_labor_force(years: &[i32], compression: Option<&str>) -> Vec<DatasetRequest> {
    years
        .iter()
        .map(|&year| DatasetRequest::labor_force(year, compression.map(str::to_string)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expenditure_plan_iterates_tables_then_years() {
        let tables = vec!["food".to_string(), "tobacco".to_string()];
        let plan = plan_expenditure(&tables, &year_range(1400, 1402), true, Some("snappy"));

        let order: Vec<String> = plan.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "food 1400",
                "food 1401",
                "food 1402",
                "tobacco 1400",
                "tobacco 1401",
                "tobacco 1402"
            ]
        );
        assert!(plan
            .iter()
            .all(|r| r.compression.as_deref() == Some("snappy")));
    }

    #[test]
    fn labor_force_plan_has_no_table_dimension() {
        let plan = plan_labor_force(&year_range(1398, 1399), None);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|r| r.table() == LABOR_FORCE_TABLE));
        assert!(plan.iter().all(|r| !r.wants_weights()));
    }

    #[test]
    fn weights_only_apply_to_household_information() {
        let hh = DatasetRequest::expenditure(HOUSEHOLD_INFORMATION, 1400, true, None);
        let food = DatasetRequest::expenditure("food", 1400, true, None);
        let hh_off = DatasetRequest::expenditure(HOUSEHOLD_INFORMATION, 1400, false, None);
        assert!(hh.wants_weights());
        assert!(!food.wants_weights());
        assert!(!hh_off.wants_weights());
    }

    #[test]
    fn empty_when_start_after_end() {
        assert!(year_range(1403, 1400).is_empty());
    }
}
