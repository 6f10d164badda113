use chrono::NaiveDateTime;
use polars::prelude::*;
use crate::error::AppError;
use crate::models::TimeSeries;

/// A worksheet loaded with its first column as the date index and every other
/// column as a `Float64` series.
#[derive(Debug, Clone)]
pub struct DatedTable {
    pub index_name: String,
    pub index: Vec<NaiveDateTime>,
    pub frame: DataFrame,
}

impl DatedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Extracts one column as a gap-free series.
    pub fn series(&self, column: &str) -> Result<TimeSeries, AppError> {
        let ca = self.frame.column(column)?.f64()?;

        let values = ca
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.filter(|v| v.is_finite()).ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "Column '{}' has a missing or non-numeric value at data row {}",
                        column,
                        row + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>, AppError>>()?;

        TimeSeries::new(column, self.index.clone(), values)
    }
}

/// Adjusted columns joined on their dates, with the index already rendered as
/// `YYYY-MM-DD` strings.
#[derive(Debug, Clone)]
pub struct DeseasonalizedTable {
    pub index_name: String,
    pub index: Vec<String>,
    pub frame: DataFrame,
}

impl DeseasonalizedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }
}
