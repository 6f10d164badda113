use super::types::DatedTable;
use super::utils::*;
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::path::Path;
use crate::error::AppError;
use polars::prelude::*;

/// Loads the first worksheet of a workbook as a [`DatedTable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ExcelReader;

impl ExcelReader {
    pub fn read_dated_table(&self, path: &Path) -> Result<DatedTable, AppError> {
        tracing::info!("Reading Excel file {}", path.display());

        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
            tracing::error!("Failed to open Excel file {}: {}", path.display(), e);
            AppError::FileProcessingError(format!("Failed to open Excel file {}: {}", path.display(), e))
        })?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::FileProcessingError("No sheets found in workbook".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
        tracing::debug!("Sheet {} has {} rows including the header", sheet_name, rows.len());

        self.create_table(&rows)
    }

    fn create_table(&self, rows: &[Vec<Data>]) -> Result<DatedTable, AppError> {
        let header = rows
            .first()
            .ok_or_else(|| AppError::InvalidInput("Worksheet is empty".to_string()))?;

        if header.len() < 2 {
            return Err(AppError::InvalidInput(
                "Worksheet needs a date column and at least one data column".to_string(),
            ));
        }

        let mut existing_names = HashSet::new();
        let headers: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(idx, cell)| unique_column_name(cell, idx, &mut existing_names))
            .collect();

        // Blank cells in the index header are common, so keep it as written.
        let index_name = match &header[0] {
            cell if is_blank(cell) => String::new(),
            cell => cell.to_string(),
        };

        let data_rows: Vec<&Vec<Data>> = rows
            .iter()
            .skip(1)
            .filter(|row| !row.iter().all(is_blank))
            .collect();

        let index = self.parse_index(&data_rows)?;

        let columns = headers
            .iter()
            .enumerate()
            .skip(1)
            .map(|(col_idx, name)| {
                let values: Vec<Option<f64>> = data_rows
                    .iter()
                    .map(|row| row.get(col_idx).and_then(cell_to_f64))
                    .collect();
                Series::new(name.as_str(), values)
            })
            .collect::<Vec<Series>>();

        let frame = DataFrame::new(columns)
            .map_err(|e| AppError::DataFrameError(format!("Failed to create DataFrame: {}", e)))?;

        tracing::info!(
            "Loaded {} rows x {} series (index '{}')",
            frame.height(),
            frame.width(),
            index_name
        );

        Ok(DatedTable { index_name, index, frame })
    }

    fn parse_index(&self, data_rows: &[&Vec<Data>]) -> Result<Vec<NaiveDateTime>, AppError> {
        let mut seen = HashSet::with_capacity(data_rows.len());

        data_rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let date = row.first().and_then(cell_to_datetime).ok_or_else(|| {
                    AppError::ParseError(format!(
                        "Data row {}: cannot parse '{}' as a date",
                        row_idx + 1,
                        row.first().map(|cell| cell.to_string()).unwrap_or_default()
                    ))
                })?;

                if !seen.insert(date) {
                    return Err(AppError::InvalidInput(format!(
                        "Duplicate date {} in index",
                        format_date(&date)
                    )));
                }
                Ok(date)
            })
            .collect()
    }
}
