use super::types::DeseasonalizedTable;
use crate::error::AppError;
use rust_xlsxwriter::{ColNum, Format, FormatBorder, RowNum, Workbook};
use std::path::Path;

/// Writes a [`DeseasonalizedTable`] as a single-sheet workbook: the date index
/// in column A, one column per adjusted series after it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExcelWriter;

impl ExcelWriter {
    pub fn write(&self, table: &DeseasonalizedTable, path: &Path) -> Result<(), AppError> {
        tracing::info!(
            "Writing {} rows x {} columns to {}",
            table.row_count(),
            table.frame.width(),
            path.display()
        );

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);
        let worksheet = workbook.add_worksheet();

        if table.index_name.is_empty() {
            worksheet.write_blank(0, 0, &header_format)?;
        } else {
            worksheet.write_string_with_format(0, 0, table.index_name.as_str(), &header_format)?;
        }

        for (row_idx, date) in table.index.iter().enumerate() {
            worksheet.write_string(row_num(row_idx + 1)?, 0, date.as_str())?;
        }

        for (col_idx, series) in table.frame.get_columns().iter().enumerate() {
            let col = col_num(col_idx + 1)?;
            worksheet.write_string_with_format(0, col, series.name(), &header_format)?;

            for (row_idx, value) in series.f64()?.into_iter().enumerate() {
                // Missing values stay as empty cells.
                if let Some(value) = value {
                    worksheet.write_number(row_num(row_idx + 1)?, col, value)?;
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

fn row_num(idx: usize) -> Result<RowNum, AppError> {
    RowNum::try_from(idx)
        .map_err(|_| AppError::InvalidInput(format!("Row {} exceeds the worksheet limit", idx)))
}

fn col_num(idx: usize) -> Result<ColNum, AppError> {
    ColNum::try_from(idx)
        .map_err(|_| AppError::InvalidInput(format!("Column {} exceeds the worksheet limit", idx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::utils::{cell_to_f64, is_blank};
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use polars::prelude::*;

    #[test]
    fn writes_index_headers_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let frame = DataFrame::new(vec![
            Series::new("A", vec![Some(1.5), None]),
            Series::new("B", vec![Some(3.0), Some(4.0)]),
        ])
        .unwrap();
        let table = DeseasonalizedTable {
            index_name: "Date".to_string(),
            index: vec!["2020-01-01".to_string(), "2020-02-01".to_string()],
            frame,
        };

        ExcelWriter.write(&table, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("Sheet1").unwrap();
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();

        assert_eq!(rows[0][0].to_string(), "Date");
        assert_eq!(rows[0][1].to_string(), "A");
        assert_eq!(rows[0][2].to_string(), "B");
        assert_eq!(rows[1][0].to_string(), "2020-01-01");
        assert_eq!(cell_to_f64(&rows[1][1]), Some(1.5));
        assert!(is_blank(&rows[2][1]));
        assert_eq!(cell_to_f64(&rows[2][2]), Some(4.0));
    }
}
