use crate::config::Config;
use crate::error::AppError;
use crate::models::TimeSeries;
use crate::services::excel::utils::format_date;
use crate::services::excel::{DatedTable, DeseasonalizedTable, ExcelReader, ExcelWriter};
use crate::services::x13::SeasonalAdjuster;
use chrono::NaiveDateTime;
use glob::{glob_with, MatchOptions, Pattern};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Inserted between the input file's stem and its extension.
pub const OUTPUT_SUFFIX: &str = "_deseasonalized";

const INPUT_PATTERN: &str = "*.xlsx";

/// Runs every workbook in the input folder through a [`SeasonalAdjuster`],
/// one file and one column at a time, and stops at the first failure.
pub struct Deseasonalizer<A> {
    config: Config,
    adjuster: A,
    reader: ExcelReader,
    writer: ExcelWriter,
}

impl<A: SeasonalAdjuster> Deseasonalizer<A> {
    pub fn new(config: Config, adjuster: A) -> Self {
        Self {
            config,
            adjuster,
            reader: ExcelReader,
            writer: ExcelWriter,
        }
    }

    /// Processes all input workbooks and writes one confirmation line per
    /// output file to `report`. Returns the paths written.
    pub fn run<W: Write>(&self, report: &mut W) -> Result<Vec<PathBuf>, AppError> {
        fs::create_dir_all(&self.config.output_dir)?;

        let inputs = discover_inputs(&self.config.input_dir)?;
        tracing::info!("Found {} Excel file(s) in {}", inputs.len(), self.config.input_dir.display());

        let subfolder = self
            .config
            .output_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut written = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let output = self.process_file(input).map_err(|e| {
                tracing::error!("Failed to deseasonalize {}: {}", input.display(), e);
                e
            })?;

            let file_name = output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            writeln!(
                report,
                "New Excel file '{}' created with deseasonalized columns in the '{}' subfolder.",
                file_name, subfolder
            )?;

            written.push(output);
        }

        Ok(written)
    }

    pub fn process_file(&self, input: &Path) -> Result<PathBuf, AppError> {
        tracing::info!("Processing {}", input.display());

        let table = self.reader.read_dated_table(input)?;
        let deseasonalized = self.deseasonalize(&table)?;
        tracing::debug!(
            "Adjusted columns {:?} over {} dates",
            deseasonalized.column_names(),
            deseasonalized.row_count()
        );

        let output = self.config.output_dir.join(output_file_name(input)?);
        self.writer.write(&deseasonalized, &output)?;

        tracing::info!("Wrote {}", output.display());
        Ok(output)
    }

    pub fn deseasonalize(&self, table: &DatedTable) -> Result<DeseasonalizedTable, AppError> {
        let mut adjusted = Vec::with_capacity(table.frame.width());

        for column in table.column_names() {
            tracing::info!("Adjusting column '{}' ({} observations)", column, table.index.len());
            let series = table.series(&column)?;
            adjusted.push(self.adjuster.adjust(&series, self.config.outlier_detection)?);
        }

        assemble(&table.index_name, adjusted)
    }
}

/// Lists `*.xlsx` files directly inside `input_dir`, sorted by path. A missing
/// folder yields no files.
pub fn discover_inputs(input_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let dir = input_dir.to_str().ok_or_else(|| {
        AppError::InvalidInput(format!("Input folder {} is not valid UTF-8", input_dir.display()))
    })?;
    let pattern = format!("{}/{}", Pattern::escape(dir), INPUT_PATTERN);

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut paths: Vec<PathBuf> = glob_with(&pattern, options)
        .map_err(|e| AppError::InvalidInput(format!("Invalid glob pattern {}: {}", pattern, e)))?
        .filter_map(|p| p.ok())
        .filter(|p| p.is_file())
        .collect();

    paths.sort();
    Ok(paths)
}

/// `sales.xlsx` -> `sales_deseasonalized.xlsx`. Only the final extension moves.
pub fn output_file_name(input: &Path) -> Result<String, AppError> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid input file name: {}", input.display())))?;

    Ok(match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    })
}

/// Outer-joins the adjusted series on their dates, keeping column order.
fn assemble(index_name: &str, adjusted: Vec<TimeSeries>) -> Result<DeseasonalizedTable, AppError> {
    let dates: BTreeSet<NaiveDateTime> = adjusted
        .iter()
        .flat_map(|series| series.dates.iter().copied())
        .collect();

    let columns = adjusted
        .iter()
        .map(|series| {
            let by_date: HashMap<NaiveDateTime, f64> = series
                .dates
                .iter()
                .copied()
                .zip(series.values.iter().copied())
                .collect();
            let values: Vec<Option<f64>> = dates.iter().map(|date| by_date.get(date).copied()).collect();
            Series::new(series.name.as_str(), values)
        })
        .collect::<Vec<Series>>();

    Ok(DeseasonalizedTable {
        index_name: index_name.to_string(),
        index: dates.iter().map(format_date).collect(),
        frame: DataFrame::new(columns)?,
    })
}
