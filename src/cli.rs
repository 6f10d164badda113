use clap::Parser;
use std::path::PathBuf;

/// Deseasonalize every `.xlsx` workbook in `<ROOT>/input` with X-13ARIMA-SEATS
/// and write the results to `<ROOT>/output`.
#[derive(Debug, Parser)]
#[command(name = "sheet-deseasonalizer", version, about)]
pub struct CliArgs {
    /// Root folder holding the `input` subfolder
    pub root: PathBuf,
}
