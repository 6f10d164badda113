use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("File processing error: {0}")]
    FileProcessingError(String),

    #[error("DataFrame error: {0}")]
    DataFrameError(String),

    #[error("X-13ARIMA-SEATS binary not found at '{path}': {source}")]
    X13NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("X-13ARIMA-SEATS error: {0}")]
    X13Error(String),

    #[error("Excel write error: {0}")]
    WriteError(#[from] rust_xlsxwriter::XlsxError),
}

impl From<PolarsError> for AppError {
    fn from(err: PolarsError) -> Self {
        AppError::DataFrameError(err.to_string())
    }
}

impl From<calamine::XlsxError> for AppError {
    fn from(err: calamine::XlsxError) -> Self {
        AppError::FileProcessingError(format!("Failed to read Excel file: {}", err))
    }
}
