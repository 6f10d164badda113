pub mod reader;
pub mod types;
pub mod utils;
pub mod writer;

pub use reader::ExcelReader;
pub use types::{DatedTable, DeseasonalizedTable};
pub use writer::ExcelWriter;
