pub mod deseasonalizer;
pub mod excel;
pub mod x13;
