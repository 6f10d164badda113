use std::collections::HashSet;
use calamine::Data;
use chrono::{NaiveDate, NaiveDateTime};

/// Date format written to the output index column.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

// Slashed dates are month-first; day-first only matches when the first field exceeds 12.
const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

/// Turns a header cell into a column name, keeping names unique the way
/// spreadsheet tools do (`Sales`, `Sales.1`, `Sales.2`).
pub fn unique_column_name(cell: &Data, position: usize, existing_names: &mut HashSet<String>) -> String {
    let base_name = match cell {
        Data::Empty => format!("Unnamed: {}", position),
        Data::String(s) if s.trim().is_empty() => format!("Unnamed: {}", position),
        other => other.to_string().trim().to_string(),
    };

    let mut name = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(name.clone()) {
        name = format!("{}.{}", base_name, counter);
        counter += 1;
    }

    name
}

pub fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    for format in DATETIME_FORMATS.iter() {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
            return Some(parsed);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn cell_to_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        // Durations are not dates; as_datetime honours the 1904 date system.
        Data::DateTime(d) if d.is_datetime() => d.as_datetime(),
        Data::DateTimeIso(s) | Data::String(s) => parse_date_string(s),
        _ => None,
    }
}

pub fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}
