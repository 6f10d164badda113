//! Driver for the X-13ARIMA-SEATS binary.
//!
//! Each call writes a spec file into a scratch directory, runs the binary on it
//! and reads back the X-11 `d11` table (the final seasonally adjusted series).

use crate::error::AppError;
use crate::models::{Frequency, Period, TimeSeries};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// X-13 rejects series titles longer than this.
const MAX_TITLE_LEN: usize = 79;

static D11_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4})(\d{2})\s+(\S+)\s*$").expect("valid d11 row pattern")
});

/// Produces the seasonally adjusted version of a series.
pub trait SeasonalAdjuster {
    fn adjust(&self, series: &TimeSeries, outlier_detection: bool) -> Result<TimeSeries, AppError>;
}

#[derive(Debug, Clone)]
pub struct X13Adjuster {
    binary: PathBuf,
}

impl X13Adjuster {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, spec_base: &Path, out_base: &Path) -> Result<String, AppError> {
        tracing::debug!("Running {} {}", self.binary.display(), spec_base.display());

        let output = Command::new(&self.binary)
            .arg(spec_base)
            .arg(out_base)
            .output()
            .map_err(|e| {
                tracing::error!("Failed to start {}: {}", self.binary.display(), e);
                if e.kind() == ErrorKind::NotFound {
                    AppError::X13NotFound { path: self.binary.display().to_string(), source: e }
                } else {
                    AppError::IoError(e)
                }
            })?;

        if let Ok(contents) = fs::read_to_string(out_base.with_extension("err")) {
            for warning in check_errors(&contents)? {
                tracing::warn!("X-13 warning: {}", warning);
            }
        }

        fs::read_to_string(out_base.with_extension("d11")).map_err(|e| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            tracing::error!("X-13 produced no d11 table ({}): {}", output.status, stdout.trim());
            AppError::X13Error(format!(
                "no seasonally adjusted table was produced ({}, {})",
                output.status, e
            ))
        })
    }
}

impl SeasonalAdjuster for X13Adjuster {
    fn adjust(&self, series: &TimeSeries, outlier_detection: bool) -> Result<TimeSeries, AppError> {
        if series.is_empty() {
            return Err(AppError::InvalidInput(format!("Series '{}' is empty", series.name)));
        }

        let frequency = Frequency::infer(&series.dates)?;
        tracing::debug!("'{}': {} observations, {:?}", series.name, series.len(), frequency);
        let spec = render_spec(series, frequency, outlier_detection)?;

        let workdir = tempfile::Builder::new().prefix("x13-").tempdir()?;
        let spec_base = workdir.path().join("series");
        let out_base = workdir.path().join("series_out");
        fs::write(spec_base.with_extension("spc"), spec)?;

        let d11 = self.run(&spec_base, &out_base)?;
        let adjusted = parse_d11(&d11)?;

        tracing::debug!("X-13 returned {} adjusted values for '{}'", adjusted.len(), series.name);
        align(series, frequency, adjusted)
    }
}

/// Renders the X-13 spec: automatic transform and ARIMA model selection, an
/// optional outlier pass, and X-11 output tables saved to disk.
pub fn render_spec(series: &TimeSeries, frequency: Frequency, outlier_detection: bool) -> Result<String, AppError> {
    let first = series
        .dates
        .first()
        .ok_or_else(|| AppError::InvalidInput(format!("Series '{}' is empty", series.name)))?;
    let start = frequency.period_of(first);

    let title: String = series.name.replace('"', "'").chars().take(MAX_TITLE_LEN).collect();

    let data: String = series.values.iter().map(|value| format!("    {}\n", value)).collect();

    let mut spec = format!(
        "series{{\n  title=\"{}\"\n  start={}.{:02}\n  period={}\n  data=(\n{}  )\n}}\n",
        title,
        start.year,
        start.period,
        frequency.periods_per_year(),
        data
    );
    spec.push_str("transform{function=auto}\n");
    if outlier_detection {
        spec.push_str("outlier{}\n");
    }
    spec.push_str("automdl{maxorder=(2 1) maxdiff=(2 1)}\n");
    spec.push_str("x11{save=(d10 d11 d12 d13)}\n");

    Ok(spec)
}

/// Fails on any `ERROR` in the `.err` file; returns the warnings otherwise.
pub fn check_errors(contents: &str) -> Result<Vec<String>, AppError> {
    if let Some(pos) = contents.find("ERROR") {
        return Err(AppError::X13Error(collapse_whitespace(&contents[pos..])));
    }

    Ok(contents
        .split("WARNING:")
        .skip(1)
        .map(collapse_whitespace)
        .filter(|w| !w.is_empty())
        .collect())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a saved X-13 table: header lines followed by `YYYYPP value` rows.
pub fn parse_d11(contents: &str) -> Result<Vec<(Period, f64)>, AppError> {
    let rows = contents
        .lines()
        .filter_map(|line| D11_ROW.captures(line))
        .map(|caps| {
            let year = caps[1].parse::<i32>();
            let period = caps[2].parse::<u32>();
            let value = caps[3].parse::<f64>();
            match (year, period, value) {
                (Ok(year), Ok(period), Ok(value)) => Ok((Period { year, period }, value)),
                _ => Err(AppError::ParseError(format!("Malformed d11 row: '{}'", caps[0].trim()))),
            }
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    if rows.is_empty() {
        return Err(AppError::X13Error("d11 table contains no observations".to_string()));
    }
    Ok(rows)
}

/// Puts adjusted values back on the input's own dates. Periods the input does
/// not cover fall on the first day of the period.
fn align(series: &TimeSeries, frequency: Frequency, adjusted: Vec<(Period, f64)>) -> Result<TimeSeries, AppError> {
    let by_period: HashMap<Period, _> = series
        .dates
        .iter()
        .map(|date| (frequency.period_of(date), *date))
        .collect();

    let mut dates = Vec::with_capacity(adjusted.len());
    let mut values = Vec::with_capacity(adjusted.len());
    for (period, value) in adjusted {
        let date = by_period
            .get(&period)
            .copied()
            .or_else(|| frequency.first_day(period))
            .ok_or_else(|| {
                AppError::X13Error(format!("Invalid period {}.{} in d11 table", period.year, period.period))
            })?;
        dates.push(date);
        values.push(value);
    }

    TimeSeries::new(series.name.clone(), dates, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn series(values: &[f64]) -> TimeSeries {
        let dates = (0..values.len() as u32).map(|m| date(2020, m + 1, 15)).collect();
        TimeSeries::new("Sales \"EU\"", dates, values.to_vec()).unwrap()
    }

    #[test]
    fn renders_monthly_spec_with_outliers() {
        let spec = render_spec(&series(&[1.5, 2.0, 3.25]), Frequency::Monthly, true).unwrap();

        assert!(spec.contains("title=\"Sales 'EU'\""));
        assert!(spec.contains("start=2020.01"));
        assert!(spec.contains("period=12"));
        assert!(spec.starts_with(
            "series{\n  title=\"Sales 'EU'\"\n  start=2020.01\n  period=12\n  data=(\n    1.5\n    2\n    3.25\n  )\n}\n"
        ));
        assert!(spec.contains("}\ntransform{function=auto}\noutlier{}\nautomdl{maxorder=(2 1) maxdiff=(2 1)}\n"));
        assert!(spec.contains("outlier{}"));
        assert!(spec.contains("x11{save=(d10 d11 d12 d13)}"));
    }

    #[test]
    fn omits_outlier_block_when_disabled() {
        let spec = render_spec(&series(&[1.0, 2.0]), Frequency::Monthly, false).unwrap();
        assert!(!spec.contains("outlier"));
    }

    #[test]
    fn parses_d11_rows_and_skips_headers() {
        let contents = "date\tseries_out.d11\n------\t-----------------------\n\
                        202001\t+0.10050000000000E+03\n202002\t-0.25000000000000E+01\n";
        let rows = parse_d11(contents).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (Period { year: 2020, period: 1 }, 100.5));
        assert_eq!(rows[1], (Period { year: 2020, period: 2 }, -2.5));
        assert!(matches!(parse_d11("date\tx\n------\t---\n"), Err(AppError::X13Error(_))));
    }

    #[test]
    fn errors_fail_and_warnings_pass_through() {
        let warnings = check_errors(
            "  WARNING: At least one visually significant\n  trading day peak.\n WARNING: second\n",
        )
        .unwrap();
        assert_eq!(warnings, vec!["At least one visually significant trading day peak.", "second"]);

        let err = check_errors(" ERROR: Series must have at least 3 complete years\n   of data.\n").unwrap_err();
        assert!(err.to_string().contains("at least 3 complete years of data"), "{}", err);
    }

    #[test]
    fn aligns_adjusted_periods_to_input_dates() {
        let input = series(&[1.0, 2.0]);
        let adjusted = vec![
            (Period { year: 2020, period: 1 }, 10.0),
            (Period { year: 2020, period: 2 }, 20.0),
            (Period { year: 2020, period: 3 }, 30.0),
        ];

        let out = align(&input, Frequency::Monthly, adjusted).unwrap();
        assert_eq!(out.dates, vec![date(2020, 1, 15), date(2020, 2, 15), date(2020, 3, 1)]);
        assert_eq!(out.values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn missing_binary_is_reported() {
        let adjuster = X13Adjuster::new("/nonexistent/x13as");
        let err = adjuster.adjust(&series(&[1.0, 2.0, 3.0]), true).unwrap_err();
        assert!(matches!(err, AppError::X13NotFound { .. }), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn runs_binary_and_reads_adjusted_table() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-x13");
        fs::write(
            &script,
            "#!/bin/sh\n\
             test -f \"$1.spc\" || exit 2\n\
             printf 'date\\tx.d11\\n------\\t-----\\n202001\\t+0.1E+03\\n202002\\t+0.2E+03\\n' > \"$2.d11\"\n\
             printf ' WARNING: fake engine\\n' > \"$2.err\"\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let out = X13Adjuster::new(&script).adjust(&series(&[1.0, 2.0]), true).unwrap();
        assert_eq!(out.name, "Sales \"EU\"");
        assert_eq!(out.dates, vec![date(2020, 1, 15), date(2020, 2, 15)]);
        assert_eq!(out.values, vec![100.0, 200.0]);
    }

    #[cfg(unix)]
    #[test]
    fn engine_errors_abort_the_adjustment() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("failing-x13");
        fs::write(
            &script,
            "#!/bin/sh\nprintf ' ERROR: Series is too short\\n' > \"$2.err\"\nexit 1\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let err = X13Adjuster::new(&script).adjust(&series(&[1.0, 2.0]), true).unwrap_err();
        assert!(matches!(err, AppError::X13Error(ref msg) if msg.contains("too short")), "{}", err);
    }
}
