use chrono::{Datelike, NaiveDate, NaiveDateTime};
use crate::error::AppError;

/// A single named series, one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub dates: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, AppError> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(AppError::InvalidInput(format!(
                "Series '{}' has {} dates but {} values",
                name,
                dates.len(),
                values.len()
            )));
        }
        Ok(Self { name, dates, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Monthly,
    Quarterly,
}

/// Position of a date within the seasonal cycle, e.g. 2021 Q3 or 2021-07.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub period: u32,
}

impl Frequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
        }
    }

    fn months_per_period(self) -> u32 {
        12 / self.periods_per_year()
    }

    /// Infers the frequency from the spacing between consecutive dates.
    pub fn infer(dates: &[NaiveDateTime]) -> Result<Self, AppError> {
        if dates.len() < 2 {
            return Err(AppError::InvalidInput(format!(
                "Cannot infer frequency from {} observation(s)",
                dates.len()
            )));
        }

        let steps: Vec<i64> = dates
            .windows(2)
            .map(|pair| month_index(&pair[1]) - month_index(&pair[0]))
            .collect();

        match steps.first() {
            Some(1) if steps.iter().all(|&s| s == 1) => Ok(Frequency::Monthly),
            Some(3) if steps.iter().all(|&s| s == 3) => Ok(Frequency::Quarterly),
            _ => Err(AppError::InvalidInput(
                "Dates must be evenly spaced monthly or quarterly observations".to_string(),
            )),
        }
    }

    pub fn period_of(self, date: &NaiveDateTime) -> Period {
        Period {
            year: date.year(),
            period: date.month0() / self.months_per_period() + 1,
        }
    }

    /// Midnight on the first day of the given period.
    pub fn first_day(self, period: Period) -> Option<NaiveDateTime> {
        let month = (period.period.checked_sub(1)?) * self.months_per_period() + 1;
        NaiveDate::from_ymd_opt(period.year, month, 1)?.and_hms_opt(0, 0, 0)
    }
}

fn month_index(date: &NaiveDateTime) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly(year: i32, months: u32) -> Vec<NaiveDateTime> {
        (0..months)
            .map(|m| {
                NaiveDate::from_ymd_opt(year + (m / 12) as i32, m % 12 + 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn infers_monthly_and_quarterly_spacing() {
        assert_eq!(Frequency::infer(&monthly(2020, 24)).unwrap(), Frequency::Monthly);

        let quarterly: Vec<_> = monthly(2020, 24).into_iter().step_by(3).collect();
        assert_eq!(Frequency::infer(&quarterly).unwrap(), Frequency::Quarterly);
    }

    #[test]
    fn rejects_irregular_or_too_short_indexes() {
        let mut dates = monthly(2020, 12);
        dates.remove(5);
        assert!(matches!(Frequency::infer(&dates), Err(AppError::InvalidInput(_))));
        assert!(matches!(Frequency::infer(&dates[..1]), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn maps_dates_to_periods_and_back() {
        let date = NaiveDate::from_ymd_opt(2021, 8, 17).unwrap().and_hms_opt(9, 30, 0).unwrap();

        let q = Frequency::Quarterly.period_of(&date);
        assert_eq!(q, Period { year: 2021, period: 3 });
        assert_eq!(
            Frequency::Quarterly.first_day(q).unwrap(),
            NaiveDate::from_ymd_opt(2021, 7, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );

        let m = Frequency::Monthly.period_of(&date);
        assert_eq!(m, Period { year: 2021, period: 8 });
        assert!(Frequency::Monthly.first_day(Period { year: 2021, period: 13 }).is_none());
    }

    #[test]
    fn series_requires_matching_lengths() {
        assert!(TimeSeries::new("A", monthly(2020, 3), vec![1.0, 2.0]).is_err());
        assert_eq!(TimeSeries::new("A", monthly(2020, 2), vec![1.0, 2.0]).unwrap().len(), 2);
    }
}
