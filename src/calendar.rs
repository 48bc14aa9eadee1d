//! Calendar heatmap layout.
//!
//! A year of daily counts is laid out on a 7-row grid, one row per weekday
//! (Monday first). Columns are bands of seven consecutive days counted from
//! Jan 1, so day `i` of the year lands in column `i / 7` regardless of where
//! calendar weeks begin. No padding is added before Jan 1.

use chrono::{Datelike, NaiveDate};

use crate::models::{CalendarYear, DailyCount, Grid, MonthBoundary, WEEKDAYS};

pub const WEEKDAY_LABELS: [&str; WEEKDAYS] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    #[error("no days to lay out")]
    Empty,
    #[error("sequence starts on {0}, expected January 1")]
    NotYearStart(NaiveDate),
    #[error("expected {expected} but found {found}: days must be contiguous")]
    Gap { expected: NaiveDate, found: NaiveDate },
    #[error("year {year} needs {expected} days, got {found}")]
    WrongLength {
        year: i32,
        expected: usize,
        found: usize,
    },
}

pub fn days_in_year(year: i32) -> usize {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

pub fn week_columns(days: usize) -> usize {
    days.div_ceil(WEEKDAYS)
}

/// Checks that `days` is exactly Jan 1 through Dec 31 of a single year.
pub fn validate_year(days: &[DailyCount]) -> Result<i32, GridError> {
    let first = days.first().ok_or(GridError::Empty)?;
    if first.date.ordinal() != 1 {
        return Err(GridError::NotYearStart(first.date));
    }
    let year = first.date.year();

    for pair in days.windows(2) {
        let expected = pair[0].date.succ_opt();
        if expected != Some(pair[1].date) {
            return Err(GridError::Gap {
                expected: expected.unwrap_or(pair[0].date),
                found: pair[1].date,
            });
        }
    }

    let expected = days_in_year(year);
    if days.len() != expected {
        return Err(GridError::WrongLength {
            year,
            expected,
            found: days.len(),
        });
    }
    Ok(year)
}

pub fn layout_year(days: &[DailyCount]) -> Result<CalendarYear, GridError> {
    let year = validate_year(days)?;
    let mut grid = Grid::zeros(week_columns(days.len()));
    let mut months = Vec::new();
    let mut current_month = days[0].date.month();

    for (i, day) in days.iter().enumerate() {
        let column = i / WEEKDAYS;
        let row = day.date.weekday().num_days_from_monday() as usize;
        grid.set(row, column, day.count);

        if day.date.month() != current_month {
            current_month = day.date.month();
            months.push(MonthBoundary {
                label: day.date.format("%b").to_string(),
                column,
            });
        }
    }

    Ok(CalendarYear { year, grid, months })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::year_days;
    use proptest::prelude::*;

    fn full_year(year: i32, count: impl Fn(usize) -> u64) -> Vec<DailyCount> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        start
            .iter_days()
            .take(days_in_year(year))
            .enumerate()
            .map(|(i, date)| DailyCount { date, count: count(i) })
            .collect()
    }

    #[test]
    fn single_message_on_new_year_2024() {
        let days = full_year(2024, |i| if i == 0 { 1 } else { 0 });
        let cal = layout_year(&days).unwrap();
        assert_eq!(cal.year, 2024);
        assert_eq!(cal.grid.get(0, 0), 1);
        assert_eq!(cal.grid.total(), 1);
    }

    #[test]
    fn grid_shape_is_seven_by_fifty_three() {
        for year in [2023, 2024] {
            let cal = layout_year(&full_year(year, |_| 1)).unwrap();
            assert_eq!(cal.grid.rows(), 7);
            assert_eq!(cal.grid.columns(), 53);
        }
    }

    #[test]
    fn placement_uses_day_offset_not_calendar_week() {
        // 2023-01-01 is a Sunday, 2023-01-02 a Monday; both sit in column 0.
        let days = full_year(2023, |i| i as u64 + 1);
        let cal = layout_year(&days).unwrap();
        assert_eq!(cal.grid.get(6, 0), 1);
        assert_eq!(cal.grid.get(0, 0), 2);
        // Day 7 is the next Sunday and opens column 1.
        assert_eq!(cal.grid.get(6, 1), 8);
        // Dec 31 2023 is day 364, a Sunday, alone in the last column.
        assert_eq!(cal.grid.get(6, 52), 365);
        assert_eq!(cal.grid.get(0, 52), 0);
    }

    #[test]
    fn month_boundaries_skip_january() {
        let cal = layout_year(&full_year(2024, |_| 0)).unwrap();
        let labels: Vec<&str> = cal.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"]
        );
        // Feb 1 is day 31 -> column 4; Dec 1 2024 is day 335 -> column 47.
        assert_eq!(cal.months[0].column, 4);
        assert_eq!(cal.months[10].column, 47);
        assert!(cal.months.windows(2).all(|w| w[0].column < w[1].column));
    }

    #[test]
    fn short_input_is_rejected() {
        let days: Vec<DailyCount> = full_year(2024, |_| 1).into_iter().take(10).collect();
        assert_eq!(
            layout_year(&days),
            Err(GridError::WrongLength {
                year: 2024,
                expected: 366,
                found: 10
            })
        );
    }

    #[test]
    fn gaps_and_bad_starts_are_rejected() {
        let mut days = full_year(2023, |_| 1);
        let removed = days.remove(40);
        assert_eq!(
            layout_year(&days),
            Err(GridError::Gap {
                expected: removed.date,
                found: removed.date.succ_opt().unwrap()
            })
        );

        let days = full_year(2023, |_| 1);
        assert_eq!(
            layout_year(&days[1..]),
            Err(GridError::NotYearStart(days[1].date))
        );
        assert_eq!(layout_year(&[]), Err(GridError::Empty));
    }

    #[test]
    fn spill_into_next_year_is_rejected() {
        let mut days = full_year(2023, |_| 1);
        days.push(DailyCount {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            count: 1,
        });
        assert!(matches!(
            layout_year(&days),
            Err(GridError::WrongLength { found: 366, .. })
        ));
    }

    #[test]
    fn works_on_aggregated_year() {
        let days = year_days(&[], 2025).unwrap();
        let cal = layout_year(&days).unwrap();
        assert_eq!(cal.grid.total(), 0);
        assert_eq!(cal.months.len(), 11);
    }

    proptest! {
        #[test]
        fn every_day_maps_to_its_cell(
            year in 1990i32..2100,
            counts in proptest::collection::vec(0u64..500, 366),
        ) {
            let days = full_year(year, |i| counts[i]);
            let cal = layout_year(&days).unwrap();
            let expected_sum: u64 = days.iter().map(|d| d.count).sum();
            prop_assert_eq!(cal.grid.total(), expected_sum);
            prop_assert_eq!(cal.grid.columns(), 53);
            for (i, day) in days.iter().enumerate() {
                let row = day.date.weekday().num_days_from_monday() as usize;
                prop_assert_eq!(cal.grid.get(row, i / 7), day.count);
            }
            prop_assert_eq!(cal.months.len(), 11);
            prop_assert_eq!(layout_year(&days).unwrap(), cal);
        }
    }
}
