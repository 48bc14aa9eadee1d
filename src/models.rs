use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const WEEKDAYS: usize = 7;
pub const HOURS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub sender: String,
    pub sent_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Weekday-by-week matrix for one calendar year. Row 0 is Monday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    columns: usize,
    cells: Vec<u64>,
}

impl Grid {
    pub fn zeros(columns: usize) -> Self {
        Self {
            columns,
            cells: vec![0; WEEKDAYS * columns],
        }
    }

    pub fn rows(&self) -> usize {
        WEEKDAYS
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> u64 {
        self.cells[row * self.columns + column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: u64) {
        self.cells[row * self.columns + column] = value;
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBoundary {
    pub label: String,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarYear {
    pub year: i32,
    pub grid: Grid,
    pub months: Vec<MonthBoundary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderCount {
    pub sender: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderHours {
    pub sender: String,
    pub hours: [u64; HOURS],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSenders {
    pub year: i32,
    pub senders: Vec<SenderCount>,
}

impl YearSenders {
    pub fn total(&self) -> u64 {
        self.senders.iter().map(|s| s.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub total_messages: u64,
    pub avg_daily: f64,
    pub busiest_day: NaiveDate,
    pub busiest_count: u64,
    pub active_days: usize,
}
