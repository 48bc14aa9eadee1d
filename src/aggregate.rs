use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate, Timelike};

use crate::models::{
    DailyCount, MessageRecord, SenderCount, SenderHours, YearSenders, YearSummary, HOURS,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregateError {
    #[error("no data to aggregate")]
    Empty,
    #[error("quantile {0} is outside [0, 1]")]
    InvalidQuantile(f64),
    #[error("year {0} is outside the supported calendar range")]
    InvalidYear(i32),
}

/// Per-day message counts over `[first day, last day]`, zero-filled.
pub fn daily_counts(messages: &[MessageRecord]) -> Result<Vec<DailyCount>, AggregateError> {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for message in messages {
        *by_date.entry(message.sent_at.date()).or_insert(0) += 1;
    }

    let (first, last) = match (by_date.keys().next(), by_date.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(AggregateError::Empty),
    };

    Ok(first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| DailyCount {
            date,
            count: by_date.get(&date).copied().unwrap_or(0),
        })
        .collect())
}

/// Distinct years covered by `daily`, ascending.
pub fn years(daily: &[DailyCount]) -> Vec<i32> {
    daily
        .iter()
        .map(|d| d.date.year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Jan 1 through Dec 31 of `year`, with counts taken from `daily` where present.
pub fn year_days(daily: &[DailyCount], year: i32) -> Result<Vec<DailyCount>, AggregateError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(AggregateError::InvalidYear(year))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(AggregateError::InvalidYear(year))?;
    let known: HashMap<NaiveDate, u64> = daily
        .iter()
        .filter(|d| d.date.year() == year)
        .map(|d| (d.date, d.count))
        .collect();

    let len = (end - start).num_days() + 1;
    Ok((0..len)
        .map(|offset| {
            let date = start + Duration::days(offset);
            DailyCount {
                date,
                count: known.get(&date).copied().unwrap_or(0),
            }
        })
        .collect())
}

pub fn sender_counts(messages: &[MessageRecord]) -> Vec<SenderCount> {
    let mut map: HashMap<&str, u64> = HashMap::new();
    for message in messages {
        *map.entry(message.sender.as_str()).or_insert(0) += 1;
    }
    sort_senders(
        map.into_iter()
            .map(|(sender, count)| SenderCount {
                sender: sender.to_string(),
                count,
            })
            .collect(),
    )
}

fn sort_senders(mut counts: Vec<SenderCount>) -> Vec<SenderCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sender.cmp(&b.sender)));
    counts
}

pub fn hourly_counts(messages: &[MessageRecord]) -> [u64; HOURS] {
    let mut hours = [0u64; HOURS];
    for message in messages {
        hours[message.sent_at.hour() as usize] += 1;
    }
    hours
}

/// Hour histogram per sender, senders ordered like [`sender_counts`].
pub fn hourly_by_sender(messages: &[MessageRecord]) -> Vec<SenderHours> {
    let mut map: HashMap<&str, [u64; HOURS]> = HashMap::new();
    for message in messages {
        let hours = map.entry(message.sender.as_str()).or_insert([0; HOURS]);
        hours[message.sent_at.hour() as usize] += 1;
    }
    sender_counts(messages)
        .into_iter()
        .map(|sc| SenderHours {
            hours: map.get(sc.sender.as_str()).copied().unwrap_or([0; HOURS]),
            sender: sc.sender,
        })
        .collect()
}

pub fn yearly_sender_counts(messages: &[MessageRecord]) -> Vec<YearSenders> {
    let mut map: BTreeMap<i32, HashMap<&str, u64>> = BTreeMap::new();
    for message in messages {
        *map.entry(message.sent_at.year())
            .or_default()
            .entry(message.sender.as_str())
            .or_insert(0) += 1;
    }
    map.into_iter()
        .map(|(year, senders)| YearSenders {
            year,
            senders: sort_senders(
                senders
                    .into_iter()
                    .map(|(sender, count)| SenderCount {
                        sender: sender.to_string(),
                        count,
                    })
                    .collect(),
            ),
        })
        .collect()
}

/// Linear-interpolation quantile at position `q * (n - 1)` of the sorted values.
pub fn percentile(values: &[u64], q: f64) -> Result<f64, AggregateError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(AggregateError::InvalidQuantile(q));
    }
    if values.is_empty() {
        return Err(AggregateError::Empty);
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Ok(sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * frac)
}

/// Colour-scale upper bound shared by every yearly heatmap.
pub fn global_vmax(daily: &[DailyCount], q: f64) -> Result<f64, AggregateError> {
    let counts: Vec<u64> = daily.iter().map(|d| d.count).collect();
    percentile(&counts, q)
}

pub fn summarize_year(days: &[DailyCount]) -> Result<YearSummary, AggregateError> {
    let first = days.first().ok_or(AggregateError::Empty)?;
    let total_messages: u64 = days.iter().map(|d| d.count).sum();
    // Earliest day wins a tie for busiest.
    let busiest = days
        .iter()
        .fold(first, |best, d| if d.count > best.count { d } else { best });

    Ok(YearSummary {
        year: first.date.year(),
        total_messages,
        avg_daily: total_messages as f64 / days.len() as f64,
        busiest_day: busiest.date,
        busiest_count: busiest.count,
        active_days: days.iter().filter(|d| d.count > 0).count(),
    })
}
