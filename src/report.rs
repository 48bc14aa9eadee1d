use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::{self, AggregateError};
use crate::models::{MessageRecord, SenderCount, YearSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_messages: u64,
    pub senders: Vec<SenderCount>,
    pub years: Vec<YearSummary>,
}

pub fn collect_stats(messages: &[MessageRecord]) -> Result<StatsReport, AggregateError> {
    let daily = aggregate::daily_counts(messages)?;
    let mut years = Vec::new();
    for year in aggregate::years(&daily) {
        let days = aggregate::year_days(&daily, year)?;
        years.push(aggregate::summarize_year(&days)?);
    }

    Ok(StatsReport {
        total_messages: messages.len() as u64,
        senders: aggregate::sender_counts(messages),
        years,
    })
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

pub fn build_report(stats: &StatsReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Message Statistics");
    let _ = writeln!(
        output,
        "Total messages: {}",
        format_thousands(stats.total_messages)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Messages per sender");

    for sender in &stats.senders {
        let share = if stats.total_messages == 0 {
            0.0
        } else {
            sender.count as f64 * 100.0 / stats.total_messages as f64
        };
        let _ = writeln!(
            output,
            "- {}: {} ({:.1}%)",
            sender.sender,
            format_thousands(sender.count),
            share
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Yearly summary");

    for year in &stats.years {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", year.year);
        let _ = writeln!(
            output,
            "- Total messages: {}",
            format_thousands(year.total_messages)
        );
        let _ = writeln!(output, "- Average per day: {:.1}", year.avg_daily);
        let _ = writeln!(
            output,
            "- Busiest day: {} ({} messages)",
            year.busiest_day.format("%Y-%m-%d"),
            year.busiest_count
        );
        let _ = writeln!(output, "- Days with messages: {}", year.active_days);
    }

    output
}

pub fn build_json(stats: &StatsReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(stats)
}
