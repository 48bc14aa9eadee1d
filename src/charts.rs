use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::models::{SenderCount, SenderHours, YearSenders, HOURS};
use crate::report::format_thousands;
use crate::style::RenderConfig;

/// Panel layout for per-year pies: at most two columns.
pub fn panel_grid(panels: usize) -> (usize, usize) {
    if panels == 0 {
        return (0, 0);
    }
    let cols = panels.min(2);
    (panels.div_ceil(cols), cols)
}

fn y_ceiling(max: u64) -> u64 {
    ((max as f64 * 1.1).ceil() as u64).max(1)
}

/// Palette slot per sender, ranked by message count over all years so a
/// sender keeps one colour in every panel.
pub fn sender_slots(yearly: &[YearSenders]) -> HashMap<String, usize> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for entry in yearly.iter().flat_map(|y| &y.senders) {
        *totals.entry(entry.sender.as_str()).or_insert(0) += entry.count;
    }
    let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .enumerate()
        .map(|(slot, (sender, _))| (sender.to_string(), slot))
        .collect()
}

fn slot_colors(
    senders: &[SenderCount],
    slots: &HashMap<String, usize>,
    config: &RenderConfig,
) -> Vec<RGBColor> {
    senders
        .iter()
        .enumerate()
        .map(|(i, s)| config.sender_color(slots.get(&s.sender).copied().unwrap_or(i)))
        .collect()
}

fn draw_donut<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    senders: &[SenderCount],
    colors: &[RGBColor],
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let total: u64 = senders.iter().map(|s| s.count).sum();
    if total == 0 {
        return Ok(());
    }

    let (width, height) = area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;
    let sizes: Vec<f64> = senders.iter().map(|s| s.count as f64).collect();
    let labels: Vec<&str> = senders.iter().map(|s| s.sender.as_str()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, colors, &labels);
    pie.start_angle(0.0);
    pie.donut_hole(radius * 0.3);
    pie.label_style(config.font(24).into_font().color(&config.text));
    pie.percentages(config.font(20).into_font().color(&config.text));
    area.draw(&pie)
        .map_err(|e| anyhow::anyhow!("failed to draw pie: {e}"))?;
    Ok(())
}

pub fn render_sender_pie(
    senders: &[SenderCount],
    path: &Path,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, config.pie_size).into_drawing_area();
    root.fill(&config.background)?;
    let body = root.titled(
        "Message share",
        config.font(36).into_font().color(&config.text),
    )?;
    let colors: Vec<RGBColor> = (0..senders.len()).map(|i| config.sender_color(i)).collect();
    draw_donut(&body, senders, &colors, config)?;
    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "sender share chart written");
    Ok(())
}

pub fn render_hourly(
    hours: &[u64; HOURS],
    path: &Path,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, config.hourly_size).into_drawing_area();
    root.fill(&config.background)?;

    let max = hours.iter().copied().max().unwrap_or(0);
    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Messages by hour of day",
            config.font(36).into_font().color(&config.text),
        )
        .margin(30)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..(HOURS as u32 - 1)).into_segmented(), 0u64..y_ceiling(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Hour")
        .y_desc("Messages")
        .x_labels(HOURS)
        .x_label_formatter(&|v| match v {
            SegmentValue::Exact(h) | SegmentValue::CenterOf(h) => h.to_string(),
            SegmentValue::Last => String::new(),
        })
        .light_line_style(&config.grid_line)
        .label_style(config.font(18).into_font().color(&config.text))
        .axis_desc_style(config.font(22).into_font().color(&config.text))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(config.sender_color(0).mix(0.7).filled())
            .margin(6)
            .data(hours.iter().enumerate().map(|(h, &c)| (h as u32, c))),
    )?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "hourly distribution written");
    Ok(())
}

/// Left edge of sender `index`'s bar within the hour group centred on `hour`.
pub fn bar_offset(hour: usize, index: usize, senders: usize) -> (f64, f64) {
    let width = 0.8 / senders.max(1) as f64;
    let left = hour as f64 - 0.4 + index as f64 * width;
    (left, left + width)
}

pub fn render_hourly_comparison(
    by_sender: &[SenderHours],
    path: &Path,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, config.comparison_size).into_drawing_area();
    root.fill(&config.background)?;

    let max = by_sender
        .iter()
        .flat_map(|s| s.hours.iter().copied())
        .max()
        .unwrap_or(0);
    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Messages by hour, per sender",
            config.font(36).into_font().color(&config.text),
        )
        .margin(30)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5f64..(HOURS as f64 - 0.5), 0u64..y_ceiling(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Hour")
        .y_desc("Messages")
        .x_labels(HOURS)
        .x_label_formatter(&|x| {
            if x.fract().abs() < 1e-9 {
                format!("{}", *x as i64)
            } else {
                String::new()
            }
        })
        .light_line_style(&config.grid_line)
        .label_style(config.font(18).into_font().color(&config.text))
        .axis_desc_style(config.font(22).into_font().color(&config.text))
        .draw()?;

    for (index, sender) in by_sender.iter().enumerate() {
        let color = config.sender_color(index);
        chart
            .draw_series(sender.hours.iter().enumerate().map(|(hour, &count)| {
                let (left, right) = bar_offset(hour, index, by_sender.len());
                Rectangle::new([(left, 0), (right, count)], color.mix(0.7).filled())
            }))?
            .label(sender.sender.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 16, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(config.font(20).into_font().color(&config.text))
        .background_style(&config.background.mix(0.8))
        .border_style(&config.grid_line)
        .draw()?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), senders = by_sender.len(), "hourly comparison written");
    Ok(())
}

pub fn render_yearly_pies(
    yearly: &[YearSenders],
    path: &Path,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let (rows, cols) = panel_grid(yearly.len());
    if rows == 0 {
        anyhow::bail!("no yearly data to draw");
    }
    let (panel_w, panel_h) = config.yearly_panel_size;
    let size = (panel_w * cols as u32, panel_h * rows as u32 + 60);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&config.panel_background)?;
    let body = root.titled(
        "Message share by year",
        config.font(36).into_font().color(&config.text),
    )?;

    let slots = sender_slots(yearly);
    let panels = body.split_evenly((rows, cols));
    for (panel, year) in panels.iter().zip(yearly) {
        let inner = panel.titled(
            &year.year.to_string(),
            config.font(28).into_font().color(&config.text),
        )?;
        let colors = slot_colors(&year.senders, &slots, config);
        draw_donut(&inner, &year.senders, &colors, config)?;

        let (w, h) = inner.dim_in_pixel();
        let note = format!("Total messages: {}", format_thousands(year.total()));
        let style = config
            .font(20)
            .into_font()
            .color(&config.muted_text)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        inner.draw_text(&note, &style, (w as i32 / 2, h as i32 - 8))?;
    }

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), years = yearly.len(), "yearly share charts written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::test_render_config;

    fn count(sender: &str, count: u64) -> SenderCount {
        SenderCount { sender: sender.into(), count }
    }

    #[test]
    fn pie_panels_use_two_columns() {
        assert_eq!(panel_grid(0), (0, 0));
        assert_eq!(panel_grid(1), (1, 1));
        assert_eq!(panel_grid(2), (1, 2));
        assert_eq!(panel_grid(3), (2, 2));
        assert_eq!(panel_grid(5), (3, 2));
    }

    #[test]
    fn grouped_bars_stay_inside_their_hour() {
        let (l0, r0) = bar_offset(5, 0, 2);
        let (l1, r1) = bar_offset(5, 1, 2);
        assert!((l0 - 4.6).abs() < 1e-9);
        assert!((r0 - l1).abs() < 1e-9);
        assert!((r1 - 5.4).abs() < 1e-9);
        let (l, r) = bar_offset(0, 0, 1);
        assert!((r - l - 0.8).abs() < 1e-9);
    }

    #[test]
    fn y_axis_has_headroom() {
        assert_eq!(y_ceiling(0), 1);
        assert_eq!(y_ceiling(10), 11);
        assert_eq!(y_ceiling(95), 105);
    }

    #[test]
    fn sender_keeps_its_colour_when_the_top_sender_changes() {
        let config = RenderConfig::default();
        let yearly = vec![
            YearSenders { year: 2023, senders: vec![count("Alice", 90), count("Bob", 10)] },
            YearSenders { year: 2024, senders: vec![count("Bob", 40), count("Alice", 30)] },
        ];
        let slots = sender_slots(&yearly);
        assert_eq!(slots["Alice"], 0);
        assert_eq!(slots["Bob"], 1);

        let first = slot_colors(&yearly[0].senders, &slots, &config);
        let second = slot_colors(&yearly[1].senders, &slots, &config);
        assert_eq!(first, vec![config.sender_color(0), config.sender_color(1)]);
        assert_eq!(second, vec![config.sender_color(1), config.sender_color(0)]);
    }

    #[test]
    fn slots_tie_break_by_name() {
        let yearly = vec![YearSenders {
            year: 2023,
            senders: vec![count("Zoe", 5), count("Amy", 5), count("Max", 7)],
        }];
        let slots = sender_slots(&yearly);
        assert_eq!((slots["Max"], slots["Amy"], slots["Zoe"]), (0, 1, 2));
    }

    #[test]
    fn writes_png_files_when_a_font_is_available() {
        let Some(config) = test_render_config() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let senders = vec![
            SenderCount { sender: "Alice".into(), count: 30 },
            SenderCount { sender: "Bob".into(), count: 12 },
        ];
        let mut hours = [0u64; HOURS];
        hours[9] = 20;
        hours[22] = 22;

        let pie = dir.path().join("chat_ratio.png");
        render_sender_pie(&senders, &pie, &config).unwrap();
        assert!(pie.exists());

        let hourly = dir.path().join("hourly_distribution.png");
        render_hourly(&hours, &hourly, &config).unwrap();
        assert!(hourly.exists());

        let by_sender = vec![
            SenderHours { sender: "Alice".into(), hours },
            SenderHours { sender: "Bob".into(), hours: [1; HOURS] },
        ];
        let comparison = dir.path().join("hourly_comparison.png");
        render_hourly_comparison(&by_sender, &comparison, &config).unwrap();
        assert!(comparison.exists());

        let yearly = vec![
            YearSenders { year: 2023, senders: senders.clone() },
            YearSenders { year: 2024, senders },
            YearSenders { year: 2025, senders: vec![] },
        ];
        let yearly_path = dir.path().join("yearly_sender_ratio.png");
        render_yearly_pies(&yearly, &yearly_path, &config).unwrap();
        assert!(yearly_path.exists());
    }
}
