use std::path::Path;

use anyhow::Context;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::aggregate;
use crate::calendar::{self, WEEKDAY_LABELS};
use crate::models::{CalendarYear, DailyCount, WEEKDAYS};
use crate::style::RenderConfig;

const LABEL_GUTTER: i32 = 70;
const TITLE_HEIGHT: i32 = 36;
const COLORBAR_GAP: i32 = 40;
const COLORBAR_WIDTH: i32 = 24;
const COLORBAR_LABELS: i32 = 130;

/// Pixel geometry of one year's grid inside its panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapLayout {
    pub origin: (i32, i32),
    pub cell: i32,
    pub gap: i32,
    pub columns: usize,
}

impl HeatmapLayout {
    pub fn new(cell: u32, columns: usize) -> Self {
        Self {
            origin: (LABEL_GUTTER, TITLE_HEIGHT),
            cell: cell as i32,
            gap: 2,
            columns,
        }
    }

    pub fn cell_rect(&self, row: usize, column: usize) -> [(i32, i32); 2] {
        let x = self.origin.0 + column as i32 * self.cell;
        let y = self.origin.1 + row as i32 * self.cell;
        [(x, y), (x + self.cell - self.gap, y + self.cell - self.gap)]
    }

    pub fn column_x(&self, column: usize) -> i32 {
        self.origin.0 + column as i32 * self.cell
    }

    pub fn grid_width(&self) -> i32 {
        self.columns as i32 * self.cell
    }

    pub fn grid_bottom(&self) -> i32 {
        self.origin.1 + WEEKDAYS as i32 * self.cell
    }

    pub fn width(&self) -> u32 {
        (self.origin.0 + self.grid_width() + COLORBAR_GAP + COLORBAR_WIDTH + COLORBAR_LABELS) as u32
    }
}

/// Edges of the colour bins, 0 through `vmax`.
pub fn colorbar_ticks(vmax: f64, levels: usize) -> Vec<f64> {
    (0..=levels)
        .map(|i| vmax * i as f64 / levels as f64)
        .collect()
}

fn format_tick(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn draw_year<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    calendar: &CalendarYear,
    vmax: f64,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    let layout = HeatmapLayout::new(config.heatmap_cell, calendar.grid.columns());
    let draw_err = |e: DrawingAreaErrorKind<DB::ErrorType>| anyhow::anyhow!("{e}");

    let title = config
        .font(22)
        .into_font()
        .color(&config.text)
        .pos(Pos::new(HPos::Center, VPos::Top));
    area.draw_text(
        &format!("{} message activity", calendar.year),
        &title,
        (layout.origin.0 + layout.grid_width() / 2, 4),
    )
    .map_err(draw_err)?;

    for row in 0..calendar.grid.rows() {
        for column in 0..calendar.grid.columns() {
            let color = config.heat_color(calendar.grid.get(row, column), vmax);
            area.draw(&Rectangle::new(layout.cell_rect(row, column), color.filled()))
                .map_err(draw_err)?;
        }
    }

    let row_label = config
        .font(15)
        .into_font()
        .color(&config.text)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (row, label) in WEEKDAY_LABELS.iter().enumerate() {
        let [(_, top), (_, bottom)] = layout.cell_rect(row, 0);
        area.draw_text(label, &row_label, (layout.origin.0 - 8, (top + bottom) / 2))
            .map_err(draw_err)?;
    }

    let month_label = config
        .font(15)
        .into_font()
        .color(&config.text)
        .pos(Pos::new(HPos::Left, VPos::Top));
    let separator = config.muted_text.mix(0.2);
    for boundary in &calendar.months {
        let x = layout.column_x(boundary.column);
        area.draw(&PathElement::new(
            vec![(x - 1, layout.origin.1), (x - 1, layout.grid_bottom())],
            separator.stroke_width(1),
        ))
        .map_err(draw_err)?;
        area.draw_text(&boundary.label, &month_label, (x, layout.grid_bottom() + 4))
            .map_err(draw_err)?;
    }

    // Colour bar: one block per ramp colour, labelled with the bin edges.
    let levels = config.heat_colors.len();
    let bar_x = layout.origin.0 + layout.grid_width() + COLORBAR_GAP;
    let bar_height = layout.grid_bottom() - layout.origin.1;
    let block = bar_height / levels as i32;
    for (i, color) in config.heat_colors.iter().enumerate() {
        let bottom = layout.grid_bottom() - i as i32 * block;
        area.draw(&Rectangle::new(
            [(bar_x, bottom - block), (bar_x + COLORBAR_WIDTH, bottom)],
            color.filled(),
        ))
        .map_err(draw_err)?;
    }
    let tick_style = config
        .font(13)
        .into_font()
        .color(&config.text)
        .pos(Pos::new(HPos::Left, VPos::Center));
    for (i, tick) in colorbar_ticks(vmax, levels).iter().enumerate() {
        let y = layout.grid_bottom() - i as i32 * block;
        area.draw_text(&format_tick(*tick), &tick_style, (bar_x + COLORBAR_WIDTH + 6, y))
            .map_err(draw_err)?;
    }
    area.draw_text(
        "Messages",
        &config
            .font(13)
            .into_font()
            .color(&config.muted_text)
            .pos(Pos::new(HPos::Left, VPos::Bottom)),
        (bar_x, layout.origin.1 - 6),
    )
    .map_err(draw_err)?;

    Ok(())
}

/// Calendars to draw plus the one colour scale they all share.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapPlan {
    pub vmax: f64,
    pub calendars: Vec<CalendarYear>,
}

/// Fixes `vmax` from every daily count first, then lays out `years` in the
/// order given.
pub fn plan_heatmaps(
    daily: &[DailyCount],
    percentile: f64,
    years: &[i32],
) -> anyhow::Result<HeatmapPlan> {
    let vmax = aggregate::global_vmax(daily, percentile)?;
    tracing::info!(vmax, percentile, "colour scale fixed for all years");

    let calendars = years
        .iter()
        .map(|&year| -> anyhow::Result<CalendarYear> {
            let days = aggregate::year_days(daily, year)?;
            calendar::layout_year(&days).with_context(|| format!("cannot lay out {year}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(HeatmapPlan { vmax, calendars })
}

/// Draws one heatmap per year, stacked vertically, sharing a single colour scale.
pub fn render_heatmaps(
    calendars: &[CalendarYear],
    vmax: f64,
    path: &Path,
    config: &RenderConfig,
) -> anyhow::Result<()> {
    if calendars.is_empty() {
        anyhow::bail!("no years to draw");
    }
    let columns = calendars
        .iter()
        .map(|c| c.grid.columns())
        .max()
        .unwrap_or(0);
    let width = HeatmapLayout::new(config.heatmap_cell, columns).width();
    let height = config.heatmap_row_height * calendars.len() as u32;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&config.background)?;
    for (area, calendar) in root.split_evenly((calendars.len(), 1)).iter().zip(calendars) {
        draw_year(area, calendar, vmax, config)
            .with_context(|| format!("failed to draw heatmap for {}", calendar.year))?;
        tracing::debug!(
            year = calendar.year,
            total = calendar.grid.total(),
            "heatmap panel drawn"
        );
    }

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), years = calendars.len(), vmax, "yearly heatmaps written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{global_vmax, year_days};
    use crate::calendar::layout_year;
    use crate::style::test_render_config;
    use chrono::{Datelike, NaiveDate};

    fn two_busy_years() -> Vec<DailyCount> {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .iter_days()
            .take_while(|d| d.year() < 2025)
            .map(|date| {
                let base = u64::from(date.ordinal() % 10);
                let count = if date.year() == 2024 { base * 3 } else { base };
                DailyCount { date, count }
            })
            .collect()
    }

    #[test]
    fn vmax_is_shared_whatever_order_years_are_drawn() {
        let daily = two_busy_years();
        let forward = plan_heatmaps(&daily, 0.95, &[2023, 2024]).unwrap();
        let backward = plan_heatmaps(&daily, 0.95, &[2024, 2023]).unwrap();

        assert_eq!(forward.vmax, backward.vmax);
        assert_eq!(forward.vmax, global_vmax(&daily, 0.95).unwrap());
        assert_eq!(backward.calendars[0], forward.calendars[1]);
        assert_eq!(backward.calendars[1], forward.calendars[0]);

        let quiet_year = year_days(&daily, 2023).unwrap();
        assert!(forward.vmax > global_vmax(&quiet_year, 0.95).unwrap());
    }

    #[test]
    fn plan_rejects_bad_years_and_quantiles() {
        let daily = two_busy_years();
        assert!(plan_heatmaps(&daily, 0.95, &[i32::MAX]).is_err());
        assert!(plan_heatmaps(&daily, 1.5, &[2023]).is_err());
    }

    #[test]
    fn cells_are_laid_out_by_row_and_column() {
        let layout = HeatmapLayout::new(24, 53);
        assert_eq!(layout.cell_rect(0, 0), [(70, 36), (92, 58)]);
        assert_eq!(
            layout.cell_rect(6, 52),
            [(70 + 52 * 24, 36 + 6 * 24), (70 + 53 * 24 - 2, 36 + 7 * 24 - 2)]
        );
        assert_eq!(layout.grid_bottom(), 36 + 7 * 24);
        assert_eq!(layout.width(), (70 + 53 * 24 + 40 + 24 + 130) as u32);
    }

    #[test]
    fn colorbar_ticks_split_range_evenly() {
        assert_eq!(colorbar_ticks(10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(format_tick(4.0), "4");
        assert_eq!(format_tick(9.5), "9.5");
    }

    #[test]
    fn empty_calendar_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::default();
        assert!(render_heatmaps(&[], 1.0, &dir.path().join("x.png"), &config).is_err());
    }

    #[test]
    fn writes_png_when_a_font_is_available() {
        let Some(config) = test_render_config() else {
            return;
        };
        let calendars: Vec<CalendarYear> = [2023, 2024]
            .into_iter()
            .map(|year| layout_year(&year_days(&[], year).unwrap()).unwrap())
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yearly_heatmaps.png");
        render_heatmaps(&calendars, 4.0, &path, &config).unwrap();
        assert!(path.exists());
    }
}
