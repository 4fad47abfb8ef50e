//! Chart rendering for the EDA artifacts.
//!
//! Two bitmaps: a two-panel temporal view (daily records, daily files) and a
//! monthly seasonality bar chart. The charts are operator-facing only and
//! are never machine-read.

use std::path::Path;

use anyhow::anyhow;
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;

use crate::eda::DailyVolume;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Render the two-panel daily volume chart.
pub fn render_temporal(path: &Path, daily: &[DailyVolume]) -> anyhow::Result<()> {
    if daily.is_empty() {
        return Err(anyhow!("no daily volume data to plot"));
    }

    let root = BitMapBackend::new(path, (1500, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("chart fill failed: {e}"))?;
    let (upper, lower) = root.split_vertically(500);

    let (from, to) = date_span(daily);
    let max_records = daily.iter().map(|d| d.records).max().unwrap_or(1).max(1);
    let max_files = daily.iter().map(|d| d.files).max().unwrap_or(1).max(1);

    draw_line_panel(
        &upper,
        "Daily Record Volume",
        from..to,
        max_records,
        daily.iter().map(|d| (d.date, d.records)),
        &BLUE,
    )?;
    draw_line_panel(
        &lower,
        "Files Processed per Day",
        from..to,
        max_files,
        daily.iter().map(|d| (d.date, d.files)),
        &RGBColor(255, 140, 0),
    )?;

    root.present()
        .map_err(|e| anyhow!("chart write failed: {e}"))?;
    Ok(())
}

/// Axis span for a non-empty ascending series; a single-day series still
/// needs a non-empty range.
fn date_span(daily: &[DailyVolume]) -> (NaiveDate, NaiveDate) {
    let from = daily[0].date;
    let mut to = daily[daily.len() - 1].date;
    if to <= from {
        to = from + Duration::days(1);
    }
    (from, to)
}

fn draw_line_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    title: &str,
    dates: std::ops::Range<NaiveDate>,
    max_value: i64,
    series: impl Iterator<Item = (NaiveDate, i64)>,
    color: &RGBColor,
) -> anyhow::Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(dates, 0i64..(max_value + max_value / 10 + 1))
        .map_err(|e| anyhow!("chart build failed: {e}"))?;

    chart
        .configure_mesh()
        .light_line_style(WHITE.mix(0.7))
        .draw()
        .map_err(|e| anyhow!("chart mesh failed: {e}"))?;

    chart
        .draw_series(LineSeries::new(series, color))
        .map_err(|e| anyhow!("chart series failed: {e}"))?;
    Ok(())
}

/// Render the monthly seasonality bar chart from (month, mean) pairs.
pub fn render_monthly(path: &Path, monthly: &[(u32, f64)]) -> anyhow::Result<()> {
    if monthly.is_empty() {
        return Err(anyhow!("no monthly data to plot"));
    }

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("chart fill failed: {e}"))?;

    let max_mean = monthly.iter().map(|(_, m)| *m).fold(0.0f64, f64::max).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Mean Daily Records per Month", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(1i32..13i32, 0f64..(max_mean * 1.1))
        .map_err(|e| anyhow!("chart build failed: {e}"))?;

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|month| {
            MONTH_LABELS
                .get((*month - 1).max(0) as usize)
                .copied()
                .unwrap_or("")
                .to_string()
        })
        .disable_x_mesh()
        .draw()
        .map_err(|e| anyhow!("chart mesh failed: {e}"))?;

    chart
        .draw_series(monthly.iter().map(|(month, mean)| {
            Rectangle::new(
                [(*month as i32, 0.0), (*month as i32 + 1, *mean)],
                RGBColor(135, 206, 235).filled(),
            )
        }))
        .map_err(|e| anyhow!("chart bars failed: {e}"))?;

    root.present()
        .map_err(|e| anyhow!("chart write failed: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_daily() -> Vec<DailyVolume> {
        (0..60)
            .map(|i| DailyVolume {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i),
                records: 1000 + (i % 7) * 150,
                files: 2 + i % 3,
            })
            .collect()
    }

    #[test]
    fn test_render_temporal_writes_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("temporal_patterns.png");
        render_temporal(&path, &sample_daily()).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_render_monthly_writes_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("monthly_patterns.png");
        let monthly = vec![(1, 1200.0), (2, 900.0), (12, 1500.0)];
        render_monthly(&path, &monthly).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(render_temporal(&tmp.path().join("t.png"), &[]).is_err());
        assert!(render_monthly(&tmp.path().join("m.png"), &[]).is_err());
    }

    #[test]
    fn test_single_day_series_renders() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("single.png");
        let daily = vec![DailyVolume {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            records: 10,
            files: 1,
        }];
        render_temporal(&path, &daily).unwrap();
        assert!(path.exists());
    }
}
