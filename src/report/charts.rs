//! SVG charts of detected changes

use chrono::NaiveDate;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ReportError, ReportRow};
use crate::config::ChartType;

const CHART_SIZE: (u32, u32) = (1200, 700);

/// Change counts keyed by URL label, then by day
pub type TimelineCounts = BTreeMap<String, BTreeMap<NaiveDate, u32>>;

/// Count changed rows per URL per day
pub fn timeline_counts(rows: &[ReportRow]) -> TimelineCounts {
    let mut counts = TimelineCounts::new();
    for row in rows.iter().filter(|r| r.changed()) {
        if let Some(date) = row.date() {
            *counts
                .entry(row.label().to_string())
                .or_default()
                .entry(date)
                .or_default() += 1;
        }
    }
    counts
}

/// Total changes per URL label, most-changed first
pub fn url_change_totals(rows: &[ReportRow]) -> Vec<(String, u32)> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.changed()) {
        *totals.entry(row.label().to_string()).or_default() += 1;
    }
    let mut totals: Vec<_> = totals.into_iter().collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}

/// Render the charts selected by `chart_type` into `picture_dir`
pub fn generate_charts(
    rows: &[ReportRow],
    picture_dir: &Path,
    chart_type: ChartType,
    timestamp: &str,
) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();

    if chart_type.includes_timeline() {
        let counts = timeline_counts(rows);
        if counts.is_empty() {
            info!("No changes recorded; skipping timeline chart");
        } else {
            let path = picture_dir.join(format!("timeline_{}.svg", timestamp));
            draw_timeline(&path, &counts)?;
            written.push(path);
        }
    }

    if chart_type.includes_bar() {
        let totals = url_change_totals(rows);
        if totals.is_empty() {
            info!("No changes recorded; skipping per-URL chart");
        } else {
            let path = picture_dir.join(format!("url_changes_{}.svg", timestamp));
            draw_totals(&path, &totals)?;
            written.push(path);
        }
    }

    for path in &written {
        info!("Chart written to {}", path.display());
    }
    Ok(written)
}

fn chart_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Chart(e.to_string())
}

fn draw_timeline(path: &Path, counts: &TimelineCounts) -> Result<(), ReportError> {
    let dates = counts.values().flat_map(|days| days.keys());
    let (Some(first), Some(last)) = (dates.clone().min().copied(), dates.max().copied()) else {
        return Ok(());
    };
    let span = (last - first).num_days();
    let max = counts
        .values()
        .flat_map(|days| days.values())
        .copied()
        .max()
        .unwrap_or(1);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Website Changes Timeline", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(0i64..span.max(1), 0u32..max + 1)
        .map_err(chart_err)?;

    let label_day = |offset: &i64| (first + chrono::Duration::days(*offset)).format("%m-%d").to_string();
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Changes")
        .x_label_formatter(&label_day)
        .draw()
        .map_err(chart_err)?;

    for (idx, (label, days)) in counts.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(i64, u32)> = (0..=span)
            .map(|offset| {
                let day = first + chrono::Duration::days(offset);
                (offset, days.get(&day).copied().unwrap_or(0))
            })
            .collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(chart_err)?
            .label(label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart
            .draw_series(points.iter().map(|&point| Circle::new(point, 4, color.filled())))
            .map_err(chart_err)?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

fn draw_totals(path: &Path, totals: &[(String, u32)]) -> Result<(), ReportError> {
    let max = totals.iter().map(|(_, n)| *n).max().unwrap_or(1);
    let count = totals.len() as u32;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Total Changes by URL", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..count).into_segmented(), 0u32..max + 1)
        .map_err(chart_err)?;

    let label_bar = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(idx) => totals
            .get(*idx as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(totals.len())
        .x_label_formatter(&label_bar)
        .y_desc("Changes")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(totals.iter().enumerate().map(|(idx, (_, n))| {
            let idx = idx as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(idx), 0), (SegmentValue::Exact(idx + 1), *n)],
                BLUE.mix(0.7).filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: &str, url: &str, name: &str, changed: bool) -> ReportRow {
        ReportRow {
            timestamp: ts.to_string(),
            url: url.to_string(),
            name: name.to_string(),
            status_code: Some(200),
            has_changed: changed.to_string(),
            screenshot_path: None,
        }
    }

    fn sample() -> Vec<ReportRow> {
        vec![
            row("2026-10-17T09:00:00+00:00", "https://a.example", "A", true),
            row("2026-10-17T18:00:00+00:00", "https://a.example", "A", true),
            row("2026-10-18T09:00:00+00:00", "https://a.example", "A", false),
            row("2026-10-18T09:00:00+00:00", "https://b.example", "", true),
            row("2026-10-19T09:00:00+00:00", "https://c.example", "C", false),
        ]
    }

    #[test]
    fn timeline_counts_changes_per_day() {
        let counts = timeline_counts(&sample());
        let a = &counts["A"];
        assert_eq!(a[&NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()], 2);
        assert!(!a.contains_key(&NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()));
        assert_eq!(counts["https://b.example"].len(), 1);
        assert!(!counts.contains_key("C"), "URLs without changes are not plotted");
    }

    #[test]
    fn totals_are_sorted_descending() {
        let totals = url_change_totals(&sample());
        assert_eq!(
            totals,
            vec![("A".to_string(), 2), ("https://b.example".to_string(), 1)]
        );
    }

    #[test]
    fn renders_selected_charts() {
        let tmp = tempfile::tempdir().unwrap();
        let written = generate_charts(&sample(), tmp.path(), ChartType::All, "20261019120000").unwrap();
        assert_eq!(
            written,
            vec![
                tmp.path().join("timeline_20261019120000.svg"),
                tmp.path().join("url_changes_20261019120000.svg"),
            ]
        );
        for path in &written {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
        }
    }

    #[test]
    fn chart_type_limits_output() {
        let tmp = tempfile::tempdir().unwrap();
        let written = generate_charts(&sample(), tmp.path(), ChartType::Bar, "1").unwrap();
        assert_eq!(written, vec![tmp.path().join("url_changes_1.svg")]);
    }

    #[test]
    fn no_changes_renders_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let rows = vec![row("2026-10-19T09:00:00+00:00", "https://a.example", "", false)];
        let written = generate_charts(&rows, tmp.path(), ChartType::All, "1").unwrap();
        assert!(written.is_empty());
    }
}
