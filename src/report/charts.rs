//! Chart rendering with plotters
//!
//! Charts are pure geometry rendered into an RGB buffer and encoded as PNG.
//! Titles and legends are typeset by the PDF builder, so no font lookup
//! happens here.

use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use printpdf::image_crate::{DynamicImage, ImageOutputFormat, RgbImage};
use std::f64::consts::PI;
use std::io::Cursor;

use crate::analysis::{format_percentage, CategoryStat, StatusStat, TrendSummary};
use crate::error::{AnalystError, Result};

const CHART_WIDTH: u32 = 1200;
const CHART_HEIGHT: u32 = 720;

/// Slice and bar colors, cycled
pub const PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

/// Status bars start with green / red / orange / blue
const STATUS_PALETTE: [(u8, u8, u8); 4] = [
    (46, 204, 113),
    (231, 76, 60),
    (243, 156, 18),
    (52, 152, 219),
];

const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);
const GRID_COLOR: RGBColor = RGBColor(220, 220, 220);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    CategoryPie,
    StatusBar,
    DailyTimeline,
}

/// One legend line printed beside a chart
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: (u8, u8, u8),
}

/// A rendered chart image
#[derive(Debug, Clone)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
    pub legend: Vec<LegendEntry>,
}

/// Render the three report charts
pub fn render_all(
    categories: &[CategoryStat],
    statuses: &[StatusStat],
    trends: &TrendSummary,
) -> Result<Vec<Chart>> {
    Ok(vec![
        category_pie(categories)?,
        status_bar(statuses)?,
        daily_timeline(trends)?,
    ])
}

/// Pie chart of the category distribution, first slice starting at the top
pub fn category_pie(categories: &[CategoryStat]) -> Result<Chart> {
    let total: usize = categories.iter().map(|c| c.count).sum();
    let colors: Vec<(u8, u8, u8)> = (0..categories.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();

    let png = render_png(CHART_WIDTH, CHART_HEIGHT, |root| {
        if total == 0 {
            return Ok(());
        }

        let center = (CHART_WIDTH as f64 / 2.0, CHART_HEIGHT as f64 / 2.0);
        let radius = CHART_HEIGHT as f64 * 0.42;
        let mut start = -PI / 2.0;

        for (stat, color) in categories.iter().zip(&colors) {
            let sweep = stat.count as f64 / total as f64 * 2.0 * PI;
            let steps = ((sweep / (2.0 * PI)) * 360.0).ceil().max(2.0) as usize;

            let mut points = vec![(center.0 as i32, center.1 as i32)];
            for step in 0..=steps {
                let angle = start + sweep * step as f64 / steps as f64;
                points.push((
                    (center.0 + radius * angle.cos()).round() as i32,
                    (center.1 + radius * angle.sin()).round() as i32,
                ));
            }

            let fill = RGBColor(color.0, color.1, color.2);
            root.draw(&Polygon::new(points, fill.filled()))
                .map_err(AnalystError::render)?;
            start += sweep;
        }

        root.draw(&Circle::new(
            (center.0 as i32, center.1 as i32),
            radius as i32,
            WHITE.stroke_width(2),
        ))
        .map_err(AnalystError::render)?;
        Ok(())
    })?;

    let legend = categories
        .iter()
        .zip(colors)
        .map(|(stat, color)| LegendEntry {
            label: format!(
                "{}: {} ({}%)",
                stat.label,
                stat.count,
                format_percentage(stat.percentage)
            ),
            color,
        })
        .collect();

    Ok(Chart {
        kind: ChartKind::CategoryPie,
        title: "Distribuição de Reclamações por Categoria".to_string(),
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        png,
        legend,
    })
}

/// Bar chart of the status distribution
pub fn status_bar(statuses: &[StatusStat]) -> Result<Chart> {
    let colors: Vec<(u8, u8, u8)> = (0..statuses.len())
        .map(|i| {
            STATUS_PALETTE
                .get(i)
                .copied()
                .unwrap_or(PALETTE[i % PALETTE.len()])
        })
        .collect();
    let max_count = statuses.iter().map(|s| s.count).max().unwrap_or(0).max(1);
    let bars = statuses.len().max(1) as f64;

    let png = render_png(CHART_WIDTH, CHART_HEIGHT, |root| {
        let y_max = max_count as f64 * 1.1;
        let mut chart = ChartBuilder::on(root)
            .margin(40)
            .build_cartesian_2d(0f64..bars, 0f64..y_max)
            .map_err(AnalystError::render)?;

        chart
            .draw_series(grid_lines(max_count).map(|y| {
                PathElement::new(vec![(0.0, y), (bars, y)], GRID_COLOR.stroke_width(1))
            }))
            .map_err(AnalystError::render)?;

        chart
            .draw_series(statuses.iter().zip(&colors).enumerate().map(|(i, (stat, color))| {
                let fill = RGBColor(color.0, color.1, color.2);
                Rectangle::new(
                    [(i as f64 + 0.15, 0.0), (i as f64 + 0.85, stat.count as f64)],
                    fill.filled(),
                )
            }))
            .map_err(AnalystError::render)?;

        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(0.0, 0.0), (bars, 0.0)],
                BLACK.stroke_width(2),
            )))
            .map_err(AnalystError::render)?;
        Ok(())
    })?;

    let legend = statuses
        .iter()
        .zip(colors)
        .map(|(stat, color)| LegendEntry {
            label: format!(
                "{}: {} ({}%)",
                stat.label,
                stat.count,
                format_percentage(stat.percentage)
            ),
            color,
        })
        .collect();

    Ok(Chart {
        kind: ChartKind::StatusBar,
        title: "Distribuição de Reclamações por Status".to_string(),
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        png,
        legend,
    })
}

/// Line chart of complaints per day; days without complaints are skipped,
/// not drawn as zero
pub fn daily_timeline(trends: &TrendSummary) -> Result<Chart> {
    let start = trends.date_range.start;
    let points: Vec<(f64, f64)> = trends
        .daily
        .iter()
        .map(|(date, count)| (day_offset(start, *date), *count as f64))
        .collect();
    let x_max = points.last().map(|p| p.0).unwrap_or(0.0).max(1.0);
    let max_count = trends.daily.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);

    let png = render_png(CHART_WIDTH, CHART_HEIGHT, |root| {
        let mut chart = ChartBuilder::on(root)
            .margin(40)
            .build_cartesian_2d(-0.5f64..x_max + 0.5, 0f64..max_count as f64 * 1.15)
            .map_err(AnalystError::render)?;

        chart
            .draw_series(grid_lines(max_count).map(|y| {
                PathElement::new(vec![(-0.5, y), (x_max + 0.5, y)], GRID_COLOR.stroke_width(1))
            }))
            .map_err(AnalystError::render)?;

        chart
            .draw_series(LineSeries::new(points.clone(), LINE_COLOR.stroke_width(4)))
            .map_err(AnalystError::render)?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 8, LINE_COLOR.filled())),
            )
            .map_err(AnalystError::render)?;
        Ok(())
    })?;

    let legend = vec![LegendEntry {
        label: format!(
            "{} a {} ({} dias com reclamações, pico de {} por dia)",
            trends.date_range.start.format("%d/%m/%Y"),
            trends.date_range.end.format("%d/%m/%Y"),
            trends.daily.len(),
            max_count
        ),
        color: PALETTE[0],
    }];

    Ok(Chart {
        kind: ChartKind::DailyTimeline,
        title: "Timeline de Reclamações".to_string(),
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        png,
        legend,
    })
}

fn day_offset(start: NaiveDate, date: NaiveDate) -> f64 {
    (date - start).num_days() as f64
}

/// Horizontal grid positions, at most ten lines
fn grid_lines(max_count: usize) -> impl Iterator<Item = f64> {
    let step = (max_count / 10).max(1);
    (step..=max_count).step_by(step).map(|y| y as f64)
}

fn render_png<F>(width: u32, height: u32, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
{
    let mut buffer = vec![255u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(AnalystError::render)?;
        draw(&root)?;
        root.present().map_err(AnalystError::render)?;
    }
    encode_png(buffer, width, height)
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| AnalystError::Render("chart buffer size mismatch".to_string()))?;

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(AnalystError::render)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_corpus;
    use crate::analysis::{analyze_categories, analyze_status, analyze_trends};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn charts() -> Vec<Chart> {
        let corpus = sample_corpus();
        render_all(
            &analyze_categories(&corpus),
            &analyze_status(&corpus),
            &analyze_trends(&corpus).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_render_all_produces_png() {
        let charts = charts();

        assert_eq!(charts.len(), 3);
        assert_eq!(charts[0].kind, ChartKind::CategoryPie);
        assert_eq!(charts[1].kind, ChartKind::StatusBar);
        assert_eq!(charts[2].kind, ChartKind::DailyTimeline);
        for chart in &charts {
            assert!(chart.png.starts_with(&PNG_SIGNATURE));
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let first = charts();
        let second = charts();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.png, b.png);
        }
    }

    #[test]
    fn test_legends() {
        let charts = charts();

        assert_eq!(charts[0].legend[0].label, "App: 6 (60.0%)");
        assert_eq!(charts[0].legend[0].color, PALETTE[0]);
        assert_eq!(charts[1].legend[0].label, "Resolvido: 7 (70.0%)");
        assert_eq!(charts[1].legend[0].color, STATUS_PALETTE[0]);
        assert!(charts[2].legend[0].label.starts_with("22/09/2025 a 26/09/2025"));
    }

    #[test]
    fn test_grid_lines() {
        assert_eq!(grid_lines(3).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(grid_lines(40).count(), 10);
    }
}
