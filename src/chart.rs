use plotters::prelude::*;

use crate::models::{MasteryCount, MasteryLevel};

const WIDTH: u32 = 720;
const ROW_HEIGHT: u32 = 56;

fn level_color(level: MasteryLevel) -> RGBColor {
    match level {
        MasteryLevel::Low => RGBColor(239, 85, 59),
        MasteryLevel::Moderate => RGBColor(254, 203, 82),
        MasteryLevel::High => RGBColor(0, 204, 150),
    }
}

/// Renders the mastery distribution as a horizontal bar chart in SVG, one
/// bar per level with its share of items printed past the bar end.
pub fn mastery_chart(distribution: &[MasteryCount]) -> anyhow::Result<String> {
    let mut svg = String::new();
    let rows = distribution.len().max(1) as i32;
    let max_count = distribution.iter().map(|d| d.count).max().unwrap_or(0).max(1) as f64;
    let height = ROW_HEIGHT * rows as u32 + 90;

    let level_label = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(index) => distribution
            .get(*index as usize)
            .map(|d| d.mastery_level.label().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let count_label = |value: &f64| format!("{value:.0}");

    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Distribution of Mastery Levels", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(180)
            .build_cartesian_2d(0f64..max_count * 1.25, (0..rows).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc("Count")
            .x_label_formatter(&count_label)
            .y_label_formatter(&level_label)
            .draw()?;

        chart.draw_series(distribution.iter().enumerate().map(|(index, entry)| {
            let index = index as i32;
            let mut bar = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(index)),
                    (entry.count as f64, SegmentValue::Exact(index + 1)),
                ],
                level_color(entry.mastery_level).filled(),
            );
            bar.set_margin(8, 8, 0, 0);
            bar
        }))?;

        chart.draw_series(distribution.iter().enumerate().map(|(index, entry)| {
            Text::new(
                format!("{:.1}%", entry.percentage),
                (
                    entry.count as f64 + max_count * 0.02,
                    SegmentValue::CenterOf(index as i32),
                ),
                ("sans-serif", 14).into_font(),
            )
        }))?;

        root.present()?;
    }

    Ok(svg)
}
