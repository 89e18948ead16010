//! SVG rendering of the equity curve.

use crate::domain::equity::EquityCurve;
use std::fmt::Write;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 56.0;
const LINE_COLOR: &str = "#1f77b4";
const AXIS_COLOR: &str = "#444444";
const Y_TICKS: usize = 4;

/// Render a standalone SVG document: axes, labels, legend and one polyline.
///
/// An empty curve still renders the frame so that the artifact is valid.
pub fn render_equity_svg(curve: &EquityCurve) -> String {
    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let left = PADDING;
    let bottom = HEIGHT - PADDING;

    let (min_equity, max_equity) = match curve.bounds() {
        Some((min, max)) if max > min => (min, max),
        // widen flat ranges so the line sits mid-plot
        Some((v, _)) => (v - 0.05, v + 0.05),
        None => (0.95, 1.05),
    };
    let range = max_equity - min_equity;

    let first_index = curve.points.first().map(|p| p.index).unwrap_or(0);
    let last_index = curve.points.last().map(|p| p.index).unwrap_or(0);
    let scale_x = if last_index > first_index {
        plot_width / (last_index - first_index) as f64
    } else {
        0.0
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}" font-family="sans-serif" font-size="12">"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="{WIDTH:.0}" height="{HEIGHT:.0}" fill="white"/>"#
    );

    // axes
    let _ = writeln!(
        svg,
        r#"  <line x1="{left:.1}" y1="{PADDING:.1}" x2="{left:.1}" y2="{bottom:.1}" stroke="{AXIS_COLOR}"/>"#
    );
    let _ = writeln!(
        svg,
        r#"  <line x1="{left:.1}" y1="{bottom:.1}" x2="{:.1}" y2="{bottom:.1}" stroke="{AXIS_COLOR}"/>"#,
        left + plot_width
    );

    for i in 0..=Y_TICKS {
        let value = min_equity + range * i as f64 / Y_TICKS as f64;
        let y = bottom - plot_height * i as f64 / Y_TICKS as f64;
        let _ = writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="end">{value:.3}</text>"#,
            left - 6.0,
            y + 4.0
        );
    }

    let _ = writeln!(
        svg,
        r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle">Time</text>"#,
        left + plot_width / 2.0,
        HEIGHT - 16.0
    );
    let _ = writeln!(
        svg,
        r#"  <text x="16" y="{:.1}" text-anchor="middle" transform="rotate(-90 16 {:.1})">Equity (normalized)</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0
    );

    if !curve.is_empty() {
        let points: Vec<String> = curve
            .points
            .iter()
            .map(|p| {
                let x = left + (p.index - first_index) as f64 * scale_x;
                let y = bottom - (p.equity - min_equity) / range * plot_height;
                format!("{x:.1},{y:.1}")
            })
            .collect();
        let _ = writeln!(
            svg,
            r#"  <polyline fill="none" stroke="{LINE_COLOR}" stroke-width="1.5" points="{}"/>"#,
            points.join(" ")
        );
    }

    // legend
    let legend_x = left + plot_width - 120.0;
    let legend_y = PADDING + 14.0;
    let _ = writeln!(
        svg,
        r#"  <line x1="{legend_x:.1}" y1="{legend_y:.1}" x2="{:.1}" y2="{legend_y:.1}" stroke="{LINE_COLOR}" stroke-width="2"/>"#,
        legend_x + 24.0
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{:.1}" y="{:.1}">Equity curve</text>"#,
        legend_x + 30.0,
        legend_y + 4.0
    );

    svg.push_str("</svg>\n");
    svg
}
