//! SVG chart rendering for reports.
//!
//! Draws four stacked panels sharing a date axis: the cash-only portfolio,
//! total value per strategy, cumulative time-weighted return per strategy and
//! the asset price.

use chrono::NaiveDate;

use crate::domain::report::{SimulationReport, cumulative_returns};

const WIDTH: f64 = 900.0;
const PANEL_HEIGHT: f64 = 240.0;
const PADDING_LEFT: f64 = 80.0;
const PADDING_RIGHT: f64 = 160.0;
const PADDING_TOP: f64 = 30.0;
const PADDING_BOTTOM: f64 = 30.0;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

struct Line {
    label: String,
    color: &'static str,
    points: Vec<(NaiveDate, f64)>,
}

struct Panel {
    title: &'static str,
    lines: Vec<Line>,
}

fn strategy_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

fn cash_only_line(report: &SimulationReport) -> Line {
    let mut points = Vec::new();
    if let Some(first) = report.prices.first() {
        points.push((first.date, report.config.initial_amount));
    }
    let mut level = report.config.initial_amount;
    for entry in &report.global_contributions {
        // Step: hold the previous level until the contribution date.
        points.push((entry.date, level));
        level = entry.cumulative;
        points.push((entry.date, level));
    }
    if let Some(last) = report.prices.last() {
        points.push((last.date, level));
    }
    Line {
        label: "Cash only".to_string(),
        color: "#555555",
        points,
    }
}

fn build_panels(report: &SimulationReport) -> Vec<Panel> {
    let values = report
        .strategies
        .iter()
        .enumerate()
        .map(|(i, s)| Line {
            label: s.name.clone(),
            color: strategy_color(i),
            points: s
                .series
                .dates
                .iter()
                .copied()
                .zip(s.series.total_values.iter().copied())
                .collect(),
        })
        .collect();

    let returns = report
        .strategies
        .iter()
        .enumerate()
        .map(|(i, s)| Line {
            label: s.name.clone(),
            color: strategy_color(i),
            points: s
                .series
                .dates
                .iter()
                .copied()
                .zip(cumulative_returns(&s.series.returns).into_iter().map(|r| r * 100.0))
                .collect(),
        })
        .collect();

    let price = Line {
        label: "Close".to_string(),
        color: "#000000",
        points: report.prices.iter().map(|p| (p.date, p.close)).collect(),
    };

    vec![
        Panel {
            title: "Cash-Only Portfolio",
            lines: vec![cash_only_line(report)],
        },
        Panel {
            title: "Portfolio Value",
            lines: values,
        },
        Panel {
            title: "Cumulative Time-Weighted Return (%)",
            lines: returns,
        },
        Panel {
            title: "Asset Price",
            lines: vec![price],
        },
    ]
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn render_panel(out: &mut String, panel: &Panel, top: f64, date_range: (NaiveDate, NaiveDate)) {
    let plot_width = WIDTH - PADDING_LEFT - PADDING_RIGHT;
    let plot_height = PANEL_HEIGHT - PADDING_TOP - PADDING_BOTTOM;
    let left = PADDING_LEFT;
    let bottom = top + PANEL_HEIGHT - PADDING_BOTTOM;

    push_line(
        out,
        &format!(
            r#"  <text x="{:.1}" y="{:.1}" font-size="14" font-weight="bold">{}</text>"#,
            left,
            top + PADDING_TOP - 10.0,
            escape(panel.title)
        ),
    );
    push_line(
        out,
        &format!(
            r##"  <line x1="{left:.1}" y1="{:.1}" x2="{left:.1}" y2="{bottom:.1}" stroke="#333" />"##,
            top + PADDING_TOP
        ),
    );
    push_line(
        out,
        &format!(
            r##"  <line x1="{left:.1}" y1="{bottom:.1}" x2="{:.1}" y2="{bottom:.1}" stroke="#333" />"##,
            left + plot_width
        ),
    );

    let finite = || {
        panel
            .lines
            .iter()
            .flat_map(|l| l.points.iter().map(|p| p.1))
            .filter(|v| v.is_finite())
    };
    let min = finite().fold(f64::INFINITY, f64::min);
    let max = finite().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() {
        push_line(
            out,
            &format!(
                r#"  <text x="{:.1}" y="{:.1}" font-size="12">No data available.</text>"#,
                left + 10.0,
                top + PANEL_HEIGHT / 2.0
            ),
        );
        return;
    }

    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let (start, end) = date_range;
    let span = (end - start).num_days() as f64;
    let x_of = |date: NaiveDate| {
        if span > 0.0 {
            left + (date - start).num_days() as f64 / span * plot_width
        } else {
            left
        }
    };
    let y_of = |value: f64| bottom - (value - min) * scale_y;

    push_line(
        out,
        &format!(
            r#"  <text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{:.2}</text>"#,
            left - 5.0,
            y_of(max) + 4.0,
            max
        ),
    );
    push_line(
        out,
        &format!(
            r#"  <text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{:.2}</text>"#,
            left - 5.0,
            y_of(min),
            min
        ),
    );
    push_line(
        out,
        &format!(
            r#"  <text x="{left:.1}" y="{:.1}" font-size="10">{start}</text>"#,
            bottom + 14.0
        ),
    );
    push_line(
        out,
        &format!(
            r#"  <text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{end}</text>"#,
            left + plot_width,
            bottom + 14.0
        ),
    );

    for (i, line) in panel.lines.iter().enumerate() {
        let points: Vec<String> = line
            .points
            .iter()
            .filter(|p| p.1.is_finite())
            .map(|&(date, value)| format!("{:.1},{:.1}", x_of(date), y_of(value)))
            .collect();
        push_line(
            out,
            &format!(
                r#"  <polyline fill="none" stroke="{}" stroke-width="1.5" points="{}" />"#,
                line.color,
                points.join(" ")
            ),
        );

        let legend_y = top + PADDING_TOP + 14.0 * i as f64;
        let legend_x = left + plot_width + 10.0;
        push_line(
            out,
            &format!(
                r#"  <rect x="{legend_x:.1}" y="{:.1}" width="10" height="10" fill="{}" />"#,
                legend_y - 9.0,
                line.color
            ),
        );
        push_line(
            out,
            &format!(
                r#"  <text x="{:.1}" y="{legend_y:.1}" font-size="11">{}</text>"#,
                legend_x + 14.0,
                escape(&line.label)
            ),
        );
    }
}

/// Renders the four-panel analysis chart as a standalone SVG document.
pub fn render_analysis_chart(report: &SimulationReport) -> String {
    let panels = build_panels(report);
    let height = PANEL_HEIGHT * panels.len() as f64;

    let mut out = String::new();
    push_line(
        &mut out,
        &format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{height:.0}" viewBox="0 0 {WIDTH:.0} {height:.0}" font-family="sans-serif">"#
        ),
    );
    push_line(&mut out, r#"  <rect width="100%" height="100%" fill="white" />"#);

    let date_range = match (report.prices.first(), report.prices.last()) {
        (Some(first), Some(last)) => Some((first.date, last.date)),
        _ => None,
    };

    for (i, panel) in panels.iter().enumerate() {
        let top = PANEL_HEIGHT * i as f64;
        match date_range {
            Some(range) => render_panel(&mut out, panel, top, range),
            None => {
                push_line(
                    &mut out,
                    &format!(
                        r#"  <text x="{PADDING_LEFT:.1}" y="{:.1}" font-size="12">No data available.</text>"#,
                        top + PANEL_HEIGHT / 2.0
                    ),
                );
            }
        }
    }

    out.push_str("</svg>\n");
    out
}
