//! Markdown report adapter implementing ReportPort.
//!
//! Writes `analysis_report.md` and the `portfolio_analysis.svg` chart it links
//! to.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::adapters::chart_svg::render_analysis_chart;
use crate::domain::error::DcasimError;
use crate::domain::report::{MonthlyReturn, SimulationReport, StrategyReport};
use crate::ports::report_port::ReportPort;

pub const REPORT_FILE: &str = "analysis_report.md";
pub const CHART_FILE: &str = "portfolio_analysis.svg";

pub struct MarkdownReportAdapter;

impl ReportPort for MarkdownReportAdapter {
    fn write(&self, report: &SimulationReport, output_dir: &Path) -> Result<PathBuf, DcasimError> {
        fs::create_dir_all(output_dir)?;

        let chart_path = output_dir.join(CHART_FILE);
        fs::write(&chart_path, render_analysis_chart(report))?;
        info!("Chart written to {}", chart_path.display());

        let report_path = output_dir.join(REPORT_FILE);
        fs::write(&report_path, render_markdown(report))?;
        info!("Report written to {}", report_path.display());

        Ok(report_path)
    }
}

fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn format_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn format_ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "n/a".to_string()
    }
}

fn format_strategy(out: &mut String, strategy: &StrategyReport) {
    let m = &strategy.metrics;
    out.push_str(&format!("### {}\n\n", strategy.name));
    out.push_str("| Metric | Value |\n");
    out.push_str("|---|---|\n");
    out.push_str(&format!("| Total Cash Contributions | {} |\n", format_money(m.total_contributions)));
    out.push_str(&format!("| Final Total Assets | {} |\n", format_money(m.final_value)));
    out.push_str(&format!("| Money-weighted Return (IRR) | {} |\n", format_pct(m.money_weighted_return)));
    out.push_str(&format!("| Sharpe Ratio | {} |\n", format_ratio(m.sharpe_ratio)));
    out.push_str(&format!("| Time-weighted CAGR | {} |\n", format_pct(m.cagr)));
    out.push_str(&format!("| Maximum Drawdown | {} |\n", format_pct(m.max_drawdown)));
    out.push_str(&format!("| Trading Days | {} |\n", strategy.series.len()));
    out.push_str(&format!("| Rejected Trades | {} |\n", strategy.rejected_trades));
    out.push_str(&format!("| Skipped Days | {} |\n", strategy.skipped_days));
    out.push('\n');

    match strategy.rolling.latest() {
        Some(p) => {
            out.push_str(&format!(
                "Trailing {}-day window (to {}): Sharpe {}, volatility {}, return {}.\n\n",
                strategy.rolling.window,
                p.date,
                format_ratio(p.sharpe),
                format_pct(p.volatility),
                format_pct(p.cumulative_return)
            ));
        }
        None => {
            out.push_str(&format!(
                "Not enough history for a {}-day rolling window.\n\n",
                strategy.rolling.window
            ));
        }
    }

    out.push_str(&format_monthly_returns(&strategy.monthly_returns));
}

/// Year-by-month table of returns with a compounded YTD column.
pub fn format_monthly_returns(returns: &[MonthlyReturn]) -> String {
    if returns.is_empty() {
        return "No monthly returns available.\n\n".to_string();
    }

    let mut years: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        let row = years.entry(r.year).or_insert([None; 12]);
        row[(r.month - 1) as usize] = Some(r.return_pct);
    }

    let mut out = String::new();
    out.push_str("| Year | Jan | Feb | Mar | Apr | May | Jun | Jul | Aug | Sep | Oct | Nov | Dec | YTD |\n");
    out.push_str("|---|---|---|---|---|---|---|---|---|---|---|---|---|---|\n");
    for (year, months) in &years {
        out.push_str(&format!("| {year} |"));
        let mut ytd = 1.0_f64;
        for cell in months {
            match cell {
                Some(ret) => {
                    ytd *= 1.0 + ret;
                    out.push_str(&format!(" {:+.1}% |", ret * 100.0));
                }
                None => out.push_str(" - |"),
            }
        }
        out.push_str(&format!(" {:+.1}% |\n", (ytd - 1.0) * 100.0));
    }
    out.push('\n');
    out
}

pub fn render_markdown(report: &SimulationReport) -> String {
    let mut out = String::new();
    out.push_str("# Investment Strategy Analysis Report\n\n");
    out.push_str(&format!(
        "Generated on: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str("## Simulation Parameters\n\n");
    out.push_str(&format!("- Initial amount: {}\n", format_money(report.config.initial_amount)));
    out.push_str(&format!(
        "- Monthly contribution: {}\n",
        format_money(report.config.monthly_contribution)
    ));
    out.push_str(&format!(
        "- Annual risk-free rate: {}\n",
        format_pct(report.config.annual_risk_free_rate)
    ));
    if let (Some(first), Some(last)) = (report.prices.first(), report.prices.last()) {
        out.push_str(&format!(
            "- Period: {} to {} ({} trading days)\n",
            first.date,
            last.date,
            report.prices.len()
        ));
    }
    let cash_only = report
        .global_contributions
        .last()
        .map_or(report.config.initial_amount, |c| c.cumulative);
    out.push_str(&format!("- Cash-only total: {}\n\n", format_money(cash_only)));

    out.push_str("## Performance Metrics\n\n");
    for strategy in &report.strategies {
        format_strategy(&mut out, strategy);
    }

    if !report.failed.is_empty() {
        out.push_str("## Failed Strategies\n\n");
        for f in &report.failed {
            out.push_str(&format!("- {}: {}\n", f.name, f.reason));
        }
        out.push('\n');
    }

    out.push_str("## Portfolio Performance Visualization\n\n");
    out.push_str(&format!("![Portfolio Analysis]({CHART_FILE})\n"));
    out
}
