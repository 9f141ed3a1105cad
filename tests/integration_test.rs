//! End-to-end simulation tests.
//!
//! Tests cover:
//! - Single trade valuation, monthly contributions and rejected trades
//! - Undefined metrics on degenerate inputs
//! - Strategy independence and the shared contribution log
//! - Pipeline failure isolation through `cli::simulate`

mod common;

use approx::assert_relative_eq;
use chrono::Datelike;
use common::*;
use dcasim::cli;
use dcasim::domain::error::{DcasimError, LedgerError};
use dcasim::domain::metrics::Metrics;
use dcasim::domain::simulation::Simulator;

fn metrics_for(sim: &Simulator, name: &str) -> Metrics {
    let run = sim.result(name).unwrap();
    let contributions = sim.ledger().contributions(name).unwrap();
    Metrics::compute(
        &run.series,
        contributions,
        sim.config().initial_amount,
        sim.config().annual_risk_free_rate,
    )
}

mod scenarios {
    use super::*;

    #[test]
    fn single_trade_valuation() {
        let series = prices(&[
            ("2023-01-02", 100.0),
            ("2023-01-03", 101.0),
            ("2023-01-04", 102.0),
            ("2023-01-05", 103.0),
        ]);
        let mut sim = Simulator::new(config(10_000.0, 1000.0), series);
        let run = sim
            .run_strategy("single", &[trade("2023-01-03", 1000.0)])
            .unwrap();

        let day2 = run.series.record(1).unwrap();
        assert_relative_eq!(day2.cash_value, 9000.0);
        assert_relative_eq!(day2.position_value, 1000.0, max_relative = 1e-12);

        let expected = 9000.0 + 1000.0 / 101.0 * 103.0;
        assert_relative_eq!(run.series.final_value().unwrap(), expected, max_relative = 1e-12);
        assert_relative_eq!(
            sim.ledger().position("single").unwrap(),
            1000.0 / 101.0,
            max_relative = 1e-12
        );
        assert!(sim.ledger().contributions("single").unwrap().is_empty());
    }

    #[test]
    fn two_month_boundaries_two_contributions() {
        let series = prices(&[
            ("2023-01-31", 100.0),
            ("2023-02-01", 100.0),
            ("2023-02-02", 100.0),
            ("2023-03-01", 100.0),
            ("2023-03-02", 100.0),
        ]);
        let mut sim = Simulator::new(config(10_000.0, 1000.0), series);
        sim.run_strategy("hold", &[trade("2023-01-31", 0.0)]).unwrap();

        let log = sim.ledger().contributions("hold").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].date, date(2023, 2, 1));
        assert_relative_eq!(log[0].cumulative, 11_000.0);
        assert_eq!(log[1].date, date(2023, 3, 1));
        assert_relative_eq!(log[1].cumulative, 12_000.0);

        let m = metrics_for(&sim, "hold");
        assert_relative_eq!(m.total_contributions, 12_000.0);
        assert_relative_eq!(m.final_value, 12_000.0);
    }

    #[test]
    fn unaffordable_trade_is_skipped_whole() {
        let series = prices(&[
            ("2023-01-02", 100.0),
            ("2023-01-03", 110.0),
            ("2023-01-04", 120.0),
        ]);
        let mut sim = Simulator::new(config(1000.0, 0.0), series);
        let run = sim
            .run_strategy("greedy", &[trade("2023-01-03", 5000.0)])
            .unwrap();

        assert_eq!(run.series.len(), 3);
        assert_relative_eq!(run.series.total_values[1], 1000.0);
        assert_eq!(run.series.position_values[1], 0.0);
        assert_eq!(run.rejected_trades.len(), 1);
        assert!(matches!(
            run.rejected_trades[0].reason,
            LedgerError::InsufficientFunds { .. }
        ));
        assert_eq!(sim.ledger().position("greedy").unwrap(), 0.0);
        assert_relative_eq!(sim.ledger().cash("greedy").unwrap(), 1000.0);
    }

    #[test]
    fn degenerate_inputs_give_nan_metrics() {
        let series = prices(&[("2023-01-02", 100.0)]);
        let mut sim = Simulator::new(config(1000.0, 100.0), series);
        sim.run_strategy("one_day", &[trade("2023-01-02", 500.0)])
            .unwrap();

        let m = metrics_for(&sim, "one_day");
        assert!(m.sharpe_ratio.is_nan());
        assert!(m.money_weighted_return.is_nan());
        assert!(m.cagr.is_nan());
        assert_eq!(m.max_drawdown, 0.0);
        assert_relative_eq!(m.final_value, 1000.0);
    }

    #[test]
    fn contribution_day_return_excludes_new_cash() {
        let series = prices(&[("2023-01-31", 100.0), ("2023-02-01", 110.0)]);
        let mut sim = Simulator::new(config(10_000.0, 1000.0), series);
        let run = sim
            .run_strategy("all_in", &[trade("2023-01-31", 10_000.0)])
            .unwrap();

        // 100 shares at 110 plus the new 1000 in cash
        assert_relative_eq!(run.series.total_values[1], 12_000.0, max_relative = 1e-12);
        // (12000 - 1000) / 11000 - 1
        assert_relative_eq!(run.series.returns[1], 0.0, epsilon = 1e-12);
    }
}

mod multi_strategy {
    use super::*;

    #[test]
    fn strategies_do_not_share_balances() {
        let series = prices(&[
            ("2023-01-02", 100.0),
            ("2023-01-03", 100.0),
            ("2023-01-04", 200.0),
        ]);
        let mut sim = Simulator::new(config(1000.0, 0.0), series);
        sim.run_strategy("buyer", &[trade("2023-01-02", 1000.0)])
            .unwrap();
        sim.run_strategy("holder", &[trade("2023-01-02", 0.0)])
            .unwrap();

        assert_relative_eq!(sim.result("buyer").unwrap().series.final_value().unwrap(), 2000.0);
        assert_relative_eq!(sim.result("holder").unwrap().series.final_value().unwrap(), 1000.0);
        assert_relative_eq!(sim.ledger().cash("holder").unwrap(), 1000.0);
        assert_eq!(sim.ledger().strategy_ids(), ["buyer", "holder"]);
    }

    #[test]
    fn global_log_is_one_entry_per_month() {
        let series = weekday_prices(date(2023, 1, 2), date(2023, 6, 30), 100.0, 0.1);
        let first_days: Vec<_> = series
            .trading_calendar()
            .into_iter()
            .filter(|d| d.day() == 1)
            .collect();

        let mut sim = Simulator::new(config(5000.0, 500.0), series);
        for name in ["a", "b", "c"] {
            sim.run_strategy(name, &[trade("2023-01-02", 1000.0)])
                .unwrap();
        }

        let global = sim.ledger().global_contributions();
        assert_eq!(global.len(), first_days.len());
        assert_eq!(
            global.iter().map(|c| c.date).collect::<Vec<_>>(),
            first_days
        );
        let last = global.last().unwrap();
        assert_relative_eq!(last.cumulative, 5000.0 + 500.0 * first_days.len() as f64);
    }

    #[test]
    fn two_year_dca_produces_finite_metrics() {
        let series = weekday_prices(date(2022, 1, 3), date(2023, 12, 29), 100.0, 0.05);
        let monthly_buys: Vec<_> = series
            .trading_calendar()
            .into_iter()
            .filter(|d| d.day() == 1)
            .map(|d| dcasim::domain::trade::TradeInstruction {
                date: d,
                amount: 1000.0,
            })
            .collect();
        let mut trades = vec![trade("2022-01-03", 10_000.0)];
        trades.extend(monthly_buys);

        let mut sim = Simulator::new(config(10_000.0, 1000.0), series);
        let run = sim.run_strategy("dca", &trades).unwrap();
        assert!(run.rejected_trades.is_empty());
        assert!(run.skipped_days.is_empty());

        let m = metrics_for(&sim, "dca");
        assert!(m.money_weighted_return.is_finite());
        assert!(m.money_weighted_return > 0.0);
        assert!(m.sharpe_ratio.is_finite());
        assert!(m.cagr.is_finite());
        assert!((0.0..=1.0).contains(&m.max_drawdown));
        assert!(m.final_value > m.total_contributions);
    }
}

mod pipeline {
    use super::*;
    use std::path::Path;

    fn base_prices() -> dcasim::domain::price::PriceSeries {
        prices(&[
            ("2023-01-30", 100.0),
            ("2023-01-31", 101.0),
            ("2023-02-01", 102.0),
            ("2023-02-02", 103.0),
        ])
    }

    #[test]
    fn failing_strategy_does_not_stop_others() {
        let port = MockDataPort::new(&base_prices())
            .with_strategy("dca", vec![trade("2023-01-30", 1000.0)])
            .with_strategy("empty", Vec::new())
            .with_error("broken", "unreadable file");

        let report = cli::simulate(&port, config(10_000.0, 1000.0), 2).unwrap();

        let names: Vec<_> = report.strategies.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["dca"]);
        let failed: Vec<_> = report.failed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, ["broken", "empty"]);
        assert!(report.failed[0].reason.contains("unreadable file"));
        assert_eq!(report.global_contributions.len(), 1);
    }

    #[test]
    fn no_surviving_strategy_is_an_error() {
        let port = MockDataPort::new(&base_prices()).with_error("broken", "bad");
        let err = cli::simulate(&port, config(10_000.0, 1000.0), 2).unwrap_err();
        assert!(matches!(err, DcasimError::NoResults));
        assert_eq!(err.exit_status(), 4);
    }

    #[test]
    fn run_pipeline_hands_report_to_port() {
        let port = MockDataPort::new(&base_prices())
            .with_strategy("b", vec![trade("2023-01-30", 500.0)])
            .with_strategy("a", vec![trade("2023-01-31", 500.0)]);
        let reporter = CapturingReportPort::new();

        let _ = cli::run_pipeline(&port, &reporter, config(1000.0, 100.0), 2, Path::new("out"));

        let captured = reporter.captured.borrow();
        let report = captured.as_ref().unwrap();
        assert_eq!(report.strategies.len(), 2);
        assert_eq!(report.strategies[0].name, "a");
        assert_eq!(report.strategies[0].rolling.points.len(), 4);
        assert!(report.strategies[0].rolling.latest().is_some());
        assert_eq!(report.prices.len(), 4);
    }
}
