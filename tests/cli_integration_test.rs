//! CLI integration tests for the run, optimize and validate commands.
//!
//! Tests cover:
//! - Strategy and search-grid construction from INI sections
//! - Data port selection
//! - Full pipeline with MockDataPort and MockReportPort
//! - Auto parameter resolution and date alignment
//! - End-to-end runs with real CSV and INI files on disk

mod common;

use clap::Parser;
use common::*;
use rotasim::adapters::file_config_adapter::FileConfigAdapter;
use rotasim::cli::{self, Cli};
use rotasim::domain::error::RotasimError;
use rotasim::domain::indicator::MovingAverageKind;
use rotasim::domain::strategy::StrategyKind;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn same_exit_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

const VALID_INI: &str = r#"
[data]
source = csv
path = DATA_DIR
symbol = NDX.INDX

[search]
window_sizes = 10:50:10
leverages = 2, 3
parallel = true

[backtest]
strategies = hold, broker_3x, wikifolio_3x

[strategy.hold]
label = Buy and Hold
kind = buy_and_hold
ter = 0.002

[strategy.broker_3x]
label = Rotary Broker 3x
kind = rotary
leverage = 3
window_size = auto
ter = 0.0075
spread = 0.0015
tax_at_rotation = true

[strategy.wikifolio_3x]
label = Rotary Wikifolio 3x
kind = rotary
leverage = 3
window_size = auto
ter = 0.0075
spread = 0.0015
certificate_fee = 0.0095
performance_fee = 0.05
moving_average = ema

[report]
output = growth.svg
log_scale = true
"#;

fn config(content: &str) -> FileConfigAdapter {
    FileConfigAdapter::from_string(content).unwrap()
}

fn wave_port(n: usize) -> MockDataPort {
    MockDataPort::new().with_bars("NDX.INDX", bars_from_closes(&wave_closes(n)))
}

mod config_building {
    use super::*;

    #[test]
    fn rotary_spec_reads_costs() {
        let spec = cli::build_strategy_spec(&config(VALID_INI), "wikifolio_3x").unwrap();
        assert_eq!(spec.label, "Rotary Wikifolio 3x");
        assert_eq!(spec.kind, StrategyKind::Rotary);
        assert_eq!(spec.config.leverage, 3.0);
        assert_eq!(spec.config.ter, 0.0075);
        assert_eq!(spec.config.spread, 0.0015);
        assert_eq!(spec.config.certificate_fee, 0.0095);
        assert_eq!(spec.config.performance_fee, 0.05);
        assert!(!spec.config.tax_at_rotation);
        assert_eq!(spec.config.moving_average, MovingAverageKind::Exponential);
        assert_eq!(spec.config.window_size, None);
        assert!(spec.search_window);
        assert!(!spec.search_leverage);
        assert!(spec.needs_search());
    }

    #[test]
    fn buy_and_hold_spec_has_no_warmup() {
        let spec = cli::build_strategy_spec(&config(VALID_INI), "hold").unwrap();
        assert_eq!(spec.kind, StrategyKind::BuyAndHold);
        assert_eq!(spec.config.leverage, 1.0);
        assert_eq!(spec.config.ter, 0.002);
        assert_eq!(spec.warmup(), 0);
        assert!(!spec.needs_search());
    }

    #[test]
    fn label_defaults_to_name() {
        let ini = VALID_INI.replace("label = Buy and Hold\n", "");
        let spec = cli::build_strategy_spec(&config(&ini), "hold").unwrap();
        assert_eq!(spec.label, "hold");
    }

    #[test]
    fn invalid_section_is_rejected() {
        let ini = VALID_INI.replace("ter = 0.002", "ter = 2");
        let err = cli::build_strategy_spec(&config(&ini), "hold").unwrap_err();
        assert!(matches!(err, RotasimError::ConfigInvalid { key, .. } if key == "ter"));
    }

    #[test]
    fn grid_keeps_fixed_leverage() {
        let cfg = config(VALID_INI);
        let spec = cli::build_strategy_spec(&cfg, "broker_3x").unwrap();
        let grid = cli::build_search_grid(&cfg, &spec, false).unwrap();
        assert_eq!(grid.window_sizes, vec![10, 20, 30, 40]);
        assert_eq!(grid.leverages, vec![3.0]);
        assert!(grid.parallel);

        let sequential = cli::build_search_grid(&cfg, &spec, true).unwrap();
        assert!(!sequential.parallel);
    }

    #[test]
    fn grid_keeps_fixed_window() {
        let ini = VALID_INI
            .replace("leverage = 3\nwindow_size = auto\nter = 0.0075\nspread = 0.0015\ntax", "leverage = auto\nwindow_size = 200\nter = 0.0075\nspread = 0.0015\ntax");
        let cfg = config(&ini);
        let spec = cli::build_strategy_spec(&cfg, "broker_3x").unwrap();
        assert!(spec.search_leverage);
        assert!(!spec.search_window);
        let grid = cli::build_search_grid(&cfg, &spec, false).unwrap();
        assert_eq!(grid.window_sizes, vec![200]);
        assert_eq!(grid.leverages, vec![2.0, 3.0]);
    }

    #[test]
    fn unknown_data_source_rejected() {
        let ini = VALID_INI.replace("source = csv", "source = ftp");
        let err = cli::build_data_port(&config(&ini)).err().unwrap();
        assert!(matches!(err, RotasimError::ConfigInvalid { key, .. } if key == "source"));
    }

    #[cfg(not(feature = "marketstack"))]
    #[test]
    fn marketstack_needs_feature() {
        let ini = VALID_INI.replace("source = csv", "source = marketstack");
        let err = cli::build_data_port(&config(&ini)).err().unwrap();
        assert!(matches!(err, RotasimError::DataSource { .. }));
    }
}

mod pipeline {
    use super::*;

    #[test]
    fn runs_every_strategy_in_listed_order() {
        let report = MockReportPort::default();
        let outcomes =
            cli::run_pipeline(&config(VALID_INI), &wave_port(400), &report, None, false).unwrap();

        let labels: Vec<&str> = outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Buy and Hold", "Rotary Broker 3x", "Rotary Wikifolio 3x"]);

        let written = report.written.borrow();
        assert_eq!(written.len(), 1);
        let (path, log_scale, curves) = &written[0];
        assert_eq!(path, Path::new("growth.svg"));
        assert!(*log_scale);
        assert_eq!(curves.len(), 3);
        assert_eq!(curves[1].label, "Rotary Broker 3x");
    }

    #[test]
    fn curves_share_start_and_end() {
        let report = MockReportPort::default();
        let outcomes =
            cli::run_pipeline(&config(VALID_INI), &wave_port(400), &report, None, true).unwrap();

        let first = &outcomes[0].result.trajectory;
        for o in &outcomes[1..] {
            assert_eq!(o.result.trajectory.dates, first.dates);
        }
        // warm-up is at least the smallest searched window
        assert!(first.dates[0] >= date(2020, 1, 11));
        assert_eq!(*first.dates.last().unwrap(), date(2020, 1, 1) + chrono::Duration::days(399));
    }

    #[test]
    fn buy_and_hold_starts_after_largest_fixed_window() {
        let ini = VALID_INI
            .replace("window_size = auto\nter = 0.0075\nspread = 0.0015\ntax", "window_size = 30\nter = 0.0075\nspread = 0.0015\ntax")
            .replace("window_size = auto", "window_size = 45");
        let report = MockReportPort::default();
        let outcomes = cli::run_pipeline(&config(&ini), &wave_port(200), &report, None, false).unwrap();

        for o in &outcomes {
            assert_eq!(o.result.trajectory.dates[0], date(2020, 1, 1) + chrono::Duration::days(45));
            assert_eq!(o.result.trajectory.len(), 155);
        }
    }

    #[test]
    fn output_override_wins() {
        let report = MockReportPort::default();
        cli::run_pipeline(
            &config(VALID_INI),
            &wave_port(300),
            &report,
            Some(Path::new("custom.svg")),
            false,
        )
        .unwrap();
        assert_eq!(report.written.borrow()[0].0, Path::new("custom.svg"));
    }

    #[test]
    fn no_output_skips_chart() {
        let ini = VALID_INI.replace("output = growth.svg\n", "");
        let report = MockReportPort::default();
        let outcomes = cli::run_pipeline(&config(&ini), &wave_port(300), &report, None, false).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(report.written.borrow().is_empty());
    }

    #[test]
    fn auto_leverage_resolves_from_grid() {
        let ini = VALID_INI
            .replace("strategies = hold, broker_3x, wikifolio_3x", "strategies = broker_3x")
            .replace("leverage = 3\nwindow_size = auto\nter = 0.0075\nspread = 0.0015\ntax", "leverage = auto\nwindow_size = 20\nter = 0.0075\nspread = 0.0015\ntax");
        let rising: Vec<f64> = (0..200).map(|i| 100.0 + i as f64).collect();
        let port = MockDataPort::new().with_bars("NDX.INDX", bars_from_closes(&rising));

        let cfg = config(&ini);
        let mut specs = vec![cli::build_strategy_spec(&cfg, "broker_3x").unwrap()];
        let series = port.data_series("NDX.INDX");
        cli::resolve_parameters(&series, &mut specs, &cfg, false).unwrap();
        assert_eq!(specs[0].config.leverage, 3.0);
        assert_eq!(specs[0].config.window_size, Some(20));
    }

    #[test]
    fn identical_profiles_resolve_identically() {
        let ini = VALID_INI.replace(
            "strategies = hold, broker_3x, wikifolio_3x",
            "strategies = broker_3x, broker_copy",
        ) + "\n[strategy.broker_copy]\nkind = rotary\nleverage = 3\nwindow_size = auto\nter = 0.0075\nspread = 0.0015\ntax_at_rotation = true\n";
        let cfg = config(&ini);
        let mut specs = vec![
            cli::build_strategy_spec(&cfg, "broker_3x").unwrap(),
            cli::build_strategy_spec(&cfg, "broker_copy").unwrap(),
        ];
        let series = wave_port(300).data_series("NDX.INDX");
        cli::resolve_parameters(&series, &mut specs, &cfg, false).unwrap();
        assert!(specs[0].config.window_size.is_some());
        assert_eq!(specs[0].config, specs[1].config);
    }

    #[test]
    fn too_short_series_fails() {
        let ini = VALID_INI
            .replace("strategies = hold, broker_3x, wikifolio_3x", "strategies = hold, broker_3x")
            .replace("leverage = 3\nwindow_size = auto", "leverage = 3\nwindow_size = 50");
        let report = MockReportPort::default();
        let err = cli::run_pipeline(&config(&ini), &wave_port(30), &report, None, false).unwrap_err();
        assert!(matches!(err, RotasimError::InsufficientData { bars: 30, minimum: 52 }));
    }

    #[test]
    fn data_errors_propagate() {
        let port = MockDataPort::new().with_error("NDX.INDX", "connection refused");
        let report = MockReportPort::default();
        let err = cli::run_pipeline(&config(VALID_INI), &port, &report, None, false).unwrap_err();
        assert!(matches!(err, RotasimError::DataSource { .. }));
    }

    #[test]
    fn optimize_searches_full_grid() {
        let (spec, best) =
            cli::optimize_strategy(&config(VALID_INI), &wave_port(400), "broker_3x", true).unwrap();
        assert_eq!(spec.label, "Rotary Broker 3x");
        assert!([10, 20, 30, 40].contains(&best.window_size));
        assert!([2.0, 3.0].contains(&best.leverage));
    }

    #[test]
    fn optimize_rejects_buy_and_hold() {
        let err = cli::optimize_strategy(&config(VALID_INI), &wave_port(400), "hold", true)
            .unwrap_err();
        assert!(matches!(err, RotasimError::InvalidParameter { .. }));
    }
}

mod end_to_end {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, tempfile::NamedTempFile) {
        let dir = TempDir::new().unwrap();
        let bars = bars_from_closes(&wave_closes(300));
        fs::write(dir.path().join("NDX.INDX.csv"), csv_content(&bars)).unwrap();
        let ini = VALID_INI.replace("DATA_DIR", &dir.path().display().to_string());
        let file = write_temp_ini(&ini);
        (dir, file)
    }

    #[test]
    fn run_writes_chart() {
        let (dir, ini) = setup();
        let svg = dir.path().join("out.svg");
        let cli = Cli::parse_from([
            "rotasim",
            "run",
            "-c",
            ini.path().to_str().unwrap(),
            "-o",
            svg.to_str().unwrap(),
            "--sequential",
        ]);
        assert!(same_exit_code(cli::run(cli), ExitCode::SUCCESS));

        let content = fs::read_to_string(&svg).unwrap();
        assert_eq!(content.matches("<polyline").count(), 3);
        assert!(content.contains("Rotary Wikifolio 3x"));
    }

    #[test]
    fn validate_accepts_valid_config() {
        let (_dir, ini) = setup();
        let cli = Cli::parse_from(["rotasim", "validate", "-c", ini.path().to_str().unwrap()]);
        assert!(same_exit_code(cli::run(cli), ExitCode::SUCCESS));
    }

    #[test]
    fn validate_reports_config_errors() {
        let ini = write_temp_ini(&VALID_INI.replace("symbol = NDX.INDX\n", ""));
        let cli = Cli::parse_from(["rotasim", "validate", "-c", ini.path().to_str().unwrap()]);
        assert!(same_exit_code(cli::run(cli), ExitCode::from(2)));
    }

    #[test]
    fn missing_csv_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&VALID_INI.replace("DATA_DIR", &dir.path().display().to_string()));
        let cli = Cli::parse_from(["rotasim", "run", "-c", ini.path().to_str().unwrap()]);
        assert!(same_exit_code(cli::run(cli), ExitCode::from(3)));
    }

    #[test]
    fn optimize_command_succeeds() {
        let (_dir, ini) = setup();
        let cli = Cli::parse_from([
            "rotasim",
            "optimize",
            "-c",
            ini.path().to_str().unwrap(),
            "-s",
            "wikifolio_3x",
        ]);
        assert!(same_exit_code(cli::run(cli), ExitCode::SUCCESS));
    }

    #[test]
    fn missing_config_file_fails() {
        assert!(cli::load_config(Path::new("/nonexistent/rotasim.ini")).is_err());
    }
}
