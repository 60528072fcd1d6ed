//! CLI integration tests: real INI files and CSV data on disk, driven
//! through `cli::run`.

mod common;

use chrono::{Duration, Local};
use common::*;
use marketlens::adapters::file_config_adapter::FileConfigAdapter;
use marketlens::cli::{self, Cli, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SNAPSHOT_CSV: &str = "\
Ticker,Nom_complet,Secteur,Pays,Devise,Capitalisation_boursiere,PER_historique,Rendement_du_dividende,Variation_52_semaines,Beta
MC.PA,LVMH,Consumer Cyclical,France,EUR,350000000000,25.1,1.8,-12.5,1.1
TTE.PA,TotalEnergies,Energy,France,EUR,140000000000,7.9,5.1,4.2,0.7
AAPL,Apple Inc.,Technology,United States,USD,3000000000000,31.2,0.5,18.0,1.2
BAD.PA,Broken,,France,EUR,N/A,,,,
";

const ALLOCATION_CSV: &str = "\
Ticker,Prix actuel,Secteur,Pays,Rendement du dividende,Beta
A.PA,100,Technology,France,1.5,1.2
B.PA,50,Energy,France,4.0,0.8
C.PA,25,Energy,Germany,
";

fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(expected)));
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("prices")).unwrap();
        write_file(dir.path(), "snapshot.csv", SNAPSHOT_CSV);
        write_file(dir.path(), "selected.csv", ALLOCATION_CSV);
        let ws = Self { dir };
        ws.prices("A.PA", &[("2024-01-02", 100.0), ("2024-01-03", 110.0), ("2024-01-04", 120.0)]);
        ws.prices("B.PA", &[("2024-01-02", 50.0), ("2024-01-03", 45.0), ("2024-01-04", 40.0)]);
        ws
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn prices(&self, ticker: &str, rows: &[(&str, f64)]) {
        let mut content = String::from("Date,Close\n");
        for (date, close) in rows {
            content.push_str(&format!("{date},{close}\n"));
        }
        write_file(&self.path("prices"), &format!("{ticker}.csv"), &content);
    }

    fn config(&self, extra: &str) -> PathBuf {
        self.config_with("", extra)
    }

    /// `data_extra` lands inside `[data]`; `extra` is appended at the end.
    fn config_with(&self, data_extra: &str, extra: &str) -> PathBuf {
        let content = format!(
            "[data]\n\
             source = csv\n\
             {data_extra}\n\
             snapshot_path = {}\n\
             allocation_path = {}\n\
             prices_dir = {}\n\
             \n\
             [portfolio]\n\
             initial_investment = 900\n\
             start_date = 2024-01-02\n\
             end_date = 2024-01-31\n\
             max_workers = 2\n\
             fetch_timeout_secs = 5\n\
             {extra}",
            self.path("snapshot.csv").display(),
            self.path("selected.csv").display(),
            self.path("prices").display(),
        );
        write_file(self.dir.path(), "marketlens.ini", &content)
    }
}

fn run(command: Command) -> ExitCode {
    cli::run(Cli { command })
}

mod config_loading {
    use super::*;
    use marketlens::ports::config_port::ConfigPort;

    #[test]
    fn written_config_parses() {
        let ws = Workspace::new();
        let config = FileConfigAdapter::from_file(ws.config("")).unwrap();
        assert_eq!(config.get_string("data", "source"), Some("csv".into()));
        assert_eq!(cli::build_allocation_config(&config).initial_investment, 900.0);
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let code = run(Command::Validate {
            config: PathBuf::from("/nonexistent/marketlens.ini"),
        });
        assert_exit(code, 2);
    }

    #[test]
    fn log_filter_read_from_config() {
        let ws = Workspace::new();
        let path = ws.config("\n[logging]\nfilter = marketlens=debug\n");
        assert_eq!(cli::config_log_filter(&path).as_deref(), Some("marketlens=debug"));
        assert_eq!(cli::config_log_filter(Path::new("/nonexistent.ini")), None);
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let ws = Workspace::new();
        assert_exit(run(Command::Validate { config: ws.config("") }), 0);
    }

    #[test]
    fn bad_yield_scale_fails() {
        let ws = Workspace::new();
        let path = ws.config_with("snapshot_yield_scale = basis_points", "");
        assert_exit(run(Command::Validate { config: path }), 2);
    }

    #[test]
    fn nonpositive_rate_fails() {
        let ws = Workspace::new();
        let path = ws.config("\n[rates]\nusd = -1\n");
        assert_exit(run(Command::Validate { config: path }), 2);
    }

    #[test]
    fn empty_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.ini", "[portfolio]\n");
        assert_exit(run(Command::Validate { config: path }), 2);
    }
}

mod market_command {
    use super::*;

    #[test]
    fn market_writes_prepared_table() {
        let ws = Workspace::new();
        let output = ws.path("prepared.csv");
        let code = run(Command::Market {
            config: ws.config(""),
            sector: vec![],
            country: vec![],
            min_cap: None,
            output: Some(output.clone()),
        });
        assert_exit(code, 0);

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        // Header plus three rows; BAD.PA has no usable market cap.
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("AAPL,"));
        assert!(!written.contains("BAD.PA"));
    }

    #[test]
    fn market_with_missing_snapshot_has_no_data() {
        let ws = Workspace::new();
        std::fs::remove_file(ws.path("snapshot.csv")).unwrap();
        let code = run(Command::Market {
            config: ws.config(""),
            sector: vec![],
            country: vec![],
            min_cap: None,
            output: None,
        });
        assert_exit(code, 5);
    }

    #[test]
    fn assess_known_ticker() {
        let ws = Workspace::new();
        let code = run(Command::Assess {
            config: ws.config(""),
            ticker: "TTE.PA".into(),
        });
        assert_exit(code, 0);
    }

    #[test]
    fn assess_unknown_ticker_is_no_data() {
        let ws = Workspace::new();
        let code = run(Command::Assess {
            config: ws.config(""),
            ticker: "NOPE".into(),
        });
        assert_exit(code, 5);
    }
}

mod portfolio_command {
    use super::*;

    #[test]
    fn portfolio_writes_value_series() {
        let ws = Workspace::new();
        let output = ws.path("series.csv");
        let code = run(Command::Portfolio {
            config: ws.config(""),
            start: None,
            end: None,
            output: Some(output.clone()),
        });
        assert_exit(code, 0);

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "date,value");
        // C.PA has no price file and holds its 300 EUR throughout.
        assert_eq!(lines[1], "2024-01-02,900.0");
        assert_eq!(lines[3], "2024-01-04,900.0");
    }

    #[test]
    fn command_line_window_overrides_config() {
        let ws = Workspace::new();
        let code = run(Command::Portfolio {
            config: ws.config(""),
            start: Some(date(2024, 2, 1)),
            end: Some(date(2024, 1, 1)),
            output: None,
        });
        assert_exit(code, 2);
    }

    #[test]
    fn empty_allocation_is_no_data() {
        let ws = Workspace::new();
        write_file(ws.dir.path(), "selected.csv", "Ticker,Prix actuel\n");
        let code = run(Command::Portfolio {
            config: ws.config(""),
            start: None,
            end: None,
            output: None,
        });
        assert_exit(code, 5);
    }

    #[test]
    fn valuation_succeeds_with_partial_prices() {
        let ws = Workspace::new();
        let code = run(Command::Valuation {
            config: ws.config(""),
            as_of: Some(date(2024, 1, 5)),
        });
        assert_exit(code, 0);
    }
}

mod tape_command {
    use super::*;

    #[test]
    fn tape_prints_recent_quotes() {
        let ws = Workspace::new();
        let today = Local::now().date_naive();
        let d1 = (today - Duration::days(2)).format("%Y-%m-%d").to_string();
        let d2 = (today - Duration::days(1)).format("%Y-%m-%d").to_string();
        ws.prices("^FCHI", &[(&d1, 7500.0), (&d2, 7560.0)]);

        let code = run(Command::Tape {
            config: ws.config("\n[tape]\ntickers = CAC 40:^FCHI\nttl_secs = 60\n"),
        });
        assert_exit(code, 0);
    }

    #[test]
    fn tape_without_quotes_is_no_data() {
        let ws = Workspace::new();
        let code = run(Command::Tape {
            config: ws.config("\n[tape]\ntickers = MISSING\n"),
        });
        assert_exit(code, 5);
    }
}
