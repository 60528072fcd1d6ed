use clap::Parser;
use marketlens::cli::{Cli, config_log_filter, init_logging, run};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(config_log_filter(cli.command.config_path()).as_deref());
    run(cli)
}
