use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let config = cli.config.as_deref();
    let exit_code = match cli.command {
        cli::Command::Scan(args) => commands::scan::execute(args, config),
        cli::Command::Select(args) => commands::select::execute(args, config),
        cli::Command::Check(args) => commands::check::execute(args),
    };

    std::process::exit(exit_code);
}
