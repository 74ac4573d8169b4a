use clap::CommandFactory;
use env_logger::Env;
use imgpro::chain::{execute_chain, split_chain};
use imgpro::cli::{Args, Commands};
use imgpro::error::{ImgProError, EXIT_SUCCESS};
use log::{error, Level};
use std::ffi::OsString;
use std::io::Write;
use std::process;

fn main() {
    init_logging();

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    if split_chain(&args).is_empty() {
        let _ = Args::command().print_help();
        process::exit(EXIT_SUCCESS);
    }

    let code = match execute_chain(&args, |segment: &[OsString]| {
        Commands::parse_segment(segment)
    }) {
        Ok(_) => EXIT_SUCCESS,
        Err(err) => report(err),
    };
    process::exit(code);
}

fn report(err: ImgProError) -> i32 {
    let code = err.exit_code();
    match err {
        // clap renders its own usage and help text
        ImgProError::Cli(e) => {
            let _ = e.print();
        }
        other => error!("{}", other),
    }
    code
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    builder.format(|buf, record| {
        let label = match record.level() {
            Level::Error => "Error",
            Level::Warn => "Warning",
            Level::Info => "Info",
            Level::Debug => "Debug",
            Level::Trace => "Trace",
        };
        writeln!(buf, "{}: {}", label, record.args())
    });
    let _ = builder.try_init();
}
