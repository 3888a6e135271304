use clap::Parser;
use std::process::ExitCode;
use viz_meshgen::cli::{run_validate, ValidateArgs};

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = match ValidateArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if run_validate(&args) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
