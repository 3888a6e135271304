use clap::Parser;
use std::process::ExitCode;
use viz_meshgen::cli::{run_meshgen, MeshgenArgs};

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = match MeshgenArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run_meshgen(&args) {
        Ok(paths) => {
            log::info!("[meshgen] {} pose file(s) written", paths.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
