use std::process::ExitCode;

mod config;
mod run;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = match args.as_slice() {
        [_, flag, path] if matches!(flag.as_str(), "-c" | "--config") => path,
        _ => {
            eprintln!("Usage: eddy -c <config.json>");
            return ExitCode::FAILURE;
        }
    };

    let config = match config::Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("eddy: {e}");
            return ExitCode::FAILURE;
        }
    };
    let scene = match config.scene() {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("eddy: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = run::run(&config, &scene);
    if report.io_errors == 0 {
        ExitCode::SUCCESS
    } else {
        eprintln!("eddy: {} output operation(s) failed", report.io_errors);
        ExitCode::from(2)
    }
}
