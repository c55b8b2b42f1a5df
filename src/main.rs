use std::process::ExitCode;

fn main() -> ExitCode {
    // Silent unless RUST_LOG is set.
    pretty_env_logger::init();

    match traffic_survey::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
