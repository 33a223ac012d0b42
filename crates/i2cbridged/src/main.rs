use std::process::ExitCode;

fn main() -> ExitCode {
    match i2cbridged::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be installed yet, so report on stderr directly.
            eprintln!("i2cbridged: {error}");
            ExitCode::FAILURE
        }
    }
}
