use std::process::ExitCode;

fn main() -> ExitCode {
    barista_cli::run()
}
