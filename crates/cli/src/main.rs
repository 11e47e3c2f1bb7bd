use std::process::ExitCode;

fn main() -> ExitCode {
    autotag_cli::run()
}
