use std::process::ExitCode;

fn main() -> ExitCode {
    match voyz_calendar_core::run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("voyz-cal: {err:#}");
            ExitCode::FAILURE
        }
    }
}
