use std::process::ExitCode;

fn main() -> ExitCode {
    match sample_join::apps::run_sample_join(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sample_join: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
