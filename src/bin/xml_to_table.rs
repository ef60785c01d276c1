use std::process::ExitCode;

fn main() -> ExitCode {
    match sample_join::apps::run_xml_to_table(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("xml_to_table: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
