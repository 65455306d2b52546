use std::process::ExitCode;

fn main() -> ExitCode {
    match modpub::cli::run() {
        Ok(code) => code,
        Err(e) => {
            modpub::ui::output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
