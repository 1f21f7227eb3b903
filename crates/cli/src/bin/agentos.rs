use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match agentos_cli::main_entry().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => agentos_cli::report_error(&err),
    }
}
