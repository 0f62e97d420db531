// hostpack - entry point

use hostpack::cli::CliHandler;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let handler = CliHandler::new();

    match handler.run(std::env::args().collect()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
