use std::process::ExitCode;

use clap::Parser;
use logwatch_cli::Cli;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logwatch_cli::init_tracing(cli.verbose);

    match logwatch_cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
