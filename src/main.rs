use clap::Parser;
use tracing::error;

use nsxup::cli::{check, run, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    cli.init_logging();

    let result = match cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Check(command) => check::execute(command).await,
    };

    if let Err(e) = result {
        error!(error = %e, "fatal error");
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}
