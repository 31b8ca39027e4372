//! Walletgate binary entry point.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use walletgate_server::{
    cli::{Cli, Commands},
    commands,
    config::{default_config_path, GatewayConfig},
    context::GatewayContext,
    error::{ServerError, ServerResult},
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        print_error(&e);
        std::process::exit(e.exit_code());
    }
}

/// `RUST_LOG` wins when set; otherwise `info`. `--verbose` adds `walletgate=debug`.
fn init_logging(verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if verbose {
        match "walletgate=debug".parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log directive: {}", e),
        }
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Print a user-friendly error message with error code and recovery hint.
fn print_error(e: &ServerError) {
    let code = e.error_code();
    eprintln!("Error [{}]: {}", code, e);
    eprintln!("Hint: {}", code.suggestion());
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Init { force } => {
            println!("{}", commands::init(&config_path, force)?);
        }
        Commands::Tools { json } => {
            let config = GatewayConfig::load(&config_path)?;
            let registry = GatewayContext::registry_from_config(&config)?;
            println!("{}", commands::tools(&registry, json)?);
        }
        Commands::Serve { listen } => {
            let config = GatewayConfig::load(&config_path)?;
            commands::serve(config, listen).await?;
        }
    }
    Ok(())
}
