use clap::{Parser, Subcommand};
use shiki_relay::{ConfigCheck, RelayConfig, RelayError, RelayServer, TokenExchanger};

#[derive(Debug, Parser)]
#[command(
    name = "shiki-relay",
    about = "OAuth authorization-code relay between a static front-end and the Shikimori API."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the relay server (the default).
    Serve {
        /// Override the listening port (falls back to PORT, then 3000).
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Verify the registered credentials and redirect URI against Shikimori
    /// without a real authorization code.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // .env is optional; system environment variables always apply.
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::CheckConfig => check_config().await,
    }
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "shiki_relay=info,tower_http=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

async fn serve(port: Option<u16>) -> Result<(), RelayError> {
    let mut config = RelayConfig::from_env();
    if let Some(port) = port {
        config = config.with_port(port);
    }
    config.warn_if_incomplete();

    RelayServer::new(config)?.run().await
}

async fn check_config() -> Result<(), RelayError> {
    let config = RelayConfig::from_env();
    if !config.has_credentials() {
        eprintln!("CLIENT_ID or CLIENT_SECRET is not set; nothing to check.");
        eprintln!("Add them to .env or the environment and run check-config again.");
        std::process::exit(1);
    }

    let environment = shiki_relay::EnvironmentContext::resolve(&config);
    let exchanger = TokenExchanger::new(&config, environment.redirect_uri.clone())?;

    println!("Redirect URI under test: {}", environment.redirect_uri);
    println!("Sending a deliberately bogus code to the token endpoint...");

    match exchanger.self_check().await? {
        ConfigCheck::Ok => {
            println!("Configuration OK: the provider rejected only the test code (invalid_grant).");
            Ok(())
        }
        ConfigCheck::ClientMismatch { description } => {
            eprintln!("Client authentication failed (invalid_client).");
            if let Some(description) = description {
                eprintln!("Provider says: {description}");
            }
            eprintln!("Likely causes:");
            eprintln!("  1. CLIENT_ID or CLIENT_SECRET does not match the Shikimori application");
            eprintln!(
                "  2. The application's redirect URI is not {}",
                environment.redirect_uri
            );
            eprintln!("Check the registration at https://shikimori.one/oauth/applications");
            std::process::exit(1);
        }
        ConfigCheck::Unexpected { detail } => {
            eprintln!("Unexpected answer from the token endpoint: {detail}");
            std::process::exit(1);
        }
    }
}
