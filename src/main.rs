//! openai-balancer HTTP server
//!
//! Starts an Axum web server that spreads OpenAI-compatible requests across
//! the configured upstream endpoints.

use clap::Parser;
use openai_balancer::cli::{Cli, Command, generate_config_template};
use openai_balancer::{config::Config, handlers, telemetry};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output }) => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    println!("Wrote configuration template to {}", path);
                }
                None => print!("{}", template),
            }
            Ok(())
        }
        Some(Command::Check) => {
            let config = Config::from_file(&cli.config)?;
            println!(
                "{}: OK ({} strategy)",
                cli.config,
                config.balancer.strategy()?
            );
            for (index, endpoint) in config.balancer.endpoints().iter().enumerate() {
                println!(
                    "  #{} {} model={}",
                    index,
                    endpoint.base_url(),
                    endpoint.model().unwrap_or("<unset>")
                );
            }
            Ok(())
        }
        Some(Command::Serve) | None => serve(&cli.config).await,
    }
}

async fn serve(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(config_path)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting openai-balancer on {}:{}",
        config.server.host,
        config.server.port
    );

    let state = handlers::AppState::new(&config.balancer)?;
    let app = handlers::router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
