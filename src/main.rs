use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garrison::{Server, ServerConfig};

fn print_usage(program: &str) {
    println!("Usage: {program} [options]");
    println!("Options:");
    println!("  -h, --help            Show this help message");
    println!("  -cp, --configpath     <path> Path to the configuration file");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("garrison");

    let mut config_path: Option<String> = None;
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                print_usage(program);
                return ExitCode::SUCCESS;
            }
            "-cp" | "--configpath" => {
                index += 1;
                match args.get(index) {
                    Some(path) => config_path = Some(path.clone()),
                    None => {
                        eprintln!("Error: --configpath option requires a value.");
                        return ExitCode::FAILURE;
                    }
                }
            }
            unknown => {
                eprintln!("Unknown argument: {unknown}");
                print_usage(program);
                return ExitCode::FAILURE;
            }
        }
        index += 1;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "garrison=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {path}");
            match ServerConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("A fatal error occurred during server startup: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            info!("No configuration file provided, using default configuration.");
            ServerConfig::default()
        }
    };

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("A fatal error occurred during server startup: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = server.bind().await {
        eprintln!("A fatal error occurred during server startup: {e}");
        return ExitCode::FAILURE;
    }

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received.");
        shutdown.cancel();
    });

    if let Err(e) = server.run().await {
        error!("Server terminated with an error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Server shut down gracefully.");
    ExitCode::SUCCESS
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
