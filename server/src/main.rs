use clap::Parser;
use hangman_server::config::Config;
use hangman_server::network::Server;
use hangman_server::words::WordList;
use log::{error, info};
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hangman server", long_about = None)]
struct Args {
    /// Word list file, read from stdin when omitted
    word_file: Option<PathBuf>,
}

/// Main-method of the application.
/// Parses the command line, loads the word list, then serves clients until
/// SIGINT or SIGTERM.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let mut words = match &args.word_file {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                error!("Could not read file {}: {}", path.display(), e);
                e
            })?;
            WordList::read(file)?
        }
        None => {
            info!("Reading words from stdin");
            WordList::read(io::stdin().lock())?
        }
    };

    if config.shuffle {
        words.shuffle(&mut rand::thread_rng());
        info!("Word list shuffled");
    }

    let server = Server::bind(&config, words).await?;
    server.run(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Completes on the first SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = terminate.recv() => info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => error!("Could not install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received SIGINT");
}
