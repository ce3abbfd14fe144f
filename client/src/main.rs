use clap::Parser;
use hangman_client::game::ClientSession;
use hangman_client::network::{server_addr, ClientError, Connection};
use log::{error, info};
use tokio::sync::watch;

const SIGINT: i32 = 2;
const SIGTERM: i32 = 15;

/// Interactive hangman client. The server address is taken from HANGMAN_ADDR.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let _args = Args::parse();

    let (interrupt_tx, interrupts) = watch::channel(None);
    tokio::spawn(forward_interrupts(interrupt_tx));

    let code = match play(interrupts).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("hangman-client: {}", e);
            1
        }
    };

    std::process::exit(code);
}

async fn play(interrupts: watch::Receiver<Option<i32>>) -> Result<i32, ClientError> {
    let addr = server_addr();
    info!("Connecting to: {}", addr);
    let connection = Connection::connect(&addr).await?;

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let session = ClientSession::new(
        connection,
        input,
        std::io::stdout(),
        interrupts,
        std::process::id(),
    );

    let outcome = session.run().await?;
    Ok(outcome.exit_code())
}

/// Records the first SIGINT or SIGTERM for the session driver
async fn forward_interrupts(interrupt_tx: watch::Sender<Option<i32>>) {
    let signal = wait_for_signal().await;
    info!("Received signal {}", signal);
    let _ = interrupt_tx.send(Some(signal));
}

async fn wait_for_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        if let Ok(mut terminate) = signal(SignalKind::terminate()) {
            return tokio::select! {
                _ = tokio::signal::ctrl_c() => SIGINT,
                _ = terminate.recv() => SIGTERM,
            };
        }
    }

    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    SIGINT
}
