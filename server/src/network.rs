//! Server network layer coordinating client processes and the game
//!
//! Each accepted connection gets a session proxy task that performs rendezvous
//! cycles on behalf of its remote client process. A single serving loop owns
//! the `GameState` and answers one cycle at a time.

use crate::config::Config;
use crate::game::GameState;
use crate::rendezvous::{Rendezvous, RendezvousError};
use crate::words::WordList;
use hangman_shared::{read_packet, write_packet, ClientId, Packet, Request, Response, Status};
use log::{debug, error, info, warn};
use std::error::Error;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};

/// How long session proxies get to deliver shutdown notices
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Final message to a client whose turn got no answer in time
pub const MSG_TURN_EXPIRED: &str = "Turn lease expired";

type SessionError = Box<dyn Error + Send + Sync>;

/// Server-session object owning the listener, the rendezvous and all game state
pub struct Server {
    listener: TcpListener,
    rendezvous: Arc<Rendezvous>,
    game: GameState,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    pub async fn bind(config: &Config, words: WordList) -> Result<Self, Box<dyn Error>> {
        let listener = TcpListener::bind(&config.addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        if words.is_empty() {
            warn!("Word list is empty, every game request will end the session");
        }

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Server {
            listener,
            rendezvous: Arc::new(Rendezvous::new(config.turn_lease)),
            game: GameState::new(words, config.max_clients),
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves clients until `shutdown` completes, then tears everything down
    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn Error>>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            rendezvous,
            mut game,
            shutdown_tx,
        } = self;

        let acceptor = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&rendezvous),
            shutdown_tx.subscribe(),
        ));

        info!("Server started successfully");
        serve(&mut game, &rendezvous, shutdown).await;

        let registered = game.clients().ids();
        info!(
            "Server shutting down, terminating {} registered clients",
            registered.len()
        );
        for id in &registered {
            debug!("Terminating client {}", id);
        }

        rendezvous.close(Response::server_shutdown(0));
        let _ = shutdown_tx.send(true);

        if let Err(e) = acceptor.await {
            error!("Accept loop panicked: {}", e);
        }

        Ok(())
    }
}

/// Answers rendezvous cycles until `shutdown` completes or the rendezvous closes
pub async fn serve<F>(game: &mut GameState, rendezvous: &Rendezvous, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        debug!("Clients: {}, waiting for a client", game.clients().len());

        let next = tokio::select! {
            next = rendezvous.next_request() => next,
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        };

        let posted = match next {
            Ok(Some(posted)) => posted,
            Ok(None) => continue,
            Err(_) => break,
        };

        let response = game.handle(posted.body);
        let ended = (response.status == Status::SessionEnded).then_some(response.client_id);

        rendezvous.publish(posted.fence, response);

        if let Some(id) = ended {
            game.retire(id);
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    rendezvous: Arc<Rendezvous>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!("Accepted connection from {}", peer);
                    let rendezvous = Arc::clone(&rendezvous);
                    let shutdown = shutdown.clone();

                    sessions.spawn(async move {
                        match run_session(stream, rendezvous, shutdown).await {
                            Ok(()) => debug!("Session from {} closed", peer),
                            Err(e) => warn!("Session from {} failed: {}", peer, e),
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    sleep(Duration::from_millis(10)).await;
                }
            },

            // Reap finished sessions
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}

            _ = shutdown.changed() => break,
        }
    }

    let drain = async { while sessions.join_next().await.is_some() {} };
    if timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("Sessions did not finish within {:?}", SHUTDOWN_GRACE);
        sessions.abort_all();
    }
}

/// Session proxy: relays one client process's requests through the rendezvous
async fn run_session(
    stream: TcpStream,
    rendezvous: Arc<Rendezvous>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SessionError> {
    let (mut reader, mut writer) = stream.into_split();
    let mut identity: Option<ClientId> = None;

    loop {
        let packet = tokio::select! {
            packet = read_packet(&mut reader) => packet,
            _ = shutdown.changed() => {
                send_shutdown(&mut writer, &rendezvous).await;
                return Ok(());
            }
        };

        let mut request = match packet {
            Ok(Some(Packet::Request(request))) => request,
            Ok(Some(other)) => {
                warn!("Unexpected packet from client: {:?}", other);
                continue;
            }
            Ok(None) => {
                discard_session(&rendezvous, identity).await;
                return Ok(());
            }
            Err(e) => {
                discard_session(&rendezvous, identity).await;
                return Err(e.into());
            }
        };

        // The identity is bound to the connection once assigned
        if let Some(id) = identity {
            if request.client_id != id {
                warn!("Client {} sent a request as {}", id, request.client_id);
                request.client_id = id;
            }
        }

        let response = match cycle(&rendezvous, request).await {
            Ok(response) => response,
            Err(RendezvousError::Closed) => {
                send_shutdown(&mut writer, &rendezvous).await;
                return Ok(());
            }
            Err(RendezvousError::LeaseExpired(_)) => {
                warn!(
                    "Client {} got no answer within {:?}, ending its session",
                    request.client_id,
                    rendezvous.lease()
                );
                if !request.is_disconnect() {
                    discard_session(&rendezvous, identity).await;
                }
                let notice = Response::notice(
                    identity.unwrap_or(request.client_id),
                    Status::SessionEnded,
                    MSG_TURN_EXPIRED,
                );
                if let Err(e) = write_packet(&mut writer, &Packet::Response(notice)).await {
                    debug!("Expiry notice not delivered: {}", e);
                }
                return Ok(());
            }
        };

        if request.is_disconnect() {
            info!("Client {} left", response.client_id);
        }
        if identity.is_none() {
            info!("Client {} obtained identity {}", request.client_id, response.client_id);
        }
        identity = Some(response.client_id);
        let ended = response.status.is_terminal();

        let written = write_packet(&mut writer, &Packet::Response(response)).await;
        if ended {
            if let Err(e) = written {
                debug!("Final response not delivered: {}", e);
            }
            return Ok(());
        }
        if let Err(e) = written {
            discard_session(&rendezvous, identity).await;
            return Err(e.into());
        }
    }
}

/// One full rendezvous cycle: acquire, exchange, release
async fn cycle(rendezvous: &Rendezvous, request: Request) -> Result<Response, RendezvousError> {
    let mut turn = rendezvous.acquire().await?;
    turn.exchange(request).await
}

/// Disconnect cycle run on behalf of a client that can no longer do it itself
///
/// Only a bound identity is discarded; an unanswered first request may have
/// been stamped with another client's id.
async fn discard_session(rendezvous: &Rendezvous, identity: Option<ClientId>) {
    if let Some(id) = identity {
        info!("Discarding session of client {}", id);
        if let Err(e) = cycle(rendezvous, Request::disconnect(id)).await {
            debug!("Could not discard client {}: {}", id, e);
        }
    }
}

async fn send_shutdown(writer: &mut OwnedWriteHalf, rendezvous: &Rendezvous) {
    let info = rendezvous
        .closing_notice()
        .map(|notice| notice.info)
        .unwrap_or_else(|| Response::server_shutdown(0).info);

    if let Err(e) = write_packet(writer, &Packet::Shutdown { info }).await {
        debug!("Shutdown notice not delivered: {}", e);
    }
}
