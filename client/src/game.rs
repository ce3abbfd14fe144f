//! Client-side session driver
//!
//! Every request goes out while this process holds the turn on the server and
//! the driver stays blocked until the answer for it arrives. Between cycles it
//! waits on the player, the server, and the interrupt channel at once.

use crate::input::{fold_input, Prompt};
use crate::network::{ClientError, Connection};
use crate::rendering::{farewell, render};
use hangman_shared::{ClientId, Packet, Request, Response, Status};
use log::{debug, info, warn};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::watch;

/// Exit status reported when the server went away under the client
pub const SERVER_SHUTDOWN_EXIT_CODE: i32 = -2;

/// How a session came to an end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Server ended the session: quit, no more words, or registry full
    Finished { info: String, wins: u32, losses: u32 },
    ServerShutdown { info: String },
    /// Process was told to stop by a signal
    Interrupted { signal: i32 },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Finished { .. } => 0,
            Outcome::ServerShutdown { .. } => SERVER_SHUTDOWN_EXIT_CODE,
            Outcome::Interrupted { signal } => *signal,
        }
    }
}

enum Cycle {
    Answer(Response),
    Shutdown(String),
    Interrupted(i32),
}

enum Waited {
    Input(u8),
    EndOfInput,
    Shutdown(String),
    Interrupted(i32),
}

pub struct ClientSession<R, W> {
    connection: Connection,
    input: Lines<R>,
    out: W,
    interrupts: watch::Receiver<Option<i32>>,
    id: ClientId,
}

impl<R, W> ClientSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// `announced_id` is offered to the server, which may hand back another one
    pub fn new(
        connection: Connection,
        input: R,
        out: W,
        interrupts: watch::Receiver<Option<i32>>,
        announced_id: ClientId,
    ) -> Self {
        ClientSession {
            connection,
            input: input.lines(),
            out,
            interrupts,
            id: announced_id,
        }
    }

    pub async fn run(mut self) -> Result<Outcome, ClientError> {
        writeln!(self.out, "Trying to connect to server...")?;

        let hello = match self.cycle(Request::connect(self.id), true).await? {
            Cycle::Answer(response) => response,
            Cycle::Shutdown(info) => return self.server_shutdown(info),
            Cycle::Interrupted(signal) => return self.interrupted(signal, None),
        };
        if hello.status.is_terminal() {
            return self.conclude(hello);
        }

        self.id = hello.client_id;
        writeln!(self.out, "{}. Obtained ID: {}", hello.info, self.id)?;
        info!("Registered as client {}", self.id);

        let mut next = b'Y';
        loop {
            let response = match self.cycle(Request::input(self.id, next), true).await? {
                Cycle::Answer(response) => response,
                Cycle::Shutdown(info) => return self.server_shutdown(info),
                Cycle::Interrupted(signal) => return self.interrupted(signal, None),
            };
            if response.status.is_terminal() {
                return self.conclude(response);
            }

            write!(self.out, "{}", render(&response))?;
            let prompt = Prompt::for_status(response.status);
            write!(self.out, "{}", prompt.text())?;
            self.out.flush()?;

            match self.wait_for_input().await? {
                Waited::Input(byte) => next = byte,
                Waited::EndOfInput => {
                    writeln!(self.out)?;
                    return self.leave(None).await;
                }
                Waited::Shutdown(info) => return self.server_shutdown(info),
                Waited::Interrupted(signal) => {
                    writeln!(self.out)?;
                    return self.leave(Some(signal)).await;
                }
            }
        }
    }

    /// Sends one request and blocks until its answer arrives
    ///
    /// An interrupt during the wait posts a disconnect for this client and
    /// returns at once, without waiting for the answer.
    async fn cycle(&mut self, request: Request, interruptible: bool) -> Result<Cycle, ClientError> {
        debug!("Sending {:?}", request);
        self.connection.send(&Packet::Request(request)).await?;

        tokio::select! {
            packet = self.connection.recv() => match packet {
                Some(Packet::Response(response)) => Ok(Cycle::Answer(response)),
                Some(Packet::Shutdown { info }) => Ok(Cycle::Shutdown(info)),
                Some(other) => Err(ClientError::UnexpectedPacket(other)),
                None => Err(ClientError::ConnectionLost),
            },
            signal = interrupted(&mut self.interrupts), if interruptible => {
                let disconnect = Packet::Request(Request::disconnect(self.id));
                if let Err(e) = self.connection.send(&disconnect).await {
                    debug!("Could not post disconnect: {}", e);
                }
                Ok(Cycle::Interrupted(signal))
            }
        }
    }

    async fn wait_for_input(&mut self) -> Result<Waited, ClientError> {
        loop {
            tokio::select! {
                line = self.input.next_line() => {
                    return Ok(match line? {
                        Some(line) => Waited::Input(fold_input(&line)),
                        None => Waited::EndOfInput,
                    });
                }
                packet = self.connection.recv() => match packet {
                    Some(Packet::Shutdown { info }) => return Ok(Waited::Shutdown(info)),
                    Some(other) => warn!("Ignoring unsolicited packet {:?}", other),
                    None => return Err(ClientError::ConnectionLost),
                },
                signal = interrupted(&mut self.interrupts) => return Ok(Waited::Interrupted(signal)),
            }
        }
    }

    /// Full disconnect cycle, used when the turn is not held
    async fn leave(&mut self, signal: Option<i32>) -> Result<Outcome, ClientError> {
        let answer = match self.cycle(Request::disconnect(self.id), false).await? {
            Cycle::Answer(response) => response,
            Cycle::Shutdown(info) => return self.server_shutdown(info),
            Cycle::Interrupted(signal) => return self.interrupted(signal, None),
        };

        match signal {
            Some(signal) => self.interrupted(signal, Some(&answer.info)),
            None => self.conclude(answer),
        }
    }

    fn conclude(&mut self, response: Response) -> Result<Outcome, ClientError> {
        if response.status == Status::ServerShutdown {
            return self.server_shutdown(response.info);
        }

        write!(self.out, "{}", farewell(&response))?;
        self.out.flush()?;
        info!("Session ended: {}", response.info);

        Ok(Outcome::Finished {
            info: response.info,
            wins: response.wins,
            losses: response.losses,
        })
    }

    fn server_shutdown(&mut self, info: String) -> Result<Outcome, ClientError> {
        writeln!(self.out, "\nServer: {}", info)?;
        writeln!(self.out, "EXIT ({})", SERVER_SHUTDOWN_EXIT_CODE)?;
        self.out.flush()?;
        warn!("Server shut down: {}", info);

        Ok(Outcome::ServerShutdown { info })
    }

    fn interrupted(&mut self, signal: i32, info: Option<&str>) -> Result<Outcome, ClientError> {
        match info {
            Some(info) => writeln!(self.out, "EXIT ({}, Code: {})", info, signal)?,
            None => writeln!(self.out, "EXIT (Code: {})", signal)?,
        }
        self.out.flush()?;
        info!("Interrupted by signal {}", signal);

        Ok(Outcome::Interrupted { signal })
    }
}

/// Resolves once an interrupt has been recorded; never resolves otherwise
async fn interrupted(interrupts: &mut watch::Receiver<Option<i32>>) -> i32 {
    loop {
        if let Some(signal) = *interrupts.borrow_and_update() {
            return signal;
        }
        if interrupts.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangman_shared::{read_packet, write_packet, RequestKind};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_test::assert_ok;

    /// Scripted stand-in for the server side of one connection
    async fn fake_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    async fn expect_request(stream: &mut TcpStream) -> Request {
        match read_packet(stream).await.unwrap() {
            Some(Packet::Request(request)) => request,
            other => panic!("expected a request, got {:?}", other),
        }
    }

    async fn answer(stream: &mut TcpStream, response: Response) {
        write_packet(stream, &Packet::Response(response))
            .await
            .unwrap();
    }

    fn active(id: ClientId) -> Response {
        let mut response = Response::notice(id, Status::Active, "");
        response.word_progress = "___".to_string();
        response
    }

    #[test]
    fn test_exit_codes() {
        let finished = Outcome::Finished {
            info: "Quit game".to_string(),
            wins: 0,
            losses: 0,
        };
        assert_eq!(finished.exit_code(), 0);
        assert_eq!(
            Outcome::ServerShutdown {
                info: String::new()
            }
            .exit_code(),
            -2
        );
        assert_eq!(Outcome::Interrupted { signal: 15 }.exit_code(), 15);
    }

    #[tokio::test]
    async fn test_quit_after_one_guess() {
        let (listener, addr) = fake_server().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let hello = expect_request(&mut stream).await;
            assert_eq!(hello.kind, RequestKind::Connect);
            assert_eq!(hello.client_id, 41);
            answer(&mut stream, Response::notice(7, Status::RoundOver, "Connected")).await;

            // the server may hand out another id; it must be used from now on
            let start = expect_request(&mut stream).await;
            assert_eq!(start, Request::input(7, b'Y'));
            answer(&mut stream, active(7)).await;

            let guess = expect_request(&mut stream).await;
            assert_eq!(guess, Request::input(7, b'Q'));
            let mut over = Response::notice(7, Status::RoundOver, "");
            over.word_progress = "QQQ".to_string();
            over.wins = 1;
            answer(&mut stream, over).await;

            let replay = expect_request(&mut stream).await;
            assert_eq!(replay, Request::input(7, b'N'));
            let mut quit = Response::notice(7, Status::SessionEnded, "Quit game");
            quit.wins = 1;
            answer(&mut stream, quit).await;
        });

        let (_tx, interrupts) = watch::channel(None);
        let connection = Connection::connect(&addr).await.unwrap();
        let mut out = Vec::new();
        let session = ClientSession::new(connection, &b"q\nn\n"[..], &mut out, interrupts, 41);

        let outcome = assert_ok!(session.run().await);
        assert_eq!(
            outcome,
            Outcome::Finished {
                info: "Quit game".to_string(),
                wins: 1,
                losses: 0
            }
        );
        server.await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Obtained ID: 7"));
        assert!(text.contains("Guess a letter: "));
        assert!(text.contains("You WIN (1 W, 0 L)"));
        assert!(text.contains("Server: Quit game (1 W, 0 L)"));
    }

    #[tokio::test]
    async fn test_end_of_input_disconnects() {
        let (listener, addr) = fake_server().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            expect_request(&mut stream).await;
            answer(&mut stream, Response::notice(2, Status::RoundOver, "Connected")).await;
            expect_request(&mut stream).await;
            answer(&mut stream, active(2)).await;

            let bye = expect_request(&mut stream).await;
            assert_eq!(bye, Request::disconnect(2));
            answer(
                &mut stream,
                Response::notice(2, Status::SessionEnded, "Client shutdown"),
            )
            .await;
        });

        let (_tx, interrupts) = watch::channel(None);
        let connection = Connection::connect(&addr).await.unwrap();
        let session = ClientSession::new(connection, &b""[..], Vec::new(), interrupts, 2);

        let outcome = session.run().await.unwrap();
        assert_eq!(outcome.exit_code(), 0);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_full() {
        let (listener, addr) = fake_server().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            expect_request(&mut stream).await;
            answer(
                &mut stream,
                Response::notice(5, Status::SessionEnded, "Server full"),
            )
            .await;
        });

        let (_tx, interrupts) = watch::channel(None);
        let connection = Connection::connect(&addr).await.unwrap();
        let session = ClientSession::new(connection, &b"a\n"[..], Vec::new(), interrupts, 5);

        match session.run().await.unwrap() {
            Outcome::Finished { info, .. } => assert_eq!(info, "Server full"),
            other => panic!("unexpected outcome {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_input() {
        let (listener, addr) = fake_server().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            expect_request(&mut stream).await;
            answer(&mut stream, Response::notice(1, Status::RoundOver, "Connected")).await;
            expect_request(&mut stream).await;
            answer(&mut stream, active(1)).await;

            write_packet(
                &mut stream,
                &Packet::Shutdown {
                    info: "Server shutdown".to_string(),
                },
            )
            .await
            .unwrap();
            stream
        });

        // player never types anything
        let (_input_tx, input_rx) = tokio::io::duplex(64);
        let (_tx, interrupts) = watch::channel(None);
        let connection = Connection::connect(&addr).await.unwrap();
        let session = ClientSession::new(
            connection,
            tokio::io::BufReader::new(input_rx),
            Vec::new(),
            interrupts,
            1,
        );

        let outcome = session.run().await.unwrap();
        assert_eq!(outcome.exit_code(), SERVER_SHUTDOWN_EXIT_CODE);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_while_holding_the_turn() {
        let (listener, addr) = fake_server().await;
        let (tx, interrupts) = watch::channel(None);

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            expect_request(&mut stream).await;
            answer(&mut stream, Response::notice(9, Status::RoundOver, "Connected")).await;

            // hold back the answer to the first input and raise SIGINT instead
            let pending = expect_request(&mut stream).await;
            assert_eq!(pending, Request::input(9, b'Y'));
            tx.send(Some(2)).unwrap();

            let disconnect = expect_request(&mut stream).await;
            assert_eq!(disconnect, Request::disconnect(9));
        });

        let connection = Connection::connect(&addr).await.unwrap();
        let mut out = Vec::new();
        let session = ClientSession::new(connection, &b""[..], &mut out, interrupts, 9);

        let outcome = session.run().await.unwrap();
        assert_eq!(outcome, Outcome::Interrupted { signal: 2 });
        server.await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("EXIT (Code: 2)"));
    }

    #[tokio::test]
    async fn test_interrupt_while_idle_runs_a_disconnect_cycle() {
        let (listener, addr) = fake_server().await;
        let (tx, interrupts) = watch::channel(None);

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            expect_request(&mut stream).await;
            answer(&mut stream, Response::notice(4, Status::RoundOver, "Connected")).await;
            expect_request(&mut stream).await;
            answer(&mut stream, active(4)).await;

            tx.send(Some(15)).unwrap();

            let disconnect = expect_request(&mut stream).await;
            assert_eq!(disconnect, Request::disconnect(4));
            answer(
                &mut stream,
                Response::notice(4, Status::SessionEnded, "Client shutdown"),
            )
            .await;
        });

        let (_input_tx, input_rx) = tokio::io::duplex(64);
        let connection = Connection::connect(&addr).await.unwrap();
        let mut out = Vec::new();
        let session = ClientSession::new(
            connection,
            tokio::io::BufReader::new(input_rx),
            &mut out,
            interrupts,
            4,
        );

        let outcome = session.run().await.unwrap();
        assert_eq!(outcome.exit_code(), 15);
        server.await.unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("EXIT (Client shutdown, Code: 15)"));
    }
}
