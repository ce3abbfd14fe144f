//! Wire types and framing shared by the hangman server and client
//!
//! Everything that crosses the process boundary lives here: the request a
//! client places in the shared slot, the response the server writes back, the
//! status codes that drive both sides, and the length-prefixed bincode frames
//! carrying them over a local TCP stream.

use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of a fixed word buffer, terminator included
pub const MAX_WORD_LENGTH: usize = 128;
/// Longest word the server keeps, in letters
pub const MAX_WORD_LETTERS: usize = MAX_WORD_LENGTH - 1;
/// Wrong guesses after which a round is lost
pub const MAX_WRONG_GUESSES: u8 = 9;
pub const ALPHABET_LEN: usize = 26;
/// Marker for an unguessed letter or an unrevealed word position
pub const UNREVEALED: u8 = b'_';
/// Frames larger than this are rejected before allocation
pub const MAX_FRAME_LEN: usize = 64 * 1024;

pub const DEFAULT_ADDR: &str = "127.0.0.1:7878";
pub const ADDR_ENV: &str = "HANGMAN_ADDR";

/// Identity of a client, announced as its process id during the first cycle
pub type ClientId = u32;

/// Phase of a session as reported by the server on every cycle
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Round decided, waiting for the replay answer
    RoundOver,
    /// Waiting for the replay answer, the last one was neither Y nor N
    ReplayInvalid,
    /// Round in progress, ready for the next guess
    Active,
    /// Round in progress, the last guess was rejected
    InvalidGuess,
    /// Session is over and the client is being removed
    SessionEnded,
    /// Server is going down
    ServerShutdown,
}

impl Status {
    /// Signed status code carried in the slot
    pub fn code(self) -> i16 {
        match self {
            Status::RoundOver => 0,
            Status::ReplayInvalid => 1,
            Status::Active => 2,
            Status::InvalidGuess => 3,
            Status::SessionEnded => -1,
            Status::ServerShutdown => -2,
        }
    }

    /// True while a word is being guessed (status codes 2 and 3)
    pub fn in_game(self) -> bool {
        self.code() >= 2
    }

    /// True for the codes after which no further cycle happens
    pub fn is_terminal(self) -> bool {
        self.code() < 0
    }
}

/// What a client asks for in one rendezvous cycle
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Identity exchange, carries no input
    Connect,
    /// A letter guess or a Y/N replay answer, as a raw byte
    Input(u8),
    /// The client is going away and its entry must be discarded
    Disconnect,
}

/// Request half of the shared slot
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub client_id: ClientId,
    pub kind: RequestKind,
}

impl Request {
    pub fn connect(client_id: ClientId) -> Self {
        Self {
            client_id,
            kind: RequestKind::Connect,
        }
    }

    pub fn input(client_id: ClientId, input: u8) -> Self {
        Self {
            client_id,
            kind: RequestKind::Input(input),
        }
    }

    pub fn disconnect(client_id: ClientId) -> Self {
        Self {
            client_id,
            kind: RequestKind::Disconnect,
        }
    }

    pub fn is_disconnect(&self) -> bool {
        self.kind == RequestKind::Disconnect
    }
}

/// Response half of the shared slot: the server's snapshot of one session
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Response {
    pub client_id: ClientId,
    pub status: Status,
    pub wrong_guesses: u8,
    /// Partially revealed word, `_` for hidden positions
    pub word_progress: String,
    /// One slot per letter A-Z, `_` when not yet guessed
    pub guessed: String,
    pub info: String,
    pub wins: u32,
    pub losses: u32,
}

impl Response {
    /// Response carrying only a status and a message, with empty game data
    pub fn notice(client_id: ClientId, status: Status, info: impl Into<String>) -> Self {
        Self {
            client_id,
            status,
            wrong_guesses: 0,
            word_progress: String::new(),
            guessed: unguessed_letters(),
            info: info.into(),
            wins: 0,
            losses: 0,
        }
    }

    pub fn server_shutdown(client_id: ClientId) -> Self {
        Self::notice(client_id, Status::ServerShutdown, "Server shutdown")
    }
}

/// Guessed-letters record with nothing guessed
pub fn unguessed_letters() -> String {
    (UNREVEALED as char).to_string().repeat(ALPHABET_LEN)
}

/// Frames exchanged between a client process and the server
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Packet {
    Request(Request),
    Response(Response),
    /// Sent unprompted when the server terminates a still-registered client
    Shutdown { info: String },
}

/// Writes one `u32` big-endian length prefix followed by the bincode body
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload =
        bincode::serialize(packet).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", payload.len(), MAX_FRAME_LEN),
        ));
    }

    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Reads one frame. Returns `Ok(None)` on a clean end of stream between frames.
///
/// Not cancellation safe: a partially read frame is lost if the future is dropped.
pub async fn read_packet<R>(reader: &mut R) -> io::Result<Option<Packet>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let frame_len = u32::from_be_bytes(len_buf) as usize;
    if frame_len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", frame_len, MAX_FRAME_LEN),
        ));
    }

    let mut frame = vec![0u8; frame_len];
    reader.read_exact(&mut frame).await?;

    bincode::deserialize(&frame)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
