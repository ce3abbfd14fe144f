//! # Hangman Client Library
//!
//! This library provides the terminal client for the multi-process hangman
//! game. A client process owns no game state: it forwards one byte of player
//! input per cycle to the server and renders whatever snapshot comes back.
//!
//! ## Session Lifecycle
//!
//! ### Identity Exchange
//! The first cycle announces the process id. The server may assign a
//! different identity when that one is already taken, and the client adopts
//! whatever it is given.
//!
//! ### Play
//! After registering, the client automatically asks for the first word and
//! then alternates between rendering a snapshot and reading one line from the
//! player. While a word is in play the line is a letter guess; between words
//! it is a Y/N replay answer.
//!
//! ### Termination
//! A session ends when the server says so (quit, no more words, registry
//! full), when the server shuts down, when stdin reaches end of file, or on
//! SIGINT/SIGTERM. Each path maps to its own exit status, see
//! [`game::Outcome::exit_code`].
//!
//! ## Module Organization
//!
//! - `network`: framed TCP connection and the client error type
//! - `game`: the session driver
//! - `input`: prompt selection and input folding
//! - `rendering`: text output for server snapshots
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use hangman_client::game::ClientSession;
//! use hangman_client::network::{server_addr, Connection};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::connect(&server_addr()).await?;
//!     let (_interrupt_tx, interrupts) = watch::channel(None);
//!     let input = tokio::io::BufReader::new(tokio::io::stdin());
//!
//!     let session = ClientSession::new(
//!         connection,
//!         input,
//!         std::io::stdout(),
//!         interrupts,
//!         std::process::id(),
//!     );
//!     let outcome = session.run().await?;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
