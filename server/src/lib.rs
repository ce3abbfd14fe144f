//! # Hangman Server Library
//!
//! This library provides the authoritative server for the multi-process
//! hangman game. It owns the word list and every client's session, and
//! time-shares a single request/response slot between all connected clients.
//!
//! ## Core Responsibilities
//!
//! ### Rendezvous Protocol
//! All traffic goes through one slot guarded by three tokens: a turn lock,
//! a client-ready signal and a server-ready signal. Exactly one cycle is in
//! flight at any instant, no matter how many clients are waiting for the turn.
//!
//! ### Session Management
//! The server keeps one registry entry per client identity, created on first
//! contact and removed when the session ends, the client disconnects, or its
//! process vanishes.
//!
//! ### Game Rules
//! Each cycle applies a single input (a letter guess or a replay answer) to
//! the client's session and writes the resulting snapshot back into the slot.
//!
//! ## Module Organization
//!
//! ### Rendezvous Module (`rendezvous`)
//! - The single-capacity slot and the three tokens
//! - Turn guard released on drop, lease on the wait for an answer
//! - Fence numbers that keep late answers away from the next holder
//!
//! ### Client Manager Module (`client_manager`)
//! - Per-client session records
//! - Identity assignment and capacity limits
//!
//! ### Game Module (`game`)
//! - Status transitions for guessing and replaying
//! - Disconnect handling
//!
//! ### Network Module (`network`)
//! - TCP front end with one session proxy per client process
//! - The serving loop that owns all game state
//! - Shutdown propagation to every connected client
//!
//! ### Supporting Modules
//! - `config`: environment-driven settings
//! - `words`: word source ingestion
//! - `art`: gallows drawings shown per wrong guess
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use hangman_server::config::Config;
//! use hangman_server::network::Server;
//! use hangman_server::words::WordList;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let words = WordList::from_words(["rust", "tokio", "semaphore"]);
//!
//!     let server = Server::bind(&config, words).await?;
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod art;
pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod rendezvous;
pub mod words;
