//! Server-side registry of client sessions
//!
//! This module keeps one entry per client that has completed at least one
//! rendezvous cycle:
//! - Session lifecycle (first contact, many cycles, removal on quit/disconnect)
//! - Identity assignment, including collisions between announced identities
//! - Capacity enforcement
//!
//! The registry has no lock of its own. Only the server loop touches it, and
//! only between a client's ready signal and the server's answer, so at most one
//! cycle ever reads or writes it. Any future code calling into it from another
//! task must keep that serialization or add a lock.

use hangman_shared::{ClientId, Response, Status, ALPHABET_LEN, UNREVEALED};
use log::info;
use std::collections::HashMap;

/// Persistent game state for one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Identity shared with the client for the whole session
    pub id: ClientId,
    /// Server's authoritative copy of the status last sent to the client
    pub status: Status,
    pub wrong_guesses: u8,
    /// Position in the word list, `None` until the first word is requested
    pub word_index: Option<usize>,
    pub word_progress: Vec<u8>,
    /// One slot per letter, `_` when not yet guessed
    pub guessed: [u8; ALPHABET_LEN],
    pub info: String,
    pub wins: u32,
    pub losses: u32,
}

impl Client {
    /// Creates a zero-initialized entry
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            status: Status::RoundOver,
            wrong_guesses: 0,
            word_index: None,
            word_progress: Vec::new(),
            guessed: [UNREVEALED; ALPHABET_LEN],
            info: String::new(),
            wins: 0,
            losses: 0,
        }
    }

    /// Copies the entry into the response half of the slot
    pub fn snapshot(&self) -> Response {
        Response {
            client_id: self.id,
            status: self.status,
            wrong_guesses: self.wrong_guesses,
            word_progress: self.word_progress.iter().map(|&b| b as char).collect(),
            guessed: self.guessed.iter().map(|&b| b as char).collect(),
            info: self.info.clone(),
            wins: self.wins,
            losses: self.losses,
        }
    }
}

pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    /// Maximum number of concurrently registered clients
    max_clients: usize,
    /// Next candidate handed out when an announced identity is taken
    next_free_id: ClientId,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
            next_free_id: 1,
        }
    }

    pub fn lookup(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn lookup_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    /// Registers a fresh entry under `id`
    ///
    /// Returns None if the registry is full or the identity is already in use.
    pub fn insert(&mut self, id: ClientId) -> Option<&mut Client> {
        if self.clients.len() >= self.max_clients || self.clients.contains_key(&id) {
            return None;
        }

        info!("Client {} registered", id);
        Some(self.clients.entry(id).or_insert_with(|| Client::new(id)))
    }

    /// Removes an entry, doing nothing if it is already gone
    pub fn remove(&mut self, id: ClientId) -> bool {
        if let Some(client) = self.clients.remove(&id) {
            info!(
                "Client {} removed ({} W, {} L)",
                client.id, client.wins, client.losses
            );
            true
        } else {
            false
        }
    }

    /// Picks an identity not currently registered, preferring `announced`
    pub fn allocate_id(&mut self, announced: ClientId) -> ClientId {
        if !self.clients.contains_key(&announced) {
            return announced;
        }

        while self.next_free_id == 0 || self.clients.contains_key(&self.next_free_id) {
            self.next_free_id = self.next_free_id.wrapping_add(1);
        }

        let id = self.next_free_id;
        self.next_free_id = self.next_free_id.wrapping_add(1);
        id
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Identities of every registered client
    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
