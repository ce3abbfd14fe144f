//! Authoritative hangman rules
//!
//! `GameState` owns the word list and the client registry and turns one
//! request into one response. It is driven by the server loop, one cycle at a
//! time, and never awaits.

use crate::art;
use crate::client_manager::{Client, ClientManager};
use crate::words::WordList;
use hangman_shared::{
    ClientId, Request, RequestKind, Response, Status, ALPHABET_LEN, MAX_WRONG_GUESSES, UNREVEALED,
};
use log::{debug, info, warn};

pub const MSG_CONNECTED: &str = "Connected";
pub const MSG_INVALID_INPUT: &str = "Invalid input";
pub const MSG_ALREADY_GUESSED: &str = "Already guessed";
pub const MSG_NO_MORE_WORDS: &str = "No more words";
pub const MSG_QUIT: &str = "Quit game";
pub const MSG_CLIENT_SHUTDOWN: &str = "Client shutdown";
pub const MSG_SERVER_FULL: &str = "Server full";

pub struct GameState {
    words: WordList,
    clients: ClientManager,
}

impl GameState {
    pub fn new(words: WordList, max_clients: usize) -> Self {
        Self {
            words,
            clients: ClientManager::new(max_clients),
        }
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn words(&self) -> &WordList {
        &self.words
    }

    /// Runs one cycle's worth of game logic and returns what goes into the slot
    ///
    /// A response with `Status::SessionEnded` means the entry must be dropped
    /// with `retire` once the response has been published.
    pub fn handle(&mut self, request: Request) -> Response {
        match request.kind {
            RequestKind::Connect => self.connect(request.client_id),
            RequestKind::Input(input) => self.input(request.client_id, input),
            RequestKind::Disconnect => self.disconnect(request.client_id),
        }
    }

    /// Drops the entry of a session that just ended
    pub fn retire(&mut self, id: ClientId) {
        self.clients.remove(id);
    }

    fn connect(&mut self, announced: ClientId) -> Response {
        let id = self.clients.allocate_id(announced);
        if id != announced {
            warn!("Identity {} already registered, assigned {}", announced, id);
        }

        // A rejection names the unregistered id so retiring it touches no one
        if self.clients.is_full() {
            warn!("Rejecting client {}: registry full", announced);
            return Response::notice(id, Status::SessionEnded, MSG_SERVER_FULL);
        }

        match self.clients.insert(id) {
            Some(client) => {
                client.info = MSG_CONNECTED.to_string();
                client.snapshot()
            }
            None => Response::notice(id, Status::SessionEnded, MSG_SERVER_FULL),
        }
    }

    fn input(&mut self, id: ClientId, input: u8) -> Response {
        if self.clients.lookup(id).is_none() {
            if self.clients.is_full() {
                warn!("Rejecting client {}: registry full", id);
                return Response::notice(id, Status::SessionEnded, MSG_SERVER_FULL);
            }
            self.clients.insert(id);
        }

        match self.clients.lookup_mut(id) {
            Some(client) => {
                advance(client, &self.words, input);
                debug!(
                    "Client {} [{:?} - {}] {}/{} wrong",
                    id,
                    client.status,
                    input.escape_ascii(),
                    client.wrong_guesses,
                    MAX_WRONG_GUESSES
                );
                client.snapshot()
            }
            None => Response::notice(id, Status::SessionEnded, MSG_SERVER_FULL),
        }
    }

    fn disconnect(&mut self, id: ClientId) -> Response {
        info!("Client {} disconnected, freeing its session", id);

        match self.clients.lookup_mut(id) {
            Some(client) => {
                client.status = Status::SessionEnded;
                client.info = MSG_CLIENT_SHUTDOWN.to_string();
                client.snapshot()
            }
            None => Response::notice(id, Status::SessionEnded, MSG_CLIENT_SHUTDOWN),
        }
    }
}

/// Applies one input to a session according to its current phase
pub fn advance(client: &mut Client, words: &WordList, input: u8) {
    let current_word = client.word_index.and_then(|i| words.get(i));

    match current_word {
        Some(word) if client.status.in_game() => guess(client, word, input),
        _ => replay(client, words, input),
    }
}

fn replay(client: &mut Client, words: &WordList, input: u8) {
    match input {
        b'Y' => {
            let next = client.word_index.map_or(0, |i| i + 1);
            client.word_index = Some(next);

            match words.get(next) {
                Some(word) => {
                    client.wrong_guesses = 0;
                    client.guessed = [UNREVEALED; ALPHABET_LEN];
                    client.word_progress = vec![UNREVEALED; word.len()];
                    client.info = art::stage(0).to_string();
                    client.status = Status::Active;
                }
                None => {
                    client.status = Status::SessionEnded;
                    client.info = MSG_NO_MORE_WORDS.to_string();
                }
            }
        }
        b'N' => {
            client.status = Status::SessionEnded;
            client.info = MSG_QUIT.to_string();
        }
        _ => {
            client.status = Status::ReplayInvalid;
            client.info = MSG_INVALID_INPUT.to_string();
        }
    }
}

fn guess(client: &mut Client, word: &str, letter: u8) {
    if !letter.is_ascii_uppercase() {
        client.status = Status::InvalidGuess;
        client.info = MSG_INVALID_INPUT.to_string();
        return;
    }

    let slot = (letter - b'A') as usize;
    if client.guessed[slot] != UNREVEALED {
        client.status = Status::InvalidGuess;
        client.info = MSG_ALREADY_GUESSED.to_string();
        return;
    }

    client.guessed[slot] = letter;
    if word.as_bytes().contains(&letter) {
        client.word_progress = reveal(word, &client.guessed);
    } else {
        client.wrong_guesses += 1;
    }

    client.info = art::stage(client.wrong_guesses).to_string();
    client.status = Status::Active;

    if client.wrong_guesses >= MAX_WRONG_GUESSES {
        client.status = Status::RoundOver;
        client.losses += 1;
        client.word_progress = word.as_bytes().to_vec();
    } else if !client.word_progress.contains(&UNREVEALED) {
        client.status = Status::RoundOver;
        client.wins += 1;
    }
}

/// Word progress implied by a set of guessed letters
pub fn reveal(word: &str, guessed: &[u8; ALPHABET_LEN]) -> Vec<u8> {
    word.bytes()
        .map(|b| {
            if b.is_ascii_uppercase() && guessed[(b - b'A') as usize] == b {
                b
            } else {
                UNREVEALED
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn game(words: &[&str]) -> GameState {
        GameState::new(WordList::from_words(words), 16)
    }

    fn send(game: &mut GameState, id: ClientId, input: u8) -> Response {
        game.handle(Request::input(id, input))
    }

    /// Connects a client and starts its first word
    fn start(game: &mut GameState, id: ClientId) -> Response {
        let hello = game.handle(Request::connect(id));
        assert_eq!(hello.client_id, id);
        send(game, id, b'Y')
    }

    #[test]
    fn test_connect_registers_client() {
        let mut game = game(&["rust"]);
        let response = game.handle(Request::connect(100));

        assert_eq!(response.client_id, 100);
        assert_eq!(response.status, Status::RoundOver);
        assert_eq!(response.info, MSG_CONNECTED);
        assert_eq!(game.clients().len(), 1);
        assert_eq!(game.clients().lookup(100).unwrap().word_index, None);
    }

    #[test]
    fn test_connect_with_taken_identity_gets_fresh_one() {
        let mut game = game(&["rust"]);
        game.handle(Request::connect(100));
        let second = game.handle(Request::connect(100));

        assert_ne!(second.client_id, 100);
        assert_eq!(game.clients().len(), 2);
    }

    #[test]
    fn test_start_round() {
        let mut game = game(&["rust"]);
        let response = start(&mut game, 1);

        assert_eq!(response.status, Status::Active);
        assert_eq!(response.word_progress, "____");
        assert_eq!(response.wrong_guesses, 0);
        assert_eq!(response.info, art::stage(0));
        assert!(response.guessed.bytes().all(|b| b == UNREVEALED));
    }

    #[test]
    fn test_win_round() {
        let mut game = game(&["rust"]);
        start(&mut game, 1);

        for letter in [b'R', b'U', b'S'] {
            assert_eq!(send(&mut game, 1, letter).status, Status::Active);
        }
        let response = send(&mut game, 1, b'T');

        assert_eq!(response.status, Status::RoundOver);
        assert_eq!(response.word_progress, "RUST");
        assert_eq!(response.wins, 1);
        assert_eq!(response.losses, 0);
    }

    #[test]
    fn test_loss_round_reveals_word() {
        let mut game = game(&["rust"]);
        start(&mut game, 1);

        let wrong = b"ABCDEFGHI";
        for (i, &letter) in wrong.iter().enumerate() {
            let response = send(&mut game, 1, letter);
            assert_eq!(response.wrong_guesses as usize, i + 1);
            if i + 1 < wrong.len() {
                assert_eq!(response.status, Status::Active);
                assert_eq!(response.word_progress, "____");
            } else {
                assert_eq!(response.status, Status::RoundOver);
                assert_eq!(response.word_progress, "RUST");
                assert_eq!(response.losses, 1);
                assert_eq!(response.wins, 0);
                assert_eq!(response.info, art::stage(MAX_WRONG_GUESSES));
            }
        }
    }

    #[test]
    fn test_all_occurrences_revealed() {
        let mut game = game(&["banana"]);
        start(&mut game, 1);

        let response = send(&mut game, 1, b'A');
        assert_eq!(response.word_progress, "_A_A_A");
        let response = send(&mut game, 1, b'N');
        assert_eq!(response.word_progress, "_ANANA");
    }

    #[test]
    fn test_repeat_guess_is_rejected_without_mutation() {
        let mut game = game(&["rust"]);
        start(&mut game, 1);

        send(&mut game, 1, b'R');
        let before = send(&mut game, 1, b'X');
        let response = send(&mut game, 1, b'X');

        assert_eq!(response.status, Status::InvalidGuess);
        assert_eq!(response.info, MSG_ALREADY_GUESSED);
        assert_eq!(response.wrong_guesses, before.wrong_guesses);
        assert_eq!(response.word_progress, before.word_progress);

        let response = send(&mut game, 1, b'R');
        assert_eq!(response.status, Status::InvalidGuess);
        assert_eq!(response.word_progress, "R___");
    }

    #[test]
    fn test_non_letter_guess_is_invalid() {
        let mut game = game(&["rust"]);
        start(&mut game, 1);

        for input in [b'r', b'1', b'?', 0u8] {
            let response = send(&mut game, 1, input);
            assert_eq!(response.status, Status::InvalidGuess);
            assert_eq!(response.info, MSG_INVALID_INPUT);
            assert_eq!(response.wrong_guesses, 0);
        }

        // still in game after an invalid guess
        assert_eq!(send(&mut game, 1, b'U').status, Status::Active);
    }

    #[test]
    fn test_replay_answers() {
        let mut game = game(&["rust", "go"]);
        start(&mut game, 1);
        for letter in *b"RUST" {
            send(&mut game, 1, letter);
        }

        let response = send(&mut game, 1, b'X');
        assert_eq!(response.status, Status::ReplayInvalid);
        assert_eq!(response.info, MSG_INVALID_INPUT);

        let response = send(&mut game, 1, b'Y');
        assert_eq!(response.status, Status::Active);
        assert_eq!(response.word_progress, "__");
        assert_eq!(response.wins, 1);
        assert!(response.guessed.bytes().all(|b| b == UNREVEALED));
    }

    #[test]
    fn test_quit() {
        let mut game = game(&["rust"]);
        game.handle(Request::connect(1));

        let response = send(&mut game, 1, b'N');
        assert_eq!(response.status, Status::SessionEnded);
        assert_eq!(response.info, MSG_QUIT);
    }

    #[test]
    fn test_word_list_exhausted() {
        let mut game = game(&["go"]);
        start(&mut game, 1);
        send(&mut game, 1, b'G');
        assert_eq!(send(&mut game, 1, b'O').status, Status::RoundOver);

        let response = send(&mut game, 1, b'Y');
        assert_eq!(response.status, Status::SessionEnded);
        assert_eq!(response.info, MSG_NO_MORE_WORDS);
    }

    #[test]
    fn test_empty_word_list() {
        let mut game = game(&[]);
        let response = start(&mut game, 1);
        assert_eq!(response.status, Status::SessionEnded);
        assert_eq!(response.info, MSG_NO_MORE_WORDS);
    }

    #[test]
    fn test_first_input_registers_unknown_client() {
        let mut game = game(&["rust"]);
        let response = send(&mut game, 9, b'Y');

        assert_eq!(response.client_id, 9);
        assert_eq!(response.status, Status::Active);
        assert!(game.clients().lookup(9).is_some());
    }

    #[test]
    fn test_disconnect_mid_game() {
        let mut game = game(&["rust", "go"]);
        start(&mut game, 1);
        start(&mut game, 2);
        send(&mut game, 2, b'G');
        let other_before = game.clients().lookup(2).cloned();

        send(&mut game, 1, b'R');
        let response = game.handle(Request::disconnect(1));
        assert_eq!(response.status, Status::SessionEnded);
        assert_eq!(response.info, MSG_CLIENT_SHUTDOWN);

        game.retire(1);
        assert!(game.clients().lookup(1).is_none());
        assert_eq!(game.clients().lookup(2).cloned(), other_before);
    }

    #[test]
    fn test_disconnect_unknown_client() {
        let mut game = game(&["rust"]);
        let response = game.handle(Request::disconnect(77));

        assert_eq!(response.client_id, 77);
        assert_eq!(response.status, Status::SessionEnded);
        assert!(game.clients().is_empty());
    }

    #[test]
    fn test_server_full() {
        let mut game = GameState::new(WordList::from_words(["rust"]), 1);
        game.handle(Request::connect(1));

        let response = game.handle(Request::connect(2));
        assert_eq!(response.status, Status::SessionEnded);
        assert_eq!(response.info, MSG_SERVER_FULL);

        let response = send(&mut game, 3, b'Y');
        assert_eq!(response.status, Status::SessionEnded);
        assert_eq!(game.clients().len(), 1);
    }

    #[test]
    fn test_server_full_rejection_never_names_a_registered_client() {
        let mut game = GameState::new(WordList::from_words(["rust"]), 1);
        start(&mut game, 100);

        let rejected = game.handle(Request::connect(100));
        assert_eq!(rejected.status, Status::SessionEnded);
        assert_eq!(rejected.info, MSG_SERVER_FULL);
        assert_ne!(rejected.client_id, 100);
        assert!(game.clients().lookup(rejected.client_id).is_none());
    }

    #[test]
    fn test_clients_are_isolated() {
        let mut game = game(&["rust", "go"]);
        start(&mut game, 1);
        start(&mut game, 2);

        let a = send(&mut game, 1, b'R');
        let b = send(&mut game, 2, b'Z');
        let a2 = send(&mut game, 1, b'Z');

        assert_eq!(a.client_id, 1);
        assert_eq!(a.word_progress, "R___");
        assert_eq!(b.client_id, 2);
        assert_eq!(b.word_progress, "____");
        assert_eq!(b.wrong_guesses, 1);
        // client 2 guessing Z did not mark Z for client 1
        assert_eq!(a2.status, Status::Active);
        assert_eq!(a2.wrong_guesses, 1);
    }

    #[test]
    fn test_random_sessions_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut game = game(&["hangman", "rendezvous", "slot", "turn", "semaphore"]);
        start(&mut game, 1);

        for _ in 0..5_000 {
            let input = if rng.gen_bool(0.1) {
                rng.gen_range(0u8..128)
            } else {
                rng.gen_range(b'A'..=b'Z')
            };
            let response = send(&mut game, 1, input);
            if response.status == Status::SessionEnded {
                break;
            }

            assert!(response.wrong_guesses <= MAX_WRONG_GUESSES);

            let client = game.clients().lookup(1).unwrap();
            if client.status.in_game() {
                let word = game.words().get(client.word_index.unwrap()).unwrap();
                assert_eq!(reveal(word, &client.guessed), client.word_progress);
            }
        }
    }
}
