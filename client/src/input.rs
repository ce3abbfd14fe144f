//! Turns terminal lines into the single byte sent to the server

use hangman_shared::Status;

/// What the player is being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Letter,
    Replay,
}

impl Prompt {
    /// Guesses while a word is in play, Y/N otherwise
    pub fn for_status(status: Status) -> Self {
        if status.in_game() {
            Prompt::Letter
        } else {
            Prompt::Replay
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Prompt::Letter => "Guess a letter: ",
            Prompt::Replay => "Do you want to play another game (Y/N)? ",
        }
    }
}

/// First non-blank character of a line, letters folded to upper case
///
/// A blank line becomes a space, which the server rejects as invalid input.
pub fn fold_input(line: &str) -> u8 {
    line.trim_start()
        .bytes()
        .next()
        .map(|b| b.to_ascii_uppercase())
        .unwrap_or(b' ')
}
