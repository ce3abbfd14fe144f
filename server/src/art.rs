//! Gallows drawings shown after each guess, indexed by wrong-guess count

use hangman_shared::MAX_WRONG_GUESSES;

pub const STAGES: usize = MAX_WRONG_GUESSES as usize + 1;

pub const FAILURE_DRAWINGS: [&str; STAGES] = [
    "\n\n\n\n\n\n",
    "\n\n\n\n\n/\n",
    "\n\n\n\n\n/ \\\n",
    "\n\n\n\n |\n/ \\\n",
    "\n\n\n |\n |\n/ \\\n",
    "\n\n /\n |\n |\n/ \\\n",
    "\n  /\n /\n |\n |\n/ \\\n",
    "   __\n  /\n /   \n |\n |\n/ \\\n",
    "   __\n  /  |\n /\n |\n |\n/ \\\n",
    "   __\n  /  |\n /   O\n |  /|\\\n |  / \\\n/ \\\n",
];

/// Drawing for the given wrong-guess count, clamped to the final stage
pub fn stage(wrong_guesses: u8) -> &'static str {
    FAILURE_DRAWINGS[(wrong_guesses as usize).min(STAGES - 1)]
}
