//! Text rendering of server responses for the terminal

use hangman_shared::{Response, Status, MAX_WRONG_GUESSES};

const RULE: &str =
    "_______________________________________________________________________________";

/// Screen text for one response
pub fn render(response: &Response) -> String {
    match response.status {
        Status::Active => format!(
            "\n{}\nWord to guess: {}\n{}\n",
            RULE,
            response.word_progress,
            progress(response)
        ),
        Status::RoundOver => {
            let verdict = if response.wrong_guesses >= MAX_WRONG_GUESSES {
                "LOSE"
            } else {
                "WIN"
            };
            format!(
                "\n{}\nThe word was: {}\n{}\nYou {} ({} W, {} L)\n{}\n",
                RULE,
                response.word_progress,
                progress(response),
                verdict,
                response.wins,
                response.losses,
                RULE
            )
        }
        Status::ReplayInvalid | Status::InvalidGuess => format!("{}\n", response.info),
        Status::SessionEnded => farewell(response),
        Status::ServerShutdown => format!("Server: {}\n", response.info),
    }
}

/// Closing text when the session ends normally
pub fn farewell(response: &Response) -> String {
    format!(
        "\n{}\nServer: {} ({} W, {} L)\nExit Game\n",
        RULE, response.info, response.wins, response.losses
    )
}

fn progress(response: &Response) -> String {
    let guessed: Vec<String> = response.guessed.chars().map(String::from).collect();
    format!(
        "{}\nWrong guesses: {}/{}\n{}",
        guessed.join(" "),
        response.wrong_guesses,
        MAX_WRONG_GUESSES,
        response.info
    )
}
