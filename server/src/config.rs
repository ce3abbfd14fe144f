//! Runtime configuration for the hangman server.
//!
//! The command line only carries the optional word file, so tuning knobs come
//! from environment variables, falling back to defaults:
//!
//! - `HANGMAN_ADDR`          (default: "127.0.0.1:7878")
//! - `HANGMAN_MAX_CLIENTS`   (default: "1024")
//! - `HANGMAN_TURN_LEASE_MS` (default: "5000")
//! - `HANGMAN_SHUFFLE`       (default: "false")

use hangman_shared::{ADDR_ENV, DEFAULT_ADDR};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to
    pub addr: String,

    /// Maximum number of registered clients
    pub max_clients: usize,

    /// Longest a turn holder may wait for the server's answer
    pub turn_lease: Duration,

    /// Shuffle the word list once after loading it
    pub shuffle: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let addr = env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let max_clients = read_env_or_default("HANGMAN_MAX_CLIENTS", 1024usize)?;
        let lease_ms = read_env_or_default("HANGMAN_TURN_LEASE_MS", 5000u64)?;
        let shuffle = read_env_or_default("HANGMAN_SHUFFLE", false)?;

        Ok(Config {
            addr,
            max_clients,
            turn_lease: Duration::from_millis(lease_ms),
            shuffle,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_clients: 1024,
            turn_lease: Duration::from_secs(5),
            shuffle: false,
        }
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
