//! Word list ingestion
//!
//! Words arrive as whitespace separated tokens. Letters are kept and folded to
//! upper case, any other byte is dropped, and each word is cut at
//! `MAX_WORD_LETTERS`. The list is built once at startup and never changes.

use hangman_shared::MAX_WORD_LETTERS;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::{self, Read};

#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Builds a list from already separated words, applying the same cleanup as `read`
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for word in words {
            for token in word.as_ref().split_ascii_whitespace() {
                list.push_token(token.as_bytes());
            }
        }
        list
    }

    /// Reads a whole word source until end of stream
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;

        let mut list = Self::default();
        for token in raw.split(|b| b.is_ascii_whitespace()) {
            list.push_token(token);
        }

        info!("Loaded {} words", list.len());
        Ok(list)
    }

    fn push_token(&mut self, token: &[u8]) {
        let word: String = token
            .iter()
            .filter(|b| b.is_ascii_alphabetic())
            .take(MAX_WORD_LETTERS)
            .map(|b| b.to_ascii_uppercase() as char)
            .collect();

        if !word.is_empty() {
            debug!("Word {}: {}", self.words.len(), word);
            self.words.push(word);
        }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.words.shuffle(rng);
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
