//! Wordlist bruteforce mode: candidates sourced from a text file, held in
//! memory so repeated passes never re-read the file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::generator::PasswordSource;

pub struct Wordlist {
    words: Vec<String>,
}

impl Wordlist {
    /// Load the whole file up front, one candidate per non-blank line, each
    /// trimmed to its first 8 bytes to match what Basic auth will use.
    ///
    /// Duplicate removal only collapses *consecutive* equal lines; a list
    /// that isn't pre-sorted keeps its non-adjacent duplicates.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Wordlist> {
        Wordlist::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Wordlist> {
        let mut words = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            words.push(truncate_to_8_bytes(&line).to_string());
        }

        words.dedup();

        Ok(Wordlist { words })
    }
}

impl PasswordSource for Wordlist {
    fn count(&self) -> u64 {
        self.words.len() as u64
    }

    fn passwords(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(self.words.iter().cloned())
    }
}

/// Keep at most the first 8 bytes, backing off to the nearest character
/// boundary so the result is still valid UTF-8.
fn truncate_to_8_bytes(line: &str) -> &str {
    if line.len() <= 8 {
        return line;
    }

    let mut end = 8;
    while !line.is_char_boundary(end) {
        end -= 1;
    }

    &line[..end]
}
