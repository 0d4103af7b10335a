//! Where confirmed matches go (spec §6 "Match output").
//!
//! Grounded on `examples/original_source/src/main.cpp`'s `print_match()`
//! (optional `file_data_id;` prefix, reconstructed text) and kept as a
//! trait, the way the teacher keeps device output behind a seam in
//! `lotus-miner-lib/src/miner.rs`, so tests can collect matches instead
//! of racing stdout from multiple worker threads.

use std::io::{IsTerminal, Write};
use std::sync::Mutex;

/// A confirmed preimage: the digest it was found for, the
/// reconstructed printable string, and — in listfile recombination
/// mode — the numeric id it's reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub digest: u64,
    pub text: String,
    pub label: Option<u64>,
}

pub trait MatchSink: Send + Sync {
    fn report(&self, m: Match);
}

/// Prints to stdout, green when stdout is a terminal (spec §6
/// "colored match output"); plain otherwise so piping/redirection
/// produces parseable text.
pub struct ConsoleSink {
    colorize: bool,
    out: Mutex<std::io::Stdout>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        ConsoleSink {
            colorize: std::io::stdout().is_terminal(),
            out: Mutex::new(std::io::stdout()),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

impl MatchSink for ConsoleSink {
    fn report(&self, m: Match) {
        let mut out = self.out.lock().unwrap();
        let prefix = match m.label {
            Some(id) => format!("{id};"),
            None => String::new(),
        };
        if self.colorize {
            let _ = writeln!(out, "{prefix}{GREEN}{}{RESET}", m.text);
        } else {
            let _ = writeln!(out, "{prefix}{}", m.text);
        }
    }
}

/// Collects matches in memory instead of printing, for deterministic
/// assertions in tests and for the listfile recombination driver's own
/// internal bookkeeping pass.
#[derive(Default)]
pub struct CollectingSink {
    matches: Mutex<Vec<Match>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_matches(self) -> Vec<Match> {
        self.matches.into_inner().unwrap()
    }

    pub fn matches(&self) -> Vec<Match> {
        self.matches.lock().unwrap().clone()
    }
}

impl MatchSink for CollectingSink {
    fn report(&self, m: Match) {
        self.matches.lock().unwrap().push(m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order() {
        let sink = CollectingSink::new();
        sink.report(Match { digest: 1, text: "a".into(), label: None });
        sink.report(Match { digest: 2, text: "b".into(), label: Some(7) });
        let got = sink.into_matches();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].label, Some(7));
    }
}
