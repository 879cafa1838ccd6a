//! Bounded, regex-guided string generation.
//!
//! Instead of inverting a regex, the generator grows a candidate one
//! character at a time and only appends characters that keep a match
//! possible. Viability comes from a lazy DFA (`regex-automata`'s hybrid
//! engine): after feeding the prefix, a dead state means no extension can
//! ever match. Candidates are drawn at random, so an attempt can walk into a
//! corner; the whole attempt is retried a few times before giving up with
//! [`PATTERN_SENTINEL`].

pub mod clean;

use rand::seq::SliceRandom;
use rand::Rng;
use regex_automata::hybrid::dfa::{Cache, DFA};
use regex_automata::hybrid::LazyStateID;
use regex_automata::{Anchored, Input};

use crate::error::PatternError;

pub use clean::{clean, flatten, strip_lookarounds, ALPHANUMERIC_PLUS};

/// Returned when no matching string could be built. Never real data.
pub const PATTERN_SENTINEL: &str = "changeOrSimplifyThePattern";

/// Attempts per [`PatternStringGenerator::generate`] call.
pub const MAX_ATTEMPTS: usize = 5;

/// Upper bound on requested lengths.
pub const MAX_LENGTH_CAP: usize = 512;

pub fn is_sentinel(value: &str) -> bool {
    value == PATTERN_SENTINEL
}

/// A compiled pattern ready to produce matching strings.
#[derive(Debug)]
pub struct PatternStringGenerator {
    source: String,
    verifier: regex::Regex,
    dfa: DFA,
    alphabet: Vec<char>,
}

impl PatternStringGenerator {
    /// Clean and compile a contract pattern.
    ///
    /// Patterns the `regex` crate rejects are retried with lookarounds
    /// removed before giving up.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let cleaned = clean(pattern);
        let (source, verifier) = match anchored_regex(&cleaned) {
            Ok(re) => (cleaned, re),
            Err(first) => {
                let stripped = strip_lookarounds(&cleaned);
                match anchored_regex(&stripped) {
                    Ok(re) => {
                        tracing::debug!(pattern, "dropped lookarounds to compile pattern");
                        (stripped, re)
                    }
                    Err(_) => {
                        return Err(PatternError::Invalid {
                            pattern: pattern.to_string(),
                            message: first.to_string(),
                        })
                    }
                }
            }
        };

        let flattened = flatten(&source);
        let dfa = build_dfa(&flattened).or_else(|_| build_dfa(&source)).map_err(|e| {
            PatternError::Invalid {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
        })?;

        let alphabet = (0x20u8..=0x7E).chain(0xA1u8..=0xFF).map(char::from).collect();
        Ok(Self {
            source,
            verifier,
            dfa,
            alphabet,
        })
    }

    /// The cleaned pattern that generated values are guaranteed to match.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.verifier.is_match(value)
    }

    /// Produce a string of `min_len..=max_len` characters matching the
    /// pattern, or [`PATTERN_SENTINEL`].
    pub fn generate<R: Rng + ?Sized>(&self, min_len: usize, max_len: usize, rng: &mut R) -> String {
        let max_len = max_len.min(MAX_LENGTH_CAP);
        let min_len = min_len.min(max_len);
        let mut cache = self.dfa.create_cache();

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(value) = self.attempt(&mut cache, min_len, max_len, rng) {
                if self.verifier.is_match(&value) {
                    return value;
                }
            }
            tracing::trace!(pattern = %self.source, attempt, "pattern attempt failed");
        }
        tracing::debug!(pattern = %self.source, min_len, max_len, "pattern unsatisfiable");
        PATTERN_SENTINEL.to_string()
    }

    // --- Internal implementation ---

    fn attempt<R: Rng + ?Sized>(
        &self,
        cache: &mut Cache,
        min_len: usize,
        max_len: usize,
        rng: &mut R,
    ) -> Option<String> {
        let start = Input::new("").anchored(Anchored::Yes);
        let mut state = self.dfa.start_state_forward(cache, &start).ok()?;
        let mut value = String::new();
        let mut len = 0;

        loop {
            if len >= min_len && self.accepts(cache, state) {
                return Some(value);
            }
            if len >= max_len {
                return None;
            }

            let last_slot = len + 1 == max_len;
            let mut viable: Vec<(char, LazyStateID)> = self
                .alphabet
                .iter()
                .filter_map(|&c| {
                    let next = self.step(cache, state, c)?;
                    (!last_slot || self.accepts(cache, next)).then_some((c, next))
                })
                .collect();
            viable.shuffle(rng);

            let (c, next) = viable.first().copied()?;
            value.push(c);
            state = next;
            len += 1;
        }
    }

    /// Feed one character; `None` when no match is reachable afterwards.
    fn step(&self, cache: &mut Cache, state: LazyStateID, c: char) -> Option<LazyStateID> {
        let mut buf = [0u8; 4];
        let mut current = state;
        for &byte in c.encode_utf8(&mut buf).as_bytes() {
            current = self.dfa.next_state(cache, current, byte).ok()?;
            if current.is_dead() || current.is_quit() {
                return None;
            }
        }
        Some(current)
    }

    fn accepts(&self, cache: &mut Cache, state: LazyStateID) -> bool {
        self.dfa
            .next_eoi_state(cache, state)
            .map(|eoi| eoi.is_match())
            .unwrap_or(false)
    }
}

/// Clean, compile and generate in one call.
pub fn generate<R: Rng + ?Sized>(
    pattern: &str,
    min_len: usize,
    max_len: usize,
    rng: &mut R,
) -> Result<String, PatternError> {
    Ok(PatternStringGenerator::new(pattern)?.generate(min_len, max_len, rng))
}

fn anchored_regex(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::Regex::new(&format!("^(?:{pattern})$"))
}

fn build_dfa(pattern: &str) -> Result<DFA, regex_automata::hybrid::BuildError> {
    DFA::builder()
        .configure(DFA::config().unicode_word_boundary(true))
        .build(&format!("^(?:{pattern})$"))
}
