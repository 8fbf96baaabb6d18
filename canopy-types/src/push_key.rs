//! Push keys: the store's identifiers for generated children.
//!
//! A push key is 20 characters drawn from an alphabet whose ASCII order
//! matches its digit value. The first 8 characters encode the creation time
//! in milliseconds (big-endian, 6 bits per character); the remaining 12 are
//! random. Keys minted in the same millisecond by one generator increment the
//! random suffix instead of redrawing it, so keys from a single generator are
//! strictly increasing in lexical order.

use crate::{Error, Result};
use parking_lot::Mutex;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key alphabet, in ascending ASCII order.
pub const PUSH_CHARS: &[u8; 64] =
    b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Length of every generated key.
pub const PUSH_KEY_LEN: usize = 20;

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = PUSH_KEY_LEN - TIME_CHARS;

#[derive(Debug)]
struct GeneratorState {
    last_millis: u64,
    last_random: [u8; RANDOM_CHARS],
}

/// Generates push keys for new children.
///
/// One generator is shared by every collection of a backend; keys are
/// unique across collections as well as within one.
#[derive(Debug)]
pub struct PushKeyGenerator {
    state: Mutex<GeneratorState>,
}

impl PushKeyGenerator {
    /// Creates a generator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GeneratorState {
                last_millis: 0,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }

    /// Mints a key for the current wall-clock time.
    pub fn next_key(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.next_key_at(now)
    }

    /// Mints a key for the given time in milliseconds since the Unix epoch.
    ///
    /// A time earlier than the previous key's time is clamped to it, which
    /// keeps the sequence monotonic when the wall clock steps backwards.
    pub fn next_key_at(&self, millis: u64) -> String {
        let mut state = self.state.lock();

        if millis > state.last_millis {
            state.last_millis = millis;
            let mut rng = rand::thread_rng();
            for digit in state.last_random.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        } else if !increment(&mut state.last_random) {
            // Suffix exhausted within one millisecond: borrow the next one.
            state.last_millis += 1;
            state.last_random = [0; RANDOM_CHARS];
        }

        let mut key = String::with_capacity(PUSH_KEY_LEN);
        let mut time_digits = [0u8; TIME_CHARS];
        let mut remaining = state.last_millis;
        for slot in time_digits.iter_mut().rev() {
            *slot = (remaining % 64) as u8;
            remaining /= 64;
        }
        for digit in time_digits.iter().chain(state.last_random.iter()) {
            key.push(PUSH_CHARS[*digit as usize] as char);
        }
        key
    }
}

impl Default for PushKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Adds one to a base-64 digit string. Returns false on overflow.
fn increment(digits: &mut [u8]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return true;
        }
    }
    false
}

/// Extracts the creation time (ms since the Unix epoch) from a push key.
pub fn push_key_millis(key: &str) -> Result<u64> {
    if key.len() != PUSH_KEY_LEN {
        return Err(Error::InvalidPushKey(format!(
            "expected {PUSH_KEY_LEN} characters, got {}",
            key.len()
        )));
    }

    let mut millis = 0u64;
    for byte in key.bytes().take(TIME_CHARS) {
        let value = PUSH_CHARS
            .iter()
            .position(|c| *c == byte)
            .ok_or_else(|| Error::InvalidPushKey(format!("unexpected character {:?}", byte as char)))?;
        millis = millis * 64 + value as u64;
    }
    Ok(millis)
}
