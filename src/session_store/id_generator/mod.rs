use rand::distributions::{DistString, Distribution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The length of a session id, in characters.
pub const SESSION_ID_LENGTH: usize = 40;

const SESSION_ID_CHARACTERS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Samples digits and lowercase ASCII letters uniformly.
#[derive(Debug, Clone, Copy)]
struct LowercaseAlphanumeric;

impl Distribution<u8> for LowercaseAlphanumeric {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        SESSION_ID_CHARACTERS[rng.gen_range(0..SESSION_ID_CHARACTERS.len())]
    }
}

impl DistString for LowercaseAlphanumeric {
    fn append_string<R: Rng + ?Sized>(&self, rng: &mut R, string: &mut String, len: usize) {
        string.extend((0..len).map(|_| char::from(self.sample(rng))));
    }
}

/// A type with the ability to generate session ids.
pub trait SessionIdGenerator {
    /// Generate a session id, i.e. a string of [`SESSION_ID_LENGTH`] characters that is a valid HTTP cookie value.
    fn generate_id(&mut self) -> String;
}

/// The default session id generator with focus on security.
/// It uses [`StdRng`] seeded from the operating system as a random source,
/// and a uniform distribution over digits and lowercase letters to generate id strings.
/// This gives `log_2(10+26) ≥ 5.16` bits of entropy per character, or more than 200 bits per id.
#[derive(Debug)]
pub struct DefaultSessionIdGenerator {
    rng: StdRng,
}

impl Default for DefaultSessionIdGenerator {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl SessionIdGenerator for DefaultSessionIdGenerator {
    fn generate_id(&mut self) -> String {
        let mut id = String::with_capacity(SESSION_ID_LENGTH);
        LowercaseAlphanumeric.append_string(&mut self.rng, &mut id, SESSION_ID_LENGTH);
        id
    }
}

/// A debug session id generator that generates an ascending sequence of integers, formatted as strings padded with zeroes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugSessionIdGenerator {
    next_index: usize,
}

impl SessionIdGenerator for DebugSessionIdGenerator {
    fn generate_id(&mut self) -> String {
        let id = format!("{:0width$}", self.next_index, width = SESSION_ID_LENGTH);
        self.next_index += 1;
        id
    }
}
