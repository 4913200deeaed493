//! Randomized resource names and admin passwords
//!
//! Names are randomized so reruns never collide with leftovers from an
//! earlier run; nothing checks for pre-existing resources.

use rand::Rng;
use rand::distr::{Alphanumeric, SampleString};
use rand::seq::SliceRandom;

/// Longest name handed to the control plane
pub const MAX_NAME_LEN: usize = 30;

const SUFFIX_LEN: usize = 8;
const PASSWORD_LEN: usize = 20;
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+";

/// `prefix` followed by a random lowercase alphanumeric suffix
///
/// The result is at most `max_len` characters; the prefix is shortened when
/// it would not leave room for the suffix.
pub fn random_name(prefix: &str, max_len: usize) -> String {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), SUFFIX_LEN)
        .to_lowercase();
    let keep = max_len.saturating_sub(SUFFIX_LEN).min(prefix.len());
    let mut name: String = prefix.chars().take(keep).collect();
    name.push_str(&suffix);
    name.truncate(max_len);
    name
}

/// A password meeting SQL server complexity rules
///
/// Always contains upper and lower case letters, digits and symbols.
pub fn random_password() -> String {
    let mut rng = rand::rng();
    let mut chars: Vec<char> = vec![
        rng.random_range(b'A'..=b'Z') as char,
        rng.random_range(b'a'..=b'z') as char,
        rng.random_range(b'0'..=b'9') as char,
        SYMBOLS[rng.random_range(0..SYMBOLS.len())] as char,
    ];
    chars.extend(Alphanumeric.sample_string(&mut rng, PASSWORD_LEN - chars.len()).chars());
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}
