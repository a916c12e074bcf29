//! Credentials handed to service users.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length used when none is configured. 62 symbols at 10 characters gives
/// roughly 59.5 bits of entropy.
pub const DEFAULT_PASSWORD_LENGTH: usize = 10;

/// Shortest password ever generated, whatever is configured.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Random `[A-Za-z0-9]` password from the thread-local CSPRNG.
///
/// Lengths below [`MIN_PASSWORD_LENGTH`] are raised to it.
#[must_use]
pub fn generate(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length.max(MIN_PASSWORD_LENGTH))
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_length_is_alphanumeric() {
        let password = generate(DEFAULT_PASSWORD_LENGTH);

        assert_eq!(password.len(), 10);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn short_lengths_are_raised_to_the_floor() {
        assert_eq!(generate(3).len(), MIN_PASSWORD_LENGTH);
        assert_eq!(generate(32).len(), 32);
    }

    #[test]
    fn passwords_do_not_repeat() {
        let generated: HashSet<String> = (0..64).map(|_| generate(10)).collect();

        assert_eq!(generated.len(), 64);
    }
}
