//! BIP39 mnemonic generation, validation, and seed derivation.

use bip39::Mnemonic;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// Entropy size for a 12-word mnemonic: 128 bits.
const ENTROPY_SIZE: usize = 16;

/// Generate a fresh 12-word (128-bit entropy) mnemonic.
pub fn generate_mnemonic() -> Result<Mnemonic> {
    let entropy = super::utils::random_bytes(ENTROPY_SIZE);
    Mnemonic::from_entropy(&entropy).map_err(|e| CoreError::Mnemonic(e.to_string()))
}

/// Validate a mnemonic phrase (checksum included) and derive its 64-byte
/// PBKDF2 seed under the given passphrase.
///
/// Wrapped in `Zeroizing` -- the seed is the root of every key this crate
/// ever derives and is wiped once its caller is done with it.
pub fn seed_from_mnemonic(phrase: &str, passphrase: &str) -> Result<Zeroizing<Vec<u8>>> {
    let mnemonic: Mnemonic = phrase
        .parse()
        .map_err(|e: bip39::Error| CoreError::Mnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed(passphrase).to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_VECTOR: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn standard_test_vector_parses() {
        let seed = seed_from_mnemonic(TEST_VECTOR, "").unwrap();
        assert_eq!(seed.len(), 64);
    }

    #[test]
    fn passphrase_changes_the_seed() {
        let a = seed_from_mnemonic(TEST_VECTOR, "").unwrap();
        let b = seed_from_mnemonic(TEST_VECTOR, "TREZOR").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let broken = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(seed_from_mnemonic(broken, "").is_err());
    }

    #[test]
    fn generated_mnemonic_round_trips() {
        let mnemonic = generate_mnemonic().unwrap();
        let phrase = mnemonic.to_string();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert!(seed_from_mnemonic(&phrase, "").is_ok());
    }
}
