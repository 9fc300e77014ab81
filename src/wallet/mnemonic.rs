use std::str::FromStr;

use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use tycho_types::cell::HashBytes;

use super::WalletError;

const WORD_COUNT: usize = 24;
/// PBKDF2 rounds for the seed. Basic seed validation uses 1/256 of it.
const PBKDF2_ITERATIONS: u32 = 100_000;
const TON_SEED_SALT: &str = "TON default seed";
/// Salt for the basic seed check.
const MNEMONIC_SALT: &str = "TON seed version";

/// Derives a signing key from a 24-word TON mnemonic without a password.
pub fn derive_from_mnemonic(phrase: &str) -> Result<SigningKey, WalletError> {
    let words = phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>();
    if words.len() != WORD_COUNT {
        return Err(WalletError::InvalidMnemonic(format!(
            "expected {WORD_COUNT} words, got {}",
            words.len()
        )));
    }

    let entropy = mnemonic_to_entropy(&words.join(" "))?;
    if !is_basic_seed(&entropy) {
        tracing::warn!("mnemonic does not look like a basic TON seed");
    }

    let mut seed = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(
        &entropy,
        TON_SEED_SALT.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut seed,
    );

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&seed[..32]);
    Ok(SigningKey::from_bytes(&secret))
}

/// Parses a hex-encoded 32-byte secret key.
pub fn parse_secret_key(hex: &str) -> Result<SigningKey, WalletError> {
    let bytes = HashBytes::from_str(hex.trim())
        .map_err(|e| WalletError::InvalidSecretKey(e.to_string()))?;
    Ok(SigningKey::from_bytes(&bytes.0))
}

fn mnemonic_to_entropy(phrase: &str) -> Result<[u8; 64], WalletError> {
    let mut mac = Hmac::<Sha512>::new_from_slice(phrase.as_bytes())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    mac.update(b"");

    let mut entropy = [0u8; 64];
    entropy.copy_from_slice(&mac.finalize().into_bytes());
    Ok(entropy)
}

fn is_basic_seed(entropy: &[u8]) -> bool {
    let iterations = std::cmp::max(1, PBKDF2_ITERATIONS / 256);
    let mut seed = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(entropy, MNEMONIC_SALT.as_bytes(), iterations, &mut seed);
    seed[0] == 0
}
