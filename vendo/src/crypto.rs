//! Random token and code generation.

use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;

/// Alphabet for referral codes. Skips ambiguous characters (0/O, 1/I/L)
/// since codes get read over the phone.
const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_LEN: usize = 8;

/// Generate a referral code like "K7QDM3XP".
///
/// Uniqueness is enforced by the database; the 31^8 space makes retries rare.
pub fn generate_referral_code() -> String {
    let mut bytes = [0u8; REFERRAL_CODE_LEN];
    rng().fill(&mut bytes);

    bytes
        .iter()
        .map(|b| REFERRAL_CODE_ALPHABET[*b as usize % REFERRAL_CODE_ALPHABET.len()] as char)
        .collect()
}

/// Generate a secure random token (password resets).
///
/// 32 bytes (256 bits) of cryptographically secure random data,
/// base64url-encoded without padding.
pub fn generate_reset_token() -> String {
    let mut token_bytes = [0u8; 32];
    rng().fill(&mut token_bytes);

    general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}
