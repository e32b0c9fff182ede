//! Random secrets handed out by email.

use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

const INVITE_TOKEN_BYTES: usize = 20;
const RESET_TOKEN_BYTES: usize = 24;
const GENERATED_PASSWORD_LEN: usize = 16;

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 40 hex characters.
pub fn invite_token() -> String {
    random_hex(INVITE_TOKEN_BYTES)
}

/// 48 hex characters.
pub fn reset_token() -> String {
    random_hex(RESET_TOKEN_BYTES)
}

/// Placeholder password for accounts created on someone's behalf. The owner
/// sets a real one through password reset.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
