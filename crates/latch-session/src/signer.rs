//! Token signing.
//!
//! The store never touches cryptography directly; it goes through the
//! [`Signer`] capability so tests can swap in a fake. [`HmacSigner`] is the
//! production implementation: HMAC-SHA256, lowercase hex, compared in
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;


type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 rounds used by [`derive_key`].
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Length in bytes of keys produced by [`derive_key`].
pub const DERIVED_KEY_LEN: usize = 32;

/// Length in bytes of salts produced by [`random_salt`].
pub const SALT_LEN: usize = 16;

/// Signing capability used by the session store.
pub trait Signer: Send + Sync {
    /// Sign `message` under `secret`, returning the signature as text.
    fn sign(&self, message: &str, secret: &[u8]) -> String;

    /// Compare an expected signature with a presented one.
    ///
    /// Implementations must not leak through timing where the inputs differ.
    fn verify(&self, expected: &str, presented: &str) -> bool {
        constant_time_eq(expected, presented)
    }
}

/// HMAC-SHA256 signer producing lowercase hex signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl HmacSigner {
    pub fn new() -> Self {
        Self
    }
}

impl Signer for HmacSigner {
    fn sign(&self, message: &str, secret: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Compare two strings in constant time.
///
/// Length mismatches return false, but still run a comparison of the same
/// shape so the early exit is not observable.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// Derive a 32-byte key from a secret and salt with PBKDF2-HMAC-SHA256.
///
/// Any salt is accepted, including an empty one.
pub fn derive_key(secret: &[u8], salt: &[u8]) -> [u8; DERIVED_KEY_LEN] {
    let mut key = [0u8; DERIVED_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Generate a fresh random salt.
pub fn random_salt() -> [u8; SALT_LEN] {
    rand::random()
}
