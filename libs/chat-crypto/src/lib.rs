//! Non-interactive pair-key derivation and the message wire cipher.
//!
//! Both endpoints of a conversation derive the same 256-bit key purely from
//! the two user identifiers — nothing is ever exchanged. The derivation is
//! a deterministic double SHA-256 over the lexicographically sorted pair,
//! not a key-agreement protocol; it keeps message content opaque at rest
//! and on the wire between the two parties that already know each other's
//! ids.
//!
//! Wire format: `<ivHex>:QKD:<base64Ciphertext>` (AES-256-CBC, PKCS7).
//! Anything without the `:QKD:` delimiter is legacy plaintext and is passed
//! through unchanged by both [`encrypt`] callers and [`decrypt`].

use std::collections::HashMap;
use std::sync::Mutex;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Delimiter separating the hex IV from the base64 ciphertext on the wire.
pub const CIPHERTEXT_DELIMITER: &str = ":QKD:";

const DERIVATION_SEED_SUFFIX: &str = "qkd-seed-2024";
const DERIVATION_FINAL_SUFFIX: &str = "final-key";

/// Process-wide memo of derived keys, keyed by the sorted identifier pair.
/// Invalidated only by [`clear_key_cache`].
static KEY_CACHE: Lazy<Mutex<HashMap<String, [u8; 32]>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn sorted_pair(id_a: &str, id_b: &str) -> String {
    let mut ids = [id_a, id_b];
    ids.sort_unstable();
    format!("{}-{}", ids[0], ids[1])
}

/// Derive the shared 256-bit key for a pair of user identifiers.
///
/// Order-independent: `derive_shared_key(a, b) == derive_shared_key(b, a)`.
pub fn derive_shared_key(id_a: &str, id_b: &str) -> [u8; 32] {
    let sorted = sorted_pair(id_a, id_b);

    if let Some(key) = KEY_CACHE.lock().expect("key cache poisoned").get(&sorted) {
        return *key;
    }

    let seed = hex::encode(Sha256::digest(format!("{sorted}{DERIVATION_SEED_SUFFIX}")));
    let key: [u8; 32] = Sha256::digest(format!("{seed}{sorted}{DERIVATION_FINAL_SUFFIX}")).into();

    KEY_CACHE
        .lock()
        .expect("key cache poisoned")
        .insert(sorted, key);
    key
}

/// Drop all memoized keys. The next derivation recomputes from scratch.
pub fn clear_key_cache() {
    KEY_CACHE.lock().expect("key cache poisoned").clear();
}

/// Encrypt `text` under the pair key for (`id_a`, `id_b`).
///
/// A fresh random 16-byte IV is drawn per call. Empty input is returned
/// unchanged — only textual payloads go through the cipher.
pub fn encrypt(text: &str, id_a: &str, id_b: &str) -> String {
    if text.is_empty() {
        return text.to_string();
    }

    let key = derive_shared_key(id_a, id_b);
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());

    format!(
        "{}{}{}",
        hex::encode(iv),
        CIPHERTEXT_DELIMITER,
        BASE64.encode(ciphertext)
    )
}

/// Decrypt a wire blob for the pair (`id_a`, `id_b`).
///
/// Blobs without the delimiter are legacy plaintext and come back
/// unchanged. Any decryption failure (bad IV, bad base64, padding error,
/// non-UTF-8 or empty plaintext) also returns the input untouched — callers
/// must tolerate rendering ciphertext; this never raises.
pub fn decrypt(blob: &str, id_a: &str, id_b: &str) -> String {
    if !blob.contains(CIPHERTEXT_DELIMITER) {
        return blob.to_string();
    }

    match try_decrypt(blob, id_a, id_b) {
        Some(plaintext) => plaintext,
        None => {
            tracing::debug!("message decryption failed, returning ciphertext");
            blob.to_string()
        }
    }
}

fn try_decrypt(blob: &str, id_a: &str, id_b: &str) -> Option<String> {
    let mut parts = blob.split(CIPHERTEXT_DELIMITER);
    let iv_hex = parts.next()?;
    let ciphertext_b64 = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let iv: [u8; 16] = hex::decode(iv_hex).ok()?.try_into().ok()?;
    let ciphertext = BASE64.decode(ciphertext_b64).ok()?;

    let key = derive_shared_key(id_a, id_b);
    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .ok()?;

    let text = String::from_utf8(plaintext).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}
