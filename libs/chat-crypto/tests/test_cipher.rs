use chat_crypto::{decrypt, encrypt, CIPHERTEXT_DELIMITER};

#[test]
fn roundtrip_restores_plaintext() {
    let samples = [
        "hello",
        "a longer message with spaces and punctuation!?",
        "unicode: héllo wörld 🔒",
        "1",
    ];

    for text in samples {
        let blob = encrypt(text, "user-a", "user-b");
        assert!(blob.contains(CIPHERTEXT_DELIMITER), "wire format marker missing");
        assert_eq!(decrypt(&blob, "user-a", "user-b"), text);
    }
}

#[test]
fn roundtrip_is_order_independent() {
    let blob = encrypt("symmetric", "user-b", "user-a");
    assert_eq!(decrypt(&blob, "user-a", "user-b"), "symmetric");
}

#[test]
fn fresh_iv_per_call() {
    let first = encrypt("same message", "user-a", "user-b");
    let second = encrypt("same message", "user-a", "user-b");
    assert_ne!(first, second, "each encryption draws a fresh IV");
}

#[test]
fn mismatched_pair_never_reveals_plaintext() {
    for text in ["secret one", "secret two", "a third secret"] {
        let blob = encrypt(text, "user-a", "user-b");
        let wrong = decrypt(&blob, "user-a", "user-c");
        assert_ne!(wrong, text);
    }
}

#[test]
fn plaintext_without_delimiter_passes_through() {
    let legacy = "plain old message";
    assert_eq!(decrypt(legacy, "user-a", "user-b"), legacy);
}

#[test]
fn malformed_blob_returns_input_untouched() {
    let bad_iv = format!("zz{}{}", CIPHERTEXT_DELIMITER, "aGVsbG8=");
    assert_eq!(decrypt(&bad_iv, "user-a", "user-b"), bad_iv);

    let bad_b64 = format!("{}{}not base64!!", "00".repeat(16), CIPHERTEXT_DELIMITER);
    assert_eq!(decrypt(&bad_b64, "user-a", "user-b"), bad_b64);
}

#[test]
fn empty_text_passes_through_encrypt() {
    assert_eq!(encrypt("", "user-a", "user-b"), "");
}
