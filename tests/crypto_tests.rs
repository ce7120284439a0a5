//! Integration tests for the RabbitHole crypto module.

use rabbithole::crypto::{
    decrypt, derive_key, encrypt, hash_password, verify_password, Argon2Params, Salt,
    SymmetricKey,
};
use rabbithole::errors::RabbitHoleError;

/// Cheap Argon2 parameters so the suite stays fast.
fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derivation_is_deterministic() {
    let salt = Salt::from_slice(&[7u8; 16]).unwrap();

    let k1 = derive_key(b"Secr3t!", &salt).unwrap();
    let k2 = derive_key(b"Secr3t!", &salt).unwrap();
    assert!(k1 == k2, "same password and salt must give the same key");
}

#[test]
fn derivation_depends_on_salt() {
    let s1 = Salt::from_slice(&[1u8; 16]).unwrap();
    let s2 = Salt::from_slice(&[2u8; 16]).unwrap();

    let k1 = derive_key(b"Secr3t!", &s1).unwrap();
    let k2 = derive_key(b"Secr3t!", &s2).unwrap();
    assert!(k1 != k2);
}

#[test]
fn generated_salts_differ() {
    let a = Salt::generate().unwrap();
    let b = Salt::generate().unwrap();
    assert_ne!(a, b);
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = SymmetricKey::new([0xAB; 32]);
    let long = "x".repeat(4096);

    for plaintext in ["sk-12345", "ghp_ünïcødé_🔑", long.as_str()] {
        let sealed = encrypt(&key, plaintext).expect("encrypt should succeed");
        let recovered = decrypt(&key, &sealed).expect("decrypt should succeed");
        assert_eq!(recovered.as_str(), plaintext);
    }
}

#[test]
fn wrong_key_never_yields_plaintext() {
    let key = SymmetricKey::new([0x11; 32]);
    let other = SymmetricKey::new([0x22; 32]);

    let sealed = encrypt(&key, "sk-12345").unwrap();
    assert!(matches!(
        decrypt(&other, &sealed),
        Err(RabbitHoleError::DecryptionFailed)
    ));
}

#[test]
fn encrypt_uses_fresh_nonce_each_time() {
    let key = SymmetricKey::new([0xCD; 32]);

    let a = encrypt(&key, "sk-12345").unwrap();
    let b = encrypt(&key, "sk-12345").unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn any_single_byte_corruption_fails() {
    let key = SymmetricKey::new([0x42; 32]);
    let sealed = encrypt(&key, "sk-12345").unwrap();

    for i in 0..sealed.ciphertext.len() {
        let mut tampered = sealed.clone();
        tampered.ciphertext[i] ^= 0x01;
        assert!(
            matches!(decrypt(&key, &tampered), Err(RabbitHoleError::DecryptionFailed)),
            "flipping byte {i} must be detected"
        );
    }

    let mut bad_nonce = sealed.clone();
    bad_nonce.nonce[0] ^= 0x80;
    assert!(decrypt(&key, &bad_nonce).is_err());
}

#[test]
fn wrong_key_and_tampering_look_the_same() {
    let key = SymmetricKey::new([0x42; 32]);
    let sealed = encrypt(&key, "sk-12345").unwrap();

    let mut tampered = sealed.clone();
    tampered.ciphertext[0] ^= 0xFF;

    let wrong_key = decrypt(&SymmetricKey::new([0x43; 32]), &sealed).unwrap_err();
    let corrupted = decrypt(&key, &tampered).unwrap_err();
    assert_eq!(wrong_key.to_string(), corrupted.to_string());
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

#[test]
fn hash_verifies_only_the_original_password() {
    let hash = hash_password(b"Secr3t!", &fast_params()).unwrap();

    assert!(verify_password(&hash, b"Secr3t!").unwrap());
    assert!(!verify_password(&hash, b"wrong").unwrap());
    assert!(!verify_password(&hash, b"secr3t!").unwrap());
}

#[test]
fn hashing_twice_gives_distinct_encodings() {
    let h1 = hash_password(b"Secr3t!", &fast_params()).unwrap();
    let h2 = hash_password(b"Secr3t!", &fast_params()).unwrap();

    assert_ne!(h1.as_str(), h2.as_str());
    assert!(verify_password(&h1, b"Secr3t!").unwrap());
    assert!(verify_password(&h2, b"Secr3t!").unwrap());
}
