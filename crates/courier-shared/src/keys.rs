//! Key management: wallet-derived x25519 keypair and the sealed-box
//! construction used for file encryption.
//!
//! [`KeyManager`] is a pure transform over byte buffers and key
//! material; it performs no network or storage I/O. Ciphertext layout
//! is `ephemeral_pub(32) || nonce(24) || aead_ciphertext`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::constants::{
    KDF_CONTEXT_IDENTITY_KEY, KDF_CONTEXT_SEALED_BOX, NONCE_SIZE, PUBKEY_SIZE,
};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; 32];

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns nonce || ciphertext (24 bytes nonce prepended)
pub fn symmetric_encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn symmetric_decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

// BLAKE3 KDF with domain separation
pub fn derive_key_from_passphrase(passphrase: &[u8], context: &str) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(passphrase);
    let hash = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash.as_bytes()[..32]);
    key
}

/// Symmetric key for a sealed box, bound to both the ephemeral and the
/// recipient public key.
fn derive_box_key(
    shared_secret: &[u8],
    ephemeral_pub: &PublicKey,
    recipient_pub: &PublicKey,
) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_SEALED_BOX);
    hasher.update(shared_secret);
    hasher.update(ephemeral_pub.as_bytes());
    hasher.update(recipient_pub.as_bytes());
    let hash = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash.as_bytes()[..32]);
    key
}

/// Holds an identity's encryption keypair, derived deterministically
/// from the wallet secret.
#[derive(Clone)]
pub struct KeyManager {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyManager {
    /// Derive the keypair from a wallet secret. The same secret always
    /// yields the same keypair.
    pub fn from_wallet_secret(wallet_secret: &[u8]) -> Self {
        let seed = derive_key_from_passphrase(wallet_secret, KDF_CONTEXT_IDENTITY_KEY);
        let secret = StaticSecret::from(seed);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Hybrid-encrypt `plaintext` so only the holder of the matching
    /// private key can read it.
    pub fn encrypt_for_recipient(
        &self,
        plaintext: &[u8],
        recipient: &PublicKey,
    ) -> Result<Vec<u8>, CryptoError> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_pub = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(recipient);

        let key = derive_box_key(shared.as_bytes(), &ephemeral_pub, recipient);
        let sealed = symmetric_encrypt(&key, plaintext)?;

        let mut output = Vec::with_capacity(PUBKEY_SIZE + sealed.len());
        output.extend_from_slice(ephemeral_pub.as_bytes());
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    /// Encrypt addressed to the identity's own key (self-store mode).
    pub fn encrypt_for_self(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_for_recipient(plaintext, &self.public)
    }

    /// Open a sealed box addressed to this identity.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < PUBKEY_SIZE + NONCE_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let (pub_bytes, sealed) = ciphertext.split_at(PUBKEY_SIZE);
        let mut arr = [0u8; 32];
        arr.copy_from_slice(pub_bytes);
        let ephemeral_pub = PublicKey::from(arr);

        let shared = self.secret.diffie_hellman(&ephemeral_pub);
        let key = derive_box_key(shared.as_bytes(), &ephemeral_pub, &self.public);
        symmetric_decrypt(&key, sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let sender = KeyManager::from_wallet_secret(b"sender-wallet-secret");
        let recipient = KeyManager::from_wallet_secret(b"recipient-wallet-secret");
        let plaintext = b"attachment bytes";

        let sealed = sender
            .encrypt_for_recipient(plaintext, &recipient.public_key())
            .unwrap();
        let opened = recipient.decrypt(&sealed).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_self_store_roundtrip() {
        let keys = KeyManager::from_wallet_secret(b"wallet-secret");
        let sealed = keys.encrypt_for_self(b"private notes").unwrap();
        assert_eq!(keys.decrypt(&sealed).unwrap(), b"private notes");
    }

    #[test]
    fn test_wrong_key_fails() {
        let sender = KeyManager::from_wallet_secret(b"sender");
        let recipient = KeyManager::from_wallet_secret(b"recipient");
        let eavesdropper = KeyManager::from_wallet_secret(b"eavesdropper");

        let sealed = sender
            .encrypt_for_recipient(b"secret", &recipient.public_key())
            .unwrap();
        assert!(matches!(
            eavesdropper.decrypt(&sealed),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let keys = KeyManager::from_wallet_secret(b"wallet");
        let mut sealed = keys.encrypt_for_self(b"data").unwrap();
        let len = sealed.len();
        sealed[len - 1] ^= 0xFF;
        assert!(keys.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let keys = KeyManager::from_wallet_secret(b"wallet");
        assert!(keys.decrypt(&[]).is_err());
        assert!(keys.decrypt(&[0u8; 40]).is_err());
    }

    #[test]
    fn test_keypair_derivation_deterministic() {
        let a = KeyManager::from_wallet_secret(b"same-secret");
        let b = KeyManager::from_wallet_secret(b"same-secret");
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());

        let c = KeyManager::from_wallet_secret(b"other-secret");
        assert_ne!(a.public_key_bytes(), c.public_key_bytes());
    }

    #[test]
    fn test_encryption_randomized() {
        let keys = KeyManager::from_wallet_secret(b"wallet");
        let a = keys.encrypt_for_self(b"data").unwrap();
        let b = keys.encrypt_for_self(b"data").unwrap();
        assert_ne!(a, b);
    }
}
