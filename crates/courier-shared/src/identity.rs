//! Wallet-bound identities.
//!
//! An [`Identity`] lives in memory only: it is created (or unlocked
//! from a passphrase-sealed wallet export) at account creation/unlock
//! and dropped on logout. The subdomain is immutable once registered.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::PublicKey;

use crate::constants::{KDF_CONTEXT_WALLET_SEAL, WALLET_SECRET_SIZE};
use crate::error::AuthError;
use crate::keys::{
    derive_key_from_passphrase, symmetric_decrypt, symmetric_encrypt, KeyManager,
};
use crate::types::Subdomain;

/// A subdomain identity with its wallet-derived encryption keypair.
#[derive(Clone)]
pub struct Identity {
    subdomain: Subdomain,
    wallet_address: String,
    keys: KeyManager,
}

/// Passphrase-sealed wallet export, safe to persist.
#[derive(Serialize, Deserialize, Clone)]
pub struct SealedWallet {
    pub subdomain: Subdomain,
    pub wallet_address: String,
    pub sealed_secret: Vec<u8>,
}

impl Identity {
    /// Create a fresh identity and its sealed wallet export.
    pub fn create(subdomain: Subdomain, passphrase: &str) -> (Self, SealedWallet) {
        let mut wallet_secret = [0u8; WALLET_SECRET_SIZE];
        OsRng.fill_bytes(&mut wallet_secret);
        let identity = Self::from_wallet_secret(subdomain, &wallet_secret);

        let seal_key = derive_key_from_passphrase(passphrase.as_bytes(), KDF_CONTEXT_WALLET_SEAL);
        // Sealing a fixed-size random secret with a fresh nonce cannot fail
        let sealed_secret = symmetric_encrypt(&seal_key, &wallet_secret)
            .unwrap_or_else(|_| unreachable!("sealing a wallet secret"));

        let sealed = SealedWallet {
            subdomain: identity.subdomain.clone(),
            wallet_address: identity.wallet_address.clone(),
            sealed_secret,
        };
        (identity, sealed)
    }

    /// Unlock an identity from its sealed export. A wrong passphrase
    /// fails the unlock only; no pipeline state is involved.
    pub fn unlock(sealed: &SealedWallet, passphrase: &str) -> Result<Self, AuthError> {
        let seal_key = derive_key_from_passphrase(passphrase.as_bytes(), KDF_CONTEXT_WALLET_SEAL);
        let wallet_secret = symmetric_decrypt(&seal_key, &sealed.sealed_secret)
            .map_err(|_| AuthError::WrongCredential)?;
        if wallet_secret.len() != WALLET_SECRET_SIZE {
            return Err(AuthError::MalformedWallet);
        }
        Ok(Self::from_wallet_secret(
            sealed.subdomain.clone(),
            &wallet_secret,
        ))
    }

    fn from_wallet_secret(subdomain: Subdomain, wallet_secret: &[u8]) -> Self {
        let keys = KeyManager::from_wallet_secret(wallet_secret);
        let wallet_address = derive_wallet_address(&keys.public_key());
        Self {
            subdomain,
            wallet_address,
            keys,
        }
    }

    pub fn subdomain(&self) -> &Subdomain {
        &self.subdomain
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }
}

// 0x-prefixed, 20 bytes of the BLAKE3 hash of the public key
fn derive_wallet_address(public_key: &PublicKey) -> String {
    let hash = blake3::hash(public_key.as_bytes());
    format!("0x{}", hex::encode(&hash.as_bytes()[..20]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_unlock_roundtrip() {
        let subdomain = Subdomain::new("alice").unwrap();
        let (identity, sealed) = Identity::create(subdomain, "hunter2");

        let unlocked = Identity::unlock(&sealed, "hunter2").unwrap();
        assert_eq!(identity.public_key(), unlocked.public_key());
        assert_eq!(identity.wallet_address(), unlocked.wallet_address());
        assert_eq!(unlocked.subdomain().as_str(), "alice");
    }

    #[test]
    fn test_wrong_passphrase_fails_unlock() {
        let subdomain = Subdomain::new("alice").unwrap();
        let (_, sealed) = Identity::create(subdomain, "hunter2");

        assert!(matches!(
            Identity::unlock(&sealed, "wrong"),
            Err(AuthError::WrongCredential)
        ));
    }

    #[test]
    fn test_wallet_address_format() {
        let subdomain = Subdomain::new("alice").unwrap();
        let (identity, _) = Identity::create(subdomain, "pw");

        let address = identity.wallet_address();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 2 + 40);
    }

    #[test]
    fn test_distinct_identities_distinct_keys() {
        let (a, _) = Identity::create(Subdomain::new("alice").unwrap(), "pw");
        let (b, _) = Identity::create(Subdomain::new("bob").unwrap(), "pw");
        assert_ne!(a.public_key().as_bytes(), b.public_key().as_bytes());
    }
}
