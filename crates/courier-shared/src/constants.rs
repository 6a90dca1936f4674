/// Application name
pub const APP_NAME: &str = "Courier";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// x25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Wallet secret size in bytes
pub const WALLET_SECRET_SIZE: usize = 32;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Content reference length in hex characters (BLAKE3, 32 bytes)
pub const REFERENCE_HEX_LEN: usize = 64;

/// Stamp batch id length in hex characters (without the `0x` prefix)
pub const BATCH_ID_HEX_LEN: usize = 64;

/// Canonical placeholder batch id substituted when sponsorship fails.
/// Uploads against it proceed on best-effort local capacity.
pub const PLACEHOLDER_BATCH_ID: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Maximum blob size accepted by a content store backend (50 MiB)
pub const MAX_BLOB_SIZE: usize = 50 * 1024 * 1024;

/// Default timeout for a sponsored stamp request
pub const DEFAULT_SPONSOR_TIMEOUT_SECS: u64 = 10;

/// Scaling factor from stamp capacity units to the legacy balance unit
/// reported by the pin compatibility API.
pub const LEGACY_BALANCE_UNIT: u64 = 10_000;

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_IDENTITY_KEY: &str = "courier-identity-key-v1";
pub const KDF_CONTEXT_SEALED_BOX: &str = "courier-sealed-box-v1";
pub const KDF_CONTEXT_WALLET_SEAL: &str = "courier-wallet-seal-v1";
