use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Capacity error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Invalid key length")]
    InvalidKeyLength,
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid content reference: {0:?}")]
    InvalidReference(String),

    #[error("Invalid batch id: {0:?}")]
    InvalidBatchId(String),

    #[error("Invalid subdomain: {0:?}")]
    InvalidSubdomain(String),

    #[error("Send mode requires a recipient")]
    RecipientRequired,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unlock failed: wrong credential")]
    WrongCredential,

    #[error("Malformed wallet export")]
    MalformedWallet,
}

/// Sponsorship failures are recoverable: callers fall back to the
/// zero-filled placeholder batch id and continue on local capacity.
#[derive(Error, Debug)]
pub enum CapacityError {
    #[error("Sponsored stamp request timed out")]
    SponsorTimeout,

    #[error("Sponsor rejected the request: {0}")]
    SponsorRejected(String),
}

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("Recipient could not be resolved: {0:?}")]
    RecipientUnresolved(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// Store and delivery I/O failures. Fatal to the operation that hit
/// them; the core performs no automatic retry.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Blob rejected: {0}")]
    Rejected(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
