use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid private key")]
    InvalidKey,

    #[error("signing failed: {0}")]
    Signing(String),
}
