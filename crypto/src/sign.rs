//! Recoverable secp256k1 signatures for header seals.
//!
//! A seal is the 65-byte `r || s || v` form: 64 signature bytes followed by
//! the one-byte recovery id. The signer's address is recovered from the seal
//! and the seal hash, so headers carry no explicit public key.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use senate_types::{Address, Hash};

use crate::{keccak256, CryptoError};

pub use k256::ecdsa::SigningKey;

/// Derive the account address of a public key: the trailing 20 bytes of the
/// Keccak-256 hash of the uncompressed point (without the 0x04 prefix byte).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.as_bytes()[12..]);
    Address::new(out)
}

/// The address a signing key seals under.
pub fn signing_address(key: &SigningKey) -> Address {
    address_of(key.verifying_key())
}

/// Sign a 32-byte prehash, returning the 65-byte `r || s || v` seal.
pub fn sign_recoverable(key: &SigningKey, prehash: &Hash) -> Result<[u8; 65], CryptoError> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(prehash.as_bytes())
        .map_err(|e| CryptoError::Signing(e.to_string()))?;

    let mut seal = [0u8; 65];
    seal[..64].copy_from_slice(&signature.to_bytes());
    seal[64] = recovery_id.to_byte();
    Ok(seal)
}

/// Recover the signer address from a 32-byte prehash and a 65-byte seal.
pub fn recover_signer(prehash: &Hash, seal: &[u8; 65]) -> Result<Address, CryptoError> {
    let signature =
        Signature::from_slice(&seal[..64]).map_err(|_| CryptoError::InvalidSignature)?;
    let recovery_id =
        RecoveryId::from_byte(seal[64]).ok_or(CryptoError::InvalidSignature)?;

    let key = VerifyingKey::recover_from_prehash(prehash.as_bytes(), &signature, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;
    Ok(address_of(&key))
}
