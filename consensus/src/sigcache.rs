//! Seal hashing and the recovered-signer cache.
//!
//! The seal hash is the Keccak-256 of the canonical header encoding with the
//! trailing 65 seal bytes stripped from the extra field; the full header hash
//! includes them. Recovered signers are memoized in a bounded LRU keyed by
//! the full header hash, so `author` stays cheap on hot paths.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use senate_crypto::{keccak256, recover_signer};
use senate_types::{Address, Hash, Header};

use crate::error::SenateError;
use crate::extra::{split_extra, EXTRA_SEAL};

/// Bound on cached recovered signers.
const SIG_CACHE_SIZE: usize = 4096;

/// Concurrency-safe LRU of `header hash → recovered signer`.
pub struct SigCache {
    inner: Mutex<LruCache<Hash, Address>>,
}

impl Default for SigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SigCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(SIG_CACHE_SIZE).expect("cache size is non-zero"),
            )),
        }
    }

    fn get(&self, hash: &Hash) -> Option<Address> {
        self.inner.lock().expect("sigcache lock poisoned").get(hash).copied()
    }

    fn insert(&self, hash: Hash, signer: Address) {
        self.inner
            .lock()
            .expect("sigcache lock poisoned")
            .put(hash, signer);
    }
}

/// The signing preimage: every header field except the seal bytes.
///
/// # Panics
///
/// Panics if `header.extra` is shorter than the 65-byte seal. This is
/// deliberate: encoding such a header both with and without a seal suffix
/// would permit two distinct seal hashes for the same block.
pub fn seal_preimage(header: &Header) -> Vec<u8> {
    encode_header(header, false)
}

/// Hash of a header prior to sealing; what the seal signs.
pub fn seal_hash(header: &Header) -> Hash {
    keccak256(&seal_preimage(header))
}

/// Hash identifying the full, sealed header.
pub fn header_hash(header: &Header) -> Hash {
    keccak256(&encode_header(header, true))
}

/// Recover the address that sealed `header`, consulting the cache first.
pub fn ecrecover(header: &Header, cache: &SigCache) -> Result<Address, SenateError> {
    let hash = header_hash(header);
    if let Some(signer) = cache.get(&hash) {
        return Ok(signer);
    }

    let (_, _, seal) = split_extra(&header.extra)?;
    let seal: [u8; EXTRA_SEAL] = seal.try_into().expect("split yields exactly 65 bytes");
    let signer = recover_signer(&seal_hash(header), &seal)?;

    cache.insert(hash, signer);
    Ok(signer)
}

/// Canonical header encoding. Fixed-width fields are appended raw in header
/// order; the variable-length bloom and extra fields are length-prefixed so
/// the encoding stays injective.
fn encode_header(header: &Header, include_seal: bool) -> Vec<u8> {
    let extra = if include_seal {
        &header.extra[..]
    } else {
        assert!(
            header.extra.len() >= EXTRA_SEAL,
            "refusing to encode a header with extra shorter than the seal"
        );
        &header.extra[..header.extra.len() - EXTRA_SEAL]
    };

    let mut out = Vec::with_capacity(256 + header.bloom.len() + extra.len());
    out.extend_from_slice(header.parent_hash.as_bytes());
    out.extend_from_slice(header.uncle_hash.as_bytes());
    out.extend_from_slice(header.coinbase.as_bytes());
    out.extend_from_slice(header.root.as_bytes());
    out.extend_from_slice(header.tx_hash.as_bytes());
    out.extend_from_slice(header.receipt_hash.as_bytes());
    out.extend_from_slice(&(header.bloom.len() as u64).to_be_bytes());
    out.extend_from_slice(&header.bloom);
    out.extend_from_slice(&header.difficulty.to_be_bytes());
    out.extend_from_slice(&header.number.to_be_bytes());
    out.extend_from_slice(&header.gas_limit.to_be_bytes());
    out.extend_from_slice(&header.gas_used.to_be_bytes());
    out.extend_from_slice(&header.time.to_be_bytes());
    out.extend_from_slice(&(extra.len() as u64).to_be_bytes());
    out.extend_from_slice(extra);
    out.extend_from_slice(header.mix_digest.as_bytes());
    out.extend_from_slice(&header.nonce);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::{frame_extra, EXTRA_VANITY};
    use senate_crypto::{sign_recoverable, signing_address, SigningKey};

    fn test_key(seed: u8) -> SigningKey {
        let mut bytes = [seed; 32];
        bytes[0] = 0x01;
        SigningKey::from_slice(&bytes).expect("valid test scalar")
    }

    fn framed_header(number: u64) -> Header {
        let mut header = Header::scaffold(number);
        header.time = 1_000;
        header.extra = frame_extra(b"", &[]);
        header
    }

    fn seal(header: &mut Header, key: &SigningKey) {
        let signature = sign_recoverable(key, &seal_hash(header)).unwrap();
        let at = header.extra.len() - EXTRA_SEAL;
        header.extra[at..].copy_from_slice(&signature);
    }

    #[test]
    fn seal_hash_ignores_seal_bytes() {
        let mut a = framed_header(1);
        let mut b = framed_header(1);
        let at = a.extra.len() - EXTRA_SEAL;
        a.extra[at..].fill(0xaa);
        b.extra[at..].fill(0xbb);

        assert_eq!(seal_hash(&a), seal_hash(&b));
        assert_ne!(header_hash(&a), header_hash(&b));
    }

    #[test]
    fn seal_hash_covers_payload() {
        let a = framed_header(1);
        let mut b = framed_header(1);
        b.extra = frame_extra(b"different vanity", &[]);
        assert_ne!(seal_hash(&a), seal_hash(&b));
    }

    #[test]
    #[should_panic(expected = "extra shorter than the seal")]
    fn short_extra_panics() {
        let mut header = Header::scaffold(1);
        header.extra = vec![0u8; EXTRA_VANITY];
        seal_hash(&header);
    }

    #[test]
    fn ecrecover_roundtrip_and_cache() {
        let key = test_key(0x21);
        let mut header = framed_header(3);
        seal(&mut header, &key);

        let cache = SigCache::new();
        let first = ecrecover(&header, &cache).unwrap();
        assert_eq!(first, signing_address(&key));

        // Repeated calls hit the cache and stay stable.
        let second = ecrecover(&header, &cache).unwrap();
        assert_eq!(first, second);

        // A fresh cache recovers the same signer.
        let third = ecrecover(&header, &SigCache::new()).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn ecrecover_rejects_unframed_header() {
        let mut header = Header::scaffold(3);
        header.extra = vec![0u8; 40];
        assert!(matches!(
            ecrecover(&header, &SigCache::new()),
            Err(SenateError::MissingSignature)
        ));
    }

    #[test]
    fn zeroed_seal_fails_recovery() {
        let header = framed_header(3);
        assert!(ecrecover(&header, &SigCache::new()).is_err());
    }
}
