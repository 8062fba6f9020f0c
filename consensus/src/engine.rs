//! The Senate engine: the consensus surface the host chain drives.
//!
//! Verification replays each header's governance log on the parent snapshot
//! and demands the declared root; sealing builds that log from the block's
//! transactions, runs the election at epoch boundaries, and signs the result
//! after waiting out the slot delay. Both paths mutate the snapshot through
//! the single [`Snapshot::apply`] replay, so their roots converge by
//! construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::{mpsc, Arc, RwLock};
use std::time::Duration;

use senate_crypto::CryptoError;
use senate_store::Store;
use senate_types::{time, Address, Block, Hash, Header, SenateConfig, Transaction, EMPTY_UNCLE_HASH};
use tracing::{info, trace, warn};

use crate::elect::elect;
use crate::error::SenateError;
use crate::extra::{frame_extra, HeaderExtra, EXTRA_SEAL, EXTRA_VANITY};
use crate::sigcache::{ecrecover, header_hash, seal_hash, seal_preimage, SigCache};
use crate::slot::{in_turn, next_epoch};
use crate::snapshot::{load_config, Snapshot};
use crate::tx::process_transactions;

/// Every block carries this difficulty; chain weight is plain length.
const DEFAULT_DIFFICULTY: u64 = 1;

/// Mimetype tag passed to the signer for header seals.
pub const MIMETYPE_SENATE: &str = "application/x-senate-header";

/// Reads headers and chain flags from the host chain.
pub trait ChainHeaderReader: Send + Sync {
    /// Look up a header by hash and number.
    fn header(&self, hash: &Hash, number: u64) -> Option<Header>;

    /// Whether EIP-158 state clearing is active at `number`. Forwarded
    /// opaquely to the state database when computing the account root.
    fn is_eip158(&self, number: u64) -> bool;
}

/// The account-state interface the engine consumes: reward crediting and
/// balance reads for election weight.
pub trait StateDb {
    fn balance(&self, address: &Address) -> u128;
    fn add_balance(&mut self, address: &Address, amount: u128);
    fn intermediate_root(&mut self, eip158: bool) -> Hash;
}

/// Produces a 65-byte `r || s || v` seal over a signing preimage.
pub type SignFn = dyn Fn(Address, &str, &[u8]) -> Result<[u8; 65], CryptoError> + Send + Sync;

#[derive(Clone)]
struct SignerEntry {
    address: Address,
    sign_fn: Arc<SignFn>,
}

/// Requests abort of a batch verification; honored between headers.
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// The delegated-proof-of-stake consensus engine.
pub struct Senate {
    /// Bootstrap config, active until governance adopts a successor.
    config: SenateConfig,
    db: Arc<dyn Store>,
    signatures: SigCache,
    signer: RwLock<Option<SignerEntry>>,
}

impl Senate {
    pub fn new(config: SenateConfig, db: Arc<dyn Store>) -> Self {
        Self {
            config,
            db,
            signatures: SigCache::new(),
            signer: RwLock::new(None),
        }
    }

    /// Inject the account and signing function used for sealing.
    pub fn authorize(&self, address: Address, sign_fn: Arc<SignFn>) {
        let mut signer = self.signer.write().expect("signer lock poisoned");
        *signer = Some(SignerEntry { address, sign_fn });
    }

    /// The address that minted the given block, recovered from its seal.
    pub fn author(&self, header: &Header) -> Result<Address, SenateError> {
        ecrecover(header, &self.signatures)
    }

    /// Hash of a block prior to sealing.
    pub fn seal_hash(&self, header: &Header) -> Hash {
        seal_hash(header)
    }

    /// The difficulty a new block should carry. Constant under DPoS.
    pub fn calc_difficulty(&self) -> u64 {
        DEFAULT_DIFFICULTY
    }

    /// Check a single header against the consensus rules.
    pub fn verify_header(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
    ) -> Result<(), SenateError> {
        self.verify_header_inner(chain, header, &[])
    }

    /// Verify a batch of headers on a background thread. Results arrive on
    /// the returned channel in input order; the handle aborts the batch at
    /// the next header boundary. Header `i` may use headers `[0..i)` of the
    /// batch as parents in lieu of database lookups.
    pub fn verify_headers(
        self: Arc<Self>,
        chain: Arc<dyn ChainHeaderReader>,
        headers: Vec<Header>,
    ) -> (AbortHandle, Receiver<Result<(), SenateError>>) {
        let (results, receiver) = mpsc::sync_channel(headers.len().max(1));
        let flag = Arc::new(AtomicBool::new(false));
        let handle = AbortHandle { flag: flag.clone() };

        std::thread::spawn(move || {
            for i in 0..headers.len() {
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                let result = self.verify_header_inner(&*chain, &headers[i], &headers[..i]);
                if results.send(result).is_err() {
                    return;
                }
            }
        });
        (handle, receiver)
    }

    /// Uncles are meaningless under DPoS; any uncle is a violation.
    pub fn verify_uncles(&self, block: &Block) -> Result<(), SenateError> {
        if block.uncles.is_empty() {
            Ok(())
        } else {
            Err(SenateError::UnclesNotAllowed)
        }
    }

    /// Check that the seal on `header` was produced by the validator whose
    /// slot covers the header's timestamp.
    pub fn verify_seal(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
    ) -> Result<(), SenateError> {
        trace!(number = header.number, "verify seal");
        if header.number == 0 {
            return Err(SenateError::UnknownBlock);
        }
        let parent = chain
            .header(&header.parent_hash, header.number - 1)
            .ok_or(SenateError::UnknownAncestor)?;
        let extra = HeaderExtra::decode_from_header(header)?;
        let (mut snap, _, _, config) = self.parent_snapshot(&parent)?;
        snap.apply(header, &extra)?;
        self.check_in_turn(&snap, &config, &extra, header.time, self.author(header)?)
    }

    /// Initialize the consensus fields of a header being mined: difficulty,
    /// timestamp, epoch coordinates, and the framed extra scaffold. The
    /// vanity prefix the miner put in `extra` is preserved.
    pub fn prepare(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &mut Header,
    ) -> Result<(), SenateError> {
        trace!(number = header.number, "prepare");
        header.mix_digest = Hash::ZERO;
        header.difficulty = self.calc_difficulty();

        let parent = chain
            .header(&header.parent_hash, header.number.wrapping_sub(1))
            .ok_or(SenateError::UnknownAncestor)?;

        let mut extra = HeaderExtra::default();
        if header.number == 1 {
            header.time = (parent.time + self.config.period).max(time::now());
            extra.epoch = 1;
            extra.epoch_time = header.time;
        } else {
            let parent_extra = HeaderExtra::decode_from_header(&parent)?;
            let config = self.config_by_hash(&parent_extra.root.config_hash)?;
            header.time = (parent.time + config.period).max(time::now());
            extra.root = parent_extra.root;
            let (epoch, epoch_time) = next_epoch(
                &config,
                parent_extra.epoch,
                parent_extra.epoch_time,
                header.time,
            );
            extra.epoch = epoch;
            extra.epoch_time = epoch_time;
        }

        header.extra = frame_extra(&header.extra, &extra.encode());
        Ok(())
    }

    /// Run the post-transaction consensus rules against a header whose extra
    /// was produced elsewhere, checking that the locally rebuilt payload
    /// matches byte-for-byte. Rewards are credited and the account root is
    /// set, but the snapshot is not committed; that is the verifier's job.
    pub fn finalize(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &mut Header,
        state: &mut dyn StateDb,
        txs: &[Transaction],
    ) -> Result<(), SenateError> {
        trace!(number = header.number, "finalize");
        let declared = HeaderExtra::decode_from_header(header)?;
        let (mut snap, mut expected) = self.replay_block(chain, header, state, txs)?;
        snap.apply(header, &expected)?;

        expected.root = snap.root()?;
        if expected != declared {
            info!(
                "finalize diverged from declared extra:\n{}\nvs\n{}",
                expected.root, declared.root
            );
            return Err(SenateError::InvalidTrieRoot);
        }

        header.root = state.intermediate_root(chain.is_eip158(header.number));
        header.uncle_hash = EMPTY_UNCLE_HASH;
        Ok(())
    }

    /// Run the post-transaction consensus rules and assemble the final block:
    /// rewards, mint count, governance log, election at epoch boundaries,
    /// snapshot commit, and the freshly encoded extra.
    pub fn finalize_and_assemble(
        &self,
        chain: &dyn ChainHeaderReader,
        mut header: Header,
        state: &mut dyn StateDb,
        txs: &[Transaction],
    ) -> Result<Block, SenateError> {
        trace!(number = header.number, "finalize and assemble");
        let (mut snap, mut extra) = self.replay_block(chain, &header, state, txs)?;
        snap.apply(&header, &extra)?;

        extra.root = snap.root()?;
        snap.commit(&extra.root)?;

        header.extra = frame_extra(&header.extra, &extra.encode());
        header.root = state.intermediate_root(chain.is_eip158(header.number));
        header.uncle_hash = EMPTY_UNCLE_HASH;
        Ok(Block::new(header, txs.to_vec()))
    }

    /// Sign the block and schedule its delivery once the slot opens.
    ///
    /// Returns immediately; a background task waits for the slot delay or the
    /// stop channel, then attempts a non-blocking send on `results` and drops
    /// the block with a warning if nobody is reading.
    pub fn seal(
        &self,
        chain: &dyn ChainHeaderReader,
        block: &Block,
        results: SyncSender<Block>,
        stop: Receiver<()>,
    ) -> Result<(), SenateError> {
        let header = block.header.clone();
        trace!(number = header.number, "seal");
        if header.number == 0 {
            return Err(SenateError::UnknownBlock);
        }
        if header.extra.len() < EXTRA_VANITY {
            return Err(SenateError::MissingVanity);
        }
        if header.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(SenateError::MissingSignature);
        }

        let parent = chain
            .header(&header.parent_hash, header.number - 1)
            .ok_or(SenateError::UnknownAncestor)?;
        let extra = HeaderExtra::decode_from_header(&header)?;
        let (mut snap, _, _, config) = self.parent_snapshot(&parent)?;
        snap.apply(&header, &extra)?;
        self.check_in_turn(&snap, &config, &extra, header.time, header.coinbase)?;

        // Hold the signer fields only for the duration of the copy.
        let entry = {
            let signer = self.signer.read().expect("signer lock poisoned");
            signer.clone().ok_or(SenateError::Unauthorized)?
        };

        let seal = (entry.sign_fn)(entry.address, MIMETYPE_SENATE, &seal_preimage(&header))?;
        let mut sealed_header = header.clone();
        let at = sealed_header.extra.len() - EXTRA_SEAL;
        sealed_header.extra[at..].copy_from_slice(&seal);
        let sealed = block.with_seal(sealed_header);

        let delay = Duration::from_secs(header.time.saturating_sub(time::now()));
        info!(number = header.number, ?delay, "waiting for slot to sign and propagate");
        std::thread::spawn(move || {
            match stop.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => {
                    let hash = seal_hash(&sealed.header);
                    if results.try_send(sealed).is_err() {
                        warn!(%hash, "sealing result is not read by miner");
                    }
                }
                // Stop requested (or the caller went away) before the slot.
                _ => {}
            }
        });
        Ok(())
    }

    fn verify_header_inner(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), SenateError> {
        trace!(number = header.number, "verify header");

        // Don't waste time on blocks from the future.
        if header.time > time::now() {
            return Err(SenateError::FutureBlock);
        }
        if header.extra.len() < EXTRA_VANITY {
            return Err(SenateError::MissingVanity);
        }
        if header.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(SenateError::MissingSignature);
        }
        // Fork-protection fields are reserved and must stay zero.
        if !header.mix_digest.is_zero() {
            return Err(SenateError::InvalidMixDigest);
        }
        if header.uncle_hash != EMPTY_UNCLE_HASH {
            return Err(SenateError::InvalidUncleHash);
        }

        let result = self.verify_cascading_fields(chain, header, parents);
        if let Err(reason) = &result {
            warn!(number = header.number, %reason, "failed to verify cascading fields");
        }
        result
    }

    fn verify_cascading_fields(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), SenateError> {
        // The genesis block is the always-valid dead end.
        if header.number == 0 {
            return Ok(());
        }

        let parent = if let Some(last) = parents.last() {
            last.clone()
        } else {
            chain
                .header(&header.parent_hash, header.number - 1)
                .ok_or(SenateError::UnknownAncestor)?
        };
        if parent.number + 1 != header.number || header_hash(&parent) != header.parent_hash {
            return Err(SenateError::UnknownAncestor);
        }
        if parent.time >= header.time {
            return Err(SenateError::InvalidTimestamp);
        }

        let extra = HeaderExtra::decode_from_header(header)?;
        let (mut snap, parent_epoch, parent_epoch_time, config) = self.parent_snapshot(&parent)?;

        // Epoch coordinates are forced, not merely consistent: the block must
        // declare exactly what the advancement rule yields for its timestamp.
        let expected = if parent.number == 0 {
            (1, header.time)
        } else {
            next_epoch(&config, parent_epoch, parent_epoch_time, header.time)
        };
        if (extra.epoch, extra.epoch_time) != expected {
            return Err(SenateError::InvalidTimestamp);
        }
        // The elected sequence travels only in epoch-first blocks.
        let advanced = extra.epoch != parent_epoch;
        if advanced == extra.current_epoch_validators.is_empty() {
            return Err(SenateError::MalformedExtra);
        }

        snap.apply(header, &extra)?;
        let root = snap.root()?;
        if root != extra.root {
            info!("root mismatch:\n{}\nvs declared\n{}", root, extra.root);
            return Err(SenateError::InvalidTrieRoot);
        }

        let signer = ecrecover(header, &self.signatures)?;
        self.check_in_turn(&snap, &config, &extra, header.time, signer)?;

        // All checks passed; persist the snapshot for the next block.
        snap.commit(&root)
    }

    fn check_in_turn(
        &self,
        snap: &Snapshot,
        config: &SenateConfig,
        extra: &HeaderExtra,
        time: u64,
        signer: Address,
    ) -> Result<(), SenateError> {
        let validators = snap
            .validators(extra.epoch)?
            .ok_or_else(|| SenateError::SnapshotMissing(format!("validators of epoch {}", extra.epoch)))?;
        if !in_turn(&validators, extra.epoch_time, time, config.period, &signer) {
            return Err(SenateError::Unauthorized);
        }
        Ok(())
    }

    /// The parent's snapshot plus its epoch coordinates and active config.
    /// Block one's parent is the genesis: an empty snapshot under the
    /// bootstrap config.
    fn parent_snapshot(
        &self,
        parent: &Header,
    ) -> Result<(Snapshot, u64, u64, SenateConfig), SenateError> {
        if parent.number == 0 {
            let snap = Snapshot::new(self.db.clone(), self.config.clone());
            return Ok((snap, 0, 0, self.config.clone()));
        }
        let parent_extra = HeaderExtra::decode_from_header(parent)?;
        let config = self.config_by_hash(&parent_extra.root.config_hash)?;
        let snap = Snapshot::load(self.db.clone(), &parent_extra.root)?;
        Ok((snap, parent_extra.epoch, parent_extra.epoch_time, config))
    }

    /// A historical config by content hash.
    fn config_by_hash(&self, hash: &Hash) -> Result<SenateConfig, SenateError> {
        load_config(&*self.db, hash)
    }

    /// The shared replay-building half of both finalize paths: credit the
    /// reward, derive the governance log from the transactions against a
    /// scratch snapshot, and elect at an epoch boundary. Returns the parent
    /// snapshot (still unmutated) and the fully built payload, ready for
    /// [`Snapshot::apply`].
    fn replay_block(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
        state: &mut dyn StateDb,
        txs: &[Transaction],
    ) -> Result<(Snapshot, HeaderExtra), SenateError> {
        let declared = HeaderExtra::decode_from_header(header)?;
        let parent = chain
            .header(&header.parent_hash, header.number.wrapping_sub(1))
            .ok_or(SenateError::UnknownAncestor)?;
        let (snap, parent_epoch, _, config) = self.parent_snapshot(&parent)?;

        if config.block_reward > 0 {
            state.add_balance(&header.coinbase, config.block_reward);
        }

        let mut extra = HeaderExtra {
            epoch: declared.epoch,
            epoch_time: declared.epoch_time,
            ..Default::default()
        };
        if parent.number > 0 {
            extra.root = HeaderExtra::decode_from_header(&parent)?.root;
        }

        let mut scratch = snap.clone();
        process_transactions(&config, state, header, &mut scratch, &mut extra, txs)?;

        if extra.epoch == parent_epoch + 1 {
            extra.current_epoch_validators = if parent_epoch == 0 {
                if config.validators.is_empty() {
                    return Err(SenateError::ElectionFailed(
                        "no genesis validators configured".into(),
                    ));
                }
                config.validators.clone()
            } else {
                elect(&scratch, state, &config, extra.epoch)?
            };
        }
        Ok((snap, extra))
    }
}
