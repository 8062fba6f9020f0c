//! Delegated proof-of-stake consensus with a rotating, epoch-elected Senate.
//!
//! The engine decides which account is authorized to mint the next block,
//! verifies that peer blocks were minted by the correct authority, and
//! maintains the auxiliary state driving validator rotation: candidacies,
//! delegations, votes, per-epoch mint counts and governance proposals. That
//! state lives in a bundle of authenticated tries whose composite root is
//! embedded in every header's extra payload. Verification replays the
//! payload's governance log on the parent snapshot and demands the exact same
//! root.

pub mod elect;
pub mod engine;
pub mod error;
pub mod extra;
pub mod root;
pub mod sigcache;
pub mod slot;
pub mod snapshot;
pub mod tx;

pub use engine::{AbortHandle, ChainHeaderReader, Senate, SignFn, StateDb, MIMETYPE_SENATE};
pub use error::SenateError;
pub use extra::{HeaderExtra, EXTRA_SEAL, EXTRA_VANITY};
pub use root::Root;
pub use snapshot::Snapshot;
pub use tx::{SenateTx, SYSTEM_CONTRACT_ADDRESS};
