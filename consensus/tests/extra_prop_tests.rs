//! Property-based tests for the header-extra codec round-trip laws.

use proptest::prelude::*;
use senate_consensus::extra::{
    frame_extra, split_extra, BallotRecord, Declare, ProposalRecord, VoteRecord,
};
use senate_consensus::{HeaderExtra, Root, EXTRA_SEAL, EXTRA_VANITY};
use senate_types::{Address, ConfigDiff, Hash};

fn arb_address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(0u8..).prop_map(Address::new)
}

fn arb_hash() -> impl Strategy<Value = Hash> {
    prop::array::uniform32(0u8..).prop_map(Hash::new)
}

fn arb_root() -> impl Strategy<Value = Root> {
    (
        arb_hash(),
        arb_hash(),
        arb_hash(),
        arb_hash(),
        arb_hash(),
        arb_hash(),
        arb_hash(),
        arb_hash(),
    )
        .prop_map(
            |(
                candidate_hash,
                config_hash,
                declare_hash,
                delegate_hash,
                epoch_hash,
                mint_cnt_hash,
                proposal_hash,
                vote_hash,
            )| Root {
                candidate_hash,
                config_hash,
                declare_hash,
                delegate_hash,
                epoch_hash,
                mint_cnt_hash,
                proposal_hash,
                vote_hash,
            },
        )
}

fn arb_declare() -> impl Strategy<Value = Declare> {
    (arb_address(), "[a-z0-9-]{0,16}", any::<u128>()).prop_map(|(candidate, alias, bond)| {
        Declare {
            candidate,
            alias,
            bond,
        }
    })
}

fn arb_vote() -> impl Strategy<Value = VoteRecord> {
    (arb_address(), arb_address()).prop_map(|(delegator, candidate)| VoteRecord {
        delegator,
        candidate,
    })
}

fn arb_proposal() -> impl Strategy<Value = ProposalRecord> {
    (
        arb_hash(),
        arb_address(),
        prop::option::of(any::<u64>()),
        prop::option::of(any::<u128>()),
        any::<u64>(),
    )
        .prop_map(|(id, proposer, period, block_reward, deadline)| ProposalRecord {
            id,
            proposer,
            diff: ConfigDiff {
                period,
                block_reward,
                ..Default::default()
            },
            deadline,
        })
}

fn arb_ballot() -> impl Strategy<Value = BallotRecord> {
    (arb_hash(), arb_address(), any::<bool>()).prop_map(|(id, voter, approve)| BallotRecord {
        id,
        voter,
        approve,
    })
}

prop_compose! {
    fn arb_extra()(
        root in arb_root(),
        epoch in any::<u64>(),
        epoch_time in any::<u64>(),
        current_epoch_validators in prop::collection::vec(arb_address(), 0..8),
        current_block_confirmations in prop::collection::vec(arb_address(), 0..4),
        declares in prop::collection::vec(arb_declare(), 0..4),
        cancels in prop::collection::vec(arb_address(), 0..4),
        votes in prop::collection::vec(arb_vote(), 0..6),
        proposals in prop::collection::vec(arb_proposal(), 0..3),
        declarations in prop::collection::vec(arb_ballot(), 0..4),
    ) -> HeaderExtra {
        HeaderExtra {
            root,
            epoch,
            epoch_time,
            current_epoch_validators,
            current_block_confirmations,
            declares,
            cancels,
            votes,
            proposals,
            declarations,
        }
    }
}

proptest! {
    /// decode(encode(x)) == x for every valid payload.
    #[test]
    fn codec_roundtrip(extra in arb_extra()) {
        let decoded = HeaderExtra::decode(&extra.encode()).unwrap();
        prop_assert_eq!(extra, decoded);
    }

    /// Equal payloads encode byte-identically.
    #[test]
    fn encoding_is_canonical(extra in arb_extra()) {
        prop_assert_eq!(extra.encode(), extra.clone().encode());
    }

    /// Framing always splits back into the original vanity, payload and an
    /// all-zero seal slot.
    #[test]
    fn framing_roundtrip(extra in arb_extra(), vanity in prop::collection::vec(any::<u8>(), 0..48)) {
        let payload = extra.encode();
        let framed = frame_extra(&vanity, &payload);
        prop_assert_eq!(framed.len(), EXTRA_VANITY + payload.len() + EXTRA_SEAL);

        let (framed_vanity, framed_payload, seal) = split_extra(&framed).unwrap();
        let kept = vanity.len().min(EXTRA_VANITY);
        prop_assert_eq!(&framed_vanity[..kept], &vanity[..kept]);
        prop_assert_eq!(framed_payload, payload.as_slice());
        prop_assert!(seal.iter().all(|b| *b == 0));

        prop_assert_eq!(HeaderExtra::decode(framed_payload).unwrap(), extra);
    }

    /// Any trailing garbage breaks the decode.
    #[test]
    fn trailing_garbage_rejected(extra in arb_extra(), junk in 1u8..) {
        let mut bytes = extra.encode();
        bytes.push(junk);
        prop_assert!(HeaderExtra::decode(&bytes).is_err());
    }
}
