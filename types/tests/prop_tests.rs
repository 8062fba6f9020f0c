//! Property-based tests for the core types.

use proptest::prelude::*;
use senate_types::{Address, Hash, Header, Transaction};

proptest! {
    /// Hash bincode serialization roundtrip.
    #[test]
    fn hash_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: Hash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(hash, decoded);
    }

    /// Address bincode serialization roundtrip.
    #[test]
    fn address_bincode_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let address = Address::new(bytes);
        let encoded = bincode::serialize(&address).unwrap();
        let decoded: Address = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(address, decoded);
    }

    /// Address ordering matches byte-wise ordering (the election tie-break
    /// depends on this).
    #[test]
    fn address_ordering_is_bytewise(a in prop::array::uniform20(0u8..),
                                    b in prop::array::uniform20(0u8..)) {
        let (x, y) = (Address::new(a), Address::new(b));
        prop_assert_eq!(x.cmp(&y), a.cmp(&b));
    }

    /// Header bincode serialization roundtrip.
    #[test]
    fn header_bincode_roundtrip(
        number in any::<u64>(),
        time in any::<u64>(),
        extra in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut header = Header::scaffold(number);
        header.time = time;
        header.extra = extra;
        let encoded = bincode::serialize(&header).unwrap();
        let decoded: Header = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(header, decoded);
    }

    /// Transaction bincode serialization roundtrip.
    #[test]
    fn transaction_bincode_roundtrip(
        hash in prop::array::uniform32(0u8..),
        sender in prop::array::uniform20(0u8..),
        value in any::<u128>(),
        data in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let tx = Transaction {
            hash: Hash::new(hash),
            sender: Address::new(sender),
            to: None,
            value,
            data,
        };
        let encoded = bincode::serialize(&tx).unwrap();
        let decoded: Transaction = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(tx, decoded);
    }
}

#[test]
fn display_formats_are_stable() {
    let hash = Hash::new([0xab; 32]);
    assert!(hash.to_string().starts_with("0xabab"));
    assert_eq!(hash.to_string().len(), 2 + 64);

    let address = Address::new([0x01; 20]);
    assert!(address.to_string().starts_with("0x0101"));
    assert_eq!(address.to_string().len(), 2 + 40);
}
