//! Slot arithmetic: mapping timestamps to the validator whose turn it is.

use senate_types::{Address, SenateConfig};

/// The validator owning the slot that covers `time`.
///
/// `None` when the sequence is empty, the period is zero, or `time` precedes
/// the epoch start.
pub fn slot_owner(
    validators: &[Address],
    epoch_time: u64,
    time: u64,
    period: u64,
) -> Option<Address> {
    if validators.is_empty() || period == 0 || time < epoch_time {
        return None;
    }
    let slot = (time - epoch_time) / period;
    Some(validators[(slot % validators.len() as u64) as usize])
}

/// Whether `signer` owns the slot covering `time`.
pub fn in_turn(
    validators: &[Address],
    epoch_time: u64,
    time: u64,
    period: u64,
    signer: &Address,
) -> bool {
    slot_owner(validators, epoch_time, time, period).as_ref() == Some(signer)
}

/// The epoch coordinates a block at `time` must declare, given its parent's.
///
/// Shared by `prepare` and the verifier so both sides advance epochs under
/// exactly the same rule.
pub fn next_epoch(
    config: &SenateConfig,
    parent_epoch: u64,
    parent_epoch_time: u64,
    time: u64,
) -> (u64, u64) {
    let duration = time.saturating_sub(parent_epoch_time);
    if config.epoch > 0 && duration >= config.epoch && duration % config.epoch > 0 {
        (parent_epoch + 1, time)
    } else {
        (parent_epoch, parent_epoch_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn rotation_follows_slot_index() {
        let validators = [addr(0xa), addr(0xb), addr(0xc)];
        // Epoch starts at 1000 with a 3s period: 1000 → A, 1003 → B,
        // 1006 → C, 1009 → A again.
        assert_eq!(slot_owner(&validators, 1_000, 1_000, 3), Some(addr(0xa)));
        assert_eq!(slot_owner(&validators, 1_000, 1_003, 3), Some(addr(0xb)));
        assert_eq!(slot_owner(&validators, 1_000, 1_006, 3), Some(addr(0xc)));
        assert_eq!(slot_owner(&validators, 1_000, 1_009, 3), Some(addr(0xa)));
    }

    #[test]
    fn exactly_one_validator_in_turn_per_slot() {
        let validators = [addr(1), addr(2), addr(3)];
        for time in (1_000..1_030).step_by(3) {
            let owners = validators
                .iter()
                .filter(|v| in_turn(&validators, 1_000, time, 3, v))
                .count();
            assert_eq!(owners, 1, "time {time}");
        }
    }

    #[test]
    fn degenerate_inputs_have_no_owner() {
        assert_eq!(slot_owner(&[], 1_000, 1_003, 3), None);
        assert_eq!(slot_owner(&[addr(1)], 1_000, 1_003, 0), None);
        assert_eq!(slot_owner(&[addr(1)], 1_000, 999, 3), None);
    }

    #[test]
    fn epoch_advances_past_boundary() {
        let config = SenateConfig {
            period: 3,
            epoch: 28,
            ..Default::default()
        };
        // Parent inside the epoch window: no advance.
        assert_eq!(next_epoch(&config, 5, 1_000, 1_027), (5, 1_000));
        // Past the window: advance, epoch time snaps to the block time.
        assert_eq!(next_epoch(&config, 5, 1_000, 1_030), (6, 1_030));
    }

    #[test]
    fn exact_multiple_does_not_advance() {
        let config = SenateConfig {
            period: 3,
            epoch: 30,
            ..Default::default()
        };
        assert_eq!(next_epoch(&config, 5, 1_000, 1_030), (5, 1_000));
        assert_eq!(next_epoch(&config, 5, 1_000, 1_033), (6, 1_033));
    }
}
