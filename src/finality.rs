//! Forced finality for chains whose upstreams report a stale or missing last irreversible block.

use crate::block::Block;

pub const FORCE_FINALITY_AFTER_BLOCKS_ENV: &str = "FORCE_FINALITY_AFTER_BLOCKS";

/// Reads [`FORCE_FINALITY_AFTER_BLOCKS_ENV`] once. Unset, empty or unparseable values disable the
/// tweak.
pub fn force_finality_after_blocks_from_env() -> Option<u64> {
    parse_force_finality_after_blocks(&std::env::var(FORCE_FINALITY_AFTER_BLOCKS_ENV).ok()?)
}

pub fn parse_force_finality_after_blocks(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<u64>().ok()
}

/// Pulls `lib_num` forward to `number - max_distance` when the block is at least `max_distance`
/// ahead of its reported last irreversible block.
pub fn tweak_block_finality(block: &mut Block, max_distance: u64) {
    if block.number >= max_distance && block.number.saturating_sub(block.lib_num) >= max_distance {
        block.lib_num = block.number - max_distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(number: u64, lib_num: u64) -> Block {
        Block { number, lib_num, ..Default::default() }
    }

    #[test]
    fn test_tweak_forces_lib_when_too_far_behind() {
        let mut blk = block(1000, 10);
        tweak_block_finality(&mut blk, 200);
        assert_eq!(blk.lib_num, 800);
    }

    #[test]
    fn test_tweak_keeps_recent_lib() {
        let mut blk = block(1000, 900);
        tweak_block_finality(&mut blk, 200);
        assert_eq!(blk.lib_num, 900);
    }

    #[test]
    fn test_tweak_exact_distance() {
        let mut blk = block(1000, 800);
        tweak_block_finality(&mut blk, 200);
        assert_eq!(blk.lib_num, 800);

        let mut blk = block(200, 0);
        tweak_block_finality(&mut blk, 200);
        assert_eq!(blk.lib_num, 0);
    }

    #[test]
    fn test_tweak_ignores_blocks_below_distance() {
        let mut blk = block(150, 0);
        tweak_block_finality(&mut blk, 200);
        assert_eq!(blk.lib_num, 0);
    }

    #[test]
    fn test_tweak_tolerates_lib_ahead_of_block() {
        let mut blk = block(1000, 1200);
        tweak_block_finality(&mut blk, 200);
        assert_eq!(blk.lib_num, 1200);
    }

    #[test]
    fn test_parse_force_finality() {
        assert_eq!(parse_force_finality_after_blocks("200"), Some(200));
        assert_eq!(parse_force_finality_after_blocks(" 12 "), Some(12));
        assert_eq!(parse_force_finality_after_blocks(""), None);
        assert_eq!(parse_force_finality_after_blocks("-5"), None);
        assert_eq!(parse_force_finality_after_blocks("ten"), None);
    }
}
