//! Term to partition routing. The build and query phases must compute this
//! identically; changing the hash silently breaks every existing index.

use crate::{IndexError, PartitionId, Result};
use std::num::NonZeroU32;

/// Polynomial string hash: `h = h * 31 + c` over the term's code points,
/// wrapping at 32 bits.
pub fn term_hash(term: &str) -> i32 {
    term.chars()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

pub fn partition_of(term: &str, num_partitions: NonZeroU32) -> PartitionId {
    ((term_hash(term) & 0x7FFF_FFFF) as u32) % num_partitions.get()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRouter {
    num_partitions: NonZeroU32,
}

impl PartitionRouter {
    pub fn new(num_partitions: u32) -> Result<Self> {
        NonZeroU32::new(num_partitions)
            .map(|num_partitions| Self { num_partitions })
            .ok_or(IndexError::InvalidPartitionCount(num_partitions))
    }

    pub fn num_partitions(&self) -> u32 { self.num_partitions.get() }

    pub fn route(&self, term: &str) -> PartitionId { partition_of(term, self.num_partitions) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_hash_values() {
        assert_eq!(term_hash(""), 0);
        assert_eq!(term_hash("cat"), 98_262);
        assert_eq!(term_hash("dog"), 99_644);
        assert_eq!(term_hash("hello"), 99_162_322);
        // Wraps to i32::MIN; masking the sign bit leaves 0.
        assert_eq!(term_hash("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn masks_sign_bit_before_modulo() {
        let router = PartitionRouter::new(7).unwrap();
        assert_eq!(router.route("polygenelubricants"), 0);
        let negative = "the quick brown fox jumps over";
        let h = term_hash(negative);
        assert_eq!(router.route(negative), ((h & 0x7FFF_FFFF) as u32) % 7);
    }

    #[test]
    fn routes_into_range_deterministically() {
        let router = PartitionRouter::new(5).unwrap();
        for term in ["a", "zebra", "naïve", "東京", "🦀", ""] {
            let p = router.route(term);
            assert!(p < 5);
            assert_eq!(p, router.route(term));
        }
    }

    #[test]
    fn single_partition_takes_everything() {
        let router = PartitionRouter::new(1).unwrap();
        assert_eq!(router.route("anything"), 0);
    }

    #[test]
    fn zero_partitions_is_rejected() {
        assert!(matches!(PartitionRouter::new(0), Err(IndexError::InvalidPartitionCount(0))));
    }
}
