use std::ops::RangeInclusive;

use alloy::{eips::BlockNumberOrTag, primitives::BlockNumber};

use crate::FetchError;

/// Upper bound of a block range.
///
/// `Latest` only ever appears on the top-level range; once the head is resolved every
/// sub-range carries a concrete number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RangeEnd {
    Number(BlockNumber),
    Latest,
}

impl RangeEnd {
    #[must_use]
    pub fn as_number(self) -> Option<BlockNumber> {
        match self {
            RangeEnd::Number(number) => Some(number),
            RangeEnd::Latest => None,
        }
    }
}

impl From<BlockNumber> for RangeEnd {
    fn from(number: BlockNumber) -> Self {
        RangeEnd::Number(number)
    }
}

impl From<RangeEnd> for BlockNumberOrTag {
    fn from(end: RangeEnd) -> Self {
        match end {
            RangeEnd::Number(number) => BlockNumberOrTag::Number(number),
            RangeEnd::Latest => BlockNumberOrTag::Latest,
        }
    }
}

impl TryFrom<BlockNumberOrTag> for RangeEnd {
    type Error = FetchError;

    fn try_from(tag: BlockNumberOrTag) -> Result<Self, Self::Error> {
        match tag {
            BlockNumberOrTag::Number(number) => Ok(RangeEnd::Number(number)),
            BlockNumberOrTag::Latest => Ok(RangeEnd::Latest),
            BlockNumberOrTag::Earliest => Ok(RangeEnd::Number(0)),
            other => Err(FetchError::UnsupportedBlockTag(other)),
        }
    }
}

/// Splits `[from, to]` at `floor((from + to) / 2)`.
///
/// Returns `None` for a single-block (or empty) range.
#[must_use]
pub fn bisect(
    from: BlockNumber,
    to: BlockNumber,
) -> Option<(RangeInclusive<BlockNumber>, RangeInclusive<BlockNumber>)> {
    if from >= to {
        return None;
    }
    let mid = from + (to - from) / 2;
    Some((from..=mid, mid + 1..=to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisect_even_range() {
        assert_eq!(bisect(100, 103), Some((100..=101, 102..=103)));
    }

    #[test]
    fn bisect_odd_range_puts_extra_block_in_upper_half() {
        assert_eq!(bisect(100, 102), Some((100..=101, 102..=102)));
        assert_eq!(bisect(1, 4), Some((1..=2, 3..=4)));
    }

    #[test]
    fn bisect_two_blocks() {
        assert_eq!(bisect(7, 8), Some((7..=7, 8..=8)));
    }

    #[test]
    fn bisect_single_block_is_atomic() {
        assert_eq!(bisect(100, 100), None);
    }

    #[test]
    fn bisect_empty_range() {
        assert_eq!(bisect(101, 100), None);
    }

    #[test]
    fn bisect_does_not_overflow() {
        let (lower, upper) = bisect(u64::MAX - 1, u64::MAX).unwrap();
        assert_eq!(lower, u64::MAX - 1..=u64::MAX - 1);
        assert_eq!(upper, u64::MAX..=u64::MAX);

        let (lower, upper) = bisect(0, u64::MAX).unwrap();
        assert_eq!(*lower.end(), u64::MAX / 2);
        assert_eq!(*upper.start(), u64::MAX / 2 + 1);
    }

    #[test]
    fn repeated_bisection_covers_range_exactly() {
        fn leaves(from: u64, to: u64, out: &mut Vec<RangeInclusive<u64>>) {
            match bisect(from, to) {
                Some((lower, upper)) => {
                    leaves(*lower.start(), *lower.end(), out);
                    leaves(*upper.start(), *upper.end(), out);
                }
                None => out.push(from..=to),
            }
        }

        let mut out = Vec::new();
        leaves(10, 27, &mut out);

        assert_eq!(out.len(), 18);
        assert!(out.iter().enumerate().all(|(i, range)| *range == (10 + i as u64..=10 + i as u64)));
    }

    #[test]
    fn block_tags_convert_to_range_ends() {
        assert_eq!(RangeEnd::try_from(BlockNumberOrTag::Number(5)).unwrap(), RangeEnd::Number(5));
        assert_eq!(RangeEnd::try_from(BlockNumberOrTag::Latest).unwrap(), RangeEnd::Latest);
        assert_eq!(RangeEnd::try_from(BlockNumberOrTag::Earliest).unwrap(), RangeEnd::Number(0));
        assert!(matches!(
            RangeEnd::try_from(BlockNumberOrTag::Finalized),
            Err(FetchError::UnsupportedBlockTag(BlockNumberOrTag::Finalized))
        ));
        assert!(matches!(
            RangeEnd::try_from(BlockNumberOrTag::Pending),
            Err(FetchError::UnsupportedBlockTag(BlockNumberOrTag::Pending))
        ));
    }

    #[test]
    fn range_end_round_trips_into_block_tag() {
        assert_eq!(BlockNumberOrTag::from(RangeEnd::Latest), BlockNumberOrTag::Latest);
        assert_eq!(BlockNumberOrTag::from(RangeEnd::from(9)), BlockNumberOrTag::Number(9));
        assert_eq!(RangeEnd::Latest.as_number(), None);
    }
}
