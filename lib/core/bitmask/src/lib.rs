//! Const-friendly bit manipulation primitives over address-line masks.
//!
//! Every function operates on [`usize`], the natural width of an address on the target. Arguments
//! named `mask` are always sets of bit positions, never counts.
#![no_std]

/// Returns `num` with every bit below its highest set bit also set.
///
/// Returns `0` when `num` is `0`. For a non-zero power of two `len`, `fill_below_highest_bit(len
/// - 1)` is `len - 1`.
pub const fn fill_below_highest_bit(mut num: usize) -> usize {
    let mut shift = 1;
    while shift < usize::BITS {
        num |= num >> shift;
        shift <<= 1;
    }

    num
}

/// Returns a value with only the most significant set bit of `num` retained.
///
/// Returns `0` when `num` is `0`.
pub const fn highest_set_bit(num: usize) -> usize {
    let filled = fill_below_highest_bit(num);
    filled ^ (filled >> 1)
}

/// Spreads the bits of `addr` open at every position marked in `mask`.
///
/// Working from the lowest marked position upwards, the bits of `addr` at and above each marked
/// position are shifted up by one, leaving a `0` at the marked position. Bits shifted past the top
/// of the word are lost.
///
/// This is the inverse of [`compress()`] on the bits that survive.
pub const fn expand(mut addr: usize, mut mask: usize) -> usize {
    while mask != 0 {
        let below = (mask - 1) & !mask;
        addr = ((addr & !below) << 1) | (addr & below);
        mask &= mask - 1;
    }

    addr
}

/// Removes the bits of `addr` at every position marked in `mask`, packing the remaining bits
/// towards bit `0`.
///
/// The marked positions are interpreted in the coordinates of the original `addr`. The vacated top
/// bits are `0`.
pub const fn compress(mut addr: usize, mut mask: usize) -> usize {
    while mask != 0 {
        let below = (mask - 1) & !mask;
        addr = (addr & below) | ((addr >> 1) & !below);
        // The bit just removed shifted every higher position down by one.
        mask = (mask & (mask - 1)) >> 1;
    }

    addr
}

#[cfg(test)]
mod test {
    use super::{compress, expand, fill_below_highest_bit, highest_set_bit};

    /// A spread of masks with contiguous, sparse, and boundary bit patterns.
    const MASKS: &[usize] = &[
        0,
        1,
        0b1010,
        0x2000,
        0x4000,
        0x8001,
        0xF0F0,
        0x0001_0100,
        usize::MAX >> 1,
        1 << (usize::BITS - 1),
    ];

    /// A spread of values to push through [`MASKS`].
    const VALUES: &[usize] = &[0, 1, 0x7FFF, 0xDEAD_BEEF, 0x1234_5678, usize::MAX];

    #[test]
    fn fill_zero_is_zero() {
        assert_eq!(fill_below_highest_bit(0), 0);
    }

    #[test]
    fn fill_is_identity_on_full_masks() {
        for shift in 0..usize::BITS {
            let len = 1usize << shift;
            assert_eq!(fill_below_highest_bit(len - 1), len - 1);
        }
        assert_eq!(fill_below_highest_bit(usize::MAX), usize::MAX);
    }

    #[test]
    fn fill_rounds_up_to_top_bit() {
        assert_eq!(fill_below_highest_bit(0x2FFF), 0x3FFF);
        assert_eq!(fill_below_highest_bit(0x8000), 0xFFFF);
        assert_eq!(fill_below_highest_bit(0x0001_0001), 0x0001_FFFF);
        assert_eq!(fill_below_highest_bit(1 << (usize::BITS - 1)), usize::MAX);
    }

    #[test]
    fn highest_set_bit_is_single_top_bit() {
        assert_eq!(highest_set_bit(0), 0);
        assert_eq!(highest_set_bit(1), 1);
        assert_eq!(highest_set_bit(0xBFFF), 0x8000);
        assert_eq!(highest_set_bit(usize::MAX), 1 << (usize::BITS - 1));

        for &value in VALUES.iter().filter(|&&value| value != 0) {
            let bit = highest_set_bit(value);
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(bit.trailing_zeros(), usize::BITS - 1 - value.leading_zeros());
        }
    }

    #[test]
    fn expand_opens_marked_lines() {
        assert_eq!(expand(0x7FFF, 0), 0x7FFF);
        assert_eq!(expand(0x7FFF, 0x4000), 0xBFFF);
        assert_eq!(expand(0x7FFF, 0x2000), 0xDFFF);
        assert_eq!(expand(0b11, 0b101), 0b1010);
        assert_eq!(expand(0x7FFF, 0x0001), 0xFFFE);
    }

    #[test]
    fn compress_removes_marked_lines() {
        assert_eq!(compress(0xBFFF, 0x4000), 0x7FFF);
        assert_eq!(compress(0xDFFF, 0x2000), 0x7FFF);
        assert_eq!(compress(0b1010, 0b101), 0b11);
        assert_eq!(compress(0xFFFF, 0), 0xFFFF);
        assert_eq!(compress(0x7FFF, 0x8000), 0x7FFF);
    }

    #[test]
    fn expand_leaves_marked_lines_clear() {
        for &mask in MASKS {
            for &value in VALUES {
                assert_eq!(expand(value, mask) & mask, 0, "{value:#x} {mask:#x}");
            }
        }
    }

    #[test]
    fn compress_undoes_expand() {
        for &mask in MASKS {
            let kept = usize::MAX.checked_shr(mask.count_ones()).unwrap_or(0);
            for &value in VALUES {
                assert_eq!(
                    compress(expand(value, mask), mask),
                    value & kept,
                    "{value:#x} {mask:#x}"
                );
            }
        }
    }

    #[test]
    fn usable_in_const_context() {
        const TOP: usize = fill_below_highest_bit(0x8000 | 0x7FFF);
        const SELECT: usize = TOP & !expand(fill_below_highest_bit(0x8000 - 1), 0);

        assert_eq!(TOP, 0xFFFF);
        assert_eq!(SELECT, 0x8000);
    }
}
