// SPDX-License-Identifier: MPL-2.0

//! Sampling parameters derived from the width of a range.
//!
//! For a range `r`, the sampler draws candidates uniformly from `[0, 2^b)` where `b` is the
//! smallest bit width with `2^b - 1 >= r`. Since `2^b <= 2 * r` for `r >= 1`, fewer than half of
//! the candidates are rejected on average.

/// Bit width, byte width and mask needed to draw candidates for a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingParameters {
    bit_width: u32,
    byte_width: usize,
    mask: u64,
}

impl SamplingParameters {
    /// Compute the parameters for candidates in `[0, range]`.
    pub fn for_range(range: u64) -> Self {
        let bit_width = u64::BITS - range.leading_zeros();
        let mask = if bit_width == u64::BITS {
            u64::MAX
        } else {
            (1 << bit_width) - 1
        };
        Self {
            bit_width,
            byte_width: bit_width.div_ceil(8) as usize,
            mask,
        }
    }

    /// The smallest `b` such that `2^b - 1` covers the range.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// `ceil(bit_width / 8)`. This is zero for an empty range.
    pub fn byte_width(&self) -> usize {
        self.byte_width
    }

    /// Mask retaining the low `bit_width` bits of a candidate.
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Number of bytes to request from the entropy source per candidate.
    ///
    /// This is `byte_width` except for a zero range, where one byte is still drawn so that each
    /// iteration of the sampling loop consumes entropy. The mask is zero in that case, so the
    /// candidate is always `0`.
    pub fn bytes_requested(&self) -> usize {
        self.byte_width.max(1)
    }

    /// Reduce a raw little-endian candidate to the low `bit_width` bits.
    pub(crate) fn apply_mask(&self, raw: u64) -> u64 {
        raw & self.mask
    }
}
