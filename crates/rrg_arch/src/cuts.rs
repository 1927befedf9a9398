//! Die-boundary ("cut") row selection for multi-die devices.
//!
//! Cuts are spread evenly over the grid height and snapped down to a multiple
//! of the least common multiple of all tile heights, so that no tile ever
//! straddles a die boundary.

use crate::error::ArchError;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u32, b: u32) -> Option<u32> {
    let g = gcd(a, b);
    if g == 0 {
        return Some(0);
    }
    (a / g).checked_mul(b)
}

/// Computes the least common multiple of the given tile heights.
///
/// Zero heights are ignored; an empty input yields `1`.
pub fn lcm_of_block_heights(heights: impl IntoIterator<Item = u16>) -> Result<u32, ArchError> {
    let mut acc = 1u32;
    for h in heights.into_iter().filter(|&h| h > 0) {
        acc = lcm(acc, u32::from(h)).ok_or(ArchError::LcmOverflow)?;
    }
    Ok(acc)
}

/// Returns `num_cuts` evenly spaced cut rows for a grid of the given height.
///
/// The `i`-th cut (1-based) is placed at `i * height / (num_cuts + 1)` and then
/// rounded down to a multiple of `alignment`. Cuts at row 0, at or beyond the
/// last row, or colliding with the previous cut are rejected, since they
/// would separate nothing.
pub fn interposer_cut_locations(
    height: u16,
    num_cuts: u16,
    alignment: u32,
) -> Result<Vec<u16>, ArchError> {
    let alignment = alignment.max(1);
    let too_dense = ArchError::CutsTooDense {
        num_cuts,
        height,
        alignment,
    };
    let mut cuts: Vec<u16> = Vec::with_capacity(num_cuts as usize);
    for i in 1..=u32::from(num_cuts) {
        let raw = i * u32::from(height) / (u32::from(num_cuts) + 1);
        let aligned = raw - raw % alignment;
        if aligned == 0 || aligned + 1 >= u32::from(height) {
            return Err(too_dense);
        }
        let aligned = aligned as u16;
        if cuts.last().is_some_and(|&prev| prev >= aligned) {
            return Err(too_dense);
        }
        cuts.push(aligned);
    }
    Ok(cuts)
}
