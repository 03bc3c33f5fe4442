//! Index windows over an image axis.

use core::ops::Range;

/// Resolve a `start..stop` window over an axis of length `len`.
///
/// Negative bounds count from the end of the axis, bounds past either end are clamped,
/// and a window whose resolved stop precedes its start is empty.
pub fn slice_range(start: i64, stop: i64, len: usize) -> Range<usize> {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolve = |index: i64| -> usize {
        let index = if index < 0 { index + len_i } else { index };
        index.clamp(0, len_i) as usize
    };

    let start = resolve(start);
    let stop = resolve(stop).max(start);
    start..stop
}
