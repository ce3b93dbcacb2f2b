//! Bit-mask addressing of calendar selections.
//!
//! A selection of calendars is encoded as `Σ 2^id` over their bit ids, so a
//! whole selection fits in one URL path segment.

use crate::error::{CoreError, CoreResult};

/// Number of addressable bit ids.
pub const MASK_WIDTH: i64 = u64::BITS as i64;

/// Encodes bit ids into a mask. Ids outside `0..64` are ignored.
pub fn encode<I>(ids: I) -> u64
where
    I: IntoIterator<Item = i64>,
{
    ids.into_iter()
        .filter(|id| (0..MASK_WIDTH).contains(id))
        .fold(0, |mask, id| mask | (1u64 << id))
}

/// Returns true if bit `id` is set in `mask`.
pub fn is_selected(mask: u64, id: i64) -> bool {
    (0..MASK_WIDTH).contains(&id) && mask & (1u64 << id) != 0
}

/// Selects the names whose bit is set, in declared order.
pub fn decode<S: AsRef<str>>(mask: u64, entries: &[(S, i64)]) -> Vec<String> {
    entries
        .iter()
        .filter(|(_, id)| is_selected(mask, *id))
        .map(|(name, _)| name.as_ref().to_string())
        .collect()
}

/// Parses a mask from a path segment.
///
/// # Errors
///
/// The segment must be a non-negative integer that fits in 64 bits.
pub fn parse_mask(segment: &str) -> CoreResult<u64> {
    let segment = segment.trim();
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_input(format!(
            "selection {segment:?} is not a non-negative integer"
        )));
    }
    segment.parse().map_err(|err| {
        CoreError::invalid_input(format!("selection {segment:?} is out of range: {err}"))
    })
}
