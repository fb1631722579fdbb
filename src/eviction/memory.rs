//! Size-based LRU: entries weigh their approximate resident size.
//!
//! The configured limit is in megabytes; the statistics gauge holds bytes.

use crate::eviction::value::EntryValue;

/// Megabytes allowed when no limit is configured.
pub const DEFAULT_MAXIMUM_MEGABYTES: i64 = 10;

pub const MEGABYTE: i64 = 1024 * 1024;

/// Fixed bookkeeping cost charged to every resident entry.
pub const PER_ENTRY_OVERHEAD: i64 = 64;

pub(crate) const LIMIT_STAT: &str = "bytesAllowed";
pub(crate) const COUNT_STAT: &str = "byteCount";

/// Convert a megabyte limit to the byte value the statistics gauge holds.
pub fn limit_in_bytes(megabytes: i64) -> i64 {
    megabytes.saturating_mul(MEGABYTE)
}

/// Resident bytes charged for one entry.
///
/// The key of an entry without a resident value still occupies memory, so
/// only removed markers weigh nothing.
pub fn entry_size(key: &[u8], value: &EntryValue<'_>) -> i64 {
    if value.is_removed() {
        return 0;
    }
    let value_len = value.live_bytes().map_or(0, <[u8]>::len);
    PER_ENTRY_OVERHEAD + key.len() as i64 + value_len as i64
}
